//! The dynamic object model the codec reads and writes.
//!
//! A [`Value`] is what a field holds. Primitives and strings are plain values; anything on the
//! heap is an [`Object`] behind an [`ObjectRef`]. Two `ObjectRef`s pointing at the same
//! allocation are the same object as far as reference tracking is concerned, so aliasing and
//! cycles in a graph survive a round trip.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::schema::{ArrayKind, StructDef, TypeDesc};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Ref(ObjectRef),
}

impl Value {
    pub fn kind(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Byte(_) => "byte".to_string(),
            Value::Short(_) => "short".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Long(_) => "long".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Double(_) => "double".to_string(),
            Value::Str(_) => "string".to_string(),
            Value::Ref(obj) => obj.type_name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_ref(&self) -> Option<&ObjectRef> {
        match self {
            Value::Ref(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match *self {
            Value::Short(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Double(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_value_from {
    ($type:ty, $variant:ident) => {
        impl From<$type> for Value {
            fn from(v: $type) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_value_from!(bool, Bool);
impl_value_from!(i8, Byte);
impl_value_from!(i16, Short);
impl_value_from!(i32, Int);
impl_value_from!(i64, Long);
impl_value_from!(f32, Float);
impl_value_from!(f64, Double);
impl_value_from!(String, Str);
impl_value_from!(ObjectRef, Ref);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// An instance of a struct type: field values keyed by field name.
#[derive(Clone)]
pub struct Struct {
    def: Rc<StructDef>,
    fields: BTreeMap<String, Value>,
}

impl Struct {
    /// Create an instance with every field at its default value.
    pub fn new(def: &Rc<StructDef>) -> Self {
        let fields = def
            .fields()
            .iter()
            .map(|f| (f.name().to_string(), f.default_for_read()))
            .collect();
        Self {
            def: Rc::clone(def),
            fields,
        }
    }

    /// Builder-style [`set`][Struct::set].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.to_string(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn def(&self) -> &Rc<StructDef> {
        &self.def
    }

    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Set every object-valued field to null, returning the objects they held.
    pub fn take_refs(&mut self) -> Vec<ObjectRef> {
        let mut refs = Vec::new();
        for value in self.fields.values_mut() {
            if matches!(value, Value::Ref(_)) {
                if let Value::Ref(obj) = std::mem::replace(value, Value::Null) {
                    refs.push(obj);
                }
            }
        }
        refs
    }
}

impl PartialEq for Struct {
    fn eq(&self, other: &Self) -> bool {
        self.def.name() == other.def.name() && self.fields == other.fields
    }
}

impl fmt::Debug for Struct {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut s = f.debug_struct(self.def.name());
        for (k, v) in self.fields.iter() {
            s.field(k, v);
        }
        s.finish()
    }
}

/// A heap object: a struct instance or a primitive array.
#[derive(Clone, Debug, PartialEq)]
pub enum Object {
    Struct(Struct),
    Bytes(Vec<u8>),
    Ints(Vec<i32>),
    Longs(Vec<i64>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
}

impl Object {
    pub fn type_name(&self) -> &str {
        match self {
            Object::Struct(s) => s.name(),
            Object::Bytes(_) => ArrayKind::Bytes.type_name(),
            Object::Ints(_) => ArrayKind::Ints.type_name(),
            Object::Longs(_) => ArrayKind::Longs.type_name(),
            Object::Floats(_) => ArrayKind::Floats.type_name(),
            Object::Doubles(_) => ArrayKind::Doubles.type_name(),
        }
    }

    pub fn type_desc(&self) -> TypeDesc {
        match self {
            Object::Struct(s) => TypeDesc::Struct(Rc::clone(s.def())),
            Object::Bytes(_) => TypeDesc::Array(ArrayKind::Bytes),
            Object::Ints(_) => TypeDesc::Array(ArrayKind::Ints),
            Object::Longs(_) => TypeDesc::Array(ArrayKind::Longs),
            Object::Floats(_) => TypeDesc::Array(ArrayKind::Floats),
            Object::Doubles(_) => TypeDesc::Array(ArrayKind::Doubles),
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Object::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct_mut(&mut self) -> Option<&mut Struct> {
        match self {
            Object::Struct(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Struct> for Object {
    fn from(v: Struct) -> Self {
        Object::Struct(v)
    }
}

impl From<Vec<u8>> for Object {
    fn from(v: Vec<u8>) -> Self {
        Object::Bytes(v)
    }
}

impl From<Vec<i32>> for Object {
    fn from(v: Vec<i32>) -> Self {
        Object::Ints(v)
    }
}

impl From<Vec<i64>> for Object {
    fn from(v: Vec<i64>) -> Self {
        Object::Longs(v)
    }
}

impl From<Vec<f32>> for Object {
    fn from(v: Vec<f32>) -> Self {
        Object::Floats(v)
    }
}

impl From<Vec<f64>> for Object {
    fn from(v: Vec<f64>) -> Self {
        Object::Doubles(v)
    }
}

/// Shared handle to an [`Object`]. The allocation's address is the object's identity.
///
/// Equality is structural. Comparing or debug-printing a graph that contains a cycle doesn't
/// terminate; use [`ObjectRef::ptr_eq`] to check identities in cyclic graphs.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<Object>>);

impl ObjectRef {
    pub fn new(obj: impl Into<Object>) -> Self {
        ObjectRef(Rc::new(RefCell::new(obj.into())))
    }

    pub fn borrow(&self) -> Ref<'_, Object> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Object> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(a: &ObjectRef, b: &ObjectRef) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Identity key used by the reference table.
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn type_name(&self) -> String {
        self.0.borrow().type_name().to_string()
    }

    pub fn type_desc(&self) -> TypeDesc {
        self.0.borrow().type_desc()
    }

    /// Null out this object's own object fields. Does nothing if the object is borrowed.
    pub(crate) fn unlink(&self) {
        if let Ok(mut obj) = self.0.try_borrow_mut() {
            if let Some(s) = obj.as_struct_mut() {
                s.take_refs();
            }
        }
    }

    /// Null out every object field reachable from this object.
    ///
    /// A decoded graph with a cycle in it is a reference cycle, and isn't freed until some link
    /// in the cycle is broken. Call this on the root once the graph is no longer needed. Objects
    /// that are borrowed at the time are skipped.
    pub fn unlink_graph(&self) {
        let mut stack = vec![self.clone()];
        while let Some(obj) = stack.pop() {
            // Each link is taken at most once, so revisits find nothing left to follow
            if let Ok(mut inner) = obj.0.try_borrow_mut() {
                if let Some(s) = inner.as_struct_mut() {
                    stack.extend(s.take_refs());
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn handle_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        ObjectRef::ptr_eq(self, other) || *self.0.borrow() == *other.0.borrow()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(obj) => fmt::Debug::fmt(&*obj, f),
            Err(_) => write!(f, "<borrowed object @{:#x}>", self.identity()),
        }
    }
}
