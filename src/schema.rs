//! Type and field descriptions.
//!
//! There is no runtime reflection to discover a type's fields, so every struct type is described
//! up front by a [`StructDef`]: a name plus an ordered list of [`FieldDescriptor`]s. The order of
//! the list is the declaration order used by the Plain, Compatible, and Versioned strategies. Tags
//! and version ranges on each descriptor are only read by the strategies that need them.

use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// The declared type of a field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Str,
    /// A reference-typed field holding an object of the named type (or null). Always encoded
    /// through the engine, so the nested type brings its own strategy.
    Object(String),
}

impl FieldType {
    /// Table code of object-typed fields. The type name follows it.
    pub const OBJECT_CODE: u8 = 9;

    pub fn object(type_name: impl Into<String>) -> Self {
        FieldType::Object(type_name.into())
    }

    /// Single-byte code used in the Compatible strategy's schema table.
    pub fn code(&self) -> u8 {
        match self {
            FieldType::Bool => 1,
            FieldType::Byte => 2,
            FieldType::Short => 3,
            FieldType::Int => 4,
            FieldType::Long => 5,
            FieldType::Float => 6,
            FieldType::Double => 7,
            FieldType::Str => 8,
            FieldType::Object(_) => Self::OBJECT_CODE,
        }
    }

    /// Convert a code back to a primitive field type. Object types carry a name and are built
    /// separately, so code 9 (and anything unknown) returns `None`.
    pub fn from_primitive_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(FieldType::Bool),
            2 => Some(FieldType::Byte),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Int),
            5 => Some(FieldType::Long),
            6 => Some(FieldType::Float),
            7 => Some(FieldType::Double),
            8 => Some(FieldType::Str),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, FieldType::Object(_))
    }

    /// The zero value of the type: `false`, `0`, `0.0`, or null for strings and objects.
    pub fn zero(&self) -> Value {
        match self {
            FieldType::Bool => Value::Bool(false),
            FieldType::Byte => Value::Byte(0),
            FieldType::Short => Value::Short(0),
            FieldType::Int => Value::Int(0),
            FieldType::Long => Value::Long(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::Double => Value::Double(0.0),
            FieldType::Str | FieldType::Object(_) => Value::Null,
        }
    }

    /// Check if a value can be stored in a field of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Bool, Value::Bool(_)) => true,
            (FieldType::Byte, Value::Byte(_)) => true,
            (FieldType::Short, Value::Short(_)) => true,
            (FieldType::Int, Value::Int(_)) => true,
            (FieldType::Long, Value::Long(_)) => true,
            (FieldType::Float, Value::Float(_)) => true,
            (FieldType::Double, Value::Double(_)) => true,
            (FieldType::Str, Value::Str(_)) | (FieldType::Str, Value::Null) => true,
            (FieldType::Object(_), Value::Null) => true,
            (FieldType::Object(name), Value::Ref(obj)) => {
                obj.borrow().type_name() == name.as_str()
            }
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldType::Bool => f.write_str("bool"),
            FieldType::Byte => f.write_str("byte"),
            FieldType::Short => f.write_str("short"),
            FieldType::Int => f.write_str("int"),
            FieldType::Long => f.write_str("long"),
            FieldType::Float => f.write_str("float"),
            FieldType::Double => f.write_str("double"),
            FieldType::Str => f.write_str("string"),
            FieldType::Object(name) => f.write_str(name),
        }
    }
}

/// Describes one field of a struct type.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    ty: FieldType,
    tag: Option<u32>,
    default: Option<Value>,
    since: u32,
    until: Option<u32>,
    tracked: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            tag: None,
            default: None,
            since: 0,
            until: None,
            tracked: true,
        }
    }

    /// Set the wire tag used by the Tagged strategy.
    pub fn tag(mut self, tag: u32) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Set the value a reader fills in when the field is absent from the data.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Schema version that introduced the field.
    pub fn since(mut self, version: u32) -> Self {
        self.since = version;
        self
    }

    /// Schema version that removed the field. It is present for versions `since..until`.
    pub fn until(mut self, version: u32) -> Self {
        self.until = Some(version);
        self
    }

    /// Never reference-track this field's objects; each occurrence is written in full.
    pub fn untracked(mut self) -> Self {
        self.tracked = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.ty
    }

    pub fn get_tag(&self) -> Option<u32> {
        self.tag
    }

    pub fn get_since(&self) -> u32 {
        self.since
    }

    pub fn get_until(&self) -> Option<u32> {
        self.until
    }

    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// Whether the field exists in the given schema version.
    pub fn active_at(&self, version: u32) -> bool {
        self.since <= version && self.until.map_or(true, |until| version < until)
    }

    /// The configured default, or the type's zero value.
    pub fn default_for_read(&self) -> Value {
        self.default.clone().unwrap_or_else(|| self.ty.zero())
    }
}

/// A struct type: name and ordered fields.
#[derive(Clone, Debug, PartialEq)]
pub struct StructDef {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl StructDef {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The newest schema version mentioned by any field.
    pub fn version(&self) -> u32 {
        self.fields
            .iter()
            .map(|f| f.since.max(f.until.unwrap_or(0)))
            .max()
            .unwrap_or(0)
    }
}

/// Element type of a primitive array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    Bytes,
    Ints,
    Longs,
    Floats,
    Doubles,
}

impl ArrayKind {
    pub fn type_name(self) -> &'static str {
        match self {
            ArrayKind::Bytes => "byte[]",
            ArrayKind::Ints => "int[]",
            ArrayKind::Longs => "long[]",
            ArrayKind::Floats => "float[]",
            ArrayKind::Doubles => "double[]",
        }
    }
}

/// The runtime identity of a type. Types are identified by name within a registry.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeDesc {
    Array(ArrayKind),
    Struct(Rc<StructDef>),
}

impl TypeDesc {
    pub fn name(&self) -> &str {
        match self {
            TypeDesc::Array(kind) => kind.type_name(),
            TypeDesc::Struct(def) => def.name(),
        }
    }

    pub fn as_struct(&self) -> Option<&Rc<StructDef>> {
        match self {
            TypeDesc::Struct(def) => Some(def),
            TypeDesc::Array(_) => None,
        }
    }
}

impl From<ArrayKind> for TypeDesc {
    fn from(kind: ArrayKind) -> Self {
        TypeDesc::Array(kind)
    }
}

impl From<Rc<StructDef>> for TypeDesc {
    fn from(def: Rc<StructDef>) -> Self {
        TypeDesc::Struct(def)
    }
}

impl From<&Rc<StructDef>> for TypeDesc {
    fn from(def: &Rc<StructDef>) -> Self {
        TypeDesc::Struct(Rc::clone(def))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ranges() {
        let f = FieldDescriptor::new("b", FieldType::Int).since(1).until(3);
        assert!(!f.active_at(0));
        assert!(f.active_at(1));
        assert!(f.active_at(2));
        assert!(!f.active_at(3));
        let g = FieldDescriptor::new("c", FieldType::Int);
        assert!(g.active_at(0) && g.active_at(u32::MAX));
    }

    #[test]
    fn struct_version() {
        let def = StructDef::new(
            "T",
            vec![
                FieldDescriptor::new("a", FieldType::Int),
                FieldDescriptor::new("b", FieldType::Int).until(2),
                FieldDescriptor::new("d", FieldType::Int).since(1),
            ],
        );
        assert_eq!(def.version(), 2);
        assert_eq!(StructDef::new("E", vec![]).version(), 0);
    }

    #[test]
    fn defaults() {
        let f = FieldDescriptor::new("x", FieldType::Long);
        assert_eq!(f.default_for_read(), Value::Long(0));
        let f = f.default_value(7i64);
        assert_eq!(f.default_for_read(), Value::Long(7));
        let s = FieldDescriptor::new("s", FieldType::Str);
        assert_eq!(s.default_for_read(), Value::Null);
    }

    #[test]
    fn accepts() {
        use crate::value::ObjectRef;

        assert!(FieldType::Int.accepts(&Value::Int(1)));
        assert!(!FieldType::Int.accepts(&Value::Long(1)));
        assert!(!FieldType::Int.accepts(&Value::Null));
        assert!(FieldType::Str.accepts(&Value::Null));
        assert!(FieldType::Str.accepts(&Value::from("s")));
        let longs = Value::Ref(ObjectRef::new(vec![1i64]));
        assert!(FieldType::object("long[]").accepts(&longs));
        assert!(FieldType::object("long[]").accepts(&Value::Null));
        assert!(!FieldType::object("int[]").accepts(&longs));
        assert!(!FieldType::Long.accepts(&longs));
    }

    #[test]
    fn codes() {
        for ty in [
            FieldType::Bool,
            FieldType::Byte,
            FieldType::Short,
            FieldType::Int,
            FieldType::Long,
            FieldType::Float,
            FieldType::Double,
            FieldType::Str,
        ] {
            assert_eq!(FieldType::from_primitive_code(ty.code()), Some(ty));
        }
        assert_eq!(FieldType::from_primitive_code(FieldType::object("X").code()), None);
    }
}
