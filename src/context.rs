//! Per-call state for one top-level write or read.
//!
//! A context is created fresh by the [`Engine`][crate::Engine] for every top-level call and
//! dropped when the call returns, successfully or not. Strategies receive it so nested objects can
//! be delegated back through the registry, with reference tracking shared across the whole graph.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::trace;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::input::Input;
use crate::marker::{ClassTag, RefMarker};
use crate::output::Output;
use crate::refs::{ReadRefs, WriteRefs};
use crate::registry::Registry;
use crate::schema::TypeDesc;
use crate::strategy::{RemoteField, Strategy};
use crate::value::{ObjectRef, Value};
use crate::MAX_DEPTH;

pub struct WriteContext<'r> {
    registry: &'r mut Registry,
    refs: WriteRefs,
    schemas: HashSet<String>,
    isolated: usize,
    depth: usize,
}

impl<'r> WriteContext<'r> {
    pub(crate) fn new(registry: &'r mut Registry) -> Self {
        Self {
            registry,
            refs: WriteRefs::new(),
            schemas: HashSet::new(),
            isolated: 0,
            depth: 0,
        }
    }

    pub fn config(&self) -> &Config {
        self.registry.config()
    }

    pub fn registry(&self) -> &Registry {
        &*self.registry
    }

    /// Number of objects tracked so far in this call.
    pub fn tracked(&self) -> usize {
        self.refs.len()
    }

    /// Write a non-null, reference-tracked object whose type the reader will know.
    pub fn write_object(&mut self, out: &mut Output, obj: &ObjectRef) -> Result<()> {
        self.write_ref(out, Some(obj), true)
    }

    pub fn write_object_or_null(
        &mut self,
        out: &mut Output,
        obj: Option<&ObjectRef>,
    ) -> Result<()> {
        self.write_ref(out, obj, true)
    }

    /// Write one reference slot: a marker, an index if tracked, then the object's record.
    ///
    /// The type is resolved before anything is written, so an unregistered type fails without
    /// touching the output.
    pub fn write_ref(
        &mut self,
        out: &mut Output,
        obj: Option<&ObjectRef>,
        tracked: bool,
    ) -> Result<()> {
        let obj = match obj {
            Some(obj) => obj,
            None => return out.write_u8(RefMarker::Null.into()),
        };
        let strategy = self.resolve(obj)?;
        if tracked && self.registry.config().references {
            let (is_new, index) = self.refs.track(obj);
            if !is_new {
                trace!("Backreference to object {}", index);
                out.write_u8(RefMarker::BackRef.into())?;
                out.write_var_u32(index as u32)?;
                return Ok(());
            }
            out.write_u8(RefMarker::New.into())?;
            out.write_var_u32(index as u32)?;
        } else {
            out.write_u8(RefMarker::Value.into())?;
        }
        self.write_body(out, &strategy, obj)
    }

    /// Write an object preceded by its type tag, so the reader doesn't need to know the type.
    pub fn write_class_and_object(
        &mut self,
        out: &mut Output,
        obj: Option<&ObjectRef>,
    ) -> Result<()> {
        let obj = match obj {
            Some(obj) => obj,
            None => {
                out.write_var_u32(ClassTag::Null.into_u32())?;
                return Ok(());
            }
        };
        let ty = obj.type_desc();
        let entry = self.registry.resolve(&ty)?;
        if entry.is_implicit() {
            out.write_var_u32(ClassTag::Name.into_u32())?;
            out.write_str(ty.name())?;
        } else {
            out.write_var_u32(ClassTag::Id(entry.id()).into_u32())?;
        }
        self.write_ref(out, Some(obj), true)
    }

    fn resolve(&mut self, obj: &ObjectRef) -> Result<Rc<dyn Strategy>> {
        let found = self
            .registry
            .get(obj.borrow().type_name())
            .map(|r| Rc::clone(r.strategy()));
        match found {
            Some(strategy) => Ok(strategy),
            None => {
                let ty = obj.type_desc();
                Ok(Rc::clone(self.registry.resolve(&ty)?.strategy()))
            }
        }
    }

    fn write_body(
        &mut self,
        out: &mut Output,
        strategy: &Rc<dyn Strategy>,
        obj: &ObjectRef,
    ) -> Result<()> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::DepthLimit(MAX_DEPTH));
        }
        self.depth += 1;
        let result = strategy.write(self, out, &obj.borrow());
        self.depth -= 1;
        result
    }

    /// Run `f` in a span the reader may skip without decoding. Schema tables written inside it
    /// aren't remembered, so nothing outside relies on the reader having seen them.
    pub(crate) fn isolated<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.isolated += 1;
        let result = f(self);
        self.isolated -= 1;
        result
    }

    /// Returns true if the schema table for `name` needs to be written inline.
    pub(crate) fn first_schema(&mut self, name: &str) -> bool {
        if self.isolated > 0 {
            return true;
        }
        if self.schemas.contains(name) {
            false
        } else {
            self.schemas.insert(name.to_string());
            true
        }
    }
}

pub struct ReadContext<'r> {
    registry: &'r mut Registry,
    refs: ReadRefs,
    /// Reference index (and gap limit) waiting for the object currently being decoded.
    pending: Vec<Option<(usize, usize)>>,
    schemas: HashMap<String, Rc<[RemoteField]>>,
    depth: usize,
    /// Decoded objects thrown away by a strategy. They may be unreachable from the result.
    dropped: usize,
}

impl<'r> ReadContext<'r> {
    pub(crate) fn new(registry: &'r mut Registry) -> Self {
        Self {
            registry,
            refs: ReadRefs::new(),
            pending: Vec::new(),
            schemas: HashMap::new(),
            depth: 0,
            dropped: 0,
        }
    }

    pub fn config(&self) -> &Config {
        self.registry.config()
    }

    pub fn registry(&self) -> &Registry {
        &*self.registry
    }

    /// Read a non-null object of a known type.
    pub fn read_object(&mut self, input: &mut Input, ty: &TypeDesc) -> Result<ObjectRef> {
        self.read_object_or_null(input, ty)?.ok_or_else(|| {
            Error::MalformedEncoding(format!("Expected a {} object, got null", ty.name()))
        })
    }

    pub fn read_object_or_null(
        &mut self,
        input: &mut Input,
        ty: &TypeDesc,
    ) -> Result<Option<ObjectRef>> {
        let entry = self.registry.resolve(ty)?;
        let (ty, strategy) = (entry.type_desc().clone(), Rc::clone(entry.strategy()));
        self.read_slot(input, &ty, &strategy)
    }

    /// Read a reference slot for a field declared with the named type.
    pub fn read_named(&mut self, input: &mut Input, name: &str) -> Result<Option<ObjectRef>> {
        let entry = self
            .registry
            .get(name)
            .ok_or_else(|| Error::UnregisteredType(name.to_string()))?;
        let (ty, strategy) = (entry.type_desc().clone(), Rc::clone(entry.strategy()));
        self.read_slot(input, &ty, &strategy)
    }

    /// Read an object preceded by its type tag.
    pub fn read_class_and_object(&mut self, input: &mut Input) -> Result<Option<ObjectRef>> {
        let entry = match ClassTag::from_u32(input.read_var_u32()?) {
            ClassTag::Null => return Ok(None),
            ClassTag::Name => {
                let name = input.read_str()?;
                self.registry
                    .get(&name)
                    .ok_or(Error::UnregisteredType(name))?
            }
            ClassTag::Id(id) => self.registry.by_id(id)?,
        };
        let (ty, strategy) = (entry.type_desc().clone(), Rc::clone(entry.strategy()));
        self.read_slot(input, &ty, &strategy)
    }

    fn read_slot(
        &mut self,
        input: &mut Input,
        ty: &TypeDesc,
        strategy: &Rc<dyn Strategy>,
    ) -> Result<Option<ObjectRef>> {
        let at = input.position();
        let marker = input.read_u8()?;
        match RefMarker::from_u8(marker) {
            None => Err(Error::MalformedEncoding(format!(
                "Unknown reference marker 0x{:02x} at byte {}",
                marker, at
            ))),
            Some(RefMarker::Null) => Ok(None),
            Some(RefMarker::BackRef) => {
                let index = input.read_var_u32()? as usize;
                let obj = self.refs.get(index)?;
                if obj.borrow().type_name() != ty.name() {
                    return Err(Error::mismatch(ty.name(), obj.type_name()));
                }
                trace!("Resolved backreference {} to a {}", index, ty.name());
                Ok(Some(obj))
            }
            Some(RefMarker::New) => {
                let index = input.read_var_u32()? as usize;
                self.pending.push(Some((index, at)));
                let result = self.read_body(input, ty, strategy);
                let pending = self.pending.pop().flatten();
                let obj = result?;
                if let Some((index, gap)) = pending {
                    self.refs.place(index, obj.clone(), gap)?;
                }
                Ok(Some(obj))
            }
            Some(RefMarker::Value) => {
                self.pending.push(None);
                let result = self.read_body(input, ty, strategy);
                self.pending.pop();
                result.map(Some)
            }
        }
    }

    fn read_body(
        &mut self,
        input: &mut Input,
        ty: &TypeDesc,
        strategy: &Rc<dyn Strategy>,
    ) -> Result<ObjectRef> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::DepthLimit(MAX_DEPTH));
        }
        self.depth += 1;
        let result = strategy.read(self, input, ty);
        self.depth -= 1;
        result
    }

    /// Register a freshly created instance before its fields are read, so references back to it
    /// from inside its own fields resolve. Strategies for types that can take part in cycles call
    /// this right after allocating the instance; for everything else the context registers the
    /// finished object itself.
    pub fn reference(&mut self, obj: &ObjectRef) -> Result<()> {
        if let Some(slot) = self.pending.last_mut() {
            if let Some((index, gap)) = slot.take() {
                return self.refs.place(index, obj.clone(), gap);
            }
        }
        Ok(())
    }

    pub(crate) fn cached_schema(&self, name: &str) -> Option<Rc<[RemoteField]>> {
        self.schemas.get(name).cloned()
    }

    pub(crate) fn cache_schema(&mut self, name: &str, table: Rc<[RemoteField]>) {
        self.schemas.insert(name.to_string(), table);
    }

    /// Record that a strategy decoded a value and won't store it.
    pub(crate) fn drop_value(&mut self, value: Value) {
        if let Value::Ref(_) = value {
            self.dropped += 1;
        }
    }

    /// Break links among decoded objects the caller can't reach from `root`. Only does any work
    /// if a strategy dropped an object during the call.
    pub(crate) fn release_unreachable(&mut self, root: Option<&ObjectRef>) {
        if self.dropped == 0 {
            return;
        }
        let mut reachable = HashSet::new();
        let mut stack: Vec<ObjectRef> = root.into_iter().cloned().collect();
        while let Some(obj) = stack.pop() {
            if !reachable.insert(obj.identity()) {
                continue;
            }
            if let Some(s) = obj.borrow().as_struct() {
                stack.extend(s.fields().filter_map(|(_, v)| v.as_ref().cloned()));
            }
        }
        let count = self
            .refs
            .unlink_where(|obj| !reachable.contains(&obj.identity()));
        trace!("Unlinked {} unreachable objects", count);
    }

    /// Break every link among the objects decoded so far. The engine calls this when a read
    /// fails, since nothing decoded is handed back.
    pub(crate) fn unlink_decoded(&mut self) {
        let count = self.refs.unlink_where(|_| true);
        trace!("Unlinked {} objects from a failed read", count);
    }
}
