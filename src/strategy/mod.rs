//! Field strategies: how a type's fields map to wire bytes.
//!
//! Every registered type is bound to a [`Strategy`]. Struct types get one of the four field
//! strategies, chosen per type or by [`Config::default_strategy`]:
//! - [`PlainStrategy`] - fields in declaration order, nothing else. Smallest and fastest, but the
//!     reader's field list must match the writer's exactly.
//! - [`CompatibleStrategy`] - fields in declaration order, preceded once per type per call by a
//!     table of field names and types. Readers match fields by name.
//! - [`TaggedStrategy`] - each field carries its tag and byte length. Unknown tags are skipped,
//!     missing ones take their default.
//! - [`VersionedStrategy`] - fields carry a `since..until` version range; each record starts
//!     with the writer's version.
//!
//! Primitive arrays are bound to the [`ArrayStrategy`]. Anything else can be handled by
//! implementing [`Strategy`] directly, or by wrapping a pair of closures in a [`FnStrategy`].
//!
//! Strategies never recurse into nested objects themselves: object-typed fields go back through
//! the context, so a nested type is encoded by whatever strategy it is bound to.

mod array;
mod compatible;
mod field;
mod plain;
mod tagged;
mod versioned;

pub use self::array::*;
pub use self::compatible::*;
pub use self::plain::*;
pub use self::tagged::*;
pub use self::versioned::*;

pub(crate) use self::compatible::RemoteField;

use std::collections::HashSet;
use std::rc::Rc;

use crate::config::{Config, StrategyKind};
use crate::context::{ReadContext, WriteContext};
use crate::error::{Error, Result};
use crate::input::Input;
use crate::output::Output;
use crate::schema::{FieldDescriptor, StructDef, TypeDesc};
use crate::value::{Object, ObjectRef, Struct, Value};

/// Encodes and decodes the objects of one registered type.
pub trait Strategy {
    /// Write the record for `obj`. The reference marker has already been written.
    fn write(&self, ctx: &mut WriteContext<'_>, out: &mut Output<'_>, obj: &Object) -> Result<()>;

    /// Read a record back into a new object of type `ty`.
    fn read(
        &self,
        ctx: &mut ReadContext<'_>,
        input: &mut Input<'_>,
        ty: &TypeDesc,
    ) -> Result<ObjectRef>;
}

/// Build the strategy a type gets when registered without an explicit one.
pub fn build_default(ty: &TypeDesc, config: &Config) -> Result<Rc<dyn Strategy>> {
    match ty {
        TypeDesc::Array(kind) => Ok(Rc::new(ArrayStrategy::new(*kind))),
        TypeDesc::Struct(def) => build(config.default_strategy, def),
    }
}

/// Build one of the field strategies for a struct type.
pub fn build(kind: StrategyKind, def: &Rc<StructDef>) -> Result<Rc<dyn Strategy>> {
    Ok(match kind {
        StrategyKind::Plain => Rc::new(PlainStrategy::new(def)?),
        StrategyKind::Compatible => Rc::new(CompatibleStrategy::new(def)?),
        StrategyKind::Tagged => Rc::new(TaggedStrategy::new(def)?),
        StrategyKind::Versioned => Rc::new(VersionedStrategy::new(def)?),
    })
}

/// A strategy made from a pair of closures, for types that want a hand-written encoding.
///
/// ```
/// # use field_pack::*;
/// let point = StructDef::new("Point", vec![
///     FieldDescriptor::new("x", FieldType::Int),
///     FieldDescriptor::new("y", FieldType::Int),
/// ]);
/// let def = point.clone();
/// let strategy = FnStrategy::new(
///     |_ctx, out, obj| {
///         let s = obj.as_struct().unwrap();
///         out.write_i32(s.get("x").and_then(Value::as_i32).unwrap_or(0))?;
///         out.write_i32(s.get("y").and_then(Value::as_i32).unwrap_or(0))
///     },
///     move |_ctx, input, _ty| {
///         let s = Struct::new(&def)
///             .with("x", input.read_i32()?)
///             .with("y", input.read_i32()?);
///         Ok(ObjectRef::new(s))
///     },
/// );
/// let mut engine = Engine::default();
/// engine.register_with(point.clone(), strategy).unwrap();
/// ```
pub struct FnStrategy<W, R> {
    write: W,
    read: R,
}

impl<W, R> FnStrategy<W, R>
where
    W: Fn(&mut WriteContext<'_>, &mut Output<'_>, &Object) -> Result<()>,
    R: Fn(&mut ReadContext<'_>, &mut Input<'_>, &TypeDesc) -> Result<ObjectRef>,
{
    pub fn new(write: W, read: R) -> Self {
        Self { write, read }
    }
}

impl<W, R> Strategy for FnStrategy<W, R>
where
    W: Fn(&mut WriteContext<'_>, &mut Output<'_>, &Object) -> Result<()>,
    R: Fn(&mut ReadContext<'_>, &mut Input<'_>, &TypeDesc) -> Result<ObjectRef>,
{
    fn write(&self, ctx: &mut WriteContext<'_>, out: &mut Output<'_>, obj: &Object) -> Result<()> {
        (self.write)(ctx, out, obj)
    }

    fn read(
        &self,
        ctx: &mut ReadContext<'_>,
        input: &mut Input<'_>,
        ty: &TypeDesc,
    ) -> Result<ObjectRef> {
        (self.read)(ctx, input, ty)
    }
}

fn check_names(def: &StructDef) -> Result<()> {
    let mut seen = HashSet::new();
    for f in def.fields() {
        if !seen.insert(f.name()) {
            return Err(Error::InvalidDescriptor(format!(
                "{} declares field {} twice",
                def.name(),
                f.name()
            )));
        }
    }
    Ok(())
}

/// Borrow the struct an object holds, checking it's the type this strategy is bound to.
fn struct_of<'o>(def: &StructDef, obj: &'o Object) -> Result<&'o Struct> {
    obj.as_struct()
        .filter(|s| s.name() == def.name())
        .ok_or_else(|| Error::mismatch(def.name(), obj.type_name()))
}

/// Write one field of a struct, falling back to the field's default if the instance lacks it.
fn write_struct_field(
    ctx: &mut WriteContext,
    out: &mut Output,
    s: &Struct,
    field: &FieldDescriptor,
) -> Result<()> {
    let default;
    let value = match s.get(field.name()) {
        Some(v) => v,
        None => {
            default = field.default_for_read();
            &default
        }
    };
    field::write_value(ctx, out, field, value)
}

/// Allocate an instance with every field at its default and register it for backreferences.
fn begin_struct(ctx: &mut ReadContext, def: &Rc<StructDef>) -> Result<ObjectRef> {
    let obj = ObjectRef::new(Struct::new(def));
    ctx.reference(&obj)?;
    Ok(obj)
}

/// Store decoded values, given as (field index, value), into an instance from `begin_struct`.
fn finish_struct(obj: &ObjectRef, def: &StructDef, values: Vec<(usize, Value)>) {
    let mut obj = obj.borrow_mut();
    if let Some(s) = obj.as_struct_mut() {
        for (index, value) in values {
            s.set(def.fields()[index].name(), value);
        }
    }
}
