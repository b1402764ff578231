use std::collections::HashMap;
use std::rc::Rc;

use log::{trace, warn};

use super::field::read_value;
use super::*;
use crate::schema::FieldType;

const SCHEMA_CACHED: u8 = 0;
const SCHEMA_INLINE: u8 = 1;

/// One entry of a writer's field table, matched against the reader's own fields.
#[derive(Clone, Debug)]
pub(crate) struct RemoteField {
    name: String,
    ty: FieldType,
    /// Index of the matching local field, if there is one of the same name and type.
    local: Option<usize>,
}

/// Fields in declaration order, preceded by a table of field names and types.
///
/// The table is written the first time a type shows up in a call; later records of the same type
/// in that call refer back to it with a single byte. Readers match fields by name: fields the
/// reader doesn't have are decoded and dropped, fields the writer didn't have keep their
/// defaults.
///
/// Object-typed values are prefixed with their byte length. A reader that has neither the field
/// nor the field's type registered skips those bytes, with the same caveat as
/// [`TaggedStrategy`]: a later backreference to an object first written inside them fails with
/// [`DanglingReference`][Error::DanglingReference].
pub struct CompatibleStrategy {
    def: Rc<StructDef>,
    by_name: HashMap<String, usize>,
}

impl CompatibleStrategy {
    pub fn new(def: &Rc<StructDef>) -> Result<Self> {
        check_names(def)?;
        let by_name = def
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name().to_string(), i))
            .collect();
        Ok(Self {
            def: Rc::clone(def),
            by_name,
        })
    }

    fn write_table(&self, out: &mut Output) -> Result<()> {
        out.write_len(self.def.fields().len())?;
        for f in self.def.fields() {
            out.write_str(f.name())?;
            let ty = f.field_type();
            out.write_u8(ty.code())?;
            if let FieldType::Object(name) = ty {
                out.write_str(name)?;
            }
        }
        Ok(())
    }

    fn read_table(&self, input: &mut Input) -> Result<Rc<[RemoteField]>> {
        let len = input.read_len()?;
        let mut table = Vec::with_capacity(len.min(self.def.fields().len() * 2));
        for _ in 0..len {
            let name = input.read_str()?;
            let code = input.read_u8()?;
            let ty = match FieldType::from_primitive_code(code) {
                Some(ty) => ty,
                None if code == FieldType::OBJECT_CODE => FieldType::Object(input.read_str()?),
                None => {
                    return Err(Error::MalformedEncoding(format!(
                        "Unknown field type code {} for {}.{}",
                        code,
                        self.def.name(),
                        name
                    )))
                }
            };
            let local = self.by_name.get(&name).copied().filter(|&i| {
                let local_ty = self.def.fields()[i].field_type();
                if *local_ty != ty {
                    warn!(
                        "Field {}.{} was written as {} but is declared as {}, dropping it",
                        self.def.name(),
                        name,
                        ty,
                        local_ty
                    );
                    return false;
                }
                true
            });
            table.push(RemoteField { name, ty, local });
        }
        Ok(table.into())
    }

    fn keep(
        &self,
        ctx: &mut ReadContext,
        remote: &RemoteField,
        value: Value,
        values: &mut Vec<(usize, Value)>,
    ) {
        match remote.local {
            Some(i) => values.push((i, value)),
            None => {
                trace!("Dropped field {}.{}", self.def.name(), remote.name);
                ctx.drop_value(value);
            }
        }
    }
}

impl Strategy for CompatibleStrategy {
    fn write(&self, ctx: &mut WriteContext<'_>, out: &mut Output<'_>, obj: &Object) -> Result<()> {
        let s = struct_of(&self.def, obj)?;
        if ctx.first_schema(self.def.name()) {
            out.write_u8(SCHEMA_INLINE)?;
            self.write_table(out)?;
        } else {
            out.write_u8(SCHEMA_CACHED)?;
        }
        let mut scratch = Output::unbounded();
        for f in self.def.fields() {
            if !f.field_type().is_object() {
                write_struct_field(ctx, out, s, f)?;
                continue;
            }
            ctx.isolated(|ctx| {
                scratch.clear();
                write_struct_field(ctx, &mut scratch, s, f)?;
                out.write_len(scratch.position())?;
                out.write_bytes(scratch.as_slice())
            })?;
        }
        Ok(())
    }

    fn read(
        &self,
        ctx: &mut ReadContext<'_>,
        input: &mut Input<'_>,
        _ty: &TypeDesc,
    ) -> Result<ObjectRef> {
        let table = match input.read_u8()? {
            SCHEMA_INLINE => {
                let table = self.read_table(input)?;
                ctx.cache_schema(self.def.name(), Rc::clone(&table));
                table
            }
            SCHEMA_CACHED => ctx.cached_schema(self.def.name()).ok_or_else(|| {
                Error::MalformedEncoding(format!(
                    "Field table for {} referenced before it was written",
                    self.def.name()
                ))
            })?,
            flag => {
                return Err(Error::MalformedEncoding(format!(
                    "Unknown field table flag 0x{:02x}",
                    flag
                )))
            }
        };

        let obj = begin_struct(ctx, &self.def)?;
        let mut values = Vec::with_capacity(table.len());
        for remote in table.iter() {
            let name = match &remote.ty {
                FieldType::Object(name) => name,
                ty => {
                    let value = read_value(ctx, input, ty)?;
                    self.keep(ctx, remote, value, &mut values);
                    continue;
                }
            };
            let len = input.read_len()?;
            let mut span = input.take(len)?;
            if remote.local.is_none() && ctx.registry().get(name).is_none() {
                trace!(
                    "Skipped {} bytes of field {}.{} with unknown type {}",
                    len,
                    self.def.name(),
                    remote.name,
                    name
                );
                continue;
            }
            let value = read_value(ctx, &mut span, &remote.ty)?;
            if !span.is_empty() {
                return Err(Error::MalformedEncoding(format!(
                    "Field {}.{} left {} of its {} bytes unread",
                    self.def.name(),
                    remote.name,
                    span.remaining(),
                    len
                )));
            }
            self.keep(ctx, remote, value, &mut values);
        }
        finish_struct(&obj, &self.def, values);
        Ok(obj)
    }
}
