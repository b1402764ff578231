use std::rc::Rc;

use super::field::read_value;
use super::*;

/// Fields in declaration order, each present only in the versions it covers.
///
/// A field exists from its [`since`][FieldDescriptor::since] version up to, but not including,
/// its [`until`][FieldDescriptor::until] version. The type's version is the newest one any field
/// mentions. Every record starts with the writer's version, and only the fields active in it are
/// written.
///
/// A reader decodes the fields that were active in the writer's version, then keeps the ones
/// still active in its own. Retired fields therefore have to stay in the field list, with their
/// `until` set. Data from a version newer than the reader's is rejected with
/// [`UnknownVersion`][Error::UnknownVersion].
pub struct VersionedStrategy {
    def: Rc<StructDef>,
    version: u32,
}

impl VersionedStrategy {
    pub fn new(def: &Rc<StructDef>) -> Result<Self> {
        check_names(def)?;
        for f in def.fields() {
            if let Some(until) = f.get_until() {
                if until <= f.get_since() {
                    return Err(Error::InvalidDescriptor(format!(
                        "{}.{} is removed at version {}, before it's added at version {}",
                        def.name(),
                        f.name(),
                        until,
                        f.get_since()
                    )));
                }
            }
        }
        Ok(Self {
            def: Rc::clone(def),
            version: def.version(),
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}

impl Strategy for VersionedStrategy {
    fn write(&self, ctx: &mut WriteContext<'_>, out: &mut Output<'_>, obj: &Object) -> Result<()> {
        let s = struct_of(&self.def, obj)?;
        out.write_var_u32(self.version)?;
        for f in self.def.fields().iter().filter(|f| f.active_at(self.version)) {
            write_struct_field(ctx, out, s, f)?;
        }
        Ok(())
    }

    fn read(
        &self,
        ctx: &mut ReadContext<'_>,
        input: &mut Input<'_>,
        _ty: &TypeDesc,
    ) -> Result<ObjectRef> {
        let found = input.read_var_u32()?;
        if found > self.version {
            return Err(Error::UnknownVersion {
                found,
                supported: self.version,
            });
        }
        let obj = begin_struct(ctx, &self.def)?;
        let mut values = Vec::with_capacity(self.def.fields().len());
        for (i, f) in self.def.fields().iter().enumerate() {
            if !f.active_at(found) {
                continue;
            }
            let value = read_value(ctx, input, f.field_type())?;
            if f.active_at(self.version) {
                values.push((i, value));
            } else {
                ctx.drop_value(value);
            }
        }
        finish_struct(&obj, &self.def, values);
        Ok(obj)
    }
}
