use std::rc::Rc;

use super::field::read_value;
use super::*;

/// Fields in declaration order, with no per-field overhead.
///
/// There's no way for a reader to notice that the writer's field list differs from its own, so
/// decoding data written with a different field list fails or produces garbage. Only use this
/// when both sides are guaranteed to use the same definition.
pub struct PlainStrategy {
    def: Rc<StructDef>,
}

impl PlainStrategy {
    pub fn new(def: &Rc<StructDef>) -> Result<Self> {
        check_names(def)?;
        Ok(Self {
            def: Rc::clone(def),
        })
    }
}

impl Strategy for PlainStrategy {
    fn write(&self, ctx: &mut WriteContext<'_>, out: &mut Output<'_>, obj: &Object) -> Result<()> {
        let s = struct_of(&self.def, obj)?;
        for f in self.def.fields() {
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
        let obj = begin_struct(ctx, &self.def)?;
        let mut values = Vec::with_capacity(self.def.fields().len());
        for (i, f) in self.def.fields().iter().enumerate() {
            values.push((i, read_value(ctx, input, f.field_type())?));
        }
        finish_struct(&obj, &self.def, values);
        Ok(obj)
    }
}
