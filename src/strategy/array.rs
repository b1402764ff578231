use super::*;
use crate::schema::ArrayKind;

/// Primitive arrays: a length, then the elements back to back.
///
/// Integer elements are varints when `var_ints` is set in the [`Config`], and little-endian fixed
/// width otherwise. Floating-point elements are always fixed width. Byte arrays are copied as-is.
pub struct ArrayStrategy {
    kind: ArrayKind,
}

impl ArrayStrategy {
    pub fn new(kind: ArrayKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ArrayKind {
        self.kind
    }
}

fn read_vec<T>(
    input: &mut Input,
    mut f: impl FnMut(&mut Input) -> Result<T>,
) -> Result<Vec<T>> {
    let len = input.read_len()?;
    let mut v = Vec::with_capacity(len);
    for _ in 0..len {
        v.push(f(input)?);
    }
    Ok(v)
}

impl Strategy for ArrayStrategy {
    fn write(&self, ctx: &mut WriteContext<'_>, out: &mut Output<'_>, obj: &Object) -> Result<()> {
        let var_ints = ctx.config().var_ints;
        match (self.kind, obj) {
            (ArrayKind::Bytes, Object::Bytes(v)) => {
                out.write_len(v.len())?;
                out.write_bytes(v)
            }
            (ArrayKind::Ints, Object::Ints(v)) => {
                out.write_len(v.len())?;
                for &x in v {
                    if var_ints {
                        out.write_var_i32(x)?;
                    } else {
                        out.write_i32(x)?;
                    }
                }
                Ok(())
            }
            (ArrayKind::Longs, Object::Longs(v)) => {
                out.write_len(v.len())?;
                for &x in v {
                    if var_ints {
                        out.write_var_i64(x)?;
                    } else {
                        out.write_i64(x)?;
                    }
                }
                Ok(())
            }
            (ArrayKind::Floats, Object::Floats(v)) => {
                out.write_len(v.len())?;
                v.iter().try_for_each(|&x| out.write_f32(x))
            }
            (ArrayKind::Doubles, Object::Doubles(v)) => {
                out.write_len(v.len())?;
                v.iter().try_for_each(|&x| out.write_f64(x))
            }
            (kind, obj) => Err(Error::mismatch(kind.type_name(), obj.type_name())),
        }
    }

    fn read(
        &self,
        ctx: &mut ReadContext<'_>,
        input: &mut Input<'_>,
        _ty: &TypeDesc,
    ) -> Result<ObjectRef> {
        let var_ints = ctx.config().var_ints;
        let obj = match self.kind {
            ArrayKind::Bytes => {
                let len = input.read_len()?;
                Object::Bytes(input.read_bytes(len)?.to_vec())
            }
            ArrayKind::Ints if var_ints => Object::Ints(read_vec(input, |i| i.read_var_i32())?),
            ArrayKind::Ints => Object::Ints(read_vec(input, |i| i.read_i32())?),
            ArrayKind::Longs if var_ints => Object::Longs(read_vec(input, |i| i.read_var_i64())?),
            ArrayKind::Longs => Object::Longs(read_vec(input, |i| i.read_i64())?),
            ArrayKind::Floats => Object::Floats(read_vec(input, |i| i.read_f32())?),
            ArrayKind::Doubles => Object::Doubles(read_vec(input, |i| i.read_f64())?),
        };
        Ok(ObjectRef::new(obj))
    }
}
