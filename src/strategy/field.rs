//! Encoding of single field values, shared by the field strategies.

use crate::context::{ReadContext, WriteContext};
use crate::error::{Error, Result};
use crate::input::Input;
use crate::output::Output;
use crate::schema::{FieldDescriptor, FieldType};
use crate::value::Value;

pub(crate) fn write_value(
    ctx: &mut WriteContext,
    out: &mut Output,
    field: &FieldDescriptor,
    value: &Value,
) -> Result<()> {
    let ty = field.field_type();
    if !ty.accepts(value) {
        return Err(Error::mismatch(
            format!("{} for field {}", ty, field.name()),
            value.kind(),
        ));
    }
    let var_ints = ctx.config().var_ints;
    match value {
        Value::Null if ty.is_object() => ctx.write_ref(out, None, field.is_tracked()),
        Value::Null => out.write_str_opt(None),
        Value::Bool(v) => out.write_bool(*v),
        Value::Byte(v) => out.write_i8(*v),
        Value::Short(v) => out.write_i16(*v),
        Value::Int(v) if var_ints => out.write_var_i32(*v).map(|_| ()),
        Value::Int(v) => out.write_i32(*v),
        Value::Long(v) if var_ints => out.write_var_i64(*v).map(|_| ()),
        Value::Long(v) => out.write_i64(*v),
        Value::Float(v) => out.write_f32(*v),
        Value::Double(v) => out.write_f64(*v),
        Value::Str(v) => out.write_str_opt(Some(v.as_str())),
        Value::Ref(obj) => ctx.write_ref(out, Some(obj), field.is_tracked()),
    }
}

pub(crate) fn read_value(
    ctx: &mut ReadContext,
    input: &mut Input,
    ty: &FieldType,
) -> Result<Value> {
    let var_ints = ctx.config().var_ints;
    Ok(match ty {
        FieldType::Bool => Value::Bool(input.read_bool()?),
        FieldType::Byte => Value::Byte(input.read_i8()?),
        FieldType::Short => Value::Short(input.read_i16()?),
        FieldType::Int => Value::Int(if var_ints {
            input.read_var_i32()?
        } else {
            input.read_i32()?
        }),
        FieldType::Long => Value::Long(if var_ints {
            input.read_var_i64()?
        } else {
            input.read_i64()?
        }),
        FieldType::Float => Value::Float(input.read_f32()?),
        FieldType::Double => Value::Double(input.read_f64()?),
        FieldType::Str => input.read_str_opt()?.map_or(Value::Null, Value::Str),
        FieldType::Object(name) => ctx.read_named(input, name)?.map_or(Value::Null, Value::Ref),
    })
}
