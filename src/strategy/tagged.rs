use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use super::field::read_value;
use super::*;

/// Each field written as its tag, its byte length, then its value.
///
/// Every field must carry a unique [tag][FieldDescriptor::tag]. Readers skip the bytes of tags
/// they don't know and leave missing fields at their default, so fields can be added and removed
/// freely as long as tags are never reused for a different type.
///
/// Objects first written inside a skipped field are never seen by the reader. A later
/// backreference to one of them fails with [`DanglingReference`][Error::DanglingReference];
/// mark such fields [untracked][FieldDescriptor::untracked] if old readers need to get past them.
pub struct TaggedStrategy {
    def: Rc<StructDef>,
    by_tag: HashMap<u32, usize>,
}

impl TaggedStrategy {
    pub fn new(def: &Rc<StructDef>) -> Result<Self> {
        check_names(def)?;
        let mut by_tag = HashMap::with_capacity(def.fields().len());
        for (i, f) in def.fields().iter().enumerate() {
            let tag = f.get_tag().ok_or_else(|| {
                Error::InvalidDescriptor(format!(
                    "{}.{} has no tag, but the type is tagged",
                    def.name(),
                    f.name()
                ))
            })?;
            if let Some(prev) = by_tag.insert(tag, i) {
                return Err(Error::InvalidDescriptor(format!(
                    "{}.{} and {}.{} share tag {}",
                    def.name(),
                    def.fields()[prev].name(),
                    def.name(),
                    f.name(),
                    tag
                )));
            }
        }
        Ok(Self {
            def: Rc::clone(def),
            by_tag,
        })
    }
}

impl Strategy for TaggedStrategy {
    fn write(&self, ctx: &mut WriteContext<'_>, out: &mut Output<'_>, obj: &Object) -> Result<()> {
        let s = struct_of(&self.def, obj)?;
        out.write_len(self.def.fields().len())?;
        ctx.isolated(|ctx| {
            let mut scratch = Output::unbounded();
            for f in self.def.fields() {
                scratch.clear();
                write_struct_field(ctx, &mut scratch, s, f)?;
                // Tags were checked when the strategy was built
                out.write_var_u32(f.get_tag().unwrap_or_default())?;
                out.write_len(scratch.position())?;
                out.write_bytes(scratch.as_slice())?;
            }
            Ok(())
        })
    }

    fn read(
        &self,
        ctx: &mut ReadContext<'_>,
        input: &mut Input<'_>,
        _ty: &TypeDesc,
    ) -> Result<ObjectRef> {
        let count = input.read_len()?;
        let obj = begin_struct(ctx, &self.def)?;
        let mut values = Vec::with_capacity(count.min(self.def.fields().len()));
        for _ in 0..count {
            let tag = input.read_var_u32()?;
            let len = input.read_len()?;
            let mut span = input.take(len)?;
            let index = match self.by_tag.get(&tag) {
                Some(&index) => index,
                None => {
                    trace!("Skipped {} bytes of unknown tag {} in {}", len, tag, self.def.name());
                    continue;
                }
            };
            let value = read_value(ctx, &mut span, self.def.fields()[index].field_type())?;
            if !span.is_empty() {
                return Err(Error::MalformedEncoding(format!(
                    "Field {}.{} (tag {}) left {} of its {} bytes unread",
                    self.def.name(),
                    self.def.fields()[index].name(),
                    tag,
                    span.remaining(),
                    len
                )));
            }
            values.push((index, value));
        }
        finish_struct(&obj, &self.def, values);
        Ok(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use crate::{Config, Engine, StrategyKind};

    fn engine(defs: &[&Rc<StructDef>]) -> Engine {
        let mut engine = Engine::new(Config::new().default_strategy(StrategyKind::Tagged));
        for def in defs {
            engine.register(*def).unwrap();
        }
        engine
    }

    #[test]
    fn untagged_field_rejected() {
        let def = StructDef::new(
            "Sample",
            vec![
                FieldDescriptor::new("a", FieldType::Int).tag(1),
                FieldDescriptor::new("b", FieldType::Int),
            ],
        );
        assert!(matches!(
            TaggedStrategy::new(&def),
            Err(Error::InvalidDescriptor(_))
        ));
        let mut engine = Engine::new(Config::new().default_strategy(StrategyKind::Tagged));
        assert!(matches!(
            engine.register(&def),
            Err(Error::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn duplicate_tag_rejected() {
        let def = StructDef::new(
            "Sample",
            vec![
                FieldDescriptor::new("a", FieldType::Int).tag(3),
                FieldDescriptor::new("b", FieldType::Str).tag(3),
            ],
        );
        assert!(matches!(
            TaggedStrategy::new(&def),
            Err(Error::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn unknown_tags_skipped() {
        let inner = StructDef::new(
            "Inner",
            vec![FieldDescriptor::new("s", FieldType::Str).tag(1)],
        );
        let writer = StructDef::new(
            "Sample",
            vec![
                FieldDescriptor::new("a", FieldType::Int).tag(1),
                FieldDescriptor::new("extra", FieldType::object("Inner")).tag(7),
                FieldDescriptor::new("b", FieldType::Double).tag(2),
            ],
        );
        let reader = StructDef::new(
            "Sample",
            vec![
                FieldDescriptor::new("b", FieldType::Double).tag(2),
                FieldDescriptor::new("a", FieldType::Int).tag(1),
                FieldDescriptor::new("c", FieldType::Long).tag(4).default_value(5i64),
            ],
        );
        let obj = ObjectRef::new(
            Struct::new(&writer)
                .with("a", 11)
                .with("b", 0.5)
                .with("extra", ObjectRef::new(Struct::new(&inner).with("s", "skip me"))),
        );
        let mut out = Output::unbounded();
        engine(&[&inner, &writer])
            .write_object(&mut out, &obj)
            .unwrap();
        let bytes = out.into_inner();

        // The reader doesn't even know the Inner type
        let read = engine(&[&reader])
            .read_object(&mut Input::new(&bytes), &(&reader).into())
            .unwrap();
        let read = read.borrow();
        let s = read.as_struct().unwrap();
        assert_eq!(s.get("a"), Some(&Value::Int(11)));
        assert_eq!(s.get("b"), Some(&Value::Double(0.5)));
        assert_eq!(s.get("c"), Some(&Value::Long(5)));
    }

    #[test]
    fn backreference_into_skipped_field() {
        let inner = StructDef::new("Inner", vec![FieldDescriptor::new("n", FieldType::Int).tag(1)]);
        let writer = StructDef::new(
            "Sample",
            vec![
                FieldDescriptor::new("gone", FieldType::object("Inner")).tag(1),
                FieldDescriptor::new("kept", FieldType::object("Inner")).tag(2),
            ],
        );
        let reader = StructDef::new(
            "Sample",
            vec![FieldDescriptor::new("kept", FieldType::object("Inner")).tag(2)],
        );
        let shared = ObjectRef::new(Struct::new(&inner).with("n", 1));
        let obj = ObjectRef::new(
            Struct::new(&writer)
                .with("gone", shared.clone())
                .with("kept", shared),
        );
        let mut out = Output::unbounded();
        engine(&[&inner, &writer])
            .write_object(&mut out, &obj)
            .unwrap();
        let bytes = out.into_inner();

        let err = engine(&[&inner, &reader])
            .read_object(&mut Input::new(&bytes), &(&reader).into())
            .unwrap_err();
        assert!(matches!(err, Error::DanglingReference { index: 1 }));
    }

    #[test]
    fn short_field_span_rejected() {
        let def = StructDef::new("Sample", vec![FieldDescriptor::new("a", FieldType::Long).tag(1)]);
        // Value marker, one field, tag 1, a two-byte span holding a one-byte varint and junk
        let bytes = [1u8, 1, 1, 2, 4, 0];
        let err = engine(&[&def])
            .read_object(&mut Input::new(&bytes), &(&def).into())
            .unwrap_err();
        assert!(matches!(err, Error::MalformedEncoding(_)));
    }
}
