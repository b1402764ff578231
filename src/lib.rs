//! field-pack is a binary codec for graphs of typed objects. Objects are encoded field by field,
//! with shared objects written once and cycles preserved, and each type picks how much schema
//! drift between writer and reader it is willing to pay for.
//!
//! The pieces:
//!
//! - [`Output`] and [`Input`]: the byte sink and source, with little-endian fixed-width and
//!     LEB128 varint primitives and length-prefixed strings. An output can be a fixed slice, a
//!     growable vector, or a chunk buffer in front of an [`std::io::Write`].
//! - [`StructDef`] and [`FieldDescriptor`]: descriptions of struct types. There is no
//!     reflection, so every field is declared up front, optionally with a tag, a default value,
//!     and the schema versions it exists in.
//! - [`Registry`]: binds each type to a small integer id and a [`Strategy`].
//! - Field strategies: [`PlainStrategy`], [`CompatibleStrategy`], [`TaggedStrategy`], and
//!     [`VersionedStrategy`] for structs, [`ArrayStrategy`] for primitive arrays, and
//!     [`FnStrategy`] or a hand-written [`Strategy`] for anything else.
//! - [`Engine`]: runs top-level writes and reads. Each call gets its own reference table, so
//!     calls never depend on each other.
//!
//! # Example
//!
//! ```
//! # use field_pack::*;
//! let person = StructDef::new("Person", vec![
//!     FieldDescriptor::new("name", FieldType::Str).tag(1),
//!     FieldDescriptor::new("age", FieldType::Int).tag(2),
//!     FieldDescriptor::new("friend", FieldType::object("Person")).tag(3),
//! ]);
//!
//! let mut engine = Engine::new(Config::new().default_strategy(StrategyKind::Tagged));
//! engine.register(&person).unwrap();
//!
//! let alice = ObjectRef::new(Struct::new(&person).with("name", "Alice").with("age", 34));
//! let bob = ObjectRef::new(Struct::new(&person)
//!     .with("name", "Bob")
//!     .with("age", 29)
//!     .with("friend", alice.clone()));
//!
//! let mut buf = [0u8; 64];
//! let mut out = Output::new(&mut buf);
//! engine.write_object(&mut out, &bob).unwrap();
//! let len = out.position();
//!
//! let mut input = Input::new(&buf[..len]);
//! let read = engine.read_object(&mut input, &person.clone().into()).unwrap();
//! assert_eq!(read, bob);
//! ```
//!
//! # Logging
//!
//! Registration is logged at `debug` level through the [`log`] facade, and reference handling and
//! per-call summaries at `trace`. Fields dropped because the writer declared a different type
//! for them are logged at `warn`.

mod config;
mod context;
mod engine;
mod error;
mod input;
mod marker;
mod output;
mod refs;
mod registry;
mod schema;
pub mod strategy;
mod value;
pub mod varint;

pub use self::config::{Config, StrategyKind};
pub use self::context::{ReadContext, WriteContext};
pub use self::engine::Engine;
pub use self::error::{Error, Result};
pub use self::input::Input;
pub use self::marker::{ClassTag, RefMarker};
pub use self::output::Output;
pub use self::refs::{ReadRefs, WriteRefs};
pub use self::registry::{Registration, Registry, TypeId};
pub use self::schema::{ArrayKind, FieldDescriptor, FieldType, StructDef, TypeDesc};
pub use self::strategy::{
    ArrayStrategy, CompatibleStrategy, FnStrategy, PlainStrategy, Strategy, TaggedStrategy,
    VersionedStrategy,
};
pub use self::value::{Object, ObjectRef, Struct, Value};

/// Deepest nesting of objects a single call will follow before failing with
/// [`Error::DepthLimit`]. Only reachable through untracked cycles or absurdly deep graphs.
pub const MAX_DEPTH: usize = 128;
