use std::rc::Rc;

use log::trace;

use crate::config::{Config, StrategyKind};
use crate::context::{ReadContext, WriteContext};
use crate::error::Result;
use crate::input::Input;
use crate::output::Output;
use crate::registry::{Registry, TypeId};
use crate::schema::{StructDef, TypeDesc};
use crate::strategy::{self, Strategy};
use crate::value::ObjectRef;

/// Entry point for encoding and decoding object graphs.
///
/// An engine owns the [`Registry`] and nothing else. Every top-level write or read starts a fresh
/// reference table and schema cache, and drops them when it returns, so back-to-back calls are
/// independent of each other. If a call fails, whatever it wrote up to the failure stays in the
/// output; discard it.
///
/// An engine isn't meant to be shared between threads. Give each worker its own engine and
/// output.
pub struct Engine {
    registry: Registry,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            registry: Registry::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        self.registry.config()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register a type with its default strategy.
    pub fn register(&mut self, ty: impl Into<TypeDesc>) -> Result<TypeId> {
        self.registry.register(ty)
    }

    /// Register a struct type bound to one of the built-in field strategies, regardless of the
    /// configured default.
    pub fn register_as(&mut self, def: &Rc<StructDef>, kind: StrategyKind) -> Result<TypeId> {
        let strategy = strategy::build(kind, def)?;
        self.registry.register_with(def, strategy)
    }

    /// Register a type bound to a custom strategy.
    pub fn register_with(
        &mut self,
        ty: impl Into<TypeDesc>,
        strategy: impl Strategy + 'static,
    ) -> Result<TypeId> {
        self.registry.register_with(ty, Rc::new(strategy))
    }

    /// Write a non-null object graph. The reader must know the root's type.
    pub fn write_object(&mut self, out: &mut Output, obj: &ObjectRef) -> Result<()> {
        self.with_write_context(|ctx| ctx.write_object(out, obj))
    }

    pub fn write_object_or_null(
        &mut self,
        out: &mut Output,
        obj: Option<&ObjectRef>,
    ) -> Result<()> {
        self.with_write_context(|ctx| ctx.write_object_or_null(out, obj))
    }

    /// Write an object graph preceded by the root's type tag.
    pub fn write_class_and_object(
        &mut self,
        out: &mut Output,
        obj: Option<&ObjectRef>,
    ) -> Result<()> {
        self.with_write_context(|ctx| ctx.write_class_and_object(out, obj))
    }

    pub fn read_object(&mut self, input: &mut Input, ty: &TypeDesc) -> Result<ObjectRef> {
        self.with_read_context(|ctx| {
            let root = ctx.read_object(input, ty)?;
            ctx.release_unreachable(Some(&root));
            Ok(root)
        })
    }

    pub fn read_object_or_null(
        &mut self,
        input: &mut Input,
        ty: &TypeDesc,
    ) -> Result<Option<ObjectRef>> {
        self.with_read_context(|ctx| {
            let root = ctx.read_object_or_null(input, ty)?;
            ctx.release_unreachable(root.as_ref());
            Ok(root)
        })
    }

    pub fn read_class_and_object(&mut self, input: &mut Input) -> Result<Option<ObjectRef>> {
        self.with_read_context(|ctx| {
            let root = ctx.read_class_and_object(input)?;
            ctx.release_unreachable(root.as_ref());
            Ok(root)
        })
    }

    /// Run `f` as one top-level write call, with its own reference table.
    pub fn with_write_context<T>(
        &mut self,
        f: impl FnOnce(&mut WriteContext) -> Result<T>,
    ) -> Result<T> {
        let mut ctx = WriteContext::new(&mut self.registry);
        let result = f(&mut ctx);
        trace!(
            "Write call done with {} tracked objects, ok = {}",
            ctx.tracked(),
            result.is_ok()
        );
        result
    }

    /// Run `f` as one top-level read call, with its own reference table.
    ///
    /// If `f` fails, every object decoded during the call has its object fields cleared, so
    /// partially decoded cycles are freed along with the context.
    pub fn with_read_context<T>(
        &mut self,
        f: impl FnOnce(&mut ReadContext) -> Result<T>,
    ) -> Result<T> {
        let mut ctx = ReadContext::new(&mut self.registry);
        let result = f(&mut ctx);
        if result.is_err() {
            ctx.unlink_decoded();
        }
        trace!("Read call done, ok = {}", result.is_ok());
        result
    }
}
