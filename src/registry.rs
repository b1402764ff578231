//! Type registration.
//!
//! The registry maps each type name to a small integer [`TypeId`], assigned in registration
//! order, and to the [`Strategy`] that encodes it. Registration is append-only. Both lookups are
//! O(1): by name through a hash map, by id by indexing the entry list.

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::schema::TypeDesc;
use crate::strategy::{self, Strategy};

pub type TypeId = u32;

/// One registered type.
#[derive(Clone)]
pub struct Registration {
    id: TypeId,
    ty: TypeDesc,
    strategy: Rc<dyn Strategy>,
    implicit: bool,
}

impl Registration {
    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn type_desc(&self) -> &TypeDesc {
        &self.ty
    }

    pub fn strategy(&self) -> &Rc<dyn Strategy> {
        &self.strategy
    }

    /// Registered on first use rather than by the caller. Such types are named, not numbered,
    /// on the wire.
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }
}

pub struct Registry {
    config: Config,
    by_name: HashMap<String, TypeId>,
    entries: Vec<Registration>,
}

impl Registry {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            by_name: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register a type with the default strategy: the array strategy for primitive arrays, and
    /// the configured [`StrategyKind`][crate::StrategyKind] for structs.
    pub fn register(&mut self, ty: impl Into<TypeDesc>) -> Result<TypeId> {
        let ty = ty.into();
        self.check_free(&ty)?;
        let strategy = strategy::build_default(&ty, &self.config)?;
        Ok(self.insert(ty, strategy, false))
    }

    /// Register a type bound to a caller-supplied strategy.
    pub fn register_with(
        &mut self,
        ty: impl Into<TypeDesc>,
        strategy: Rc<dyn Strategy>,
    ) -> Result<TypeId> {
        let ty = ty.into();
        self.check_free(&ty)?;
        Ok(self.insert(ty, strategy, false))
    }

    fn check_free(&self, ty: &TypeDesc) -> Result<()> {
        if self.by_name.contains_key(ty.name()) {
            return Err(Error::DuplicateRegistration(ty.name().to_string()));
        }
        Ok(())
    }

    fn insert(&mut self, ty: TypeDesc, strategy: Rc<dyn Strategy>, implicit: bool) -> TypeId {
        let id = self.entries.len() as TypeId;
        debug!(
            "Registered type {} as id {}{}",
            ty.name(),
            id,
            if implicit { " (implicit)" } else { "" }
        );
        self.by_name.insert(ty.name().to_string(), id);
        self.entries.push(Registration {
            id,
            ty,
            strategy,
            implicit,
        });
        id
    }

    pub fn get(&self, name: &str) -> Option<&Registration> {
        self.by_name.get(name).map(|id| &self.entries[*id as usize])
    }

    pub fn id_of(&self, name: &str) -> Result<TypeId> {
        self.get(name)
            .map(|r| r.id)
            .ok_or_else(|| Error::UnregisteredType(name.to_string()))
    }

    pub fn strategy_of(&self, name: &str) -> Result<&Rc<dyn Strategy>> {
        self.get(name)
            .map(|r| &r.strategy)
            .ok_or_else(|| Error::UnregisteredType(name.to_string()))
    }

    pub fn by_id(&self, id: TypeId) -> Result<&Registration> {
        self.entries
            .get(id as usize)
            .ok_or_else(|| Error::UnregisteredType(format!("type id {}", id)))
    }

    /// Find a type's registration, registering it on the spot if registration isn't required.
    pub fn resolve(&mut self, ty: &TypeDesc) -> Result<&Registration> {
        if let Some(&id) = self.by_name.get(ty.name()) {
            return Ok(&self.entries[id as usize]);
        }
        if self.config.registration_required {
            return Err(Error::UnregisteredType(ty.name().to_string()));
        }
        let strategy = strategy::build_default(ty, &self.config)?;
        let id = self.insert(ty.clone(), strategy, true);
        Ok(&self.entries[id as usize])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ArrayKind, FieldDescriptor, FieldType, StructDef};

    fn sample() -> TypeDesc {
        StructDef::new("Sample", vec![FieldDescriptor::new("a", FieldType::Int)]).into()
    }

    #[test]
    fn ids_in_registration_order() {
        let mut reg = Registry::new(Config::default());
        assert_eq!(reg.register(ArrayKind::Doubles).unwrap(), 0);
        assert_eq!(reg.register(ArrayKind::Longs).unwrap(), 1);
        assert_eq!(reg.register(sample()).unwrap(), 2);
        assert_eq!(reg.id_of("long[]").unwrap(), 1);
        assert_eq!(reg.id_of("Sample").unwrap(), 2);
        assert_eq!(reg.by_id(0).unwrap().type_desc().name(), "double[]");
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn duplicate() {
        let mut reg = Registry::new(Config::default());
        reg.register(sample()).unwrap();
        assert!(matches!(
            reg.register(sample()),
            Err(Error::DuplicateRegistration(ref name)) if name == "Sample"
        ));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unregistered() {
        let mut reg = Registry::new(Config::default());
        assert!(matches!(
            reg.id_of("Sample"),
            Err(Error::UnregisteredType(_))
        ));
        assert!(matches!(
            reg.strategy_of("Sample"),
            Err(Error::UnregisteredType(_))
        ));
        assert!(matches!(reg.by_id(3), Err(Error::UnregisteredType(_))));
        assert!(matches!(
            reg.resolve(&sample()),
            Err(Error::UnregisteredType(_))
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn implicit_registration() {
        let mut reg = Registry::new(Config::default().registration_required(false));
        let entry = reg.resolve(&sample()).unwrap();
        assert_eq!(entry.id(), 0);
        assert!(entry.is_implicit());
        // Second resolve finds the same entry
        assert_eq!(reg.resolve(&sample()).unwrap().id(), 0);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn bad_descriptors_rejected() {
        let def = StructDef::new(
            "Twice",
            vec![
                FieldDescriptor::new("a", FieldType::Int),
                FieldDescriptor::new("a", FieldType::Long),
            ],
        );
        let mut reg = Registry::new(Config::default());
        assert!(matches!(
            reg.register(def),
            Err(Error::InvalidDescriptor(_))
        ));
        assert!(reg.is_empty());
    }
}
