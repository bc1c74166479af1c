use crate::{Context, Entity, EntityRef, PersistentEntity, Result};
use dashmap::DashMap;
use std::{
    any::TypeId,
    sync::{Arc, LazyLock},
};

static GLOBAL: LazyLock<EntityRegistry> = LazyLock::new(EntityRegistry::new);

/// Cache of entity metadata, safe to share between threads.
///
/// Each type is described at most once per publication: concurrent first lookups may
/// both run `describe`, only the first result is kept and every caller receives it.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: DashMap<TypeId, Arc<PersistentEntity>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static EntityRegistry {
        &GLOBAL
    }

    pub fn get<T: Entity>(&self) -> Result<Arc<PersistentEntity>> {
        self.resolve(&EntityRef::of::<T>())
    }

    pub fn resolve(&self, entity: &EntityRef) -> Result<Arc<PersistentEntity>> {
        let type_id = entity.type_id();
        if let Some(found) = self.entities.get(&type_id) {
            return Ok(found.clone());
        }
        // Described outside of the map lock, `describe` is user code
        let described = Arc::new(
            entity
                .describe()
                .with_context(|| format!("While describing `{}`", entity.type_name()))?,
        );
        log::debug!(
            "Described entity `{}` with {} properties",
            described.name(),
            described.properties().len()
        );
        Ok(self.entities.entry(type_id).or_insert(described).clone())
    }

    pub fn contains<T: Entity>(&self) -> bool {
        self.entities.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
