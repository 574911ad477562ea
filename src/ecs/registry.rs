use std::any::TypeId;
use std::collections::HashMap;

use super::component::AnyStorage;
use super::{Component, ComponentStorage, Entity, EntityAllocator};

/// The entity registry: id allocation plus one storage per component type.
///
/// Storages are created lazily on first insert, so systems that spawn
/// short-lived entities (hit events) never have to pre-register anything.
pub struct Registry {
    entities: EntityAllocator,
    storages: HashMap<TypeId, Box<dyn AnyStorage>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entities: EntityAllocator::new(),
            storages: HashMap::new(),
        }
    }

    pub fn create(&mut self) -> Entity {
        self.entities.create()
    }

    /// Destroy an entity and every component attached to it
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if self.entities.destroy(entity) {
            for storage in self.storages.values_mut() {
                storage.clear_entity(entity);
            }
            true
        } else {
            false
        }
    }

    pub fn exists(&self, entity: Entity) -> bool {
        self.entities.exists(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.count()
    }

    pub fn insert<T: Component>(&mut self, entity: Entity, component: T) {
        if !self.entities.exists(entity) {
            return;
        }
        self.storage_mut::<T>().insert(entity, component);
    }

    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.typed_storage_mut::<T>()?.remove(entity)
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.typed_storage::<T>()?.get(entity)
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.typed_storage_mut::<T>()?.get_mut(entity)
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.get::<T>(entity).is_some()
    }

    /// Entities currently carrying component `T`, collected so the caller
    /// can mutate the registry while walking them
    pub fn entities_with<T: Component>(&self) -> Vec<Entity> {
        match self.typed_storage::<T>() {
            Some(storage) => storage.entities().collect(),
            None => Vec::new(),
        }
    }

    /// Start building an entity fluently
    pub fn spawn(&mut self) -> EntityBuilder<'_> {
        let entity = self.create();
        EntityBuilder {
            registry: self,
            entity,
        }
    }

    fn typed_storage<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        let boxed = self.storages.get(&TypeId::of::<T>())?;
        AnyStorage::as_any(&**boxed).downcast_ref::<ComponentStorage<T>>()
    }

    fn typed_storage_mut<T: Component>(&mut self) -> Option<&mut ComponentStorage<T>> {
        let boxed = self.storages.get_mut(&TypeId::of::<T>())?;
        AnyStorage::as_any_mut(&mut **boxed).downcast_mut::<ComponentStorage<T>>()
    }

    fn storage_mut<T: Component>(&mut self) -> &mut ComponentStorage<T> {
        let boxed = self
            .storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ComponentStorage::<T>::new()));
        AnyStorage::as_any_mut(&mut **boxed)
            .downcast_mut::<ComponentStorage<T>>()
            .expect("storage type mismatch for TypeId")
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent helper for spawning an entity with components
pub struct EntityBuilder<'a> {
    registry: &'a mut Registry,
    entity: Entity,
}

impl<'a> EntityBuilder<'a> {
    pub fn with<T: Component>(self, component: T) -> Self {
        self.registry.insert(self.entity, component);
        self
    }

    pub fn build(self) -> Entity {
        self.entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    use crate::ecs::{Transform, Velocity};

    #[test]
    fn insert_get_mutate() {
        let mut reg = Registry::new();
        let e = reg.create();
        reg.insert(e, Transform { pos: Vec3::ONE });
        assert_eq!(reg.get::<Transform>(e).unwrap().pos, Vec3::ONE);
        reg.get_mut::<Transform>(e).unwrap().pos.y = 5.0;
        assert_eq!(reg.get::<Transform>(e).unwrap().pos.y, 5.0);
    }

    #[test]
    fn destroy_clears_all_components() {
        let mut reg = Registry::new();
        let e = reg
            .spawn()
            .with(Transform { pos: Vec3::ZERO })
            .with(Velocity { vel: Vec3::ZERO })
            .build();
        assert!(reg.has::<Transform>(e));
        assert!(reg.destroy(e));
        assert!(!reg.exists(e));
        assert!(!reg.has::<Transform>(e));
        assert!(!reg.has::<Velocity>(e));
    }

    #[test]
    fn recycled_ids_do_not_inherit_components() {
        let mut reg = Registry::new();
        let a = reg.spawn().with(Transform { pos: Vec3::ONE }).build();
        reg.destroy(a);
        let b = reg.create();
        assert_eq!(a.0, b.0);
        assert!(!reg.has::<Transform>(b));
    }

    #[test]
    fn entities_with_lists_only_holders() {
        let mut reg = Registry::new();
        let a = reg.spawn().with(Velocity { vel: Vec3::ZERO }).build();
        let _b = reg.create();
        let held = reg.entities_with::<Velocity>();
        assert_eq!(held, vec![a]);
        assert!(reg.entities_with::<Transform>().is_empty());
    }
}
