//! Lazy assignment of [`ComponentId`]s to Rust types, scoped to one world.

use std::any::TypeId;
use std::collections::HashMap;

use crate::component::{Component, ComponentId, ComponentInfo, ComponentKey};

/// Maps component types to the small integer ids of one world.
///
/// The first lookup of a type allocates the next id; later lookups return the
/// same id. Ids are never reclaimed.
#[derive(Debug, Default)]
pub struct ComponentIdRegistry {
    ids: HashMap<TypeId, ComponentId>,
    /// Indexed by `ComponentId::index()`.
    infos: Vec<ComponentInfo>,
}

impl ComponentIdRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The id for `T`, allocating one on first use.
    pub fn id_for<T: Component>(&mut self) -> ComponentId {
        self.id_for_key(ComponentKey::of::<T>())
    }

    /// The id for `key`, allocating one on first use.
    pub fn id_for_key(&mut self, key: ComponentKey) -> ComponentId {
        if let Some(&id) = self.ids.get(&key.type_id) {
            return id;
        }
        let id = ComponentId(self.infos.len() as u32);
        self.ids.insert(key.type_id, id);
        self.infos.push(ComponentInfo { id, name: key.name });
        id
    }

    /// The id for `T` if it has been assigned already.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<ComponentId> {
        self.get_key(&ComponentKey::of::<T>())
    }

    /// The id for `key` if it has been assigned already.
    #[must_use]
    pub fn get_key(&self, key: &ComponentKey) -> Option<ComponentId> {
        self.ids.get(&key.type_id).copied()
    }

    /// Id and name of an assigned component.
    #[must_use]
    pub fn info(&self, id: ComponentId) -> Option<ComponentInfo> {
        self.infos.get(id.index()).copied()
    }

    /// Type name of an assigned component, or `"<unknown>"`.
    #[must_use]
    pub fn name_of(&self, id: ComponentId) -> &'static str {
        self.info(id).map_or("<unknown>", |info| info.name)
    }

    /// Number of component types seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Returns `true` if no component type has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct A;
    impl Component for A {}

    #[derive(Clone)]
    struct B;
    impl Component for B {}

    #[test]
    fn test_ids_are_assigned_lazily_and_stable() {
        let mut registry = ComponentIdRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.get::<A>(), None);

        let a = registry.id_for::<A>();
        let b = registry.id_for::<B>();
        assert_ne!(a, b);
        assert_eq!(registry.id_for::<A>(), a);
        assert_eq!(registry.get::<B>(), Some(b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_ids_are_world_scoped() {
        let mut first = ComponentIdRegistry::new();
        let mut second = ComponentIdRegistry::new();

        first.id_for::<A>();
        let b_in_first = first.id_for::<B>();
        let b_in_second = second.id_for::<B>();

        assert_ne!(b_in_first, b_in_second);
    }

    #[test]
    fn test_info_and_name() {
        let mut registry = ComponentIdRegistry::new();
        let a = registry.id_for::<A>();
        let info = registry.info(a).unwrap();
        assert_eq!(info.id, a);
        assert!(registry.name_of(a).ends_with("::A"));
        assert_eq!(registry.name_of(ComponentId(99)), "<unknown>");
    }
}
