//! Entity identifiers, allocation, and per-entity component bookkeeping.
//!
//! An [`EntityId`] is a plain `u64` with no data of its own. The components it
//! owns are tracked by an [`EntityData`] record: one registry index per
//! component type.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::component::ComponentId;

/// A unique entity identifier.
///
/// Ids are unique within a world and never reused, even after the entity is
/// despawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The null / invalid entity sentinel. No world ever hands it out.
    pub const INVALID: EntityId = EntityId(0);

    /// Create an entity id from a raw `u64`.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) entity.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Allocates monotonically increasing entity ids, starting at 1.
#[derive(Debug)]
pub struct EntityAllocator {
    next_id: u64,
}

impl EntityAllocator {
    /// Creates a new allocator. Ids start at 1 (0 is [`EntityId::INVALID`]).
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Allocates a fresh entity id.
    pub fn allocate(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        EntityId(id)
    }

    /// Returns the number of ids handed out so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.next_id - 1
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// The component set of one entity: component id → index into that
/// component's registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityData {
    components: HashMap<ComponentId, usize>,
}

impl EntityData {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the entity holds the component.
    #[must_use]
    pub fn has_component(&self, component: ComponentId) -> bool {
        self.components.contains_key(&component)
    }

    /// Registry index of the entity's value for `component`, if present.
    #[must_use]
    pub fn index_of(&self, component: ComponentId) -> Option<usize> {
        self.components.get(&component).copied()
    }

    /// Number of components the entity holds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if the entity holds no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Iterates over `(component, registry index)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, usize)> + '_ {
        self.components.iter().map(|(&id, &index)| (id, index))
    }

    /// Records (or re-points) the registry index for `component`.
    pub(crate) fn set_index(&mut self, component: ComponentId, index: usize) {
        self.components.insert(component, index);
    }

    /// Forgets `component`, returning the index it pointed at.
    pub(crate) fn remove(&mut self, component: ComponentId) -> Option<usize> {
        self.components.remove(&component)
    }

    /// Builds a record from explicit pairs. Mostly useful in tests.
    #[must_use]
    pub fn from_indices(pairs: impl IntoIterator<Item = (ComponentId, usize)>) -> Self {
        Self {
            components: pairs.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_creation() {
        let e = EntityId::from_raw(42);
        assert_eq!(e.id(), 42);
        assert!(e.is_valid());
        assert_eq!(e.to_string(), "Entity(42)");
    }

    #[test]
    fn test_entity_invalid() {
        assert!(!EntityId::INVALID.is_valid());
        assert_eq!(EntityId::INVALID.id(), 0);
    }

    #[test]
    fn test_allocator_starts_at_one_and_increments() {
        let mut alloc = EntityAllocator::new();
        let e1 = alloc.allocate();
        let e2 = alloc.allocate();
        let e3 = alloc.allocate();
        assert_eq!(e1.id(), 1);
        assert_eq!(e2.id(), 2);
        assert_eq!(e3.id(), 3);
        assert_eq!(alloc.count(), 3);
    }

    #[test]
    fn test_entity_data_membership() {
        let mut data = EntityData::new();
        assert!(data.is_empty());

        data.set_index(ComponentId(3), 7);
        assert!(data.has_component(ComponentId(3)));
        assert!(!data.has_component(ComponentId(4)));
        assert_eq!(data.index_of(ComponentId(3)), Some(7));

        // Re-pointing keeps a single entry per component.
        data.set_index(ComponentId(3), 2);
        assert_eq!(data.len(), 1);
        assert_eq!(data.index_of(ComponentId(3)), Some(2));

        assert_eq!(data.remove(ComponentId(3)), Some(2));
        assert!(data.is_empty());
    }
}
