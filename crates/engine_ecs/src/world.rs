//! The [`World`]: entity table plus one registry per component type.
//!
//! The world is the exclusive owner of all component data. Entities are
//! records of `component id → registry index`; component values live in the
//! typed registries and are handed out by queries.
//!
//! Structural operations (spawning, inserting or removing components, first
//! use of a component type) take `&mut self`, so the borrow checker already
//! serialises them against in-flight query results.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::capacity::{
    ComponentCapacityStrategy, DEFAULT_COMPONENT_CAPACITY, FixedCapacity, WorldConfig,
};
use crate::component::{AnyComponent, Component, ComponentBundle, ComponentId, ComponentKey};
use crate::entity::{EntityAllocator, EntityData, EntityId};
use crate::error::{EcsError, Result};
use crate::registry::{AnyComponentRegistry, ComponentRegistry};
use crate::type_registry::ComponentIdRegistry;

static NEXT_WORLD_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a world.
///
/// Component ids are only meaningful inside the world that assigned them, so
/// prepared queries remember the world they were prepared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldId(u64);

impl WorldId {
    fn next() -> Self {
        Self(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Contains all entities and their components.
pub struct World {
    id: WorldId,
    allocator: EntityAllocator,
    entities: HashMap<EntityId, EntityData>,
    registries: HashMap<ComponentId, Box<dyn AnyComponentRegistry>>,
    capacity: Box<dyn ComponentCapacityStrategy>,
    component_ids: ComponentIdRegistry,
}

impl World {
    /// Creates an empty world.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfiguration`] if the config carries no
    /// capacity strategy.
    pub fn new(config: WorldConfig) -> Result<Self> {
        let capacity = config.component_capacity.ok_or_else(|| {
            EcsError::InvalidConfiguration("component capacity strategy can not be empty".into())
        })?;
        Ok(Self::with_capacity_strategy(capacity))
    }

    fn with_capacity_strategy(capacity: Box<dyn ComponentCapacityStrategy>) -> Self {
        Self {
            id: WorldId::next(),
            allocator: EntityAllocator::new(),
            entities: HashMap::new(),
            registries: HashMap::new(),
            capacity,
            component_ids: ComponentIdRegistry::new(),
        }
    }

    /// This world's identity.
    #[must_use]
    pub fn id(&self) -> WorldId {
        self.id
    }

    /// Number of live entities.
    #[must_use]
    pub fn count_entities(&self) -> usize {
        self.entities.len()
    }

    /// Sum of the component counts of all live entities.
    #[must_use]
    pub fn count_components(&self) -> usize {
        self.entities.values().map(EntityData::len).sum()
    }

    // -- Entity lifecycle --

    /// Spawns an entity holding every component of `bundle`, plus the
    /// components they require (recursively).
    ///
    /// The spawn is all-or-nothing: on error no entity id is consumed and no
    /// component is stored.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DuplicateComponent`] if a component type appears twice
    ///   in the bundle, or a required component is also given explicitly.
    /// - [`EcsError::InvalidCapacity`] if storage for a new component type
    ///   cannot be reserved.
    pub fn spawn(&mut self, bundle: impl ComponentBundle) -> Result<EntityId> {
        let components = collect_with_required(bundle.into_components())?;

        // Resolve ids and make sure every registry exists and stores the
        // right type before anything is inserted.
        let mut ids = Vec::with_capacity(components.len());
        for component in &components {
            let id = self.component_ids.id_for_key(component.component_key());
            self.ensure_registry(id, component.as_ref())?;
            ids.push(id);
        }

        let entity = self.allocator.allocate();
        let mut data = EntityData::new();
        for (component, id) in components.into_iter().zip(ids) {
            let registry = self.registry_entry(id)?;
            let index = component.insert_into(registry, entity)?;
            data.set_index(id, index);
        }
        self.entities.insert(entity, data);
        Ok(entity)
    }

    /// Removes an entity and drops all of its components.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity does not exist.
    pub fn despawn(&mut self, entity: EntityId) -> Result<()> {
        let data = self
            .entities
            .remove(&entity)
            .ok_or(EcsError::EntityNotFound(entity))?;
        for (id, index) in data.iter() {
            self.detach(id, index)?;
        }
        Ok(())
    }

    /// Returns `true` if the entity exists.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Ids of all live entities, in unspecified order.
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// The component record of an entity.
    #[must_use]
    pub fn entity_data(&self, entity: EntityId) -> Option<&EntityData> {
        self.entities.get(&entity)
    }

    // -- Component operations --

    /// Attaches a component to an existing entity.
    ///
    /// Required components of `value` are not resolved here; they only apply
    /// at spawn time.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] if the entity does not exist.
    /// - [`EcsError::DuplicateComponent`] if the entity already holds a `T`.
    pub fn insert_component<T: Component>(&mut self, entity: EntityId, value: T) -> Result<()> {
        let id = self.component_ids.id_for::<T>();
        let data = self
            .entities
            .get(&entity)
            .ok_or(EcsError::EntityNotFound(entity))?;
        if data.has_component(id) {
            return Err(EcsError::DuplicateComponent {
                component: T::type_name(),
            });
        }

        let index = self.get_or_create_registry::<T>()?.insert(entity, value);
        if let Some(data) = self.entities.get_mut(&entity) {
            data.set_index(id, index);
        }
        Ok(())
    }

    /// Detaches a component from an entity and returns it.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] if the entity does not exist.
    /// - [`EcsError::ComponentNotFound`] if the entity holds no `T`.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> Result<T> {
        let data = self
            .entities
            .get_mut(&entity)
            .ok_or(EcsError::EntityNotFound(entity))?;
        let index = self
            .component_ids
            .get::<T>()
            .and_then(|id| data.remove(id).map(|index| (id, index)));
        let Some((id, index)) = index else {
            return Err(EcsError::ComponentNotFound {
                component: T::type_name(),
                entity,
            });
        };

        let (value, moved) = self
            .typed_registry_mut::<T>(id)?
            .swap_remove(index)?;
        self.repoint(moved, id, index);
        Ok(value)
    }

    /// The entity's `T`, if it has one.
    #[must_use]
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        let id = self.component_ids.get::<T>()?;
        let index = self.entities.get(&entity)?.index_of(id)?;
        self.registry::<T>()?.get(index).ok()
    }

    /// The entity's `T` mutably, if it has one.
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        let id = self.component_ids.get::<T>()?;
        let index = self.entities.get(&entity)?.index_of(id)?;
        self.typed_registry_mut::<T>(id).ok()?.get_mut(index).ok()
    }

    /// Returns `true` if the entity exists and holds a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.component_ids.get::<T>().is_some_and(|id| {
            self.entities
                .get(&entity)
                .is_some_and(|data| data.has_component(id))
        })
    }

    // -- Component types and registries --

    /// The world-scoped id of `T`, assigned on first use.
    pub fn component_id<T: Component>(&mut self) -> ComponentId {
        self.component_ids.id_for::<T>()
    }

    /// The type registry of this world.
    #[must_use]
    pub fn component_ids(&self) -> &ComponentIdRegistry {
        &self.component_ids
    }

    pub(crate) fn component_ids_mut(&mut self) -> &mut ComponentIdRegistry {
        &mut self.component_ids
    }

    /// The registry storing `T`, if one has been created.
    #[must_use]
    pub fn registry<T: Component>(&self) -> Option<&ComponentRegistry<T>> {
        let id = self.component_ids.get::<T>()?;
        self.registries
            .get(&id)?
            .as_any()
            .downcast_ref::<ComponentRegistry<T>>()
    }

    /// The registry storing `T`, created with the strategy's capacity on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidCapacity`] if the storage cannot be
    /// reserved.
    pub fn get_or_create_registry<T: Component>(&mut self) -> Result<&mut ComponentRegistry<T>> {
        let id = self.component_ids.id_for::<T>();
        if !self.registries.contains_key(&id) {
            let capacity = self.initial_capacity(id);
            let registry = ComponentRegistry::<T>::create(capacity, id)?;
            self.registries.insert(id, Box::new(registry));
        }
        self.typed_registry_mut::<T>(id)
    }

    /// Type-erased registry lookup.
    #[must_use]
    pub fn registry_by_id(&self, id: ComponentId) -> Option<&dyn AnyComponentRegistry> {
        self.registries.get(&id).map(|registry| registry.as_ref())
    }

    /// Mutable access to several distinct registries at once.
    ///
    /// Slots for ids without a registry are `None`. Ids must be distinct; a
    /// repeated id is only filled once.
    pub(crate) fn registries_mut<const N: usize>(
        &mut self,
        ids: [ComponentId; N],
    ) -> [Option<&mut (dyn AnyComponentRegistry + 'static)>; N] {
        let mut found: [Option<&mut (dyn AnyComponentRegistry + 'static)>; N] =
            std::array::from_fn(|_| None);
        for (id, registry) in &mut self.registries {
            if let Some(slot) = ids.iter().position(|candidate| candidate == id) {
                found[slot] = Some(registry.as_mut());
            }
        }
        found
    }

    pub(crate) fn iter_entities(&self) -> impl Iterator<Item = (EntityId, &EntityData)> + '_ {
        self.entities.iter().map(|(&entity, data)| (entity, data))
    }

    fn initial_capacity(&self, id: ComponentId) -> usize {
        self.component_ids
            .info(id)
            .map_or(DEFAULT_COMPONENT_CAPACITY, |info| {
                self.capacity.default_component_capacity(&info)
            })
    }

    fn ensure_registry(&mut self, id: ComponentId, component: &dyn AnyComponent) -> Result<()> {
        let key = component.component_key();
        if let Some(registry) = self.registries.get(&id) {
            if registry.component_key() != key {
                return Err(EcsError::RegistryMismatch {
                    component: key.name,
                });
            }
            return Ok(());
        }
        let registry = component.create_registry(id, self.initial_capacity(id))?;
        self.registries.insert(id, registry);
        Ok(())
    }

    fn registry_entry(&mut self, id: ComponentId) -> Result<&mut (dyn AnyComponentRegistry + 'static)> {
        let name = self.component_ids.name_of(id);
        self.registries
            .get_mut(&id)
            .map(|registry| registry.as_mut())
            .ok_or(EcsError::RegistryMismatch { component: name })
    }

    fn typed_registry_mut<T: Component>(&mut self, id: ComponentId) -> Result<&mut ComponentRegistry<T>> {
        self.registries
            .get_mut(&id)
            .and_then(|registry| registry.as_any_mut().downcast_mut::<ComponentRegistry<T>>())
            .ok_or(EcsError::RegistryMismatch {
                component: T::type_name(),
            })
    }

    /// Drops the value at `index` and re-points whichever entity's value
    /// moved into its slot.
    fn detach(&mut self, id: ComponentId, index: usize) -> Result<()> {
        let moved = self.registry_entry(id)?.remove(index)?;
        self.repoint(moved, id, index);
        Ok(())
    }

    fn repoint(&mut self, moved: Option<EntityId>, id: ComponentId, index: usize) {
        if let Some(data) = moved.and_then(|owner| self.entities.get_mut(&owner)) {
            data.set_index(id, index);
        }
    }
}

impl Default for World {
    /// A world using [`DEFAULT_COMPONENT_CAPACITY`] for every type.
    fn default() -> Self {
        Self::with_capacity_strategy(Box::new(FixedCapacity(DEFAULT_COMPONENT_CAPACITY)))
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("entities", &self.entities.len())
            .field("component_types", &self.component_ids.len())
            .field("registries", &self.registries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Flattens explicit components and their required components into one list.
///
/// Explicit duplicates and required types that are also explicit are errors.
/// A type required by several components is added once, first one wins.
fn collect_with_required(
    explicit: Vec<Box<dyn AnyComponent>>,
) -> Result<Vec<Box<dyn AnyComponent>>> {
    let mut explicit_keys: HashSet<ComponentKey> = HashSet::with_capacity(explicit.len());
    for component in &explicit {
        let key = component.component_key();
        if !explicit_keys.insert(key) {
            return Err(EcsError::DuplicateComponent {
                component: key.name,
            });
        }
    }

    let mut seen = explicit_keys.clone();
    let mut pending = VecDeque::new();
    let mut all = Vec::with_capacity(explicit.len());
    for component in explicit {
        pending.extend(component.required_components());
        all.push(component);
    }

    while let Some(required) = pending.pop_front() {
        let key = required.component_key();
        if explicit_keys.contains(&key) {
            return Err(EcsError::DuplicateComponent {
                component: key.name,
            });
        }
        if !seen.insert(key) {
            continue;
        }
        pending.extend(required.required_components());
        all.push(required);
    }

    Ok(all)
}
