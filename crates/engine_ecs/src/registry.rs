//! Typed per-component storage.
//!
//! A [`ComponentRegistry<T>`] holds every live `T` in the world in a dense
//! `Vec<T>`, with a parallel owner column recording which entity each value
//! belongs to. Values are addressed by the index returned from
//! [`ComponentRegistry::insert`], which the world stores in the owner's
//! [`EntityData`](crate::entity::EntityData).
//!
//! Removal is a swap-remove: the last value moves into the vacated slot and
//! its owner is reported back so the world can re-point that entity's index
//! in the same operation. An index therefore never refers to another entity's
//! value once the world has finished a removal.

use std::any::Any;

use crate::component::{Component, ComponentId, ComponentKey};
use crate::entity::EntityId;
use crate::error::{EcsError, Result};

/// Type-erased view of a [`ComponentRegistry`], as stored by the world.
pub trait AnyComponentRegistry: Send + Sync {
    /// The component id this registry stores.
    fn component_id(&self) -> ComponentId;

    /// The key of the stored Rust type.
    fn component_key(&self) -> ComponentKey;

    /// Number of stored values.
    fn len(&self) -> usize;

    /// Returns `true` if no values are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops the value at `index` by swap-remove.
    ///
    /// Returns the owner of the value that moved into `index`, if any.
    fn remove(&mut self, index: usize) -> Result<Option<EntityId>>;

    /// Upcast for downcasting to the concrete registry.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete registry.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Dense storage for all values of one component type.
#[derive(Debug, Clone)]
pub struct ComponentRegistry<T> {
    id: ComponentId,
    values: Vec<T>,
    /// `owners[i]` is the entity holding `values[i]`.
    owners: Vec<EntityId>,
}

impl<T: Component> ComponentRegistry<T> {
    /// Creates an empty registry with room for `initial_capacity` values.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidCapacity`] if the storage cannot be
    /// reserved (for example when the capacity overflows `isize::MAX` bytes).
    pub fn create(initial_capacity: usize, id: ComponentId) -> Result<Self> {
        let invalid = || EcsError::InvalidCapacity {
            component: T::type_name(),
            capacity: initial_capacity,
        };

        let mut values = Vec::new();
        values
            .try_reserve_exact(initial_capacity)
            .map_err(|_| invalid())?;
        let mut owners = Vec::new();
        owners
            .try_reserve_exact(initial_capacity)
            .map_err(|_| invalid())?;

        Ok(Self { id, values, owners })
    }

    /// The component id this registry stores.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Appends a value owned by `owner` and returns its index.
    pub fn insert(&mut self, owner: EntityId, value: T) -> usize {
        self.values.push(value);
        self.owners.push(owner);
        self.values.len() - 1
    }

    /// Returns the value at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] if `index` is not a live slot.
    pub fn get(&self, index: usize) -> Result<&T> {
        let len = self.values.len();
        self.values.get(index).ok_or(EcsError::IndexOutOfRange {
            component: self.id,
            index,
            len,
        })
    }

    /// Returns the value at `index` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] if `index` is not a live slot.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T> {
        let len = self.values.len();
        let id = self.id;
        self.values.get_mut(index).ok_or(EcsError::IndexOutOfRange {
            component: id,
            index,
            len,
        })
    }

    /// The entity owning the value at `index`.
    #[must_use]
    pub fn owner(&self, index: usize) -> Option<EntityId> {
        self.owners.get(index).copied()
    }

    /// Removes the value at `index`, moving the last value into its place.
    ///
    /// Returns the removed value and the owner of the value that moved, if
    /// one did (nothing moves when the last slot is removed).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] if `index` is not a live slot.
    pub fn swap_remove(&mut self, index: usize) -> Result<(T, Option<EntityId>)> {
        if index >= self.values.len() {
            return Err(EcsError::IndexOutOfRange {
                component: self.id,
                index,
                len: self.values.len(),
            });
        }
        let value = self.values.swap_remove(index);
        self.owners.swap_remove(index);
        Ok((value, self.owners.get(index).copied()))
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no values are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of values the registry can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Iterates over `(owner, value)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.owners.iter().copied().zip(self.values.iter())
    }

    pub(crate) fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }
}

impl<T: Component> AnyComponentRegistry for ComponentRegistry<T> {
    fn component_id(&self) -> ComponentId {
        self.id
    }

    fn component_key(&self) -> ComponentKey {
        ComponentKey::of::<T>()
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn remove(&mut self, index: usize) -> Result<Option<EntityId>> {
        self.swap_remove(index).map(|(_, moved)| moved)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
