//! Core [`Component`] trait and the type-erased plumbing around it.
//!
//! Every piece of data attached to an entity implements [`Component`]. The
//! world stores components behind [`AnyComponent`] while a spawn is being
//! validated, then moves each value into the typed
//! [`ComponentRegistry`](crate::registry::ComponentRegistry) for its type.
//!
//! ## Type identity
//!
//! A [`ComponentId`] is a small integer handed out lazily by the world the
//! first time a type is seen. It is **world-scoped**: two worlds may give the
//! same Rust type different ids. Use [`ComponentKey`] when a world-independent
//! handle is needed.

use std::any::TypeId;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::registry::{AnyComponentRegistry, ComponentRegistry};

/// A world-scoped identifier for a component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub u32);

impl ComponentId {
    /// Position of this id in its world's type registry.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Component({})", self.0)
    }
}

/// A world-independent handle for a component type.
///
/// Resolved to a [`ComponentId`] by
/// [`ComponentIdRegistry::id_for_key`](crate::type_registry::ComponentIdRegistry::id_for_key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentKey {
    /// The Rust type id.
    pub type_id: TypeId,
    /// The component's [`Component::type_name`].
    pub name: &'static str,
}

impl ComponentKey {
    /// The key for component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::type_name(),
        }
    }
}

/// A resolved component type: its id in one world and its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentInfo {
    /// The world-scoped id.
    pub id: ComponentId,
    /// The component's [`Component::type_name`].
    pub name: &'static str,
}

impl ComponentInfo {
    /// The last `::` segment of the type name, without generic arguments
    /// (`"Position"` for `"my_game::physics::Position"`, `"Wrapper"` for
    /// `"my_game::Wrapper<my_game::Position>"`).
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let path = self.name.split('<').next().unwrap_or(self.name);
        path.rsplit("::").next().unwrap_or(path)
    }
}

/// The core component trait.
///
/// `Clone` is required so that a query can hand out a disconnected copy of a
/// component marked read-only. `Send + Sync + 'static` lets the world be moved
/// between threads by a scheduler.
///
/// # Examples
///
/// ```rust
/// use engine_ecs::{AnyComponent, Component};
///
/// #[derive(Debug, Clone, Default)]
/// struct Health(f32);
/// impl Component for Health {}
///
/// #[derive(Debug, Clone)]
/// struct Player;
/// impl Component for Player {
///     fn required_components(&self) -> Vec<Box<dyn AnyComponent>> {
///         vec![Box::new(Health(100.0))]
///     }
/// }
/// ```
pub trait Component: Clone + Send + Sync + 'static {
    /// A human-readable name for this component type.
    ///
    /// Defaults to the full Rust type path.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Components that must be spawned alongside this one.
    ///
    /// Resolved recursively at spawn time. A type listed here that is also
    /// given explicitly to the same spawn is a duplicate.
    fn required_components(&self) -> Vec<Box<dyn AnyComponent>> {
        Vec::new()
    }
}

/// Object-safe view of a component value, used while a spawn is validated.
pub trait AnyComponent: Send + Sync + 'static {
    /// The key of the concrete component type.
    fn component_key(&self) -> ComponentKey;

    /// Forwards to [`Component::required_components`].
    fn required_components(&self) -> Vec<Box<dyn AnyComponent>>;

    /// Creates an empty registry able to store this component type.
    fn create_registry(
        &self,
        id: ComponentId,
        initial_capacity: usize,
    ) -> Result<Box<dyn AnyComponentRegistry>>;

    /// Moves the value into `registry`, returning its index.
    fn insert_into(
        self: Box<Self>,
        registry: &mut dyn AnyComponentRegistry,
        owner: EntityId,
    ) -> Result<usize>;
}

impl<T: Component> AnyComponent for T {
    fn component_key(&self) -> ComponentKey {
        ComponentKey::of::<T>()
    }

    fn required_components(&self) -> Vec<Box<dyn AnyComponent>> {
        Component::required_components(self)
    }

    fn create_registry(
        &self,
        id: ComponentId,
        initial_capacity: usize,
    ) -> Result<Box<dyn AnyComponentRegistry>> {
        let registry = ComponentRegistry::<T>::create(initial_capacity, id)?;
        Ok(Box::new(registry))
    }

    fn insert_into(
        self: Box<Self>,
        registry: &mut dyn AnyComponentRegistry,
        owner: EntityId,
    ) -> Result<usize> {
        let registry = registry
            .as_any_mut()
            .downcast_mut::<ComponentRegistry<T>>()
            .ok_or(EcsError::RegistryMismatch {
                component: T::type_name(),
            })?;
        Ok(registry.insert(owner, *self))
    }
}

/// A collection of components that can be spawned together as one entity.
///
/// Implemented for `()`, tuples of up to twelve components, and
/// `Vec<Box<dyn AnyComponent>>` for bundles assembled at runtime.
pub trait ComponentBundle {
    /// Boxes every component of the bundle, in declaration order.
    fn into_components(self) -> Vec<Box<dyn AnyComponent>>;
}

impl ComponentBundle for () {
    fn into_components(self) -> Vec<Box<dyn AnyComponent>> {
        Vec::new()
    }
}

impl ComponentBundle for Vec<Box<dyn AnyComponent>> {
    fn into_components(self) -> Vec<Box<dyn AnyComponent>> {
        self
    }
}

macro_rules! impl_component_bundle {
    ($($C:ident => $idx:tt),+) => {
        impl<$($C: Component),+> ComponentBundle for ($($C,)+) {
            fn into_components(self) -> Vec<Box<dyn AnyComponent>> {
                vec![$(Box::new(self.$idx) as Box<dyn AnyComponent>),+]
            }
        }
    };
}

impl_component_bundle!(C1 => 0);
impl_component_bundle!(C1 => 0, C2 => 1);
impl_component_bundle!(C1 => 0, C2 => 1, C3 => 2);
impl_component_bundle!(C1 => 0, C2 => 1, C3 => 2, C4 => 3);
impl_component_bundle!(C1 => 0, C2 => 1, C3 => 2, C4 => 3, C5 => 4);
impl_component_bundle!(C1 => 0, C2 => 1, C3 => 2, C4 => 3, C5 => 4, C6 => 5);
impl_component_bundle!(C1 => 0, C2 => 1, C3 => 2, C4 => 3, C5 => 4, C6 => 5, C7 => 6);
impl_component_bundle!(C1 => 0, C2 => 1, C3 => 2, C4 => 3, C5 => 4, C6 => 5, C7 => 6, C8 => 7);
impl_component_bundle!(
    C1 => 0, C2 => 1, C3 => 2, C4 => 3, C5 => 4, C6 => 5, C7 => 6, C8 => 7, C9 => 8
);
impl_component_bundle!(
    C1 => 0, C2 => 1, C3 => 2, C4 => 3, C5 => 4, C6 => 5, C7 => 6, C8 => 7, C9 => 8,
    C10 => 9
);
impl_component_bundle!(
    C1 => 0, C2 => 1, C3 => 2, C4 => 3, C5 => 4, C6 => 5, C7 => 6, C8 => 7, C9 => 8,
    C10 => 9, C11 => 10
);
impl_component_bundle!(
    C1 => 0, C2 => 1, C3 => 2, C4 => 3, C5 => 4, C6 => 5, C7 => 6, C8 => 7, C9 => 8,
    C10 => 9, C11 => 10, C12 => 11
);
