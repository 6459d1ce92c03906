//! # engine_ecs
//!
//! The in-memory store of the engine: entities, their components, and typed
//! queries over them.
//!
//! This crate provides:
//!
//! - [`World`]: owns every entity and one dense registry per component type.
//! - [`Component`]: the contract all ECS data must satisfy, including
//!   components that require siblings at spawn time.
//! - [`ComponentCapacityStrategy`]: how much storage a new registry reserves.
//! - [`Query1`] .. [`Query4`]: arity-generic queries with optional,
//!   read-only, filtered, and lazy components.
//! - [`QueryAccess`]: read/write metadata that a scheduler uses to run
//!   systems side by side.
//!
//! The crate never logs. Every fallible operation returns [`EcsError`].

pub mod capacity;
pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod registry;
pub mod type_registry;
pub mod world;

pub use capacity::{
    CapacityConfig, ComponentCapacityStrategy, DEFAULT_COMPONENT_CAPACITY, FixedCapacity,
    PerTypeCapacity, WorldConfig,
};
pub use component::{AnyComponent, Component, ComponentBundle, ComponentId, ComponentInfo, ComponentKey};
pub use entity::{EntityAllocator, EntityData, EntityId};
pub use error::{EcsError, Result};
pub use query::{
    Access, And, CombinedQueryOptions, ComponentRef, FilterNode, FilterType, NoFilter, Or,
    Query1, Query1Result, Query2, Query2Result, Query3, Query3Result, Query4, Query4Result,
    QueryAccess, QueryFilter, QueryOption, QueryOptions, QueryState, ReadOnly, With, Without,
};
pub use registry::{AnyComponentRegistry, ComponentRegistry};
pub use type_registry::ComponentIdRegistry;
pub use world::{World, WorldId};
