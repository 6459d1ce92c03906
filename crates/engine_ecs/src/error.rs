//! Error types for the ECS core.

use crate::component::ComponentId;
use crate::entity::EntityId;

/// Errors returned by world and query operations.
///
/// None of these are fatal: every operation that fails leaves the world and
/// the query in the state they were in before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The world was constructed without a usable configuration.
    #[error("invalid world configuration: {0}")]
    InvalidConfiguration(String),

    /// Storage for a component type could not be reserved.
    #[error("invalid initial capacity {capacity} for component {component}")]
    InvalidCapacity {
        /// Type name of the component.
        component: &'static str,
        /// The capacity that was requested.
        capacity: usize,
    },

    /// The same component type was named more than once where it must be unique.
    #[error("component {component} was given more than once")]
    DuplicateComponent {
        /// Type name of the duplicated component.
        component: &'static str,
    },

    /// A registry index did not point at a live value.
    #[error("index {index} out of range for component {component} (len {len})")]
    IndexOutOfRange {
        /// The component the registry stores.
        component: ComponentId,
        /// The offending index.
        index: usize,
        /// Number of values in the registry.
        len: usize,
    },

    /// `exec` or `validate` was called before a successful `prepare`.
    #[error("query has not been prepared")]
    UnpreparedQuery,

    /// A leaf filter was asked for nested sub-filters.
    #[error("nested filters are not supported by {filter}")]
    NestedFilterUnsupported {
        /// Name of the filter type.
        filter: &'static str,
    },

    /// The entity does not exist in this world.
    #[error("{0} not found")]
    EntityNotFound(EntityId),

    /// The entity exists but does not hold the component.
    #[error("component {component} not found on {entity}")]
    ComponentNotFound {
        /// Type name of the component.
        component: &'static str,
        /// The entity that was looked up.
        entity: EntityId,
    },

    /// A query prepared against one world was used with another.
    #[error("query was prepared against a different world")]
    WorldMismatch,

    /// A query with writable components was executed through shared world access.
    #[error("query holds writable components and needs exclusive world access")]
    WritableQuery,

    /// A registry holds a different Rust type than its component id says.
    #[error("registry for {component} stores a different type")]
    RegistryMismatch {
        /// Type name of the component that was expected.
        component: &'static str,
    },

    /// Advisory: the query is correct but configured sub-optimally.
    #[error("sub-optimal query: {0}")]
    SuboptimalQuery(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = EcsError> = std::result::Result<T, E>;
