//! Initial-capacity policy for component registries, and world configuration.
//!
//! A world asks its [`ComponentCapacityStrategy`] how many values to reserve
//! the first time it creates storage for a component type. Types known to be
//! numerous can be pre-sized to avoid reallocation while entities are spawned.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::component::ComponentInfo;

/// Capacity reserved by [`WorldConfig::default`] for every component type.
pub const DEFAULT_COMPONENT_CAPACITY: usize = 64;

/// Supplies the initial storage size for a component type.
pub trait ComponentCapacityStrategy: Send + Sync + fmt::Debug {
    /// Number of values to reserve for `component`.
    fn default_component_capacity(&self, component: &ComponentInfo) -> usize;
}

/// The same capacity for every component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCapacity(pub usize);

impl ComponentCapacityStrategy for FixedCapacity {
    fn default_component_capacity(&self, _component: &ComponentInfo) -> usize {
        self.0
    }
}

/// Explicit capacities for named component types, a default for the rest.
///
/// Names match either the full type name or its last path segment, so
/// `"Position"` covers `my_game::Position` and `"Buffer"` covers
/// `my_game::Buffer<my_game::Position>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerTypeCapacity {
    /// Capacity for types without an override.
    pub default: usize,
    /// Overrides keyed by type name.
    #[serde(default)]
    pub overrides: HashMap<String, usize>,
}

impl PerTypeCapacity {
    /// Creates a table with no overrides.
    #[must_use]
    pub fn new(default: usize) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    /// Adds an override for the type called `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, capacity: usize) -> Self {
        self.overrides.insert(name.into(), capacity);
        self
    }
}

impl ComponentCapacityStrategy for PerTypeCapacity {
    fn default_component_capacity(&self, component: &ComponentInfo) -> usize {
        self.overrides
            .get(component.name)
            .or_else(|| self.overrides.get(component.short_name()))
            .copied()
            .unwrap_or(self.default)
    }
}

/// Serialisable description of a capacity strategy.
///
/// ```json
/// { "strategy": "fixed", "capacity": 128 }
/// { "strategy": "per_type", "default": 8, "overrides": { "Position": 4096 } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CapacityConfig {
    /// See [`FixedCapacity`].
    Fixed {
        /// Capacity for every type.
        capacity: usize,
    },
    /// See [`PerTypeCapacity`].
    PerType(PerTypeCapacity),
}

impl CapacityConfig {
    /// Builds the strategy this config describes.
    #[must_use]
    pub fn into_strategy(self) -> Box<dyn ComponentCapacityStrategy> {
        match self {
            Self::Fixed { capacity } => Box::new(FixedCapacity(capacity)),
            Self::PerType(table) => Box::new(table),
        }
    }
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self::Fixed {
            capacity: DEFAULT_COMPONENT_CAPACITY,
        }
    }
}

/// Configuration consumed by [`World::new`](crate::world::World::new).
#[derive(Debug)]
pub struct WorldConfig {
    /// Required. A world cannot be built without a capacity strategy.
    pub component_capacity: Option<Box<dyn ComponentCapacityStrategy>>,
}

impl WorldConfig {
    /// A config using `strategy`.
    #[must_use]
    pub fn with_strategy(strategy: impl ComponentCapacityStrategy + 'static) -> Self {
        Self {
            component_capacity: Some(Box::new(strategy)),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self::with_strategy(FixedCapacity(DEFAULT_COMPONENT_CAPACITY))
    }
}

impl From<CapacityConfig> for WorldConfig {
    fn from(config: CapacityConfig) -> Self {
        Self {
            component_capacity: Some(config.into_strategy()),
        }
    }
}
