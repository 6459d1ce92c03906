//! Per-query options: filters, optional components, read-only components,
//! and laziness.
//!
//! Options are built with [`QueryOptions`] and resolved against a world by
//! [`CombinedQueryOptions::resolve`] when the query is prepared.

use std::collections::HashSet;

use crate::component::{Component, ComponentId, ComponentKey};
use crate::error::{EcsError, Result};
use crate::type_registry::ComponentIdRegistry;

use super::filter::{FilterNode, QueryFilter};

/// One option passed to a query.
#[derive(Debug)]
pub enum QueryOption {
    /// Only entities passing the filter are matched. Several filters are
    /// combined with `And`.
    Filter(Box<dyn QueryFilter>),
    /// The component may be absent; its slot in the result is then `None`.
    Optional(ComponentKey),
    /// Results hold a disconnected copy of the component.
    ReadOnly(ComponentKey),
    /// Every queried component is read-only.
    AllReadOnly,
    /// Schedulers skip the query's system unless it is run explicitly.
    Lazy,
}

/// Builder for the options of one query.
///
/// ```rust
/// use engine_ecs::{Component, QueryOptions, Without};
///
/// #[derive(Clone)] struct Position;
/// #[derive(Clone)] struct Velocity;
/// #[derive(Clone)] struct Frozen;
/// impl Component for Position {}
/// impl Component for Velocity {}
/// impl Component for Frozen {}
///
/// let options = QueryOptions::new()
///     .filter(Without::<Frozen>::new())
///     .optional::<Velocity>()
///     .read_only::<Velocity>();
/// ```
#[derive(Debug, Default)]
pub struct QueryOptions {
    options: Vec<QueryOption>,
}

impl QueryOptions {
    /// No options: every queried component required and writable, no filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter.
    #[must_use]
    pub fn filter(self, filter: impl QueryFilter) -> Self {
        self.push(QueryOption::Filter(Box::new(filter)))
    }

    /// Marks `T` optional.
    #[must_use]
    pub fn optional<T: Component>(self) -> Self {
        self.push(QueryOption::Optional(ComponentKey::of::<T>()))
    }

    /// Marks `T` read-only.
    #[must_use]
    pub fn read_only<T: Component>(self) -> Self {
        self.push(QueryOption::ReadOnly(ComponentKey::of::<T>()))
    }

    /// Marks every queried component read-only.
    #[must_use]
    pub fn all_read_only(self) -> Self {
        self.push(QueryOption::AllReadOnly)
    }

    /// Marks the query lazy.
    #[must_use]
    pub fn lazy(self) -> Self {
        self.push(QueryOption::Lazy)
    }

    /// Adds a raw option.
    #[must_use]
    pub fn push(mut self, option: QueryOption) -> Self {
        self.options.push(option);
        self
    }

    /// The options in the order they were added.
    #[must_use]
    pub fn as_slice(&self) -> &[QueryOption] {
        &self.options
    }

    /// Returns `true` if a [`QueryOption::Lazy`] was added.
    #[must_use]
    pub fn is_lazy(&self) -> bool {
        self.options
            .iter()
            .any(|option| matches!(option, QueryOption::Lazy))
    }
}

impl From<Vec<QueryOption>> for QueryOptions {
    fn from(options: Vec<QueryOption>) -> Self {
        Self { options }
    }
}

/// Which components a query hands out as copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOnly {
    /// Every queried component.
    All,
    /// Only the listed components.
    Only(Vec<ComponentId>),
}

impl Default for ReadOnly {
    fn default() -> Self {
        Self::Only(Vec::new())
    }
}

impl ReadOnly {
    /// Returns `true` if `id` is read-only.
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => ids.contains(&id),
        }
    }
}

/// The options of a query, resolved against one world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedQueryOptions {
    /// Components that may be absent.
    pub optional: Vec<ComponentId>,
    /// Components handed out as copies.
    pub read_only: ReadOnly,
    /// All filters, joined with `And`.
    pub filter: FilterNode,
    /// Whether the query is lazy.
    pub lazy: bool,
}

impl CombinedQueryOptions {
    /// Resolves `options`, assigning component ids as needed.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DuplicateComponent`] if a component is marked optional
    ///   (or read-only) more than once.
    /// - [`EcsError::NestedFilterUnsupported`] if a filter cannot be resolved.
    pub fn resolve(options: &QueryOptions, ids: &mut ComponentIdRegistry) -> Result<Self> {
        let mut combined = Self::default();
        let mut optional_seen = HashSet::new();
        let mut read_only_seen = HashSet::new();
        let mut read_only = Vec::new();
        let mut all_read_only = false;

        for option in options.as_slice() {
            match option {
                QueryOption::Filter(filter) => {
                    let node = FilterNode::resolve(filter.as_ref(), ids)?;
                    combined.filter = std::mem::take(&mut combined.filter).and(node);
                }
                QueryOption::Optional(key) => {
                    if !optional_seen.insert(key.type_id) {
                        return Err(EcsError::DuplicateComponent {
                            component: key.name,
                        });
                    }
                    combined.optional.push(ids.id_for_key(*key));
                }
                QueryOption::ReadOnly(key) => {
                    if !read_only_seen.insert(key.type_id) {
                        return Err(EcsError::DuplicateComponent {
                            component: key.name,
                        });
                    }
                    read_only.push(ids.id_for_key(*key));
                }
                QueryOption::AllReadOnly => all_read_only = true,
                QueryOption::Lazy => combined.lazy = true,
            }
        }

        combined.read_only = if all_read_only {
            ReadOnly::All
        } else {
            ReadOnly::Only(read_only)
        };
        Ok(combined)
    }

    /// Returns `true` if `id` may be absent.
    #[must_use]
    pub fn is_optional(&self, id: ComponentId) -> bool {
        self.optional.contains(&id)
    }

    /// Returns `true` if `id` is handed out as a copy.
    #[must_use]
    pub fn is_read_only(&self, id: ComponentId) -> bool {
        self.read_only.contains(id)
    }
}
