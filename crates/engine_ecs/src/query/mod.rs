//! Typed queries over the components of a [`World`](crate::world::World).
//!
//! A query names one to four component types ([`Query1`] .. [`Query4`]) and a
//! set of [`QueryOptions`]. Its lifecycle is:
//!
//! 1. [`prepare`](Query2::prepare) resolves component types and options
//!    against a world. Required once per world before anything else.
//! 2. [`validate`](Query2::validate) optionally reports sub-optimal but
//!    correct configurations.
//! 3. [`exec`](Query2::exec) scans the world and returns a result whose
//!    arrays are index-aligned: `entity_ids()[i]` owns `components_a()[i]`,
//!    `components_b()[i]`, and so on. Results borrow the world, so it cannot
//!    be structurally changed while they are alive.
//!
//! Components marked read-only are returned as clones. A query whose every
//! component is read-only can also run through
//! [`exec_shared`](Query2::exec_shared) with only `&World`, which is what lets
//! a scheduler run such queries side by side.
//!
//! [`QueryAccess`] summarises which components a prepared query reads and
//! writes, for schedulers deciding what may run concurrently.

mod arity;
mod fetch;
mod filter;
mod options;
mod state;

pub use arity::{
    Query1, Query1Result, Query2, Query2Result, Query3, Query3Result, Query4, Query4Result,
};
pub use fetch::ComponentRef;
pub use filter::{And, FilterNode, FilterType, NoFilter, Or, QueryFilter, With, Without};
pub use options::{CombinedQueryOptions, QueryOption, QueryOptions, ReadOnly};
pub use state::QueryState;

use serde::{Deserialize, Serialize};

use crate::component::ComponentId;

/// How a query touches one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
    /// Results hold clones; the stored value is never handed out mutably.
    ReadOnly,
    /// Results hold live mutable references.
    Mutable,
}

/// The component access of one or more prepared queries.
///
/// Schedulers use it to decide which systems may run in parallel. Every
/// queried component is listed in exactly one of `reads` and `writes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAccess {
    /// Components handed out as clones.
    pub reads: Vec<ComponentId>,
    /// Components handed out as live mutable references.
    pub writes: Vec<ComponentId>,
    /// Queried components that may be absent.
    pub optionals: Vec<ComponentId>,
    /// Components only tested for membership by filters.
    pub filtered: Vec<ComponentId>,
}

impl QueryAccess {
    /// Create an empty access set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a read-only component.
    #[must_use]
    pub fn read(mut self, id: ComponentId) -> Self {
        push_unique(&mut self.reads, id);
        self
    }

    /// Add a mutable component.
    #[must_use]
    pub fn write(mut self, id: ComponentId) -> Self {
        push_unique(&mut self.writes, id);
        self
    }

    /// Add an optional component.
    #[must_use]
    pub fn optional(mut self, id: ComponentId) -> Self {
        push_unique(&mut self.optionals, id);
        self
    }

    /// Add a filter-only component.
    #[must_use]
    pub fn filtered(mut self, id: ComponentId) -> Self {
        push_unique(&mut self.filtered, id);
        self
    }

    /// Folds another query's access into this one.
    ///
    /// A component written by either side ends up in `writes` only.
    pub fn merge(&mut self, other: &QueryAccess) {
        for &id in &other.writes {
            push_unique(&mut self.writes, id);
        }
        for &id in &other.reads {
            push_unique(&mut self.reads, id);
        }
        for &id in &other.optionals {
            push_unique(&mut self.optionals, id);
        }
        for &id in &other.filtered {
            push_unique(&mut self.filtered, id);
        }
        let writes = &self.writes;
        self.reads.retain(|id| !writes.contains(id));
    }

    /// Every queried component with its access mode.
    #[must_use]
    pub fn components(&self) -> Vec<(ComponentId, Access)> {
        self.reads
            .iter()
            .map(|&id| (id, Access::ReadOnly))
            .chain(self.writes.iter().map(|&id| (id, Access::Mutable)))
            .collect()
    }

    /// Returns `true` if no component is handed out mutably.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    /// Checks whether this access conflicts with another.
    ///
    /// Two accesses conflict when one writes a component the other reads or
    /// writes:
    ///
    /// ```text
    /// A.writes ∩ (B.reads ∪ B.writes) ≠ ∅  OR
    /// B.writes ∩ (A.reads ∪ A.writes) ≠ ∅
    /// ```
    ///
    /// Filter-only components never conflict: filters look at membership,
    /// which cannot change while queries are running.
    #[must_use]
    pub fn conflicts_with(&self, other: &QueryAccess) -> bool {
        let touches = |access: &QueryAccess, id: &ComponentId| {
            access.reads.contains(id) || access.writes.contains(id)
        };
        self.writes.iter().any(|id| touches(other, id))
            || other.writes.iter().any(|id| touches(self, id))
    }
}

fn push_unique(ids: &mut Vec<ComponentId>, id: ComponentId) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}
