//! Query filters: a small boolean language over component membership.
//!
//! Filters are written as types ([`With<T>`], [`Without<T>`], [`And`], [`Or`],
//! [`NoFilter`]) and resolved into a [`FilterNode`] tree when a query is
//! prepared. From then on, evaluating a filter against an entity is a walk
//! over integer membership tests; no type information is consulted.
//!
//! `&` and `|` build [`And`] and [`Or`]:
//!
//! ```rust
//! use engine_ecs::{Component, With, Without};
//!
//! #[derive(Clone)] struct Player;
//! #[derive(Clone)] struct Dead;
//! #[derive(Clone)] struct Boss;
//! impl Component for Player {}
//! impl Component for Dead {}
//! impl Component for Boss {}
//!
//! let alive_players_or_bosses = (With::<Player>::new() & Without::<Dead>::new()) | With::<Boss>::new();
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ops::{BitAnd, BitOr};

use crate::component::{Component, ComponentId, ComponentKey};
use crate::entity::EntityData;
use crate::error::{EcsError, Result};
use crate::type_registry::ComponentIdRegistry;

/// The kind of a filter, used to resolve it into a [`FilterNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Entity must hold every listed component.
    With,
    /// Entity must hold none of the listed components.
    Without,
    /// Both nested filters must pass.
    And,
    /// At least one nested filter must pass.
    Or,
    /// Always passes.
    None,
}

/// A filter that can be passed to a query.
pub trait QueryFilter: fmt::Debug + Send + Sync + 'static {
    /// What kind of filter this is.
    fn filter_type(&self) -> FilterType;

    /// Components tested by a `With`/`Without` filter.
    fn components(&self) -> Vec<ComponentKey> {
        Vec::new()
    }

    /// The two operands of an `And`/`Or` filter.
    ///
    /// # Errors
    ///
    /// Leaf filters return [`EcsError::NestedFilterUnsupported`].
    fn nested_filters(&self) -> Result<(&dyn QueryFilter, &dyn QueryFilter)> {
        Err(EcsError::NestedFilterUnsupported {
            filter: std::any::type_name::<Self>(),
        })
    }
}

/// Passes every entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoFilter;

impl QueryFilter for NoFilter {
    fn filter_type(&self) -> FilterType {
        FilterType::None
    }
}

/// Passes entities that hold a `T`.
pub struct With<T>(PhantomData<fn() -> T>);

/// Passes entities that do not hold a `T`.
pub struct Without<T>(PhantomData<fn() -> T>);

macro_rules! impl_leaf_filter {
    ($filter:ident, $kind:ident) => {
        impl<T: Component> $filter<T> {
            /// Creates the filter.
            #[must_use]
            pub const fn new() -> Self {
                Self(PhantomData)
            }
        }

        impl<T: Component> Default for $filter<T> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<T: Component> Clone for $filter<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T: Component> Copy for $filter<T> {}

        impl<T: Component> fmt::Debug for $filter<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}<{}>", stringify!($filter), T::type_name())
            }
        }

        impl<T: Component> QueryFilter for $filter<T> {
            fn filter_type(&self) -> FilterType {
                FilterType::$kind
            }

            fn components(&self) -> Vec<ComponentKey> {
                vec![ComponentKey::of::<T>()]
            }
        }
    };
}

impl_leaf_filter!(With, With);
impl_leaf_filter!(Without, Without);

/// Passes entities that pass both `A` and `B`.
#[derive(Debug, Clone, Copy, Default)]
pub struct And<A, B> {
    a: A,
    b: B,
}

/// Passes entities that pass `A`, `B`, or both.
#[derive(Debug, Clone, Copy, Default)]
pub struct Or<A, B> {
    a: A,
    b: B,
}

macro_rules! impl_nested_filter {
    ($filter:ident, $kind:ident) => {
        impl<A: QueryFilter, B: QueryFilter> $filter<A, B> {
            /// Combines two filters.
            #[must_use]
            pub const fn new(a: A, b: B) -> Self {
                Self { a, b }
            }
        }

        impl<A: QueryFilter, B: QueryFilter> QueryFilter for $filter<A, B> {
            fn filter_type(&self) -> FilterType {
                FilterType::$kind
            }

            fn nested_filters(&self) -> Result<(&dyn QueryFilter, &dyn QueryFilter)> {
                let a: &dyn QueryFilter = &self.a;
                let b: &dyn QueryFilter = &self.b;
                Ok((a, b))
            }
        }
    };
}

impl_nested_filter!(And, And);
impl_nested_filter!(Or, Or);

macro_rules! impl_filter_ops {
    ($({$($params:tt)*} $filter:ty),+ $(,)?) => {
        $(
            impl<$($params)* Rhs: QueryFilter> BitAnd<Rhs> for $filter {
                type Output = And<Self, Rhs>;

                fn bitand(self, rhs: Rhs) -> Self::Output {
                    And::new(self, rhs)
                }
            }

            impl<$($params)* Rhs: QueryFilter> BitOr<Rhs> for $filter {
                type Output = Or<Self, Rhs>;

                fn bitor(self, rhs: Rhs) -> Self::Output {
                    Or::new(self, rhs)
                }
            }
        )+
    };
}

impl_filter_ops!(
    {} NoFilter,
    {T: Component,} With<T>,
    {T: Component,} Without<T>,
    {A: QueryFilter, B: QueryFilter,} And<A, B>,
    {A: QueryFilter, B: QueryFilter,} Or<A, B>,
);

/// A filter resolved against one world.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterNode {
    /// Always passes.
    #[default]
    NoFilter,
    /// Entity must hold every listed component.
    With(Vec<ComponentId>),
    /// Entity must hold none of the listed components.
    Without(Vec<ComponentId>),
    /// Both sides must pass.
    And(Box<FilterNode>, Box<FilterNode>),
    /// At least one side must pass.
    Or(Box<FilterNode>, Box<FilterNode>),
}

impl FilterNode {
    /// Resolves `filter` into a tree, assigning component ids as needed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::NestedFilterUnsupported`] if a filter reports
    /// itself as `And`/`Or` but cannot produce its operands.
    pub fn resolve(filter: &dyn QueryFilter, ids: &mut ComponentIdRegistry) -> Result<Self> {
        let node = match filter.filter_type() {
            FilterType::None => Self::NoFilter,
            FilterType::With => Self::With(resolve_keys(filter, ids)),
            FilterType::Without => Self::Without(resolve_keys(filter, ids)),
            FilterType::And => {
                let (a, b) = filter.nested_filters()?;
                Self::And(
                    Box::new(Self::resolve(a, ids)?),
                    Box::new(Self::resolve(b, ids)?),
                )
            }
            FilterType::Or => {
                let (a, b) = filter.nested_filters()?;
                Self::Or(
                    Box::new(Self::resolve(a, ids)?),
                    Box::new(Self::resolve(b, ids)?),
                )
            }
        };
        Ok(node)
    }

    /// Evaluates the filter against one entity.
    #[must_use]
    pub fn matches(&self, entity: &EntityData) -> bool {
        match self {
            Self::NoFilter => true,
            Self::With(ids) => ids.iter().all(|&id| entity.has_component(id)),
            Self::Without(ids) => !ids.iter().any(|&id| entity.has_component(id)),
            Self::And(a, b) => a.matches(entity) && b.matches(entity),
            Self::Or(a, b) => a.matches(entity) || b.matches(entity),
        }
    }

    /// Combines two trees so both must pass, dropping `NoFilter` operands.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::NoFilter, node) | (node, Self::NoFilter) => node,
            (a, b) => Self::And(Box::new(a), Box::new(b)),
        }
    }

    /// Every component the tree refers to.
    #[must_use]
    pub fn components(&self) -> Vec<ComponentId> {
        let mut out = Vec::new();
        self.collect_components(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_components(&self, out: &mut Vec<ComponentId>) {
        match self {
            Self::NoFilter => {}
            Self::With(ids) | Self::Without(ids) => out.extend_from_slice(ids),
            Self::And(a, b) | Self::Or(a, b) => {
                a.collect_components(out);
                b.collect_components(out);
            }
        }
    }

    /// Components every passing entity must hold, and components no passing
    /// entity may hold, following `And` branches only.
    pub(crate) fn mandatory(&self) -> (Vec<ComponentId>, Vec<ComponentId>) {
        let mut with = Vec::new();
        let mut without = Vec::new();
        self.collect_mandatory(&mut with, &mut without);
        (with, without)
    }

    fn collect_mandatory(&self, with: &mut Vec<ComponentId>, without: &mut Vec<ComponentId>) {
        match self {
            Self::With(ids) => with.extend_from_slice(ids),
            Self::Without(ids) => without.extend_from_slice(ids),
            Self::And(a, b) => {
                a.collect_mandatory(with, without);
                b.collect_mandatory(with, without);
            }
            Self::NoFilter | Self::Or(..) => {}
        }
    }
}

fn resolve_keys(filter: &dyn QueryFilter, ids: &mut ComponentIdRegistry) -> Vec<ComponentId> {
    filter
        .components()
        .into_iter()
        .map(|key| ids.id_for_key(key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct ComponentA;
    impl Component for ComponentA {}

    #[derive(Clone)]
    struct ComponentB;
    impl Component for ComponentB {}

    #[derive(Clone)]
    struct ComponentC;
    impl Component for ComponentC {}

    #[derive(Clone)]
    struct ComponentD;
    impl Component for ComponentD {}

    /// Resolves `filter` and evaluates it against an entity holding `present`.
    fn eval(filter: impl QueryFilter, present: &[ComponentKey]) -> bool {
        let mut ids = ComponentIdRegistry::new();
        let entity =
            EntityData::from_indices(present.iter().map(|&key| (ids.id_for_key(key), 0)));
        FilterNode::resolve(&filter, &mut ids)
            .unwrap()
            .matches(&entity)
    }

    fn a() -> ComponentKey {
        ComponentKey::of::<ComponentA>()
    }

    fn b() -> ComponentKey {
        ComponentKey::of::<ComponentB>()
    }

    #[test]
    fn test_no_filter_always_passes() {
        assert!(eval(NoFilter, &[]));
        assert!(eval(NoFilter, &[a()]));
    }

    #[test]
    fn test_with_only_passes_if_entity_has_component() {
        assert!(eval(With::<ComponentA>::new(), &[a()]));
        assert!(!eval(With::<ComponentB>::new(), &[a()]));
    }

    #[test]
    fn test_without_only_passes_if_entity_lacks_component() {
        assert!(!eval(Without::<ComponentA>::new(), &[a()]));
        assert!(eval(Without::<ComponentB>::new(), &[a()]));
    }

    #[test]
    fn test_and_truth_table() {
        let entity = [a()];
        // true, true
        assert!(eval(
            And::new(With::<ComponentA>::new(), Without::<ComponentB>::new()),
            &entity
        ));
        // true, false
        assert!(!eval(
            And::new(With::<ComponentA>::new(), With::<ComponentB>::new()),
            &entity
        ));
        // false, true
        assert!(!eval(
            And::new(With::<ComponentB>::new(), With::<ComponentA>::new()),
            &entity
        ));
        // false, false
        assert!(!eval(
            And::new(With::<ComponentB>::new(), With::<ComponentC>::new()),
            &entity
        ));
    }

    #[test]
    fn test_or_truth_table() {
        let entity = [a(), b()];
        // true, true
        assert!(eval(
            Or::new(With::<ComponentA>::new(), With::<ComponentB>::new()),
            &entity
        ));
        // true, false
        assert!(eval(
            Or::new(With::<ComponentA>::new(), With::<ComponentC>::new()),
            &entity
        ));
        // false, true
        assert!(eval(
            Or::new(With::<ComponentC>::new(), With::<ComponentA>::new()),
            &entity
        ));
        // false, false
        assert!(!eval(
            Or::new(With::<ComponentC>::new(), With::<ComponentD>::new()),
            &entity
        ));
    }

    #[test]
    fn test_operators_build_nested_trees() {
        let filter = (With::<ComponentA>::new() & Without::<ComponentB>::new())
            | With::<ComponentC>::new();

        assert_eq!(filter.filter_type(), FilterType::Or);
        assert!(eval(filter, &[a()]));
        assert!(!eval(filter, &[a(), b()]));
        assert!(eval(filter, &[a(), b(), ComponentKey::of::<ComponentC>()]));
    }

    #[test]
    fn test_leaf_filters_have_no_nested_filters() {
        let err = With::<ComponentA>::new().nested_filters().unwrap_err();
        assert!(matches!(err, EcsError::NestedFilterUnsupported { .. }));
        assert!(NoFilter.nested_filters().is_err());
        assert!(Without::<ComponentA>::new().nested_filters().is_err());
    }

    /// A filter that claims to be an `And` but cannot produce operands.
    #[derive(Debug)]
    struct BrokenAnd;

    impl QueryFilter for BrokenAnd {
        fn filter_type(&self) -> FilterType {
            FilterType::And
        }
    }

    #[test]
    fn test_resolving_broken_nested_filter_fails() {
        let mut ids = ComponentIdRegistry::new();
        let err = FilterNode::resolve(&BrokenAnd, &mut ids).unwrap_err();
        assert!(matches!(err, EcsError::NestedFilterUnsupported { .. }));
    }

    #[test]
    fn test_resolution_assigns_ids_once() {
        let mut ids = ComponentIdRegistry::new();
        let filter = With::<ComponentA>::new() | Without::<ComponentA>::new();
        let node = FilterNode::resolve(&filter, &mut ids).unwrap();

        let id = ids.get::<ComponentA>().unwrap();
        assert_eq!(
            node,
            FilterNode::Or(
                Box::new(FilterNode::With(vec![id])),
                Box::new(FilterNode::Without(vec![id])),
            )
        );
        assert_eq!(node.components(), vec![id]);
    }

    #[test]
    fn test_and_combinator_skips_no_filter() {
        let node = FilterNode::NoFilter.and(FilterNode::With(vec![ComponentId(1)]));
        assert_eq!(node, FilterNode::With(vec![ComponentId(1)]));

        let node = FilterNode::With(vec![ComponentId(1)]).and(FilterNode::Without(vec![ComponentId(2)]));
        assert_eq!(
            node.mandatory(),
            (vec![ComponentId(1)], vec![ComponentId(2)])
        );
    }
}
