//! Per-entity matching and per-column materialisation of query results.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::component::{Component, ComponentId};
use crate::entity::EntityData;
use crate::error::{EcsError, Result};
use crate::registry::{AnyComponentRegistry, ComponentRegistry};

use super::options::CombinedQueryOptions;

/// One component value in a query result.
///
/// Mutable components are `Live` references into the world's storage.
/// Read-only components are `Cloned`, so changing them never reaches the
/// world.
pub enum ComponentRef<'w, T> {
    /// The stored value.
    Live(&'w mut T),
    /// A copy taken during `exec`.
    Cloned(T),
}

impl<T> ComponentRef<'_, T> {
    /// Returns `true` if this is a disconnected copy.
    #[must_use]
    pub fn is_cloned(&self) -> bool {
        matches!(self, Self::Cloned(_))
    }

    /// The value, cloning it if it is live.
    #[must_use]
    pub fn into_owned(self) -> T
    where
        T: Clone,
    {
        match self {
            Self::Live(value) => value.clone(),
            Self::Cloned(value) => value,
        }
    }
}

impl<T> Deref for ComponentRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Self::Live(value) => value,
            Self::Cloned(value) => value,
        }
    }
}

impl<T> DerefMut for ComponentRef<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self {
            Self::Live(value) => value,
            Self::Cloned(value) => value,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ComponentRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live(value) => f.debug_tuple("Live").field(value).finish(),
            Self::Cloned(value) => f.debug_tuple("Cloned").field(value).finish(),
        }
    }
}

/// Resolves one queried component for one entity.
///
/// - `None`: the entity lacks a required component and must be skipped.
/// - `Some(None)`: the component is optional and absent.
/// - `Some(Some(index))`: the registry index of the entity's value.
pub(crate) fn match_component(
    entity: &EntityData,
    id: ComponentId,
    options: &CombinedQueryOptions,
) -> Option<Option<usize>> {
    match entity.index_of(id) {
        Some(index) => Some(Some(index)),
        None if options.is_optional(id) => Some(None),
        None => None,
    }
}

/// Appends one result column from an exclusively borrowed registry.
///
/// Mutable columns hand out live references; each registry slot is owned by
/// exactly one entity, so every slot is taken at most once.
pub(crate) fn fetch_column<'w, T: Component>(
    registry: Option<&'w mut (dyn AnyComponentRegistry + 'static)>,
    read_only: bool,
    indices: impl Iterator<Item = Option<usize>>,
    out: &mut Vec<Option<ComponentRef<'w, T>>>,
) -> Result<()> {
    let Some(registry) = registry else {
        return fill_missing(indices, out);
    };
    let registry = downcast_mut::<T>(registry)?;
    if read_only {
        for index in indices {
            out.push(match index {
                Some(index) => Some(ComponentRef::Cloned(registry.get(index)?.clone())),
                None => None,
            });
        }
        return Ok(());
    }

    let id = registry.id();
    let values = registry.values_mut();
    let len = values.len();
    let mut slots: Vec<Option<&'w mut T>> = values.iter_mut().map(Some).collect();
    for index in indices {
        let value = match index {
            Some(index) => Some(
                slots
                    .get_mut(index)
                    .and_then(Option::take)
                    .map(ComponentRef::Live)
                    .ok_or(EcsError::IndexOutOfRange {
                        component: id,
                        index,
                        len,
                    })?,
            ),
            None => None,
        };
        out.push(value);
    }
    Ok(())
}

/// Appends one result column of clones from a shared registry.
pub(crate) fn fetch_column_cloned<'w, T: Component>(
    registry: Option<&dyn AnyComponentRegistry>,
    indices: impl Iterator<Item = Option<usize>>,
    out: &mut Vec<Option<ComponentRef<'w, T>>>,
) -> Result<()> {
    let Some(registry) = registry else {
        return fill_missing(indices, out);
    };
    let registry = registry
        .as_any()
        .downcast_ref::<ComponentRegistry<T>>()
        .ok_or(EcsError::RegistryMismatch {
            component: T::type_name(),
        })?;
    for index in indices {
        out.push(match index {
            Some(index) => Some(ComponentRef::Cloned(registry.get(index)?.clone())),
            None => None,
        });
    }
    Ok(())
}

fn downcast_mut<'a, T: Component>(
    registry: &'a mut (dyn AnyComponentRegistry + 'static),
) -> Result<&'a mut ComponentRegistry<T>> {
    registry
        .as_any_mut()
        .downcast_mut::<ComponentRegistry<T>>()
        .ok_or(EcsError::RegistryMismatch {
            component: T::type_name(),
        })
}

/// A component without a registry has never been stored, so only optional
/// slots can reach here.
fn fill_missing<T>(
    indices: impl Iterator<Item = Option<usize>>,
    out: &mut Vec<Option<ComponentRef<'_, T>>>,
) -> Result<()> {
    for index in indices {
        if index.is_some() {
            return Err(EcsError::RegistryMismatch {
                component: std::any::type_name::<T>(),
            });
        }
        out.push(None);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use crate::query::options::ReadOnly;

    #[derive(Debug, Clone, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    fn registry_with(values: &[u32]) -> ComponentRegistry<Health> {
        let mut registry = ComponentRegistry::create(values.len(), ComponentId(0)).unwrap();
        for (owner, &value) in values.iter().enumerate() {
            registry.insert(EntityId(owner as u64 + 1), Health(value));
        }
        registry
    }

    #[test]
    fn test_match_component() {
        let entity = EntityData::from_indices([(ComponentId(0), 4)]);
        let required = CombinedQueryOptions::default();
        let optional = CombinedQueryOptions {
            optional: vec![ComponentId(1)],
            read_only: ReadOnly::default(),
            ..CombinedQueryOptions::default()
        };

        assert_eq!(match_component(&entity, ComponentId(0), &required), Some(Some(4)));
        assert_eq!(match_component(&entity, ComponentId(1), &required), None);
        assert_eq!(match_component(&entity, ComponentId(1), &optional), Some(None));
    }

    #[test]
    fn test_live_column_writes_through() {
        let mut registry = registry_with(&[10, 20, 30]);
        let mut out = Vec::new();
        fetch_column::<Health>(
            Some(&mut registry),
            false,
            [Some(2), None, Some(0)].into_iter(),
            &mut out,
        )
        .unwrap();

        assert_eq!(out.len(), 3);
        assert!(out[1].is_none());
        let value = out[0].as_mut().unwrap();
        assert!(!value.is_cloned());
        value.0 = 31;
        drop(out);

        assert_eq!(registry.get(2).unwrap(), &Health(31));
    }

    #[test]
    fn test_read_only_column_is_disconnected() {
        let mut registry = registry_with(&[10]);
        let mut out = Vec::new();
        fetch_column::<Health>(Some(&mut registry), true, [Some(0)].into_iter(), &mut out)
            .unwrap();

        let value = out[0].as_mut().unwrap();
        assert!(value.is_cloned());
        value.0 = 99;
        drop(out);

        assert_eq!(registry.get(0).unwrap(), &Health(10));
    }

    #[test]
    fn test_live_column_rejects_reused_slot() {
        let mut registry = registry_with(&[10]);
        let mut out = Vec::new();
        let err = fetch_column::<Health>(
            Some(&mut registry),
            false,
            [Some(0), Some(0)].into_iter(),
            &mut out,
        )
        .unwrap_err();

        assert!(matches!(err, EcsError::IndexOutOfRange { index: 0, .. }));
    }

    #[test]
    fn test_missing_registry_only_fills_optional_slots() {
        let mut out: Vec<Option<ComponentRef<'_, Health>>> = Vec::new();
        fetch_column_cloned::<Health>(None, [None, None].into_iter(), &mut out).unwrap();
        assert_eq!(out.len(), 2);

        let mut out: Vec<Option<ComponentRef<'_, Health>>> = Vec::new();
        assert!(fetch_column_cloned::<Health>(None, [Some(0)].into_iter(), &mut out).is_err());
    }

    #[test]
    fn test_into_owned() {
        let mut value = Health(5);
        assert_eq!(ComponentRef::Live(&mut value).into_owned(), Health(5));
        assert_eq!(ComponentRef::Cloned(Health(6)).into_owned(), Health(6));
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Mana(u32);
    impl Component for Mana {}

    #[test]
    fn test_downcast_returns_registry_borrow() {
        let mut registry = registry_with(&[7]);
        let typed = downcast_mut::<Health>(&mut registry).unwrap();
        typed.get_mut(0).unwrap().0 = 8;
        assert_eq!(registry.get(0).unwrap(), &Health(8));

        let err = downcast_mut::<Mana>(&mut registry).unwrap_err();
        assert!(matches!(err, EcsError::RegistryMismatch { .. }));
    }
}
