//! The arity-independent half of a query: preparation, validation, access
//! metadata, and the entity scan.

use std::collections::HashSet;

use crate::component::{ComponentId, ComponentKey};
use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::world::{World, WorldId};

use super::QueryAccess;
use super::fetch::match_component;
use super::options::{CombinedQueryOptions, QueryOption, QueryOptions};

/// Options and queried types of one query, plus what `prepare` resolved.
#[derive(Debug)]
pub struct QueryState {
    keys: Vec<ComponentKey>,
    options: QueryOptions,
    prepared: Option<Prepared>,
}

#[derive(Debug)]
pub(crate) struct Prepared {
    pub(crate) world: WorldId,
    /// Parallel to `QueryState::keys`.
    pub(crate) ids: Vec<ComponentId>,
    pub(crate) combined: CombinedQueryOptions,
}

impl QueryState {
    /// A query over `keys` (in declaration order) with `options`.
    #[must_use]
    pub fn new(keys: Vec<ComponentKey>, options: QueryOptions) -> Self {
        Self {
            keys,
            options,
            prepared: None,
        }
    }

    /// Resolves the queried types and options against `world`.
    ///
    /// On error the query is left unprepared.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DuplicateComponent`] if a type is queried twice, or an
    ///   option names a component twice.
    /// - [`EcsError::NestedFilterUnsupported`] if a filter cannot be resolved.
    pub fn prepare(&mut self, world: &mut World) -> Result<()> {
        self.prepared = None;

        let mut seen = HashSet::with_capacity(self.keys.len());
        for key in &self.keys {
            if !seen.insert(key.type_id) {
                return Err(EcsError::DuplicateComponent {
                    component: key.name,
                });
            }
        }

        let world_id = world.id();
        let registry = world.component_ids_mut();
        let combined = CombinedQueryOptions::resolve(&self.options, registry)?;
        let ids = self
            .keys
            .iter()
            .map(|&key| registry.id_for_key(key))
            .collect();

        self.prepared = Some(Prepared {
            world: world_id,
            ids,
            combined,
        });
        Ok(())
    }

    /// Returns `true` once `prepare` has succeeded.
    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    /// Whether schedulers should leave this query's system to manual runs.
    #[must_use]
    pub fn is_lazy(&self) -> bool {
        self.options.is_lazy()
    }

    /// Reports correct but sub-optimal configurations.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnpreparedQuery`] before a successful `prepare`.
    /// - [`EcsError::SuboptimalQuery`] listing every finding. This is
    ///   advisory: the query still executes correctly.
    pub fn validate(&self) -> Result<()> {
        let prepared = self.prepared.as_ref().ok_or(EcsError::UnpreparedQuery)?;
        let (with, without) = prepared.combined.filter.mandatory();
        let mut findings = Vec::new();

        for (key, &id) in self.keys.iter().zip(&prepared.ids) {
            if with.contains(&id) {
                findings.push(format!(
                    "{} is queried and also required by a With filter",
                    key.name
                ));
            }
            if without.contains(&id) && !prepared.combined.is_optional(id) {
                findings.push(format!(
                    "{} is required by the query but excluded by a Without filter, nothing can match",
                    key.name
                ));
            }
        }

        let queried = |key: &ComponentKey| self.keys.iter().any(|k| k.type_id == key.type_id);
        for option in self.options.as_slice() {
            match option {
                QueryOption::Optional(key) if !queried(key) => findings.push(format!(
                    "{} is marked optional but is not queried",
                    key.name
                )),
                QueryOption::ReadOnly(key) if !queried(key) => findings.push(format!(
                    "{} is marked read-only but is not queried",
                    key.name
                )),
                _ => {}
            }
        }

        if findings.is_empty() {
            Ok(())
        } else {
            Err(EcsError::SuboptimalQuery(findings.join("; ")))
        }
    }

    /// Which components the query reads, writes, and filters on.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnpreparedQuery`] before a successful `prepare`.
    pub fn access(&self) -> Result<QueryAccess> {
        let prepared = self.prepared.as_ref().ok_or(EcsError::UnpreparedQuery)?;
        let combined = &prepared.combined;
        let mut access = QueryAccess::new();
        for &id in &prepared.ids {
            access = if combined.is_read_only(id) {
                access.read(id)
            } else {
                access.write(id)
            };
            if combined.is_optional(id) {
                access = access.optional(id);
            }
        }
        for id in combined.filter.components() {
            if !prepared.ids.contains(&id) {
                access = access.filtered(id);
            }
        }
        Ok(access)
    }

    /// Returns `true` if every queried component is read-only.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnpreparedQuery`] before a successful `prepare`.
    pub fn is_read_only(&self) -> Result<bool> {
        let prepared = self.prepared.as_ref().ok_or(EcsError::UnpreparedQuery)?;
        Ok(prepared
            .ids
            .iter()
            .all(|&id| prepared.combined.is_read_only(id)))
    }

    /// The prepared state, checked against the world about to be scanned.
    pub(crate) fn prepared_for(&self, world: &World) -> Result<&Prepared> {
        let prepared = self.prepared.as_ref().ok_or(EcsError::UnpreparedQuery)?;
        if prepared.world != world.id() {
            return Err(EcsError::WorldMismatch);
        }
        Ok(prepared)
    }

    /// Collects every entity passing the filter and holding all required
    /// components, with one registry index (or `None` when optional and
    /// absent) per queried component. `rows` is cleared first.
    pub(crate) fn scan<const N: usize>(
        &self,
        world: &World,
        rows: &mut Vec<(EntityId, [Option<usize>; N])>,
    ) -> Result<()> {
        rows.clear();
        let prepared = self.prepared_for(world)?;
        let combined = &prepared.combined;

        'entities: for (entity, data) in world.iter_entities() {
            if !combined.filter.matches(data) {
                continue;
            }
            let mut row = [None; N];
            for (slot, &id) in row.iter_mut().zip(&prepared.ids) {
                match match_component(data, id, combined) {
                    Some(index) => *slot = index,
                    None => continue 'entities,
                }
            }
            rows.push((entity, row));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::query::filter::{With, Without};

    #[derive(Clone)]
    struct ComponentA;
    impl Component for ComponentA {}

    #[derive(Clone)]
    struct ComponentB;
    impl Component for ComponentB {}

    #[derive(Clone)]
    struct ComponentC;
    impl Component for ComponentC {}

    fn state(keys: Vec<ComponentKey>, options: QueryOptions) -> QueryState {
        QueryState::new(keys, options)
    }

    fn ab() -> Vec<ComponentKey> {
        vec![ComponentKey::of::<ComponentA>(), ComponentKey::of::<ComponentB>()]
    }

    #[test]
    fn test_unprepared_query_fails() {
        let query = state(ab(), QueryOptions::new());
        assert_eq!(query.validate(), Err(EcsError::UnpreparedQuery));
        assert_eq!(query.access(), Err(EcsError::UnpreparedQuery));

        let world = World::default();
        let mut rows: Vec<(EntityId, [Option<usize>; 2])> = Vec::new();
        assert_eq!(query.scan(&world, &mut rows), Err(EcsError::UnpreparedQuery));
    }

    #[test]
    fn test_duplicate_query_type_fails_and_unprepares() {
        let mut world = World::default();
        let mut query = state(ab(), QueryOptions::new());
        query.prepare(&mut world).unwrap();
        assert!(query.is_prepared());

        let mut duplicate = state(
            vec![ComponentKey::of::<ComponentA>(), ComponentKey::of::<ComponentA>()],
            QueryOptions::new(),
        );
        let err = duplicate.prepare(&mut world).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
        assert!(!duplicate.is_prepared());
        assert_eq!(duplicate.validate(), Err(EcsError::UnpreparedQuery));
    }

    #[test]
    fn test_failed_reprepare_leaves_query_unprepared() {
        let mut world = World::default();
        let mut query = state(
            ab(),
            QueryOptions::new()
                .optional::<ComponentB>()
                .optional::<ComponentB>(),
        );
        assert!(query.prepare(&mut world).is_err());
        assert!(!query.is_prepared());
    }

    #[test]
    fn test_validate_accepts_plain_query() {
        let mut world = World::default();
        let mut query = state(ab(), QueryOptions::new().filter(With::<ComponentC>::new()));
        query.prepare(&mut world).unwrap();
        assert_eq!(query.validate(), Ok(()));
    }

    #[test]
    fn test_validate_reports_redundant_with_filter() {
        let mut world = World::default();
        let mut query = state(ab(), QueryOptions::new().filter(With::<ComponentA>::new()));
        query.prepare(&mut world).unwrap();

        let Err(EcsError::SuboptimalQuery(message)) = query.validate() else {
            panic!("expected an advisory");
        };
        assert!(message.contains("With filter"));
    }

    #[test]
    fn test_validate_reports_contradicting_without_filter() {
        let mut world = World::default();
        let mut query = state(
            ab(),
            QueryOptions::new().filter(With::<ComponentC>::new() & Without::<ComponentB>::new()),
        );
        query.prepare(&mut world).unwrap();

        let Err(EcsError::SuboptimalQuery(message)) = query.validate() else {
            panic!("expected an advisory");
        };
        assert!(message.contains("Without filter"));
    }

    #[test]
    fn test_validate_ignores_or_branches() {
        let mut world = World::default();
        let mut query = state(
            ab(),
            QueryOptions::new().filter(With::<ComponentA>::new() | With::<ComponentC>::new()),
        );
        query.prepare(&mut world).unwrap();
        assert_eq!(query.validate(), Ok(()));
    }

    #[test]
    fn test_validate_reports_options_for_unqueried_components() {
        let mut world = World::default();
        let mut query = state(
            ab(),
            QueryOptions::new()
                .optional::<ComponentC>()
                .read_only::<ComponentC>(),
        );
        query.prepare(&mut world).unwrap();

        let Err(EcsError::SuboptimalQuery(message)) = query.validate() else {
            panic!("expected an advisory");
        };
        assert!(message.contains("optional"));
        assert!(message.contains("read-only"));
        assert_eq!(message.matches("; ").count(), 1);
    }

    #[test]
    fn test_access_splits_reads_and_writes() {
        let mut world = World::default();
        let mut query = state(
            ab(),
            QueryOptions::new()
                .read_only::<ComponentA>()
                .optional::<ComponentB>()
                .filter(Without::<ComponentC>::new()),
        );
        query.prepare(&mut world).unwrap();

        let a = world.component_id::<ComponentA>();
        let b = world.component_id::<ComponentB>();
        let c = world.component_id::<ComponentC>();
        let access = query.access().unwrap();
        assert_eq!(access.reads, vec![a]);
        assert_eq!(access.writes, vec![b]);
        assert_eq!(access.optionals, vec![b]);
        assert_eq!(access.filtered, vec![c]);
        assert_eq!(query.is_read_only(), Ok(false));
    }

    #[test]
    fn test_all_read_only() {
        let mut world = World::default();
        let mut query = state(ab(), QueryOptions::new().all_read_only());
        query.prepare(&mut world).unwrap();
        assert_eq!(query.is_read_only(), Ok(true));
        assert!(query.access().unwrap().is_read_only());
    }

    #[test]
    fn test_scan_against_other_world_fails() {
        let mut world = World::default();
        let other = World::default();
        let mut query = state(ab(), QueryOptions::new());
        query.prepare(&mut world).unwrap();

        let mut rows: Vec<(EntityId, [Option<usize>; 2])> = Vec::new();
        assert_eq!(query.scan(&other, &mut rows), Err(EcsError::WorldMismatch));
    }

    #[test]
    fn test_scan_applies_optional_and_filter() {
        let mut world = World::default();
        let only_a = world.spawn((ComponentA,)).unwrap();
        let both = world.spawn((ComponentA, ComponentB)).unwrap();
        world.spawn((ComponentB,)).unwrap();
        world.spawn((ComponentA, ComponentC)).unwrap();

        let mut query = state(
            ab(),
            QueryOptions::new()
                .optional::<ComponentB>()
                .filter(Without::<ComponentC>::new()),
        );
        query.prepare(&mut world).unwrap();

        let mut rows: Vec<(EntityId, [Option<usize>; 2])> = Vec::new();
        query.scan(&world, &mut rows).unwrap();
        rows.sort_by_key(|(entity, _)| *entity);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], (only_a, [Some(0), None]));
        assert_eq!(rows[1].0, both);
        assert!(rows[1].1.iter().all(Option::is_some));
        assert!(!query.is_lazy());
    }
}
