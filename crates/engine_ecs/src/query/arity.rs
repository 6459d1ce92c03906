//! `Query1` .. `Query4` and their result containers.
//!
//! Every arity is generated by `define_query!`; they share [`QueryState`] for
//! everything but the typed column fetch. More arities only need another
//! invocation.

use std::fmt;
use std::marker::PhantomData;

use crate::component::{Component, ComponentId, ComponentKey};
use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::world::World;

use super::QueryAccess;
use super::fetch::{ComponentRef, fetch_column, fetch_column_cloned};
use super::options::QueryOptions;
use super::state::QueryState;

macro_rules! define_query {
    (
        $(#[$meta:meta])*
        $query:ident, $result:ident, $n:literal;
        $($T:ident => $idx:tt, $column:ident, $column_mut:ident);+ $(;)?
    ) => {
        $(#[$meta])*
        pub struct $query<$($T),+> {
            state: QueryState,
            /// Scratch buffer reused across `exec` calls.
            rows: Vec<(EntityId, [Option<usize>; $n])>,
            _marker: PhantomData<fn() -> ($($T,)+)>,
        }

        impl<$($T: Component),+> $query<$($T),+> {
            /// Creates an unprepared query.
            #[must_use]
            pub fn new(options: QueryOptions) -> Self {
                Self {
                    state: QueryState::new(vec![$(ComponentKey::of::<$T>()),+], options),
                    rows: Vec::new(),
                    _marker: PhantomData,
                }
            }

            /// Resolves component types and options against `world`.
            ///
            /// # Errors
            ///
            /// See [`QueryState::prepare`].
            pub fn prepare(&mut self, world: &mut World) -> Result<()> {
                self.state.prepare(world)
            }

            /// Reports sub-optimal configurations. See [`QueryState::validate`].
            ///
            /// # Errors
            ///
            /// [`EcsError::UnpreparedQuery`] or an advisory
            /// [`EcsError::SuboptimalQuery`].
            pub fn validate(&self) -> Result<()> {
                self.state.validate()
            }

            /// Component access of the prepared query.
            ///
            /// # Errors
            ///
            /// [`EcsError::UnpreparedQuery`] before a successful `prepare`.
            pub fn access(&self) -> Result<QueryAccess> {
                self.state.access()
            }

            /// Returns `true` if every queried component is read-only.
            ///
            /// # Errors
            ///
            /// [`EcsError::UnpreparedQuery`] before a successful `prepare`.
            pub fn is_read_only(&self) -> Result<bool> {
                self.state.is_read_only()
            }

            /// Whether schedulers should leave this query to manual runs.
            #[must_use]
            pub fn is_lazy(&self) -> bool {
                self.state.is_lazy()
            }

            /// The arity-independent state.
            #[must_use]
            pub fn state(&self) -> &QueryState {
                &self.state
            }

            /// Scans `world` and returns every matching entity.
            ///
            /// Writable components are live references; read-only ones are
            /// clones. The result borrows the world until it is dropped.
            ///
            /// Each call returns freshly allocated result columns. Only the
            /// query's internal scan buffer keeps its capacity across calls;
            /// the result's `clear` truncates a result the caller holds.
            ///
            /// # Errors
            ///
            /// - [`EcsError::UnpreparedQuery`] before a successful `prepare`.
            /// - [`EcsError::WorldMismatch`] if prepared against another world.
            pub fn exec<'w>(&mut self, world: &'w mut World) -> Result<$result<'w, $($T),+>> {
                self.state.scan::<$n>(world, &mut self.rows)?;
                let prepared = self.state.prepared_for(world)?;
                let ids: [ComponentId; $n] = [$(prepared.ids[$idx]),+];
                let read_only: [bool; $n] = [$(prepared.combined.is_read_only(ids[$idx])),+];

                let [$($column),+] = world.registries_mut(ids);
                let mut result = $result::with_capacity(self.rows.len());
                result.entity_ids.extend(self.rows.iter().map(|(entity, _)| *entity));
                $(
                    fetch_column::<$T>(
                        $column,
                        read_only[$idx],
                        self.rows.iter().map(|(_, row)| row[$idx]),
                        &mut result.$column,
                    )?;
                )+
                Ok(result)
            }

            /// Like [`exec`](Self::exec), through shared world access.
            ///
            /// Only allowed when every queried component is read-only, so
            /// several such queries may run over the same world at once.
            ///
            /// # Errors
            ///
            /// - [`EcsError::UnpreparedQuery`] before a successful `prepare`.
            /// - [`EcsError::WorldMismatch`] if prepared against another world.
            /// - [`EcsError::WritableQuery`] if a component is writable.
            pub fn exec_shared<'w>(&mut self, world: &'w World) -> Result<$result<'w, $($T),+>> {
                let prepared = self.state.prepared_for(world)?;
                let ids: [ComponentId; $n] = [$(prepared.ids[$idx]),+];
                if !self.state.is_read_only()? {
                    return Err(EcsError::WritableQuery);
                }

                self.state.scan::<$n>(world, &mut self.rows)?;
                let mut result = $result::with_capacity(self.rows.len());
                result.entity_ids.extend(self.rows.iter().map(|(entity, _)| *entity));
                $(
                    fetch_column_cloned::<$T>(
                        world.registry_by_id(ids[$idx]),
                        self.rows.iter().map(|(_, row)| row[$idx]),
                        &mut result.$column,
                    )?;
                )+
                Ok(result)
            }
        }

        impl<$($T: Component),+> Default for $query<$($T),+> {
            fn default() -> Self {
                Self::new(QueryOptions::new())
            }
        }

        impl<$($T),+> fmt::Debug for $query<$($T),+> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($query))
                    .field("state", &self.state)
                    .finish_non_exhaustive()
            }
        }

        #[doc = concat!("Index-aligned results of a [`", stringify!($query), "`].")]
        ///
        /// Slot `i` of every column belongs to `entity_ids()[i]`. A slot is
        /// `None` only for an optional component the entity lacks.
        pub struct $result<'w, $($T),+> {
            entity_ids: Vec<EntityId>,
            $($column: Vec<Option<ComponentRef<'w, $T>>>,)+
        }

        impl<'w, $($T),+> $result<'w, $($T),+> {
            fn with_capacity(capacity: usize) -> Self {
                Self {
                    entity_ids: Vec::with_capacity(capacity),
                    $($column: Vec::with_capacity(capacity),)+
                }
            }

            /// Matching entities, in world iteration order.
            #[must_use]
            pub fn entity_ids(&self) -> &[EntityId] {
                &self.entity_ids
            }

            $(
                #[doc = concat!("The `", stringify!($T), "` column.")]
                #[must_use]
                pub fn $column(&self) -> &[Option<ComponentRef<'w, $T>>] {
                    &self.$column
                }

                #[doc = concat!("The `", stringify!($T), "` column, mutably.")]
                pub fn $column_mut(&mut self) -> &mut [Option<ComponentRef<'w, $T>>] {
                    &mut self.$column
                }
            )+

            /// Number of matching entities.
            #[must_use]
            pub fn len(&self) -> usize {
                self.entity_ids.len()
            }

            /// Returns `true` if nothing matched.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.entity_ids.is_empty()
            }

            /// Row `index`.
            #[must_use]
            pub fn get(&self, index: usize) -> Option<(EntityId, $(Option<&$T>),+)> {
                let entity = *self.entity_ids.get(index)?;
                Some((entity, $(self.$column[index].as_deref()),+))
            }

            /// Row `index`, mutably.
            pub fn get_mut(&mut self, index: usize) -> Option<(EntityId, $(Option<&mut $T>),+)> {
                let entity = *self.entity_ids.get(index)?;
                Some((entity, $(self.$column[index].as_deref_mut()),+))
            }

            /// Iterates over rows.
            pub fn iter(&self) -> impl Iterator<Item = (EntityId, $(Option<&$T>),+)> + '_ {
                (0..self.len()).filter_map(move |index| self.get(index))
            }

            /// Calls `f` on every row, stopping at the first error.
            ///
            /// # Errors
            ///
            /// Whatever `f` returns.
            pub fn try_for_each<E>(
                &mut self,
                mut f: impl FnMut(EntityId, $(Option<&mut $T>),+) -> std::result::Result<(), E>,
            ) -> std::result::Result<(), E> {
                for index in 0..self.entity_ids.len() {
                    f(self.entity_ids[index], $(self.$column[index].as_deref_mut()),+)?;
                }
                Ok(())
            }

            /// Empties every column, keeping their capacity.
            pub fn clear(&mut self) {
                self.entity_ids.clear();
                $(self.$column.clear();)+
            }
        }

        impl<$($T: fmt::Debug),+> fmt::Debug for $result<'_, $($T),+> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($result))
                    .field("entity_ids", &self.entity_ids)
                    $(.field(stringify!($column), &self.$column))+
                    .finish()
            }
        }
    };
}

define_query! {
    /// A query over one component type.
    Query1, Query1Result, 1;
    A => 0, components_a, components_a_mut;
}

define_query! {
    /// A query over two component types.
    ///
    /// ```rust
    /// use engine_ecs::{Component, Query2, QueryOptions, With, World};
    ///
    /// #[derive(Debug, Clone, PartialEq)] struct Position(f32);
    /// #[derive(Debug, Clone, PartialEq)] struct Velocity(f32);
    /// impl Component for Position {}
    /// impl Component for Velocity {}
    ///
    /// let mut world = World::default();
    /// world.spawn((Position(0.0), Velocity(1.0)))?;
    /// world.spawn((Position(5.0),))?;
    ///
    /// let mut query = Query2::<Position, Velocity>::new(
    ///     QueryOptions::new().optional::<Velocity>().read_only::<Velocity>(),
    /// );
    /// query.prepare(&mut world)?;
    ///
    /// let mut result = query.exec(&mut world)?;
    /// result.try_for_each(|_, position, velocity| {
    ///     if let (Some(position), Some(velocity)) = (position, velocity) {
    ///         position.0 += velocity.0;
    ///     }
    ///     Ok::<_, engine_ecs::EcsError>(())
    /// })?;
    /// assert_eq!(result.len(), 2);
    /// # Ok::<_, engine_ecs::EcsError>(())
    /// ```
    Query2, Query2Result, 2;
    A => 0, components_a, components_a_mut;
    B => 1, components_b, components_b_mut;
}

define_query! {
    /// A query over three component types.
    Query3, Query3Result, 3;
    A => 0, components_a, components_a_mut;
    B => 1, components_b, components_b_mut;
    C => 2, components_c, components_c_mut;
}

define_query! {
    /// A query over four component types.
    Query4, Query4Result, 4;
    A => 0, components_a, components_a_mut;
    B => 1, components_b, components_b_mut;
    C => 2, components_c, components_c_mut;
    D => 3, components_d, components_d_mut;
}
