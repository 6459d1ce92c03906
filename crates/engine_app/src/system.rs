//! Systems and the registry that tracks them.
//!
//! A system owns one or more prepared queries and runs them against the
//! world once per tick. Its [`QueryAccess`] tells the scheduler which other
//! systems it may share a stage with.

use anyhow::{Result, bail};
use engine_ecs::{EcsError, QueryAccess, World};

/// A unit of work run by the tick loop.
pub trait System: Send {
    /// Unique name, used for logging and manual runs.
    fn name(&self) -> &str;

    /// Prepares the system's queries against `world`.
    ///
    /// Called once, when the system is added to a tick loop.
    fn prepare(&mut self, world: &mut World) -> Result<(), EcsError>;

    /// Advisory check of the system's queries, after `prepare`.
    fn validate(&self) -> Result<(), EcsError> {
        Ok(())
    }

    /// Components the system reads and writes.
    ///
    /// Fails with [`EcsError::UnpreparedQuery`] before `prepare`.
    fn access(&self) -> Result<QueryAccess, EcsError>;

    /// Lazy systems are never scheduled; they only run through
    /// [`TickLoop::run_system`](crate::tick::TickLoop::run_system).
    fn is_lazy(&self) -> bool {
        false
    }

    /// Runs the system once.
    fn run(&mut self, world: &mut World) -> Result<()>;
}

/// All systems known to a tick loop, in registration order.
#[derive(Default)]
pub struct SystemRegistry {
    systems: Vec<Box<dyn System>>,
}

impl SystemRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a system.
    ///
    /// # Errors
    ///
    /// Fails if a system with the same name is already registered.
    pub fn register(&mut self, system: Box<dyn System>) -> Result<()> {
        if self.position(system.name()).is_some() {
            bail!("system {} is already registered", system.name());
        }
        self.systems.push(system);
        Ok(())
    }

    /// Removes a system by name.
    pub fn unregister(&mut self, name: &str) -> Option<Box<dyn System>> {
        let index = self.position(name)?;
        Some(self.systems.remove(index))
    }

    /// Registration index of the system called `name`.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.systems.iter().position(|system| system.name() == name)
    }

    /// The system at `index`, mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn System + 'static)> {
        self.systems.get_mut(index).map(|system| system.as_mut())
    }

    /// Returns an iterator over all systems in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn System> {
        self.systems.iter().map(|system| system.as_ref())
    }

    /// Returns the number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` if no system is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl std::fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.systems.iter().map(|system| system.name()))
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use engine_ecs::ComponentId;

    use super::*;

    /// A system with fixed access that does nothing.
    pub(crate) struct StubSystem {
        pub(crate) name: &'static str,
        pub(crate) access: QueryAccess,
        pub(crate) lazy: bool,
    }

    impl StubSystem {
        pub(crate) fn new(name: &'static str, reads: &[u32], writes: &[u32]) -> Self {
            let mut access = QueryAccess::new();
            for &id in reads {
                access = access.read(ComponentId(id));
            }
            for &id in writes {
                access = access.write(ComponentId(id));
            }
            Self {
                name,
                access,
                lazy: false,
            }
        }

        pub(crate) fn lazy(mut self) -> Self {
            self.lazy = true;
            self
        }
    }

    impl System for StubSystem {
        fn name(&self) -> &str {
            self.name
        }

        fn prepare(&mut self, _world: &mut World) -> Result<(), EcsError> {
            Ok(())
        }

        fn access(&self) -> Result<QueryAccess, EcsError> {
            Ok(self.access.clone())
        }

        fn is_lazy(&self) -> bool {
            self.lazy
        }

        fn run(&mut self, _world: &mut World) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_keeps_order() {
        let mut registry = SystemRegistry::new();
        registry
            .register(Box::new(StubSystem::new("physics", &[1], &[2])))
            .unwrap();
        registry
            .register(Box::new(StubSystem::new("ai", &[1], &[3])))
            .unwrap();

        let names: Vec<_> = registry.iter().map(System::name).collect();
        assert_eq!(names, vec!["physics", "ai"]);
        assert_eq!(registry.position("ai"), Some(1));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_rejects_duplicate_names() {
        let mut registry = SystemRegistry::new();
        registry
            .register(Box::new(StubSystem::new("physics", &[], &[1])))
            .unwrap();
        assert!(
            registry
                .register(Box::new(StubSystem::new("physics", &[], &[2])))
                .is_err()
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister() {
        let mut registry = SystemRegistry::new();
        registry
            .register(Box::new(StubSystem::new("physics", &[], &[1])))
            .unwrap();

        assert!(registry.unregister("physics").is_some());
        assert!(registry.unregister("physics").is_none());
        assert!(registry.is_empty());
    }
}
