//! Fixed-timestep tick loop.
//!
//! Each tick:
//!
//! 1. Recompute execution stages if the system set changed.
//! 2. Run every stage in order; within a stage, systems run in
//!    registration order.
//! 3. Advance the tick counter.
//!
//! Lazy systems are left out of the stages and only run through
//! [`TickLoop::run_system`].

use std::time::Instant;

use anyhow::{Context, Result};
use engine_ecs::{EcsError, World};
use tracing::{debug, info, warn};

use crate::config::TickConfig;
use crate::scheduler::{self, Stage, SystemAccess};
use crate::system::{System, SystemRegistry};

/// The tick loop state.
#[derive(Debug)]
pub struct TickLoop {
    /// Current tick counter.
    tick_id: u64,
    /// Tick configuration.
    config: TickConfig,
    /// The world every system runs against.
    world: World,
    /// Registered systems, lazy ones included.
    systems: SystemRegistry,
    /// Pre-computed stages (recomputed when system set changes).
    stages: Vec<Stage>,
    /// Maps stage indices to registry indices.
    scheduled: Vec<usize>,
    /// Whether the stage cache is dirty and needs recomputation.
    stages_dirty: bool,
}

impl TickLoop {
    /// Create a new tick loop over `world`.
    #[must_use]
    pub fn new(config: TickConfig, world: World) -> Self {
        Self {
            tick_id: 0,
            config,
            world,
            systems: SystemRegistry::new(),
            stages: Vec::new(),
            scheduled: Vec::new(),
            stages_dirty: true,
        }
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns a reference to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Returns a mutable reference to the world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Prepares `system` against the world and registers it.
    ///
    /// Validation findings are logged and do not prevent registration.
    pub fn add_system(&mut self, mut system: impl System + 'static) -> Result<()> {
        system
            .prepare(&mut self.world)
            .with_context(|| format!("failed to prepare system {}", system.name()))?;

        match system.validate() {
            Ok(()) => {}
            Err(EcsError::SuboptimalQuery(advice)) => {
                warn!(system = system.name(), %advice, "sub-optimal query");
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to validate system {}", system.name()));
            }
        }

        let access = system
            .access()
            .with_context(|| format!("system {} has no query access", system.name()))?;
        info!(
            system = system.name(),
            lazy = system.is_lazy(),
            read_only = access.is_read_only(),
            "registered system"
        );
        self.systems.register(Box::new(system))?;
        self.stages_dirty = true;
        Ok(())
    }

    /// Removes a system by name. Returns `true` if it was registered.
    pub fn remove_system(&mut self, name: &str) -> bool {
        let removed = self.systems.unregister(name).is_some();
        if removed {
            self.stages_dirty = true;
        }
        removed
    }

    /// Runs one system immediately, lazy or not.
    pub fn run_system(&mut self, name: &str) -> Result<()> {
        let index = self
            .systems
            .position(name)
            .with_context(|| format!("no system named {name}"))?;
        self.run_at(index)
    }

    /// Recompute execution stages from the current non-lazy systems.
    fn recompute_stages(&mut self) -> Result<()> {
        self.scheduled.clear();
        let mut systems = Vec::with_capacity(self.systems.len());
        for (index, system) in self.systems.iter().enumerate() {
            if system.is_lazy() {
                debug!(system = system.name(), "lazy system left out of stages");
                continue;
            }
            let access = system
                .access()
                .with_context(|| format!("system {} has no query access", system.name()))?;
            self.scheduled.push(index);
            systems.push(SystemAccess {
                name: system.name().to_string(),
                access,
            });
        }

        self.stages = scheduler::compute_stages(&systems);
        self.stages_dirty = false;

        for (stage_idx, stage) in self.stages.iter().enumerate() {
            let names: Vec<&str> = stage
                .system_indices
                .iter()
                .map(|&idx| systems[idx].name.as_str())
                .collect();
            debug!(stage = stage_idx, systems = ?names, "stage layout");
        }

        info!(
            tick_id = self.tick_id,
            stage_count = self.stages.len(),
            system_count = systems.len(),
            lazy_count = self.systems.len() - systems.len(),
            "recomputed execution stages"
        );
        Ok(())
    }

    /// Returns the current execution stages, recomputing if necessary.
    ///
    /// Stage entries index the non-lazy systems in registration order.
    pub fn stages(&mut self) -> Result<&[Stage]> {
        if self.stages_dirty {
            self.recompute_stages()?;
        }
        Ok(&self.stages)
    }

    /// Run one tick of the simulation.
    pub fn tick(&mut self) -> Result<()> {
        self.tick_id += 1;

        if self.stages_dirty {
            self.recompute_stages()?;
        }

        debug!(
            tick_id = self.tick_id,
            stages = self.stages.len(),
            "tick start"
        );

        for stage_idx in 0..self.stages.len() {
            debug!(
                tick_id = self.tick_id,
                stage = stage_idx,
                systems = self.stages[stage_idx].system_indices.len(),
                "executing stage"
            );
            for slot in 0..self.stages[stage_idx].system_indices.len() {
                let index = self.scheduled[self.stages[stage_idx].system_indices[slot]];
                self.run_at(index)?;
            }
        }
        Ok(())
    }

    fn run_at(&mut self, index: usize) -> Result<()> {
        let tick_id = self.tick_id;
        let system = self
            .systems
            .get_mut(index)
            .with_context(|| format!("no system at index {index}"))?;
        system
            .run(&mut self.world)
            .with_context(|| format!("system {} failed at tick {tick_id}", system.name()))
    }

    /// Run the tick loop for the configured number of ticks, or indefinitely.
    pub fn run(&mut self) -> Result<()> {
        let tick_duration = self.config.tick_duration()?;
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();

            self.tick()?;

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(ticks = tick_count, "tick loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
        Ok(())
    }
}
