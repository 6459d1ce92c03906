//! System scheduler: conflict detection and stage computation.
//!
//! The scheduler groups systems into **stages** based on the read/write
//! access reported by their prepared queries. Systems within a stage have no
//! conflicts: none of them writes a component another one reads or writes.
//! Stages execute sequentially.

use engine_ecs::QueryAccess;

/// A schedulable system with its name and component access.
#[derive(Debug, Clone)]
pub struct SystemAccess {
    /// The system name (e.g. `"movement"`).
    pub name: String,
    /// The system's data access requirements.
    pub access: QueryAccess,
}

/// A stage is a group of systems that do not conflict with each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Indices into the slice passed to [`compute_stages`].
    pub system_indices: Vec<usize>,
}

/// Computes execution stages from a set of systems.
///
/// The algorithm is a greedy graph colouring:
/// 1. For each system, check if it conflicts with any system already placed
///    in the current stage.
/// 2. If no conflict, add it to the current stage.
/// 3. If conflict, try the next stage, or create a new one.
///
/// This produces a valid (though not necessarily optimal) stage assignment
/// that guarantees no two conflicting systems share a stage.
#[must_use]
pub fn compute_stages(systems: &[SystemAccess]) -> Vec<Stage> {
    let mut stages: Vec<Stage> = Vec::new();

    for (sys_idx, system) in systems.iter().enumerate() {
        let free_stage = stages.iter_mut().find(|stage| {
            !stage
                .system_indices
                .iter()
                .any(|&existing_idx| system.access.conflicts_with(&systems[existing_idx].access))
        });

        match free_stage {
            Some(stage) => stage.system_indices.push(sys_idx),
            None => stages.push(Stage {
                system_indices: vec![sys_idx],
            }),
        }
    }

    stages
}
