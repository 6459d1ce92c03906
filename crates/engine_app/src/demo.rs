//! Demo simulation: point masses drifting and falling.

use anyhow::Result;
use engine_ecs::{
    AnyComponent, Component, EcsError, EntityId, Query1, Query3, QueryAccess, QueryOptions, With,
    World,
};
use glam::Vec3;
use tracing::info;

use crate::config::DemoConfig;
use crate::system::System;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position(pub Vec3);
impl Component for Position {}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity(pub Vec3);
impl Component for Velocity {}

/// Constant acceleration. Entities without it move in straight lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gravity(pub Vec3);
impl Component for Gravity {}

impl Default for Gravity {
    fn default() -> Self {
        Self(Vec3::new(0.0, -9.81, 0.0))
    }
}

/// Marks a simulated body. Bodies always start at the origin: the position
/// comes along as a required component and cannot be given explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Body;

impl Component for Body {
    fn required_components(&self) -> Vec<Box<dyn AnyComponent>> {
        vec![Box::new(Position::default())]
    }
}

/// Spawns the configured number of bodies.
pub fn populate(world: &mut World, config: &DemoConfig) -> Result<Vec<EntityId>> {
    let mut entities = Vec::with_capacity(config.movers);
    for i in 0..config.movers {
        let offset = i as f32;
        let velocity = Velocity(Vec3::new(1.0, 0.5 * offset.sin(), 0.0));
        let entity = if config.gravity_every > 0 && i % config.gravity_every == 0 {
            world.spawn((Body, velocity, Gravity::default()))?
        } else {
            world.spawn((Body, velocity))?
        };
        entities.push(entity);
    }
    info!(count = entities.len(), "spawned bodies");
    Ok(entities)
}

/// Integrates velocity (with optional gravity) and position.
#[derive(Debug)]
pub struct MovementSystem {
    dt: f32,
    query: Query3<Position, Velocity, Gravity>,
}

impl MovementSystem {
    #[must_use]
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            query: Query3::new(
                QueryOptions::new()
                    .optional::<Gravity>()
                    .read_only::<Gravity>(),
            ),
        }
    }
}

impl System for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn prepare(&mut self, world: &mut World) -> Result<(), EcsError> {
        self.query.prepare(world)
    }

    fn validate(&self) -> Result<(), EcsError> {
        self.query.validate()
    }

    fn access(&self) -> Result<QueryAccess, EcsError> {
        self.query.access()
    }

    fn run(&mut self, world: &mut World) -> Result<()> {
        let dt = self.dt;
        let mut result = self.query.exec(world)?;
        result.try_for_each(|_, position, velocity, gravity| {
            if let (Some(position), Some(velocity)) = (position, velocity) {
                if let Some(gravity) = gravity {
                    velocity.0 += gravity.0 * dt;
                }
                position.0 += velocity.0 * dt;
            }
            Ok(())
        })
    }
}

/// Summary of all body positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub bodies: usize,
    pub centroid: Vec3,
    pub lowest: f32,
}

/// Logs where the bodies are. Lazy: runs only when asked to.
#[derive(Debug)]
pub struct ReportSystem {
    query: Query1<Position>,
    last: Option<Report>,
}

impl ReportSystem {
    #[must_use]
    pub fn new() -> Self {
        Self {
            query: Query1::new(
                QueryOptions::new()
                    .filter(With::<Body>::new())
                    .all_read_only()
                    .lazy(),
            ),
            last: None,
        }
    }
}

impl Default for ReportSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ReportSystem {
    fn name(&self) -> &str {
        "report"
    }

    fn prepare(&mut self, world: &mut World) -> Result<(), EcsError> {
        self.query.prepare(world)
    }

    fn validate(&self) -> Result<(), EcsError> {
        self.query.validate()
    }

    fn access(&self) -> Result<QueryAccess, EcsError> {
        self.query.access()
    }

    fn is_lazy(&self) -> bool {
        self.query.is_lazy()
    }

    fn run(&mut self, world: &mut World) -> Result<()> {
        let result = self.query.exec_shared(world)?;
        let positions: Vec<Vec3> = result
            .iter()
            .filter_map(|(_, position)| position.map(|p| p.0))
            .collect();

        let report = Report {
            bodies: positions.len(),
            centroid: if positions.is_empty() {
                Vec3::ZERO
            } else {
                positions.iter().copied().sum::<Vec3>() / positions.len() as f32
            },
            lowest: positions.iter().map(|p| p.y).fold(f32::INFINITY, f32::min),
        };
        info!(
            bodies = report.bodies,
            centroid = ?report.centroid,
            lowest = report.lowest,
            "body report"
        );
        self.last = Some(report);
        Ok(())
    }
}
