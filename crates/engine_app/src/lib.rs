//! # engine_app
//!
//! The application layer around [`engine_ecs`]: systems, a conflict-aware
//! stage scheduler, a fixed-timestep tick loop, and JSON configuration.
//!
//! - [`system::System`]: a unit of work owning prepared queries.
//! - [`scheduler::compute_stages`]: groups systems whose query access does
//!   not conflict.
//! - [`tick::TickLoop`]: owns the world and runs stages every tick.
//! - [`config::AppConfig`]: tick, world, and demo settings.
//! - [`demo`]: the bodies simulation run by the binary.

pub mod config;
pub mod demo;
pub mod scheduler;
pub mod system;
pub mod tick;
