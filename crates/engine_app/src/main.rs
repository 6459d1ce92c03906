//! # engine_app binary
//!
//! Drives an ECS [`World`] with a fixed-timestep tick loop. Systems declare
//! their component access through prepared queries; the loop groups them into
//! conflict-free stages and runs the stages in order every tick.
//!
//! ## Startup Sequence
//!
//! 1. Load the JSON config given with `--config`, or use defaults.
//! 2. Build the world with the configured capacity strategy.
//! 3. Spawn the demo bodies and register the systems.
//! 4. Enter the tick loop; print a final report when it ends.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use engine_app::config::AppConfig;
use engine_app::demo::{self, MovementSystem, ReportSystem};
use engine_app::tick::TickLoop;
use engine_ecs::{World, WorldConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "engine_app", about = "Fixed-timestep ECS demo simulation")]
struct Args {
    /// Path to a JSON config file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let args = Args::parse();
    info!("engine starting");

    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    info!(?config, "loaded configuration");

    let world = World::new(WorldConfig::from(config.world.clone())).context("failed to create world")?;
    let mut tick_loop = TickLoop::new(config.tick.clone(), world);

    demo::populate(tick_loop.world_mut(), &config.demo)?;
    tick_loop.add_system(MovementSystem::new(config.tick.dt() as f32))?;
    tick_loop.add_system(ReportSystem::new())?;
    info!(stages = tick_loop.stages()?.len(), "systems scheduled");

    tick_loop.run()?;
    tick_loop.run_system("report")?;

    info!(
        ticks = tick_loop.tick_id(),
        entities = tick_loop.world().count_entities(),
        "engine shut down"
    );
    Ok(())
}
