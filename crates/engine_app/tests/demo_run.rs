//! Runs the demo simulation through the tick loop.

use engine_app::config::{AppConfig, DemoConfig, TickConfig};
use engine_app::demo::{self, Gravity, MovementSystem, Position, ReportSystem};
use engine_app::tick::TickLoop;
use engine_ecs::{World, WorldConfig};
use glam::Vec3;

fn demo_loop(movers: usize, gravity_every: usize, max_ticks: u64) -> TickLoop {
    let config = AppConfig {
        tick: TickConfig {
            tick_rate: 1000.0,
            max_ticks,
        },
        demo: DemoConfig {
            movers,
            gravity_every,
        },
        ..AppConfig::default()
    };
    let world = World::new(WorldConfig::from(config.world.clone())).unwrap();
    let mut tick_loop = TickLoop::new(config.tick.clone(), world);
    demo::populate(tick_loop.world_mut(), &config.demo).unwrap();
    tick_loop
        .add_system(MovementSystem::new(config.tick.dt() as f32))
        .unwrap();
    tick_loop.add_system(ReportSystem::new()).unwrap();
    tick_loop
}

#[test]
fn report_is_lazy_and_movement_scheduled() {
    let mut tick_loop = demo_loop(4, 2, 1);
    // Only the movement system is scheduled.
    let stages = tick_loop.stages().unwrap();
    assert_eq!(stages.len(), 1);
    assert_eq!(stages[0].system_indices, vec![0]);
}

#[test]
fn bodies_move_and_fall() {
    let mut tick_loop = demo_loop(6, 6, 10);
    tick_loop.run().unwrap();
    tick_loop.run_system("report").unwrap();
    assert_eq!(tick_loop.tick_id(), 10);

    let world = tick_loop.world();
    let entities: Vec<_> = world.entity_ids().collect();
    assert_eq!(entities.len(), 6);
    for entity in entities {
        let position = world.get::<Position>(entity).unwrap().0;
        assert!(position.x > 0.0, "every body drifts along +x");
        if world.has_component::<Gravity>(entity) {
            assert!(position.y < 0.0, "bodies with gravity fall");
        }
    }
}

#[test]
fn world_capacity_comes_from_config() {
    let config = AppConfig::from_json(
        r#"{ "world": { "strategy": "per_type", "default": 1, "overrides": { "Position": 256 } } }"#,
    )
    .unwrap();
    let mut world = World::new(WorldConfig::from(config.world)).unwrap();
    world.spawn((Position(Vec3::ONE),)).unwrap();

    assert!(world.registry::<Position>().unwrap().capacity() >= 256);
}
