//! Integration test: the plugin steps the simulation inside a Bevy app and
//! mirrors body poses onto their parent entities.

use bevy::prelude::*;

use bodyworks_core::{EngineKind, PhysicsConfig};
use bodyworks_physics::body::Body;
use bodyworks_physics::components::{BodyLink, BodyPose};
use bodyworks_physics::engine::PhysicsEngine;
use bodyworks_physics::native::NativeEngine;
use bodyworks_physics::rapier::RapierEngine;
use bodyworks_physics::simulation::Simulation;
use bodyworks_test_utils::{falling_body_config, physics_test_app};

fn falling_entity_pose<E: PhysicsEngine>(engine: EngineKind) {
    let mut app = physics_test_app(PhysicsConfig::for_engine(engine));

    let entity = app.world_mut().spawn(BodyPose::default()).id();
    let key = app
        .world_mut()
        .resource_mut::<Simulation<E>>()
        .spawn_body(entity, &falling_body_config(3.0), &[])
        .unwrap();
    app.world_mut().entity_mut(entity).insert(BodyLink(key));

    for _ in 0..100 {
        app.world_mut().run_schedule(FixedUpdate);
    }

    let sim = app.world().resource::<Simulation<E>>();
    assert_eq!(sim.steps(), 100);
    let pose = app.world().get::<BodyPose>(entity).unwrap();
    assert!(pose.0.translation.z < 3.0);
    assert_eq!(pose.0, sim.world_pose(key).unwrap());
    assert_eq!(sim.body(key).map(Body::parent), Some(entity));
}

#[test]
fn native_plugin_mirrors_body_pose() {
    falling_entity_pose::<NativeEngine>(EngineKind::Native);
}

#[test]
fn rapier_plugin_mirrors_body_pose() {
    falling_entity_pose::<RapierEngine>(EngineKind::Rapier);
}

#[test]
fn removed_body_leaves_last_pose() {
    let mut app = physics_test_app(PhysicsConfig::default());
    let entity = app.world_mut().spawn(BodyPose::default()).id();
    let key = app
        .world_mut()
        .resource_mut::<Simulation<NativeEngine>>()
        .spawn_body(entity, &falling_body_config(1.0), &[])
        .unwrap();
    app.world_mut().entity_mut(entity).insert(BodyLink(key));

    app.world_mut().run_schedule(FixedUpdate);
    let before = app.world().get::<BodyPose>(entity).unwrap().0;

    app.world_mut()
        .resource_mut::<Simulation<NativeEngine>>()
        .remove_body(key)
        .unwrap();
    app.world_mut().run_schedule(FixedUpdate);
    assert_eq!(app.world().get::<BodyPose>(entity).unwrap().0, before);
}
