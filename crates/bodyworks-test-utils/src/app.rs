//! Bevy test app builders.

use bevy::prelude::*;
use bodyworks_core::PhysicsConfig;
use bodyworks_physics::BodyworksPhysicsPlugin;

/// App with the physics plugin built from `config`.
///
/// Tests drive stepping with `app.world_mut().run_schedule(FixedUpdate)`.
pub fn physics_test_app(config: PhysicsConfig) -> App {
    let mut app = App::new();
    app.add_plugins(BodyworksPhysicsPlugin::from_config(config));
    app.finish();
    app.cleanup();
    app
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
