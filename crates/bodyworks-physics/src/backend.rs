//! Backend seam between the plugin and a concrete engine.
//!
//! [`NativeBackend`](crate::native::NativeBackend) and
//! [`RapierBackend`](crate::rapier::RapierBackend) implement
//! [`PhysicsBackend`] and are handed to
//! [`BodyworksPhysicsPlugin::new`](super::BodyworksPhysicsPlugin::new).

use bevy::prelude::*;

use bodyworks_core::{EngineKind, PhysicsConfig};

use crate::engine::PhysicsEngine;
use crate::native::NativeBackend;
use crate::rapier::RapierBackend;
use crate::simulation::Simulation;
use crate::systems::step_simulation;

/// Trait that concrete physics backends must implement.
///
/// The backend is responsible for:
/// - Inserting its [`Simulation`] resource, built from the app's
///   [`PhysicsConfig`] resource (or the default configuration)
/// - Registering [`step_simulation`] on `FixedUpdate`
pub trait PhysicsBackend: Send + Sync + 'static {
    /// Called once during plugin build.
    fn build(&self, app: &mut App);

    /// Human-readable engine name (e.g., "rapier3d").
    fn name(&self) -> &str;
}

/// Backend matching `kind`.
pub fn backend_for(kind: EngineKind) -> Box<dyn PhysicsBackend> {
    match kind {
        EngineKind::Native => Box::new(NativeBackend),
        EngineKind::Rapier => Box::new(RapierBackend),
    }
}

/// Shared setup: insert `Simulation<E>` and its step system.
pub(crate) fn install_simulation<E: PhysicsEngine>(app: &mut App, backend: &str) {
    let config = app
        .world()
        .get_resource::<PhysicsConfig>()
        .cloned()
        .unwrap_or_default();
    let step_size = config.step_size;

    match Simulation::<E>::new(config) {
        Ok(sim) => {
            app.insert_resource(sim);
            app.insert_resource(Time::<Fixed>::from_seconds(step_size));
            app.add_systems(FixedUpdate, step_simulation::<E>);
            tracing::debug!(backend, step_size, "physics backend installed");
        }
        Err(err) => {
            tracing::error!(%err, backend, "invalid physics configuration, backend not installed");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
