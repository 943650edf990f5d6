//! [`RapierBackend`]: Bevy wiring for the rapier engine.

use bevy::prelude::*;

use crate::backend::{PhysicsBackend, install_simulation};

use super::context::RapierEngine;

/// Raw rapier3d physics backend.
///
/// Inserts a `Simulation<RapierEngine>` built from the app's
/// [`PhysicsConfig`](bodyworks_core::PhysicsConfig) and steps it on
/// `FixedUpdate`.
pub struct RapierBackend;

impl PhysicsBackend for RapierBackend {
    fn build(&self, app: &mut App) {
        install_simulation::<RapierEngine>(app, self.name());
    }

    fn name(&self) -> &str {
        "rapier3d"
    }
}
