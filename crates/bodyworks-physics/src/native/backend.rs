//! [`NativeBackend`]: Bevy wiring for the native engine.

use bevy::prelude::*;

use crate::backend::{PhysicsBackend, install_simulation};

use super::NativeEngine;

/// Inserts a `Simulation<NativeEngine>` and steps it on `FixedUpdate`.
pub struct NativeBackend;

impl PhysicsBackend for NativeBackend {
    fn build(&self, app: &mut App) {
        install_simulation::<NativeEngine>(app, self.name());
    }

    fn name(&self) -> &str {
        "native"
    }
}
