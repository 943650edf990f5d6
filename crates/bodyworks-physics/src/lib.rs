// bodyworks-physics: Backend-neutral rigid bodies over interchangeable engines.
//
// A `Body` owns the engine-independent state (pose, velocities, mass, attached
// geoms) and realises it on a `PhysicsEngine`: the in-crate native world or
// rapier3d. `Simulation` keys bodies and drives stepping; the plugin wires a
// simulation into a Bevy app.

pub mod backend;
pub mod body;
pub mod components;
pub mod convert;
pub mod engine;
pub mod geom;
pub mod native;
pub mod plugin;
pub mod rapier;
pub mod simulation;
pub mod systems;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        backend::PhysicsBackend,
        body::{Body, BodyKey},
        components::{BodyLink, BodyPose},
        engine::{PhysicsEngine, PoseRefresh},
        geom::{Geom, GeomId, GeomSet, Shape},
        native::{NativeBackend, NativeBody, NativeEngine},
        plugin::BodyworksPhysicsPlugin,
        rapier::{RapierBackend, RapierBody, RapierEngine},
        simulation::{AnySimulation, Simulation},
    };
    pub use bodyworks_core::{BodyConfig, EngineKind, PhysicsConfig};
}

// Re-export the plugin at crate root for convenience.
pub use plugin::BodyworksPhysicsPlugin;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
