//! Native backend.
//!
//! Runs bodies on the in-crate [`NativeWorld`]: ODE-style array math,
//! body-frame angular quantities, per-body collision spaces and move
//! notifications collected during the step.

pub mod backend;
pub mod body;
pub mod world;

use bevy::prelude::Entity;
use nalgebra::Vector3;

use bodyworks_core::{BackendError, PhysicsConfig};

use crate::body::BodyKey;
use crate::convert::native::{from_native_vector, to_native_vector};
use crate::convert::vector_from_array;
use crate::engine::{PhysicsEngine, PoseRefresh};
use crate::geom::{GeomId, GeomSet};

pub use backend::NativeBackend;
pub use body::NativeBody;
pub use world::{NativeBodyId, NativeRigidBody, NativeSpace, NativeWorld, SpaceId};

/// Engine context for the native backend.
pub struct NativeEngine {
    config: PhysicsConfig,
    gravity: Vector3<f64>,
    world: Option<NativeWorld>,
    geoms: GeomSet,
    epoch: u64,
}

impl NativeEngine {
    pub fn world(&self) -> Option<&NativeWorld> {
        self.world.as_ref()
    }

    pub fn world_mut(&mut self) -> Option<&mut NativeWorld> {
        self.world.as_mut()
    }

    /// World and geom set borrowed together.
    pub(crate) fn parts_mut(&mut self) -> (Option<&mut NativeWorld>, &mut GeomSet) {
        (self.world.as_mut(), &mut self.geoms)
    }

    /// Broad-phase candidate geom pairs at the current poses.
    pub fn candidate_pairs(&self) -> Vec<(GeomId, GeomId)> {
        self.world
            .as_ref()
            .map(|w| w.candidate_pairs(&self.geoms))
            .unwrap_or_default()
    }
}

impl PhysicsEngine for NativeEngine {
    type Body = NativeBody;

    fn from_config(config: &PhysicsConfig) -> Self {
        Self {
            config: config.clone(),
            gravity: vector_from_array(config.gravity),
            world: None,
            geoms: GeomSet::new(),
            epoch: 0,
        }
    }

    fn name(&self) -> &'static str {
        "native"
    }

    fn init(&mut self) {
        if self.world.is_some() {
            return;
        }
        self.world = Some(NativeWorld::new(
            to_native_vector(&self.gravity),
            self.config.auto_disable,
        ));
        self.epoch += 1;
        tracing::debug!(engine = "native", epoch = self.epoch, "context initialised");
    }

    fn fini(&mut self) {
        if let Some(world) = self.world.take() {
            tracing::debug!(
                engine = "native",
                epoch = self.epoch,
                bodies = world.body_count(),
                "context finalised"
            );
        }
    }

    fn is_initialized(&self) -> bool {
        self.world.is_some()
    }

    fn epoch(&self) -> u64 {
        self.epoch
    }

    fn gravity(&self) -> Vector3<f64> {
        self.world
            .as_ref()
            .map_or(self.gravity, |w| from_native_vector(&w.gravity()))
    }

    fn set_gravity(&mut self, gravity: Vector3<f64>) {
        self.gravity = gravity;
        if let Some(world) = self.world.as_mut() {
            world.set_gravity(to_native_vector(&gravity));
        }
    }

    fn step_size(&self) -> f64 {
        self.config.step_size
    }

    fn step(&mut self) -> Result<(), BackendError> {
        let world = self
            .world
            .as_mut()
            .ok_or(BackendError::ContextUninitialized)?;
        world.step(self.config.step_size);
        Ok(())
    }

    fn drain_pose_refreshes(&mut self) -> Vec<PoseRefresh> {
        self.world
            .as_mut()
            .map(NativeWorld::take_moved)
            .unwrap_or_default()
    }

    fn geoms(&self) -> &GeomSet {
        &self.geoms
    }

    fn geoms_mut(&mut self) -> &mut GeomSet {
        &mut self.geoms
    }

    fn create_body(&self, parent: Entity, key: BodyKey) -> NativeBody {
        NativeBody::new(key, parent)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
