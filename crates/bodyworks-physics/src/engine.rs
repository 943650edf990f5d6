//! Physics engine context trait.
//!
//! A context owns one backend's world (created by [`PhysicsEngine::init`],
//! destroyed by [`PhysicsEngine::fini`]), the global solver parameters, and
//! the [`GeomSet`]. It is constructed explicitly and handed to every body
//! operation; there is no process-wide instance.

use bevy::prelude::Entity;
use nalgebra::Vector3;

use bodyworks_core::{BackendError, PhysicsConfig};

use crate::body::{Body, BodyKey};
use crate::geom::GeomSet;

/// Pose computed by the engine for one body during a step.
///
/// Produced by the engine's move notification (native) or motion-state bridge
/// (rapier) and delivered to the body after the step returns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseRefresh {
    pub body: BodyKey,
    pub pose: nalgebra::Isometry3<f64>,
}

/// Trait that concrete physics engine contexts implement.
pub trait PhysicsEngine: Send + Sync + 'static {
    /// Body type realised on this engine.
    type Body: Body<Engine = Self>;

    /// Build an uninitialised context from global parameters.
    fn from_config(config: &PhysicsConfig) -> Self
    where
        Self: Sized;

    /// Human-readable engine name (e.g., "rapier3d").
    fn name(&self) -> &'static str;

    /// Create the native world. No-op if it already exists.
    fn init(&mut self);

    /// Destroy the native world and every handle in it. Idempotent.
    fn fini(&mut self);

    fn is_initialized(&self) -> bool;

    /// Incremented on every `init`. Handles created under an older epoch are
    /// stale.
    fn epoch(&self) -> u64;

    fn gravity(&self) -> Vector3<f64>;
    fn set_gravity(&mut self, gravity: Vector3<f64>);

    /// Fixed step size in seconds.
    fn step_size(&self) -> f64;

    /// Advance the world by one fixed step.
    fn step(&mut self) -> Result<(), BackendError>;

    /// Take the pose refreshes produced by the last step(s).
    fn drain_pose_refreshes(&mut self) -> Vec<PoseRefresh>;

    fn geoms(&self) -> &GeomSet;
    fn geoms_mut(&mut self) -> &mut GeomSet;

    /// Construct an unloaded body for this engine.
    fn create_body(&self, parent: Entity, key: BodyKey) -> Self::Body;
}
