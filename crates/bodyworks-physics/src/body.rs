//! The backend-neutral body contract.
//!
//! [`Body`] is implemented once per backend. Every implementation keeps a
//! [`BodyState`], the backend-neutral cache of pose, flags and mass, and an
//! exclusively owned native handle created in [`Body::init`] and released in
//! [`Body::fini`].
//!
//! # Who writes `pose`
//!
//! During an engine step the only writer is [`Body::on_pose_refresh`], fed
//! from the engine's pose-refresh queue. Between steps the only writer is the
//! simulator, through [`Body::set_world_pose`], which pushes the new pose into
//! the backend synchronously via [`Body::on_pose_change`].

use bevy::prelude::Entity;
use nalgebra::{Isometry3, Matrix3, Vector3};
use slotmap::new_key_type;

use bodyworks_core::{BackendError, BodyConfig, BodyError, ConfigError, UnsupportedOperation};

use crate::convert::{FlatPose, inertia_from_upper, pose_from_flat, vector_from_array};
use crate::engine::PhysicsEngine;
use crate::geom::{GeomId, GeomSet, aggregate_mass_properties};

new_key_type! {
    /// Key of a body inside a simulation.
    pub struct BodyKey;
}

// ---------------------------------------------------------------------------
// BodyState
// ---------------------------------------------------------------------------

/// Backend-neutral state shared by every body implementation.
///
/// Holds no backend math types. Before `init` the velocity and wrench fields
/// hold values to be pushed into the native handle; afterwards they mirror
/// the last value read from or written to it.
#[derive(Debug, Clone)]
pub struct BodyState {
    pub key: BodyKey,
    pub parent: Entity,
    pub name: String,
    pub loaded: bool,

    pub pose: Isometry3<f64>,
    pub linear_vel: Vector3<f64>,
    pub angular_vel: Vector3<f64>,
    pub applied_force: Vector3<f64>,
    pub applied_torque: Vector3<f64>,

    pub mass: f64,
    /// Inertia from the body description, if it gave one.
    pub configured_inertia: Option<Matrix3<f64>>,
    pub configured_com: Vector3<f64>,
    /// Effective centre of mass in the body frame.
    pub center_of_mass: Vector3<f64>,
    /// Effective inertia about the centre of mass.
    pub inertia: Matrix3<f64>,

    pub enabled: bool,
    pub gravity_mode: bool,
    pub kinematic: bool,
    pub self_collide: bool,
    pub linear_damping: f64,
    pub angular_damping: f64,

    /// Attached geoms in attachment order, without duplicates.
    pub geoms: Vec<GeomId>,
}

impl BodyState {
    pub fn new(key: BodyKey, parent: Entity) -> Self {
        Self {
            key,
            parent,
            name: String::new(),
            loaded: false,
            pose: Isometry3::identity(),
            linear_vel: Vector3::zeros(),
            angular_vel: Vector3::zeros(),
            applied_force: Vector3::zeros(),
            applied_torque: Vector3::zeros(),
            mass: 1.0,
            configured_inertia: None,
            configured_com: Vector3::zeros(),
            center_of_mass: Vector3::zeros(),
            inertia: Matrix3::identity(),
            enabled: true,
            gravity_mode: true,
            kinematic: false,
            self_collide: false,
            linear_damping: 0.0,
            angular_damping: 0.0,
            geoms: Vec::new(),
        }
    }

    /// Validate `config` and copy it in. Nothing is modified on error.
    pub fn apply_config(&mut self, config: &BodyConfig) -> Result<(), ConfigError> {
        config.validate()?;

        self.name.clone_from(&config.name);
        self.pose = pose_from_flat(&FlatPose {
            position: config.position,
            orientation: config.orientation,
        });
        self.linear_vel = vector_from_array(config.linear_velocity);
        self.angular_vel = vector_from_array(config.angular_velocity);
        self.mass = config.mass;
        self.configured_inertia = config.inertia.map(inertia_from_upper);
        self.configured_com = vector_from_array(config.center_of_mass);
        self.center_of_mass = self.configured_com;
        self.inertia = self.configured_inertia.unwrap_or_else(Matrix3::identity);
        self.enabled = config.enabled;
        self.gravity_mode = config.gravity;
        self.kinematic = config.kinematic;
        self.self_collide = config.self_collide;
        self.linear_damping = config.linear_damping;
        self.angular_damping = config.angular_damping;
        self.loaded = true;
        Ok(())
    }

    /// Recompute centre of mass and inertia.
    ///
    /// A configured inertia wins; otherwise the mass is spread over the
    /// attached geoms. With neither, a unit inertia at the configured centre
    /// of mass is used.
    pub fn recompute_mass(&mut self, geoms: &GeomSet) {
        if let Some(inertia) = self.configured_inertia {
            self.center_of_mass = self.configured_com;
            self.inertia = inertia;
            return;
        }
        match aggregate_mass_properties(geoms, &self.geoms, self.mass) {
            Some(agg) => {
                self.center_of_mass = agg.center_of_mass;
                self.inertia = agg.inertia;
            }
            None => {
                self.center_of_mass = self.configured_com;
                self.inertia = Matrix3::identity();
            }
        }
    }

    /// Notify every attached geom of the current pose.
    pub fn propagate_pose(&self, geoms: &mut GeomSet) {
        for id in &self.geoms {
            if let Some(geom) = geoms.get_mut(*id) {
                geom.on_pose_change(&self.pose);
            }
        }
    }

    /// Record `id` as attached. Returns `Ok(false)` if it already was.
    pub fn attach(&mut self, id: GeomId, geoms: &mut GeomSet) -> Result<bool, BackendError> {
        let added = geoms.claim(id, self.key)?;
        if added {
            self.geoms.push(id);
        }
        Ok(added)
    }

    /// Forget `id`. Returns `false` if it was not attached.
    pub fn detach(&mut self, id: GeomId, geoms: &mut GeomSet) -> bool {
        let Some(pos) = self.geoms.iter().position(|g| *g == id) else {
            return false;
        };
        self.geoms.remove(pos);
        geoms.release(id, self.key);
        true
    }

    /// Release every attached geom, leaving them in the set.
    pub fn detach_all(&mut self, geoms: &mut GeomSet) {
        for id in self.geoms.drain(..) {
            geoms.release(id, self.key);
        }
    }
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// One rigid body, realised on a specific backend.
///
/// World-frame values cross this interface; conversion to the backend's own
/// frame and layout happens inside each implementation. Operations on a body
/// that is not initialised (never `init`ed, `fini`ed, or holding a handle from
/// a previous engine epoch) update the cached [`BodyState`] and are pushed to
/// the backend at the next `init`.
///
/// Setting velocity, force or torque on a disabled body re-enables it on
/// every backend. Force and torque set on a kinematic body are cached (and
/// readable) but never integrated.
pub trait Body: Send + Sync + 'static {
    type Engine: PhysicsEngine<Body = Self>;

    fn state(&self) -> &BodyState;
    fn state_mut(&mut self) -> &mut BodyState;

    fn key(&self) -> BodyKey {
        self.state().key
    }

    fn parent(&self) -> Entity {
        self.state().parent
    }

    fn name(&self) -> &str {
        &self.state().name
    }

    // -- Lifecycle --

    /// Read mass, inertia, damping, initial pose and flags.
    fn load(&mut self, config: &BodyConfig) -> Result<(), ConfigError> {
        self.state_mut().apply_config(config)
    }

    /// Create the native handle inside `engine`.
    fn init(&mut self, engine: &mut Self::Engine) -> Result<(), BackendError>;

    /// Release the native handle. Idempotent.
    fn fini(&mut self, engine: &mut Self::Engine);

    /// Whether this body holds a live handle in `engine`'s current world.
    fn is_initialized(&self, engine: &Self::Engine) -> bool;

    /// Per-step tick: pull velocity from the backend, clear the force and
    /// torque accumulators and reposition attached geoms at the pose the
    /// step delivered through [`Body::on_pose_refresh`].
    fn update(&mut self, engine: &mut Self::Engine);

    /// Detach from the engine and release all geoms ahead of deletion or an
    /// engine switch. Safe after `fini`.
    fn remove_from_physics(&mut self, engine: &mut Self::Engine) {
        self.fini(engine);
        let state = self.state_mut();
        state.detach_all(engine.geoms_mut());
        tracing::debug!(body = %state.name, "removed from physics");
    }

    // -- Geoms --

    /// Attach a geom. Attaching a geom twice is a no-op.
    fn attach_geom(&mut self, engine: &mut Self::Engine, geom: GeomId) -> Result<(), BackendError>;

    /// Detach a geom. Detaching a geom that is not attached is a no-op.
    fn detach_geom(&mut self, engine: &mut Self::Engine, geom: GeomId);

    /// Move an attached geom within the body frame.
    fn set_geom_relative_pose(
        &mut self,
        engine: &mut Self::Engine,
        geom: GeomId,
        pose: Isometry3<f64>,
    ) -> Result<(), BackendError> {
        if !self.state().geoms.contains(&geom) {
            return Err(BackendError::UnknownGeom(format!("{geom:?}")));
        }
        if let Some(g) = engine.geoms_mut().get_mut(geom) {
            g.relative_pose = pose;
            g.on_pose_change(&self.state().pose);
        }
        self.update_com(engine);
        Ok(())
    }

    /// Attached geoms in attachment order.
    fn geoms(&self) -> &[GeomId] {
        &self.state().geoms
    }

    /// Recompute the aggregate centre of mass and inertia and push it to the
    /// backend.
    fn update_com(&mut self, engine: &mut Self::Engine);

    // -- Pose --

    fn world_pose(&self) -> Isometry3<f64> {
        self.state().pose
    }

    /// Simulator-side pose edit (teleport). Must happen between steps.
    fn set_world_pose(&mut self, engine: &mut Self::Engine, pose: Isometry3<f64>) {
        self.state_mut().pose = pose;
        self.on_pose_change(engine);
    }

    /// Push the cached pose into the backend and reposition geoms.
    fn on_pose_change(&mut self, engine: &mut Self::Engine);

    /// Pose computed by the engine during a step. Never calls back into the
    /// backend.
    fn on_pose_refresh(&mut self, engine: &mut Self::Engine, pose: Isometry3<f64>) {
        let state = self.state_mut();
        state.pose = pose;
        state.propagate_pose(engine.geoms_mut());
    }

    // -- Activity --

    fn set_enabled(&mut self, engine: &mut Self::Engine, enabled: bool);
    fn enabled(&self, engine: &Self::Engine) -> bool;

    fn set_kinematic(&mut self, engine: &mut Self::Engine, kinematic: bool);

    fn kinematic(&self) -> bool {
        self.state().kinematic
    }

    fn set_gravity_mode(&mut self, engine: &mut Self::Engine, mode: bool);

    fn gravity_mode(&self) -> bool {
        self.state().gravity_mode
    }

    fn set_self_collide(
        &mut self,
        engine: &mut Self::Engine,
        collide: bool,
    ) -> Result<(), UnsupportedOperation>;

    fn self_collide(&self) -> bool {
        self.state().self_collide
    }

    // -- Velocity and wrench (world frame) --

    fn set_linear_vel(&mut self, engine: &mut Self::Engine, vel: Vector3<f64>);
    fn set_angular_vel(&mut self, engine: &mut Self::Engine, vel: Vector3<f64>);
    fn set_force(&mut self, engine: &mut Self::Engine, force: Vector3<f64>);
    fn set_torque(&mut self, engine: &mut Self::Engine, torque: Vector3<f64>);

    fn world_linear_vel(&self, engine: &Self::Engine) -> Vector3<f64>;
    fn world_angular_vel(&self, engine: &Self::Engine) -> Vector3<f64>;
    fn world_force(&self, engine: &Self::Engine) -> Vector3<f64>;
    fn world_torque(&self, engine: &Self::Engine) -> Vector3<f64>;

    // -- Damping and contact parameters --

    fn set_linear_damping(&mut self, engine: &mut Self::Engine, damping: f64)
    -> Result<(), BodyError>;
    fn set_angular_damping(
        &mut self,
        engine: &mut Self::Engine,
        damping: f64,
    ) -> Result<(), BodyError>;

    fn linear_damping(&self) -> f64 {
        self.state().linear_damping
    }

    fn angular_damping(&self) -> f64 {
        self.state().angular_damping
    }

    /// Maximum correcting velocity for contacts on this body.
    fn set_max_vel(&mut self, engine: &mut Self::Engine, max_vel: f64)
    -> Result<(), UnsupportedOperation>;

    /// Contact depth allowed before correction kicks in.
    fn set_min_depth(
        &mut self,
        engine: &mut Self::Engine,
        min_depth: f64,
    ) -> Result<(), UnsupportedOperation>;

    // -- Mass --

    fn mass(&self) -> f64 {
        self.state().mass
    }

    fn center_of_mass(&self) -> Vector3<f64> {
        self.state().center_of_mass
    }
}

/// Shared damping validation for the setters.
pub(crate) fn check_damping(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite(field));
    }
    if value < 0.0 {
        return Err(ConfigError::NegativeDamping { field, value });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
