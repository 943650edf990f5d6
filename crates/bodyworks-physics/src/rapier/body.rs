//! [`RapierBody`]: the body contract on a rapier world.
//!
//! Each live body owns one rapier rigid body, at most one (possibly
//! compound) collider, and a motion-state bridge registered with the
//! context. Velocities cross the seam in the world frame on both sides.
//! Rapier has no per-body contact correction limits and never collides
//! colliders of the same rigid body, so those operations are reported as
//! unsupported.

use bevy::prelude::Entity;
use nalgebra::Vector3;
use rapier3d::math::{Point, Real};
use rapier3d::prelude::{
    ColliderHandle, MassProperties, RigidBody, RigidBodyBuilder, RigidBodyHandle, RigidBodyType,
};
use slotmap::Key;

use bodyworks_core::{BackendError, BodyError, UnsupportedOperation};

use crate::body::{Body, BodyKey, BodyState, check_damping};
use crate::convert::rapier::{
    from_rapier_vector, to_rapier_isometry, to_rapier_matrix, to_rapier_vector,
};
use crate::engine::PhysicsEngine;
use crate::geom::GeomId;

use super::compound::rebuild_collider;
use super::context::RapierEngine;
use super::motion_state::MotionState;

const BACKEND: &str = "rapier3d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RapierHandle {
    body: RigidBodyHandle,
    collider: Option<ColliderHandle>,
    epoch: u64,
}

/// A body realised on a rapier world.
#[derive(Debug)]
pub struct RapierBody {
    state: BodyState,
    handle: Option<RapierHandle>,
}

fn body_type(kinematic: bool) -> RigidBodyType {
    if kinematic {
        RigidBodyType::KinematicVelocityBased
    } else {
        RigidBodyType::Dynamic
    }
}

fn gravity_scale(mode: bool) -> Real {
    if mode { 1.0 } else { 0.0 }
}

#[allow(clippy::cast_possible_truncation)]
fn mass_properties(state: &BodyState) -> MassProperties {
    MassProperties::with_inertia_matrix(
        Point::from(to_rapier_vector(&state.center_of_mass)),
        state.mass as Real,
        to_rapier_matrix(&state.inertia),
    )
}

fn unsupported(name: &str, operation: &'static str) -> UnsupportedOperation {
    tracing::warn!(body = %name, operation, backend = BACKEND, "operation not supported");
    UnsupportedOperation::new(BACKEND, operation)
}

impl RapierBody {
    pub fn new(key: BodyKey, parent: Entity) -> Self {
        Self {
            state: BodyState::new(key, parent),
            handle: None,
        }
    }

    /// Handle of the rapier rigid body, if live.
    pub fn rigid_body_handle(&self, engine: &RapierEngine) -> Option<RigidBodyHandle> {
        self.live(engine).map(|h| h.body)
    }

    /// Handle of the (compound) collider, if live and carrying geoms.
    pub fn collider_handle(&self, engine: &RapierEngine) -> Option<ColliderHandle> {
        self.live(engine).and_then(|h| h.collider)
    }

    fn live(&self, engine: &RapierEngine) -> Option<RapierHandle> {
        self.handle
            .filter(|h| h.epoch == engine.epoch() && engine.is_initialized())
    }

    fn rigid_body<'a>(&self, engine: &'a RapierEngine) -> Option<&'a RigidBody> {
        let handle = self.live(engine)?;
        engine.world()?.rigid_body_set.get(handle.body)
    }

    fn rigid_body_mut<'a>(&self, engine: &'a mut RapierEngine) -> Option<&'a mut RigidBody> {
        let handle = self.live(engine)?;
        engine.world_mut()?.rigid_body_set.get_mut(handle.body)
    }

    fn rebuild_shape(&mut self, engine: &mut RapierEngine) {
        let Some(mut handle) = self.live(engine) else {
            return;
        };
        let (world, geoms) = engine.parts_mut();
        let Some(world) = world else {
            return;
        };
        handle.collider =
            rebuild_collider(world, handle.body, handle.collider, geoms, &self.state.geoms);
        self.handle = Some(handle);
    }
}

#[allow(clippy::cast_possible_truncation)]
impl Body for RapierBody {
    type Engine = RapierEngine;

    fn state(&self) -> &BodyState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BodyState {
        &mut self.state
    }

    // -- Lifecycle --

    fn init(&mut self, engine: &mut RapierEngine) -> Result<(), BackendError> {
        if !self.state.loaded {
            return Err(BackendError::NotLoaded(self.state.name.clone()));
        }
        if self.live(engine).is_some() {
            return Err(BackendError::AlreadyInitialized(self.state.name.clone()));
        }
        if self.handle.take().is_some() {
            tracing::debug!(body = %self.state.name, "dropping handle from a previous world");
        }

        let epoch = engine.epoch();
        let can_sleep = engine.sleeping_allowed();
        let (world, geoms) = engine.parts_mut();
        let world = world.ok_or(BackendError::ContextUninitialized)?;

        self.state.recompute_mass(geoms);
        let s = &self.state;
        let pose = to_rapier_isometry(&s.pose);
        let rb = RigidBodyBuilder::new(body_type(s.kinematic))
            .position(pose)
            .linvel(to_rapier_vector(&s.linear_vel))
            .angvel(to_rapier_vector(&s.angular_vel))
            .gravity_scale(gravity_scale(s.gravity_mode))
            .linear_damping(s.linear_damping as Real)
            .angular_damping(s.angular_damping as Real)
            .can_sleep(can_sleep)
            .additional_mass_properties(mass_properties(s))
            .user_data(u128::from(s.key.data().as_ffi()))
            .build();
        let body = world.rigid_body_set.insert(rb);
        let collider = rebuild_collider(world, body, None, geoms, &s.geoms);

        if let Some(rb) = world.rigid_body_set.get_mut(body) {
            rb.add_force(to_rapier_vector(&s.applied_force), true);
            rb.add_torque(to_rapier_vector(&s.applied_torque), true);
            if !s.enabled {
                rb.sleep();
            }
        }
        world.register_motion_state(body, MotionState::new(s.key, pose));
        self.state.propagate_pose(geoms);

        self.handle = Some(RapierHandle {
            body,
            collider,
            epoch,
        });
        tracing::debug!(body = %self.state.name, backend = BACKEND, epoch, "body initialised");
        Ok(())
    }

    fn fini(&mut self, engine: &mut RapierEngine) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.epoch != engine.epoch() {
            return;
        }
        if let Some(world) = engine.world_mut() {
            if let Some(rb) = world.rigid_body_set.get(handle.body) {
                self.state.linear_vel = from_rapier_vector(rb.linvel());
                self.state.angular_vel = from_rapier_vector(rb.angvel());
                self.state.enabled = !rb.is_sleeping();
            }
            world.unregister_motion_state(handle.body);
            world.remove_body(handle.body);
        }
        tracing::debug!(body = %self.state.name, backend = BACKEND, "body finalised");
    }

    fn is_initialized(&self, engine: &RapierEngine) -> bool {
        self.rigid_body(engine).is_some()
    }

    fn update(&mut self, engine: &mut RapierEngine) {
        if let Some(rb) = self.rigid_body_mut(engine) {
            rb.reset_forces(false);
            rb.reset_torques(false);
            self.state.linear_vel = from_rapier_vector(rb.linvel());
            self.state.angular_vel = from_rapier_vector(rb.angvel());
            self.state.enabled = !rb.is_sleeping();
        }
        self.state.applied_force = Vector3::zeros();
        self.state.applied_torque = Vector3::zeros();
        self.state.propagate_pose(engine.geoms_mut());
    }

    // -- Geoms --

    fn attach_geom(
        &mut self,
        engine: &mut RapierEngine,
        geom: GeomId,
    ) -> Result<(), BackendError> {
        if !self.state.attach(geom, engine.geoms_mut())? {
            return Ok(());
        }
        if let Some(g) = engine.geoms_mut().get_mut(geom) {
            g.on_pose_change(&self.state.pose);
        }
        self.update_com(engine);
        Ok(())
    }

    fn detach_geom(&mut self, engine: &mut RapierEngine, geom: GeomId) {
        if !self.state.detach(geom, engine.geoms_mut()) {
            tracing::warn!(body = %self.state.name, ?geom, "detach of a geom that is not attached");
            return;
        }
        self.update_com(engine);
    }

    fn update_com(&mut self, engine: &mut RapierEngine) {
        self.state.recompute_mass(engine.geoms());
        self.rebuild_shape(engine);
        let props = mass_properties(&self.state);
        if let Some(rb) = self.rigid_body_mut(engine) {
            rb.set_additional_mass_properties(props, true);
        }
    }

    // -- Pose --

    fn on_pose_change(&mut self, engine: &mut RapierEngine) {
        let pose = to_rapier_isometry(&self.state.pose);
        if let Some(handle) = self.live(engine)
            && let Some(world) = engine.world_mut()
        {
            if let Some(rb) = world.rigid_body_set.get_mut(handle.body) {
                rb.set_position(pose, true);
            }
            if let Some(bridge) = world.motion_state_mut(handle.body) {
                bridge.sync(pose);
            }
        }
        self.state.propagate_pose(engine.geoms_mut());
    }

    // -- Activity --

    fn set_enabled(&mut self, engine: &mut RapierEngine, enabled: bool) {
        self.state.enabled = enabled;
        if let Some(rb) = self.rigid_body_mut(engine) {
            if enabled {
                rb.wake_up(true);
            } else {
                rb.sleep();
            }
        }
    }

    fn enabled(&self, engine: &RapierEngine) -> bool {
        self.rigid_body(engine)
            .map_or(self.state.enabled, |rb| !rb.is_sleeping())
    }

    fn set_kinematic(&mut self, engine: &mut RapierEngine, kinematic: bool) {
        self.state.kinematic = kinematic;
        if let Some(rb) = self.rigid_body_mut(engine) {
            rb.set_body_type(body_type(kinematic), true);
        }
    }

    fn set_gravity_mode(&mut self, engine: &mut RapierEngine, mode: bool) {
        self.state.gravity_mode = mode;
        if let Some(rb) = self.rigid_body_mut(engine) {
            rb.set_gravity_scale(gravity_scale(mode), true);
        }
    }

    fn set_self_collide(
        &mut self,
        _engine: &mut RapierEngine,
        collide: bool,
    ) -> Result<(), UnsupportedOperation> {
        if collide {
            return Err(unsupported(&self.state.name, "set_self_collide"));
        }
        self.state.self_collide = false;
        Ok(())
    }

    // -- Velocity and wrench --

    fn set_linear_vel(&mut self, engine: &mut RapierEngine, vel: Vector3<f64>) {
        self.state.linear_vel = vel;
        self.state.enabled = true;
        if let Some(rb) = self.rigid_body_mut(engine) {
            rb.set_linvel(to_rapier_vector(&vel), true);
        }
    }

    fn set_angular_vel(&mut self, engine: &mut RapierEngine, vel: Vector3<f64>) {
        self.state.angular_vel = vel;
        self.state.enabled = true;
        if let Some(rb) = self.rigid_body_mut(engine) {
            rb.set_angvel(to_rapier_vector(&vel), true);
        }
    }

    fn set_force(&mut self, engine: &mut RapierEngine, force: Vector3<f64>) {
        if self.state.kinematic {
            tracing::warn!(body = %self.state.name, "force on a kinematic body is kept but not integrated");
        }
        self.state.applied_force = force;
        self.state.enabled = true;
        if let Some(rb) = self.rigid_body_mut(engine) {
            rb.reset_forces(false);
            rb.add_force(to_rapier_vector(&force), true);
        }
    }

    fn set_torque(&mut self, engine: &mut RapierEngine, torque: Vector3<f64>) {
        if self.state.kinematic {
            tracing::warn!(body = %self.state.name, "torque on a kinematic body is kept but not integrated");
        }
        self.state.applied_torque = torque;
        self.state.enabled = true;
        if let Some(rb) = self.rigid_body_mut(engine) {
            rb.reset_torques(false);
            rb.add_torque(to_rapier_vector(&torque), true);
        }
    }

    fn world_linear_vel(&self, engine: &RapierEngine) -> Vector3<f64> {
        self.rigid_body(engine)
            .map_or(self.state.linear_vel, |rb| from_rapier_vector(rb.linvel()))
    }

    fn world_angular_vel(&self, engine: &RapierEngine) -> Vector3<f64> {
        self.rigid_body(engine)
            .map_or(self.state.angular_vel, |rb| from_rapier_vector(rb.angvel()))
    }

    /// Rapier's user force accumulator. Rapier drops forces on kinematic
    /// bodies, so those read back from the cache.
    fn world_force(&self, engine: &RapierEngine) -> Vector3<f64> {
        if self.state.kinematic {
            return self.state.applied_force;
        }
        self.rigid_body(engine)
            .map_or(self.state.applied_force, |rb| from_rapier_vector(&rb.user_force()))
    }

    fn world_torque(&self, engine: &RapierEngine) -> Vector3<f64> {
        if self.state.kinematic {
            return self.state.applied_torque;
        }
        self.rigid_body(engine)
            .map_or(self.state.applied_torque, |rb| from_rapier_vector(&rb.user_torque()))
    }

    // -- Damping and contact parameters --

    fn set_linear_damping(
        &mut self,
        engine: &mut RapierEngine,
        damping: f64,
    ) -> Result<(), BodyError> {
        check_damping("linear_damping", damping)?;
        self.state.linear_damping = damping;
        if let Some(rb) = self.rigid_body_mut(engine) {
            rb.set_linear_damping(damping as Real);
        }
        Ok(())
    }

    fn set_angular_damping(
        &mut self,
        engine: &mut RapierEngine,
        damping: f64,
    ) -> Result<(), BodyError> {
        check_damping("angular_damping", damping)?;
        self.state.angular_damping = damping;
        if let Some(rb) = self.rigid_body_mut(engine) {
            rb.set_angular_damping(damping as Real);
        }
        Ok(())
    }

    fn set_max_vel(
        &mut self,
        _engine: &mut RapierEngine,
        _max_vel: f64,
    ) -> Result<(), UnsupportedOperation> {
        Err(unsupported(&self.state.name, "set_max_vel"))
    }

    fn set_min_depth(
        &mut self,
        _engine: &mut RapierEngine,
        _min_depth: f64,
    ) -> Result<(), UnsupportedOperation> {
        Err(unsupported(&self.state.name, "set_min_depth"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use bodyworks_core::{BodyConfig, PhysicsConfig};
    use nalgebra::Isometry3;
    use slotmap::SlotMap;

    use super::*;
    use crate::geom::{Geom, Shape};

    fn engine() -> RapierEngine {
        let mut engine = RapierEngine::from_config(&PhysicsConfig {
            gravity: [0.0, 0.0, 0.0],
            ..PhysicsConfig::default()
        });
        engine.init();
        engine
    }

    fn loaded_body(engine: &RapierEngine, config: &BodyConfig) -> RapierBody {
        let mut keys: SlotMap<BodyKey, ()> = SlotMap::with_key();
        let mut body = engine.create_body(Entity::PLACEHOLDER, keys.insert(()));
        body.load(config).unwrap();
        body
    }

    #[test]
    fn init_registers_motion_state_and_fini_removes_it() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        let handle = body.rigid_body_handle(&engine).unwrap();
        let world = engine.world().unwrap();
        assert_eq!(world.motion_state_count(), 1);
        assert_eq!(world.motion_state(handle).unwrap().body(), body.key());
        assert_eq!(
            world.rigid_body_set[handle].user_data,
            u128::from(body.key().data().as_ffi())
        );

        body.fini(&mut engine);
        body.fini(&mut engine);
        let world = engine.world().unwrap();
        assert_eq!(world.motion_state_count(), 0);
        assert_eq!(world.rigid_body_set.len(), 0);
    }

    #[test]
    fn init_applies_mass_properties() {
        let mut engine = engine();
        let config = BodyConfig {
            mass: 2.5,
            ..BodyConfig::default()
        };
        let mut body = loaded_body(&engine, &config);
        body.init(&mut engine).unwrap();
        // Mass properties are resolved when the pipeline processes the insertion.
        engine.step().unwrap();
        let handle = body.rigid_body_handle(&engine).unwrap();
        let rb = &engine.world().unwrap().rigid_body_set[handle];
        assert_relative_eq!(rb.mass(), 2.5, epsilon = 1e-6);
    }

    #[test]
    fn unsupported_operations_are_reported() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();

        let err = body.set_max_vel(&mut engine, 1.0).unwrap_err();
        assert_eq!(err.operation, "set_max_vel");
        assert_eq!(err.backend, "rapier3d");
        assert!(body.set_min_depth(&mut engine, 0.01).is_err());
        assert!(body.set_self_collide(&mut engine, true).is_err());
        assert!(!body.self_collide());
        assert!(body.set_self_collide(&mut engine, false).is_ok());
    }

    #[test]
    fn compound_collider_follows_attachments() {
        let mut engine = engine();
        let a = engine
            .geoms_mut()
            .insert(Geom::new("a", Shape::Sphere { radius: 0.1 }));
        let b = engine.geoms_mut().insert(
            Geom::new("b", Shape::Sphere { radius: 0.1 })
                .with_relative_pose(Isometry3::translation(1.0, 0.0, 0.0)),
        );
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        assert!(body.collider_handle(&engine).is_none());

        body.attach_geom(&mut engine, a).unwrap();
        body.attach_geom(&mut engine, b).unwrap();
        let collider = body.collider_handle(&engine).unwrap();
        let world = engine.world().unwrap();
        assert_eq!(world.collider_set.len(), 1);
        assert!(world.collider_set[collider].shape().as_compound().is_some());
        assert_relative_eq!(body.center_of_mass(), Vector3::new(0.5, 0.0, 0.0));

        body.detach_geom(&mut engine, b);
        let collider = body.collider_handle(&engine).unwrap();
        assert!(engine.world().unwrap().collider_set[collider].shape().as_ball().is_some());

        body.detach_geom(&mut engine, a);
        assert!(body.collider_handle(&engine).is_none());
        assert_eq!(engine.world().unwrap().collider_set.len(), 0);
    }

    #[test]
    fn disable_sleeps_and_velocity_wakes() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        body.set_enabled(&mut engine, false);
        assert!(!body.enabled(&engine));
        body.set_linear_vel(&mut engine, Vector3::new(0.0, 1.0, 0.0));
        assert!(body.enabled(&engine));
        assert_relative_eq!(
            body.world_linear_vel(&engine),
            Vector3::new(0.0, 1.0, 0.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn kinematic_switch_changes_body_type() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        body.set_kinematic(&mut engine, true);
        let handle = body.rigid_body_handle(&engine).unwrap();
        assert!(engine.world().unwrap().rigid_body_set[handle].is_kinematic());
        assert!(body.kinematic());
    }

    #[test]
    fn teleport_survives_the_next_step() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        body.set_world_pose(&mut engine, Isometry3::translation(0.0, 0.0, 5.0));
        let handle = body.rigid_body_handle(&engine).unwrap();
        let bridge = engine.world().unwrap().motion_state(handle).unwrap();
        assert!((bridge.world_transform().translation.z - 5.0).abs() < 1e-6);

        engine.step().unwrap();
        for refresh in engine.drain_pose_refreshes() {
            assert_relative_eq!(refresh.pose.translation.z, 5.0, epsilon = 1e-6);
        }
        let handle = body.rigid_body_handle(&engine).unwrap();
        let rb = &engine.world().unwrap().rigid_body_set[handle];
        assert_relative_eq!(rb.translation().z, 5.0);
    }

    #[test]
    fn stale_handle_after_reinit() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        engine.fini();
        engine.init();
        assert!(!body.is_initialized(&engine));
        body.init(&mut engine).unwrap();
        assert!(body.is_initialized(&engine));
    }

    #[test]
    fn force_is_cached_and_cleared_on_update() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        body.set_force(&mut engine, Vector3::new(3.0, 0.0, 0.0));
        assert_relative_eq!(body.world_force(&engine), Vector3::new(3.0, 0.0, 0.0));
        engine.step().unwrap();
        body.update(&mut engine);
        assert_relative_eq!(body.world_force(&engine), Vector3::zeros());
        assert!(body.world_linear_vel(&engine).x > 0.0);
    }

    #[test]
    fn init_applies_inertia_and_com_offset() {
        let mut engine = engine();
        let config = BodyConfig {
            mass: 2.0,
            inertia: Some([0.5, 0.0, 0.0, 1.5, 0.0, 3.0]),
            center_of_mass: [0.1, -0.2, 0.3],
            ..BodyConfig::default()
        };
        let mut body = loaded_body(&engine, &config);
        body.init(&mut engine).unwrap();
        engine.step().unwrap();

        let handle = body.rigid_body_handle(&engine).unwrap();
        let rb = &engine.world().unwrap().rigid_body_set[handle];
        assert_relative_eq!(rb.mass(), 2.0, epsilon = 1e-6);
        let com = rb.mass_properties().local_mprops.local_com;
        assert_relative_eq!(com.x, 0.1, epsilon = 1e-6);
        assert_relative_eq!(com.y, -0.2, epsilon = 1e-6);
        assert_relative_eq!(com.z, 0.3, epsilon = 1e-6);

        let principal = rb.mass_properties().local_mprops.principal_inertia();
        let mut moments = [principal.x, principal.y, principal.z];
        moments.sort_by(f32::total_cmp);
        assert_relative_eq!(moments[0], 0.5, epsilon = 1e-4);
        assert_relative_eq!(moments[1], 1.5, epsilon = 1e-4);
        assert_relative_eq!(moments[2], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn world_force_reads_the_rigid_body_accumulator() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        let handle = body.rigid_body_handle(&engine).unwrap();

        let rb = &mut engine.world_mut().unwrap().rigid_body_set[handle];
        rb.add_force(rapier3d::math::Vector::new(0.0, 2.0, 0.0), true);
        rb.add_torque(rapier3d::math::Vector::new(0.0, 0.0, -1.0), true);
        assert_relative_eq!(body.world_force(&engine), Vector3::new(0.0, 2.0, 0.0));
        assert_relative_eq!(body.world_torque(&engine), Vector3::new(0.0, 0.0, -1.0));

        body.fini(&mut engine);
        body.set_force(&mut engine, Vector3::new(4.0, 0.0, 0.0));
        assert_relative_eq!(body.world_force(&engine), Vector3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn moving_a_geom_rebuilds_the_collider_offset() {
        let mut engine = engine();
        let geom = engine
            .geoms_mut()
            .insert(Geom::new("ball", Shape::Sphere { radius: 0.2 }));
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.attach_geom(&mut engine, geom).unwrap();
        body.init(&mut engine).unwrap();

        body.set_geom_relative_pose(&mut engine, geom, Isometry3::translation(0.0, 0.0, 0.4))
            .unwrap();

        let collider = body.collider_handle(&engine).unwrap();
        let offset = engine.world().unwrap().collider_set[collider]
            .position_wrt_parent()
            .copied()
            .unwrap();
        assert_relative_eq!(offset.translation.vector.z, 0.4, epsilon = 1e-6);
        assert_relative_eq!(body.center_of_mass(), Vector3::new(0.0, 0.0, 0.4), epsilon = 1e-9);
        assert_relative_eq!(
            engine.geoms().get(geom).unwrap().world_pose().translation.z,
            0.4,
            epsilon = 1e-9
        );
    }
}
