//! [`NativeBody`]: the body contract on the native world.

use bevy::prelude::Entity;
use nalgebra::Vector3;

use bodyworks_core::{BackendError, BodyError, UnsupportedOperation};

use crate::body::{Body, BodyKey, BodyState, check_damping};
use crate::convert::native::{from_native_vector, to_native_transform, to_native_vector};
use crate::engine::PhysicsEngine;
use crate::geom::GeomId;

use super::NativeEngine;
use super::world::{NativeBodyId, NativeRigidBody, SpaceId, matrix_to_native};

/// Live native handle: the body record, its collision space, and the epoch
/// of the world that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NativeHandle {
    id: NativeBodyId,
    space: SpaceId,
    epoch: u64,
}

/// A body realised on the native world.
#[derive(Debug)]
pub struct NativeBody {
    state: BodyState,
    handle: Option<NativeHandle>,
    max_vel: f64,
    min_depth: f64,
}

impl NativeBody {
    pub fn new(key: BodyKey, parent: Entity) -> Self {
        Self {
            state: BodyState::new(key, parent),
            handle: None,
            max_vel: f64::INFINITY,
            min_depth: 0.0,
        }
    }

    /// Id of the native body record, if live.
    pub fn native_id(&self, engine: &NativeEngine) -> Option<NativeBodyId> {
        self.live(engine).map(|h| h.id)
    }

    /// Collision space holding this body's geoms, if live.
    pub fn space(&self, engine: &NativeEngine) -> Option<SpaceId> {
        self.live(engine).map(|h| h.space)
    }

    /// Contact parameters `(max_vel, min_depth)`.
    pub fn contact_params(&self) -> (f64, f64) {
        (self.max_vel, self.min_depth)
    }

    fn live(&self, engine: &NativeEngine) -> Option<NativeHandle> {
        self.handle
            .filter(|h| h.epoch == engine.epoch() && engine.is_initialized())
    }

    fn rigid<'a>(&self, engine: &'a NativeEngine) -> Option<&'a NativeRigidBody> {
        let handle = self.live(engine)?;
        engine.world()?.body(handle.id)
    }

    fn rigid_mut<'a>(&self, engine: &'a mut NativeEngine) -> Option<&'a mut NativeRigidBody> {
        let handle = self.live(engine)?;
        engine.world_mut()?.body_mut(handle.id)
    }

    fn wake(&mut self, engine: &mut NativeEngine) {
        self.state.enabled = true;
        if let Some(b) = self.rigid_mut(engine) {
            b.enable();
        }
    }
}

impl Body for NativeBody {
    type Engine = NativeEngine;

    fn state(&self) -> &BodyState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BodyState {
        &mut self.state
    }

    // -- Lifecycle --

    fn init(&mut self, engine: &mut NativeEngine) -> Result<(), BackendError> {
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
        let (world, geoms) = engine.parts_mut();
        let world = world.ok_or(BackendError::ContextUninitialized)?;

        self.state.recompute_mass(geoms);
        let id = world.create_body(Some(self.state.key));
        let root = world.root_space();
        let space = world.create_space(root, self.state.self_collide);
        for geom in &self.state.geoms {
            world.space_add(space, *geom);
        }

        let s = &self.state;
        if let Some(b) = world.body_mut(id) {
            b.set_mass(
                s.mass,
                matrix_to_native(&s.inertia),
                to_native_vector(&s.center_of_mass),
            );
            b.set_link_transform(&to_native_transform(&s.pose));
            b.linear_vel = to_native_vector(&s.linear_vel);
            b.set_world_angular_vel(&s.angular_vel);
            b.force = to_native_vector(&s.applied_force);
            b.set_world_torque(&s.applied_torque);
            b.gravity_mode = s.gravity_mode;
            b.kinematic = s.kinematic;
            b.linear_damping = s.linear_damping;
            b.angular_damping = s.angular_damping;
            b.max_vel = self.max_vel;
            b.min_depth = self.min_depth;
            if !s.enabled {
                b.disable();
            }
        }
        self.state.propagate_pose(geoms);

        self.handle = Some(NativeHandle { id, space, epoch });
        tracing::debug!(body = %self.state.name, backend = "native", epoch, "body initialised");
        Ok(())
    }

    fn fini(&mut self, engine: &mut NativeEngine) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.epoch != engine.epoch() {
            return;
        }
        if let Some(world) = engine.world_mut() {
            if let Some(b) = world.body(handle.id) {
                self.state.linear_vel = from_native_vector(&b.linear_vel);
                self.state.angular_vel = b.world_angular_vel();
                self.state.enabled = b.enabled;
            }
            world.destroy_body(handle.id);
            world.destroy_space(handle.space);
        }
        tracing::debug!(body = %self.state.name, backend = "native", "body finalised");
    }

    fn is_initialized(&self, engine: &NativeEngine) -> bool {
        self.rigid(engine).is_some()
    }

    fn update(&mut self, engine: &mut NativeEngine) {
        if let Some(b) = self.rigid(engine) {
            self.state.linear_vel = from_native_vector(&b.linear_vel);
            self.state.angular_vel = b.world_angular_vel();
            self.state.enabled = b.enabled;
        }
        self.state.applied_force = Vector3::zeros();
        self.state.applied_torque = Vector3::zeros();
        self.state.propagate_pose(engine.geoms_mut());
    }

    // -- Geoms --

    fn attach_geom(
        &mut self,
        engine: &mut NativeEngine,
        geom: GeomId,
    ) -> Result<(), BackendError> {
        if !self.state.attach(geom, engine.geoms_mut())? {
            return Ok(());
        }
        if let Some(handle) = self.live(engine)
            && let Some(world) = engine.world_mut()
        {
            world.space_add(handle.space, geom);
        }
        if let Some(g) = engine.geoms_mut().get_mut(geom) {
            g.on_pose_change(&self.state.pose);
        }
        self.update_com(engine);
        Ok(())
    }

    fn detach_geom(&mut self, engine: &mut NativeEngine, geom: GeomId) {
        if !self.state.detach(geom, engine.geoms_mut()) {
            tracing::warn!(body = %self.state.name, ?geom, "detach of a geom that is not attached");
            return;
        }
        if let Some(handle) = self.live(engine)
            && let Some(world) = engine.world_mut()
        {
            world.space_remove(handle.space, geom);
        }
        self.update_com(engine);
    }

    fn update_com(&mut self, engine: &mut NativeEngine) {
        self.state.recompute_mass(engine.geoms());
        let s = &self.state;
        if let Some(b) = self.rigid_mut(engine) {
            b.set_mass(
                s.mass,
                matrix_to_native(&s.inertia),
                to_native_vector(&s.center_of_mass),
            );
        }
    }

    // -- Pose --

    fn on_pose_change(&mut self, engine: &mut NativeEngine) {
        let transform = to_native_transform(&self.state.pose);
        if let Some(b) = self.rigid_mut(engine) {
            b.set_link_transform(&transform);
        }
        self.state.propagate_pose(engine.geoms_mut());
    }

    // -- Activity --

    fn set_enabled(&mut self, engine: &mut NativeEngine, enabled: bool) {
        self.state.enabled = enabled;
        if let Some(b) = self.rigid_mut(engine) {
            if enabled {
                b.enable();
            } else {
                b.disable();
            }
        }
    }

    fn enabled(&self, engine: &NativeEngine) -> bool {
        self.rigid(engine).map_or(self.state.enabled, |b| b.enabled)
    }

    fn set_kinematic(&mut self, engine: &mut NativeEngine, kinematic: bool) {
        self.state.kinematic = kinematic;
        if let Some(b) = self.rigid_mut(engine) {
            b.kinematic = kinematic;
        }
    }

    fn set_gravity_mode(&mut self, engine: &mut NativeEngine, mode: bool) {
        self.state.gravity_mode = mode;
        if let Some(b) = self.rigid_mut(engine) {
            b.gravity_mode = mode;
        }
    }

    fn set_self_collide(
        &mut self,
        engine: &mut NativeEngine,
        collide: bool,
    ) -> Result<(), UnsupportedOperation> {
        self.state.self_collide = collide;
        if let Some(handle) = self.live(engine)
            && let Some(space) = engine.world_mut().and_then(|w| w.space_mut(handle.space))
        {
            space.collide_internal = collide;
        }
        Ok(())
    }

    // -- Velocity and wrench --

    fn set_linear_vel(&mut self, engine: &mut NativeEngine, vel: Vector3<f64>) {
        self.state.linear_vel = vel;
        if let Some(b) = self.rigid_mut(engine) {
            b.linear_vel = to_native_vector(&vel);
        }
        self.wake(engine);
    }

    fn set_angular_vel(&mut self, engine: &mut NativeEngine, vel: Vector3<f64>) {
        self.state.angular_vel = vel;
        if let Some(b) = self.rigid_mut(engine) {
            b.set_world_angular_vel(&vel);
        }
        self.wake(engine);
    }

    fn set_force(&mut self, engine: &mut NativeEngine, force: Vector3<f64>) {
        if self.state.kinematic {
            tracing::warn!(body = %self.state.name, "force on a kinematic body is kept but not integrated");
        }
        self.state.applied_force = force;
        if let Some(b) = self.rigid_mut(engine) {
            b.force = to_native_vector(&force);
        }
        self.wake(engine);
    }

    fn set_torque(&mut self, engine: &mut NativeEngine, torque: Vector3<f64>) {
        if self.state.kinematic {
            tracing::warn!(body = %self.state.name, "torque on a kinematic body is kept but not integrated");
        }
        self.state.applied_torque = torque;
        if let Some(b) = self.rigid_mut(engine) {
            b.set_world_torque(&torque);
        }
        self.wake(engine);
    }

    fn world_linear_vel(&self, engine: &NativeEngine) -> Vector3<f64> {
        self.rigid(engine)
            .map_or(self.state.linear_vel, |b| from_native_vector(&b.linear_vel))
    }

    fn world_angular_vel(&self, engine: &NativeEngine) -> Vector3<f64> {
        self.rigid(engine)
            .map_or(self.state.angular_vel, NativeRigidBody::world_angular_vel)
    }

    fn world_force(&self, engine: &NativeEngine) -> Vector3<f64> {
        self.rigid(engine)
            .map_or(self.state.applied_force, |b| from_native_vector(&b.force))
    }

    fn world_torque(&self, engine: &NativeEngine) -> Vector3<f64> {
        self.rigid(engine)
            .map_or(self.state.applied_torque, NativeRigidBody::world_torque)
    }

    // -- Damping and contact parameters --

    fn set_linear_damping(
        &mut self,
        engine: &mut NativeEngine,
        damping: f64,
    ) -> Result<(), BodyError> {
        check_damping("linear_damping", damping)?;
        self.state.linear_damping = damping;
        if let Some(b) = self.rigid_mut(engine) {
            b.linear_damping = damping;
        }
        Ok(())
    }

    fn set_angular_damping(
        &mut self,
        engine: &mut NativeEngine,
        damping: f64,
    ) -> Result<(), BodyError> {
        check_damping("angular_damping", damping)?;
        self.state.angular_damping = damping;
        if let Some(b) = self.rigid_mut(engine) {
            b.angular_damping = damping;
        }
        Ok(())
    }

    fn set_max_vel(
        &mut self,
        engine: &mut NativeEngine,
        max_vel: f64,
    ) -> Result<(), UnsupportedOperation> {
        self.max_vel = max_vel.max(0.0);
        let value = self.max_vel;
        if let Some(b) = self.rigid_mut(engine) {
            b.max_vel = value;
        }
        Ok(())
    }

    fn set_min_depth(
        &mut self,
        engine: &mut NativeEngine,
        min_depth: f64,
    ) -> Result<(), UnsupportedOperation> {
        self.min_depth = min_depth.max(0.0);
        let value = self.min_depth;
        if let Some(b) = self.rigid_mut(engine) {
            b.min_depth = value;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use bodyworks_core::{BodyConfig, PhysicsConfig};
    use nalgebra::{Isometry3, UnitQuaternion};
    use slotmap::SlotMap;

    use super::*;
    use crate::geom::{Geom, Shape};

    fn engine() -> NativeEngine {
        let mut engine = NativeEngine::from_config(&PhysicsConfig {
            gravity: [0.0, 0.0, 0.0],
            ..PhysicsConfig::default()
        });
        engine.init();
        engine
    }

    fn loaded_body(engine: &NativeEngine, config: &BodyConfig) -> NativeBody {
        let mut keys: SlotMap<BodyKey, ()> = SlotMap::with_key();
        let mut body = engine.create_body(Entity::PLACEHOLDER, keys.insert(()));
        body.load(config).unwrap();
        body
    }

    #[test]
    fn init_requires_load() {
        let mut engine = engine();
        let mut keys: SlotMap<BodyKey, ()> = SlotMap::with_key();
        let mut body = NativeBody::new(keys.insert(()), Entity::PLACEHOLDER);
        assert!(matches!(body.init(&mut engine), Err(BackendError::NotLoaded(_))));
    }

    #[test]
    fn init_twice_is_rejected() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        assert!(matches!(
            body.init(&mut engine),
            Err(BackendError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn init_without_world_fails() {
        let mut engine = NativeEngine::from_config(&PhysicsConfig::default());
        let mut body = loaded_body(&engine, &BodyConfig::default());
        assert_eq!(
            body.init(&mut engine),
            Err(BackendError::ContextUninitialized)
        );
        assert!(!body.is_initialized(&engine));
    }

    #[test]
    fn init_pushes_configured_pose() {
        let mut engine = engine();
        let config = BodyConfig {
            position: [1.0, 2.0, 3.0],
            ..BodyConfig::default()
        };
        let mut body = loaded_body(&engine, &config);
        body.init(&mut engine).unwrap();
        let id = body.native_id(&engine).unwrap();
        let b = engine.world().unwrap().body(id).unwrap();
        assert_eq!(b.link_transform().position, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn fini_is_idempotent() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        body.fini(&mut engine);
        body.fini(&mut engine);
        assert!(!body.is_initialized(&engine));
        assert_eq!(engine.world().unwrap().body_count(), 0);
    }

    #[test]
    fn handle_from_previous_world_is_stale() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        engine.fini();
        engine.init();
        assert!(!body.is_initialized(&engine));
        // Does not touch the new world.
        body.fini(&mut engine);
        body.init(&mut engine).unwrap();
        assert!(body.is_initialized(&engine));
    }

    #[test]
    fn velocity_round_trips_in_world_frame() {
        let mut engine = engine();
        let config = BodyConfig {
            orientation: [0.0, 0.0, 0.0, 1.0],
            ..BodyConfig::default()
        };
        let mut body = loaded_body(&engine, &config);
        body.init(&mut engine).unwrap();
        let w = Vector3::new(0.3, -0.2, 1.0);
        body.set_angular_vel(&mut engine, w);
        body.set_linear_vel(&mut engine, Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(body.world_angular_vel(&engine), w, epsilon = 1e-12);
        assert_relative_eq!(body.world_linear_vel(&engine), Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn setters_before_init_are_pushed_at_init() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.set_linear_vel(&mut engine, Vector3::new(0.0, 2.0, 0.0));
        body.set_gravity_mode(&mut engine, false);
        body.init(&mut engine).unwrap();
        assert_relative_eq!(body.world_linear_vel(&engine), Vector3::new(0.0, 2.0, 0.0));
        let id = body.native_id(&engine).unwrap();
        assert!(!engine.world().unwrap().body(id).unwrap().gravity_mode);
    }

    #[test]
    fn velocity_setter_wakes_disabled_body() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        body.set_enabled(&mut engine, false);
        assert!(!body.enabled(&engine));
        body.set_linear_vel(&mut engine, Vector3::new(1.0, 0.0, 0.0));
        assert!(body.enabled(&engine));
    }

    #[test]
    fn force_on_kinematic_body_is_cached() {
        let mut engine = engine();
        let config = BodyConfig {
            kinematic: true,
            ..BodyConfig::default()
        };
        let mut body = loaded_body(&engine, &config);
        body.init(&mut engine).unwrap();
        body.set_force(&mut engine, Vector3::new(5.0, 0.0, 0.0));
        assert_relative_eq!(body.world_force(&engine), Vector3::new(5.0, 0.0, 0.0));
        engine.step().unwrap();
        assert!(engine.drain_pose_refreshes().is_empty());
    }

    #[test]
    fn world_torque_round_trips_through_body_frame() {
        let mut engine = engine();
        let config = BodyConfig {
            orientation: [0.5_f64.sqrt(), 0.5_f64.sqrt(), 0.0, 0.0],
            ..BodyConfig::default()
        };
        let mut body = loaded_body(&engine, &config);
        body.init(&mut engine).unwrap();
        let tau = Vector3::new(0.0, 1.0, 2.0);
        body.set_torque(&mut engine, tau);
        assert_relative_eq!(body.world_torque(&engine), tau, epsilon = 1e-12);
    }

    #[test]
    fn damping_setter_validates() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        assert!(body.set_linear_damping(&mut engine, -0.1).is_err());
        body.set_angular_damping(&mut engine, 0.5).unwrap();
        assert_relative_eq!(body.angular_damping(), 0.5);
    }

    #[test]
    fn contact_params_are_accepted() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.set_max_vel(&mut engine, 3.0).unwrap();
        body.set_min_depth(&mut engine, 0.001).unwrap();
        body.init(&mut engine).unwrap();
        assert_eq!(body.contact_params(), (3.0, 0.001));
        let id = body.native_id(&engine).unwrap();
        assert_relative_eq!(engine.world().unwrap().body(id).unwrap().max_vel, 3.0);
    }

    #[test]
    fn attach_geom_joins_space_and_shifts_com() {
        let mut engine = engine();
        let geom = engine.geoms_mut().insert(
            Geom::new("ball", Shape::Sphere { radius: 0.1 })
                .with_relative_pose(Isometry3::translation(0.0, 0.0, 0.5)),
        );
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        body.attach_geom(&mut engine, geom).unwrap();
        body.attach_geom(&mut engine, geom).unwrap();

        assert_eq!(body.geoms(), &[geom]);
        let space = body.space(&engine).unwrap();
        assert_eq!(engine.world().unwrap().space(space).unwrap().geoms, vec![geom]);
        assert_relative_eq!(body.center_of_mass(), Vector3::new(0.0, 0.0, 0.5));

        body.detach_geom(&mut engine, geom);
        body.detach_geom(&mut engine, geom);
        assert!(body.geoms().is_empty());
        assert!(engine.world().unwrap().space(space).unwrap().geoms.is_empty());
        assert_relative_eq!(body.center_of_mass(), Vector3::zeros());
    }

    #[test]
    fn self_collide_toggles_space_flag() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        let space = body.space(&engine).unwrap();
        assert!(!engine.world().unwrap().space(space).unwrap().collide_internal);
        body.set_self_collide(&mut engine, true).unwrap();
        assert!(body.self_collide());
        assert!(engine.world().unwrap().space(space).unwrap().collide_internal);
    }

    #[test]
    fn set_world_pose_moves_native_body_and_geoms() {
        let mut engine = engine();
        let geom = engine
            .geoms_mut()
            .insert(Geom::new("ball", Shape::Sphere { radius: 0.1 }));
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.attach_geom(&mut engine, geom).unwrap();
        body.init(&mut engine).unwrap();

        let pose = Isometry3::from_parts(
            nalgebra::Translation3::new(0.0, 4.0, 0.0),
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
        );
        body.set_world_pose(&mut engine, pose);

        let id = body.native_id(&engine).unwrap();
        let t = engine.world().unwrap().body(id).unwrap().link_transform();
        assert_relative_eq!(t.position[1], 4.0, epsilon = 1e-12);
        assert_relative_eq!(
            engine.geoms().get(geom).unwrap().world_pose(),
            pose,
            epsilon = 1e-12
        );
    }

    #[test]
    fn update_clears_wrench_and_pulls_velocity() {
        let mut engine = engine();
        let mut body = loaded_body(&engine, &BodyConfig::default());
        body.init(&mut engine).unwrap();
        body.set_force(&mut engine, Vector3::new(1.0, 0.0, 0.0));
        engine.step().unwrap();
        body.update(&mut engine);
        assert_relative_eq!(body.world_force(&engine), Vector3::zeros());
        assert_relative_eq!(body.state().applied_force, Vector3::zeros());
        assert_relative_eq!(body.state().linear_vel.x, 0.001, epsilon = 1e-12);
    }
}
