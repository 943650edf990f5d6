//! Rapier world and the engine context wrapping it.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use bevy::prelude::Entity;
use nalgebra::Vector3;
use rapier3d::math::{Real, Vector};
use rapier3d::prelude::{
    CCDSolver, ColliderSet, DefaultBroadPhase, ImpulseJointSet, IntegrationParameters,
    IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline, QueryPipeline,
    RigidBodyHandle, RigidBodySet,
};

use bodyworks_core::{BackendError, PhysicsConfig};

use crate::body::BodyKey;
use crate::convert::rapier::{from_rapier_vector, to_rapier_vector};
use crate::convert::vector_from_array;
use crate::engine::{PhysicsEngine, PoseRefresh};
use crate::geom::GeomSet;

use super::body::RapierBody;
use super::motion_state::MotionState;

// ---------------------------------------------------------------------------
// RapierWorld
// ---------------------------------------------------------------------------

/// All rapier state of one context.
///
/// `PhysicsPipeline::step()` requires mutable access to every set
/// simultaneously, so they must all live together.
pub struct RapierWorld {
    // -- Rapier sets --
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,

    // -- Pipeline objects --
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    // -- Bridges --
    motion_states: HashMap<RigidBodyHandle, MotionState>,
    refreshes: Vec<PoseRefresh>,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierWorld {
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            motion_states: HashMap::new(),
            refreshes: Vec::new(),
        }
    }

    pub fn register_motion_state(&mut self, handle: RigidBodyHandle, state: MotionState) {
        self.motion_states.insert(handle, state);
    }

    pub fn unregister_motion_state(&mut self, handle: RigidBodyHandle) -> Option<MotionState> {
        self.motion_states.remove(&handle)
    }

    pub fn motion_state(&self, handle: RigidBodyHandle) -> Option<&MotionState> {
        self.motion_states.get(&handle)
    }

    pub fn motion_state_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut MotionState> {
        self.motion_states.get_mut(&handle)
    }

    pub fn motion_state_count(&self) -> usize {
        self.motion_states.len()
    }

    /// Remove a rigid body together with its colliders and bridge.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.motion_states.remove(&handle);
        self.rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    /// Run one pipeline step, then feed every active body's transform to its
    /// bridge.
    pub fn step(&mut self, gravity: &Vector<Real>, params: &IntegrationParameters) {
        self.physics_pipeline.step(
            gravity,
            params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        let active = self
            .island_manager
            .active_dynamic_bodies()
            .iter()
            .chain(self.island_manager.active_kinematic_bodies());
        for handle in active {
            let (Some(rb), Some(bridge)) = (
                self.rigid_body_set.get(*handle),
                self.motion_states.get_mut(handle),
            ) else {
                continue;
            };
            if let Some(refresh) = bridge.set_world_transform(rb.position()) {
                tracing::trace!(body = ?refresh.body, "motion state refreshed");
                self.refreshes.push(refresh);
            }
        }
    }

    pub fn take_refreshes(&mut self) -> Vec<PoseRefresh> {
        std::mem::take(&mut self.refreshes)
    }
}

// ---------------------------------------------------------------------------
// RapierEngine
// ---------------------------------------------------------------------------

/// Engine context for the rapier backend.
pub struct RapierEngine {
    config: PhysicsConfig,
    gravity: Vector3<f64>,
    integration_parameters: IntegrationParameters,
    world: Option<RapierWorld>,
    geoms: GeomSet,
    epoch: u64,
}

impl RapierEngine {
    pub fn world(&self) -> Option<&RapierWorld> {
        self.world.as_ref()
    }

    pub fn world_mut(&mut self) -> Option<&mut RapierWorld> {
        self.world.as_mut()
    }

    pub(crate) fn parts_mut(&mut self) -> (Option<&mut RapierWorld>, &mut GeomSet) {
        (self.world.as_mut(), &mut self.geoms)
    }

    pub fn integration_parameters(&self) -> &IntegrationParameters {
        &self.integration_parameters
    }

    /// Whether rapier may put resting bodies to sleep.
    pub fn sleeping_allowed(&self) -> bool {
        self.config.auto_disable.enabled
    }
}

impl PhysicsEngine for RapierEngine {
    type Body = RapierBody;

    #[allow(clippy::cast_possible_truncation)]
    fn from_config(config: &PhysicsConfig) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.step_size as Real;
        if let Some(iterations) = NonZeroUsize::new(config.solver_iterations) {
            integration_parameters.num_solver_iterations = iterations;
        }
        Self {
            config: config.clone(),
            gravity: vector_from_array(config.gravity),
            integration_parameters,
            world: None,
            geoms: GeomSet::new(),
            epoch: 0,
        }
    }

    fn name(&self) -> &'static str {
        "rapier3d"
    }

    fn init(&mut self) {
        if self.world.is_some() {
            return;
        }
        self.world = Some(RapierWorld::new());
        self.epoch += 1;
        tracing::debug!(engine = "rapier3d", epoch = self.epoch, "context initialised");
    }

    fn fini(&mut self) {
        if let Some(world) = self.world.take() {
            tracing::debug!(
                engine = "rapier3d",
                epoch = self.epoch,
                bodies = world.rigid_body_set.len(),
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
        // Round-trip through rapier's width so callers see what the solver uses.
        from_rapier_vector(&to_rapier_vector(&self.gravity))
    }

    fn set_gravity(&mut self, gravity: Vector3<f64>) {
        self.gravity = gravity;
    }

    fn step_size(&self) -> f64 {
        self.config.step_size
    }

    fn step(&mut self) -> Result<(), BackendError> {
        let gravity = to_rapier_vector(&self.gravity);
        let world = self
            .world
            .as_mut()
            .ok_or(BackendError::ContextUninitialized)?;
        world.step(&gravity, &self.integration_parameters);
        Ok(())
    }

    fn drain_pose_refreshes(&mut self) -> Vec<PoseRefresh> {
        self.world
            .as_mut()
            .map(RapierWorld::take_refreshes)
            .unwrap_or_default()
    }

    fn geoms(&self) -> &GeomSet {
        &self.geoms
    }

    fn geoms_mut(&mut self) -> &mut GeomSet {
        &mut self.geoms
    }

    fn create_body(&self, parent: Entity, key: BodyKey) -> RapierBody {
        RapierBody::new(key, parent)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
