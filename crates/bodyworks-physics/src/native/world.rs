//! ID-addressed rigid-body world used by the native backend.
//!
//! Modelled on ODE's body API: bodies are plain records addressed by id,
//! positions are those of the centre of mass, quaternions are `[w, x, y, z]`
//! arrays, angular velocity and torque live in the body frame, and every body
//! whose pose changes during a step is reported through the move queue.
//! Collision spaces group geoms for broad-phase filtering only; contacts are
//! not resolved here.

use nalgebra::{Matrix3, UnitQuaternion, Vector3};
use slotmap::{SlotMap, new_key_type};

use bodyworks_core::config::AutoDisableConfig;

use crate::body::BodyKey;
use crate::convert::native::{
    NativeQuat, NativeTransform, NativeVec3, from_native_quaternion, from_native_transform,
    from_native_vector, to_native_quaternion, to_native_vector,
};
use crate::engine::PoseRefresh;
use crate::geom::{GeomId, GeomSet};

new_key_type! {
    /// Id of a body in a [`NativeWorld`].
    pub struct NativeBodyId;
    /// Id of a collision space in a [`NativeWorld`].
    pub struct SpaceId;
}

/// Native 3x3 matrix, row-major.
pub type NativeMat3 = [[f64; 3]; 3];

fn matrix_from_native(m: &NativeMat3) -> Matrix3<f64> {
    Matrix3::from_fn(|r, c| m[r][c])
}

pub fn matrix_to_native(m: &Matrix3<f64>) -> NativeMat3 {
    [
        [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
        [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
    ]
}

// ---------------------------------------------------------------------------
// NativeRigidBody
// ---------------------------------------------------------------------------

/// One body record.
#[derive(Debug, Clone)]
pub struct NativeRigidBody {
    /// Centre of mass, world frame.
    pub position: NativeVec3,
    pub rotation: NativeQuat,
    /// Centre-of-mass velocity, world frame.
    pub linear_vel: NativeVec3,
    /// Body frame.
    pub angular_vel: NativeVec3,
    /// Force accumulator, world frame. Cleared after every step.
    pub force: NativeVec3,
    /// Torque accumulator, body frame. Cleared after every step.
    pub torque: NativeVec3,
    pub mass: f64,
    /// Inertia about the centre of mass, body frame.
    pub inertia: NativeMat3,
    /// Offset of the centre of mass from the link origin, body frame.
    pub com_offset: NativeVec3,
    pub gravity_mode: bool,
    pub kinematic: bool,
    pub enabled: bool,
    pub linear_damping: f64,
    pub angular_damping: f64,
    /// Maximum contact correction velocity.
    pub max_vel: f64,
    /// Contact depth tolerated before correction.
    pub min_depth: f64,
    /// Owning body, echoed back in move notifications.
    pub user_data: Option<BodyKey>,
    idle_steps: u32,
}

impl NativeRigidBody {
    fn new(user_data: Option<BodyKey>) -> Self {
        Self {
            position: [0.0; 3],
            rotation: [1.0, 0.0, 0.0, 0.0],
            linear_vel: [0.0; 3],
            angular_vel: [0.0; 3],
            force: [0.0; 3],
            torque: [0.0; 3],
            mass: 1.0,
            inertia: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            com_offset: [0.0; 3],
            gravity_mode: true,
            kinematic: false,
            enabled: true,
            linear_damping: 0.0,
            angular_damping: 0.0,
            max_vel: f64::INFINITY,
            min_depth: 0.0,
            user_data,
            idle_steps: 0,
        }
    }

    fn orientation(&self) -> UnitQuaternion<f64> {
        from_native_quaternion(&self.rotation)
    }

    /// Pose of the link origin (not the centre of mass).
    pub fn link_transform(&self) -> NativeTransform {
        let rot = self.orientation();
        let com = from_native_vector(&self.position);
        let offset = rot * from_native_vector(&self.com_offset);
        NativeTransform {
            position: to_native_vector(&(com - offset)),
            rotation: self.rotation,
        }
    }

    /// Place the link origin at `t`, moving the centre of mass with it.
    pub fn set_link_transform(&mut self, t: &NativeTransform) {
        self.rotation = t.rotation;
        let offset = self.orientation() * from_native_vector(&self.com_offset);
        self.position = to_native_vector(&(from_native_vector(&t.position) + offset));
    }

    /// Replace mass properties, keeping the link origin where it is.
    pub fn set_mass(&mut self, mass: f64, inertia: NativeMat3, com_offset: NativeVec3) {
        let link = self.link_transform();
        self.mass = mass;
        self.inertia = inertia;
        self.com_offset = com_offset;
        self.set_link_transform(&link);
    }

    pub fn enable(&mut self) {
        self.enabled = true;
        self.idle_steps = 0;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.idle_steps = 0;
    }

    /// Angular velocity rotated into the world frame.
    pub fn world_angular_vel(&self) -> Vector3<f64> {
        self.orientation() * from_native_vector(&self.angular_vel)
    }

    pub fn set_world_angular_vel(&mut self, w: &Vector3<f64>) {
        self.angular_vel = to_native_vector(&self.orientation().inverse_transform_vector(w));
    }

    pub fn world_torque(&self) -> Vector3<f64> {
        self.orientation() * from_native_vector(&self.torque)
    }

    pub fn set_world_torque(&mut self, tau: &Vector3<f64>) {
        self.torque = to_native_vector(&self.orientation().inverse_transform_vector(tau));
    }

    fn clear_accumulators(&mut self) {
        self.force = [0.0; 3];
        self.torque = [0.0; 3];
    }

    /// Semi-implicit Euler step. Returns whether the pose changed.
    fn integrate_dynamic(&mut self, gravity: &Vector3<f64>, dt: f64) -> bool {
        let mut force = from_native_vector(&self.force);
        if self.gravity_mode {
            force += gravity * self.mass;
        }
        let mut v = from_native_vector(&self.linear_vel) + force * (dt / self.mass);

        let inertia = matrix_from_native(&self.inertia);
        let tau = from_native_vector(&self.torque);
        let mut w = from_native_vector(&self.angular_vel);
        if let Some(inv) = inertia.try_inverse() {
            // Euler's equations in the body frame, gyroscopic term included.
            w += inv * (tau - w.cross(&(inertia * w))) * dt;
        }

        v *= (1.0 - self.linear_damping * dt).max(0.0);
        w *= (1.0 - self.angular_damping * dt).max(0.0);

        self.linear_vel = to_native_vector(&v);
        self.angular_vel = to_native_vector(&w);
        self.advance_pose(&v, &w, dt)
    }

    /// Kinematic bodies follow their velocity and ignore forces and gravity.
    fn integrate_kinematic(&mut self, dt: f64) -> bool {
        let v = from_native_vector(&self.linear_vel);
        let w = from_native_vector(&self.angular_vel);
        self.advance_pose(&v, &w, dt)
    }

    fn advance_pose(&mut self, v: &Vector3<f64>, w_body: &Vector3<f64>, dt: f64) -> bool {
        if v.iter().all(|c| *c == 0.0) && w_body.iter().all(|c| *c == 0.0) {
            return false;
        }
        let x = from_native_vector(&self.position) + v * dt;
        let q = self.orientation() * UnitQuaternion::from_scaled_axis(w_body * dt);
        self.position = to_native_vector(&x);
        self.rotation = to_native_quaternion(&q);
        true
    }

    fn track_idle(&mut self, params: &AutoDisableConfig) {
        let lin = from_native_vector(&self.linear_vel).norm();
        let ang = from_native_vector(&self.angular_vel).norm();
        if lin < params.linear_threshold && ang < params.angular_threshold {
            self.idle_steps += 1;
            if self.idle_steps >= params.idle_steps {
                self.disable();
            }
        } else {
            self.idle_steps = 0;
        }
    }
}

// ---------------------------------------------------------------------------
// NativeSpace
// ---------------------------------------------------------------------------

/// Group of geoms sharing a collision filter.
#[derive(Debug, Clone, Default)]
pub struct NativeSpace {
    pub parent: Option<SpaceId>,
    pub geoms: Vec<GeomId>,
    /// Whether geoms inside this space may collide with each other.
    pub collide_internal: bool,
}

// ---------------------------------------------------------------------------
// NativeWorld
// ---------------------------------------------------------------------------

/// All native bodies and spaces of one context.
#[derive(Debug)]
pub struct NativeWorld {
    bodies: SlotMap<NativeBodyId, NativeRigidBody>,
    spaces: SlotMap<SpaceId, NativeSpace>,
    root_space: SpaceId,
    gravity: NativeVec3,
    auto_disable: AutoDisableConfig,
    moved: Vec<PoseRefresh>,
}

impl NativeWorld {
    pub fn new(gravity: NativeVec3, auto_disable: AutoDisableConfig) -> Self {
        let mut spaces = SlotMap::with_key();
        let root_space = spaces.insert(NativeSpace {
            collide_internal: true,
            ..NativeSpace::default()
        });
        Self {
            bodies: SlotMap::with_key(),
            spaces,
            root_space,
            gravity,
            auto_disable,
            moved: Vec::new(),
        }
    }

    pub fn gravity(&self) -> NativeVec3 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: NativeVec3) {
        self.gravity = gravity;
    }

    // -- Bodies --

    pub fn create_body(&mut self, user_data: Option<BodyKey>) -> NativeBodyId {
        self.bodies.insert(NativeRigidBody::new(user_data))
    }

    pub fn destroy_body(&mut self, id: NativeBodyId) -> bool {
        self.bodies.remove(id).is_some()
    }

    pub fn body(&self, id: NativeBodyId) -> Option<&NativeRigidBody> {
        self.bodies.get(id)
    }

    pub fn body_mut(&mut self, id: NativeBodyId) -> Option<&mut NativeRigidBody> {
        self.bodies.get_mut(id)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    // -- Spaces --

    pub fn root_space(&self) -> SpaceId {
        self.root_space
    }

    pub fn create_space(&mut self, parent: SpaceId, collide_internal: bool) -> SpaceId {
        self.spaces.insert(NativeSpace {
            parent: Some(parent),
            geoms: Vec::new(),
            collide_internal,
        })
    }

    /// Destroy a space and drop its geom registrations. The root space
    /// cannot be destroyed.
    pub fn destroy_space(&mut self, id: SpaceId) -> bool {
        if id == self.root_space {
            return false;
        }
        self.spaces.remove(id).is_some()
    }

    /// Number of spaces, the root included.
    pub fn space_count(&self) -> usize {
        self.spaces.len()
    }

    pub fn space(&self, id: SpaceId) -> Option<&NativeSpace> {
        self.spaces.get(id)
    }

    pub fn space_mut(&mut self, id: SpaceId) -> Option<&mut NativeSpace> {
        self.spaces.get_mut(id)
    }

    pub fn space_add(&mut self, space: SpaceId, geom: GeomId) -> bool {
        match self.spaces.get_mut(space) {
            Some(s) if !s.geoms.contains(&geom) => {
                s.geoms.push(geom);
                true
            }
            _ => false,
        }
    }

    pub fn space_remove(&mut self, space: SpaceId, geom: GeomId) -> bool {
        let Some(s) = self.spaces.get_mut(space) else {
            return false;
        };
        let before = s.geoms.len();
        s.geoms.retain(|g| *g != geom);
        s.geoms.len() != before
    }

    /// Geom pairs whose bounding spheres overlap, skipping pairs inside a
    /// space that does not collide internally.
    pub fn candidate_pairs(&self, geoms: &GeomSet) -> Vec<(GeomId, GeomId)> {
        let entries: Vec<(GeomId, SpaceId, Vector3<f64>, f64)> = self
            .spaces
            .iter()
            .flat_map(|(space_id, space)| {
                space.geoms.iter().filter_map(move |id| {
                    geoms.get(*id).map(|g| {
                        (
                            *id,
                            space_id,
                            g.world_pose().translation.vector,
                            g.shape.bounding_radius(),
                        )
                    })
                })
            })
            .collect();

        let mut pairs = Vec::new();
        for (i, a) in entries.iter().enumerate() {
            for b in &entries[i + 1..] {
                if a.1 == b.1 && !self.spaces[a.1].collide_internal {
                    continue;
                }
                if (a.2 - b.2).norm() <= a.3 + b.3 {
                    pairs.push((a.0, b.0));
                }
            }
        }
        pairs
    }

    // -- Stepping --

    /// Integrate every enabled body by `dt`, clear force accumulators and
    /// queue a move notification for every body whose pose changed.
    pub fn step(&mut self, dt: f64) {
        let Self {
            bodies,
            gravity,
            auto_disable,
            moved,
            ..
        } = self;
        let gravity = from_native_vector(gravity);

        for body in bodies.values_mut() {
            if !body.enabled {
                body.clear_accumulators();
                continue;
            }
            let changed = if body.kinematic {
                body.integrate_kinematic(dt)
            } else {
                body.integrate_dynamic(&gravity, dt)
            };
            body.clear_accumulators();
            if auto_disable.enabled && !body.kinematic {
                body.track_idle(auto_disable);
            }
            if changed && let Some(key) = body.user_data {
                moved.push(PoseRefresh {
                    body: key,
                    pose: from_native_transform(&body.link_transform()),
                });
            }
        }
    }

    /// Take queued move notifications.
    pub fn take_moved(&mut self) -> Vec<PoseRefresh> {
        std::mem::take(&mut self.moved)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
