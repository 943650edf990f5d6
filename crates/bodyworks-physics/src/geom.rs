//! Collision shapes attached to bodies.
//!
//! Geoms live in a [`GeomSet`] owned by the physics engine context and are
//! referenced by [`GeomId`]. A body records which geoms it carries; detaching
//! or removing the body never destroys the geom itself, so a geom can be
//! re-attached elsewhere.

use std::f64::consts::PI;

use nalgebra::{Isometry3, Matrix3, Vector3};
use slotmap::{SlotMap, new_key_type};

use bodyworks_core::BackendError;

use crate::body::BodyKey;

new_key_type! {
    /// Key of a [`Geom`] inside a [`GeomSet`].
    pub struct GeomId;
}

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// Primitive collision shape. Cylinders and capsules run along local Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { radius: f64 },
    Box { half_extents: Vector3<f64> },
    Cylinder { radius: f64, half_height: f64 },
    Capsule { radius: f64, half_height: f64 },
}

impl Shape {
    pub fn volume(&self) -> f64 {
        match *self {
            Self::Sphere { radius } => 4.0 / 3.0 * PI * radius.powi(3),
            Self::Box { half_extents: h } => 8.0 * h.x * h.y * h.z,
            Self::Cylinder {
                radius,
                half_height,
            } => PI * radius * radius * 2.0 * half_height,
            Self::Capsule {
                radius,
                half_height,
            } => PI * radius * radius * 2.0 * half_height + 4.0 / 3.0 * PI * radius.powi(3),
        }
    }

    /// Inertia tensor about the shape's own origin for the given mass.
    pub fn inertia(&self, mass: f64) -> Matrix3<f64> {
        match *self {
            Self::Sphere { radius } => Matrix3::from_diagonal_element(0.4 * mass * radius * radius),
            Self::Box { half_extents: h } => {
                let (x2, y2, z2) = (h.x * h.x, h.y * h.y, h.z * h.z);
                Matrix3::from_diagonal(&Vector3::new(
                    mass / 3.0 * (y2 + z2),
                    mass / 3.0 * (x2 + z2),
                    mass / 3.0 * (x2 + y2),
                ))
            }
            Self::Cylinder {
                radius,
                half_height,
            } => {
                let r2 = radius * radius;
                let h2 = 4.0 * half_height * half_height;
                let side = mass * (3.0 * r2 + h2) / 12.0;
                Matrix3::from_diagonal(&Vector3::new(side, side, 0.5 * mass * r2))
            }
            Self::Capsule {
                radius,
                half_height,
            } => {
                let volume = self.volume();
                if volume <= 0.0 {
                    return Matrix3::zeros();
                }
                let r2 = radius * radius;
                let cyl_volume = PI * r2 * 2.0 * half_height;
                let m_cyl = mass * cyl_volume / volume;
                let m_caps = mass - m_cyl;
                let h = half_height;
                let side = m_cyl * (3.0 * r2 + 4.0 * h * h) / 12.0
                    + m_caps * (0.4 * r2 + h * h + 0.75 * h * radius);
                let axial = 0.5 * m_cyl * r2 + 0.4 * m_caps * r2;
                Matrix3::from_diagonal(&Vector3::new(side, side, axial))
            }
        }
    }

    /// Radius of a sphere around the shape origin enclosing the shape.
    pub fn bounding_radius(&self) -> f64 {
        match *self {
            Self::Sphere { radius } => radius,
            Self::Box { half_extents } => half_extents.norm(),
            Self::Cylinder {
                radius,
                half_height,
            } => radius.hypot(half_height),
            Self::Capsule {
                radius,
                half_height,
            } => radius + half_height,
        }
    }
}

// ---------------------------------------------------------------------------
// Geom
// ---------------------------------------------------------------------------

/// A collision shape placed at a pose relative to its body.
#[derive(Debug, Clone)]
pub struct Geom {
    pub name: String,
    pub shape: Shape,
    /// Pose of the shape in its body's frame.
    pub relative_pose: Isometry3<f64>,
    /// Density used to weight this geom's share of the body's mass.
    pub density: f64,
    world_pose: Isometry3<f64>,
    body: Option<BodyKey>,
    pose_updates: u64,
}

impl Geom {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            relative_pose: Isometry3::identity(),
            density: 1.0,
            world_pose: Isometry3::identity(),
            body: None,
            pose_updates: 0,
        }
    }

    #[must_use]
    pub fn with_relative_pose(mut self, pose: Isometry3<f64>) -> Self {
        self.relative_pose = pose;
        self
    }

    #[must_use]
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    /// Mass-weighting contribution to the owning body's aggregate.
    pub fn mass_weight(&self) -> f64 {
        (self.density * self.shape.volume()).max(0.0)
    }

    pub fn world_pose(&self) -> Isometry3<f64> {
        self.world_pose
    }

    pub fn body(&self) -> Option<BodyKey> {
        self.body
    }

    /// How many times a body has pushed its pose to this geom.
    pub fn pose_updates(&self) -> u64 {
        self.pose_updates
    }

    /// Notification from the owning body that its world pose changed.
    pub fn on_pose_change(&mut self, body_pose: &Isometry3<f64>) {
        self.world_pose = body_pose * self.relative_pose;
        self.pose_updates += 1;
    }
}

// ---------------------------------------------------------------------------
// GeomSet
// ---------------------------------------------------------------------------

/// Arena of every geom known to one engine context.
#[derive(Debug, Default)]
pub struct GeomSet {
    geoms: SlotMap<GeomId, Geom>,
}

impl GeomSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, geom: Geom) -> GeomId {
        self.geoms.insert(geom)
    }

    /// Remove a detached geom. Geoms still attached to a body are refused.
    pub fn remove(&mut self, id: GeomId) -> Result<Geom, BackendError> {
        let geom = self
            .geoms
            .get(id)
            .ok_or_else(|| BackendError::UnknownGeom(format!("{id:?}")))?;
        if let Some(owner) = geom.body {
            return Err(BackendError::GeomOwned {
                geom: format!("{id:?}"),
                owner: format!("{owner:?}"),
            });
        }
        self.geoms
            .remove(id)
            .ok_or_else(|| BackendError::UnknownGeom(format!("{id:?}")))
    }

    pub fn get(&self, id: GeomId) -> Option<&Geom> {
        self.geoms.get(id)
    }

    pub fn get_mut(&mut self, id: GeomId) -> Option<&mut Geom> {
        self.geoms.get_mut(id)
    }

    pub fn contains(&self, id: GeomId) -> bool {
        self.geoms.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.geoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geoms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GeomId, &Geom)> {
        self.geoms.iter()
    }

    /// Mark `id` as carried by `body`.
    ///
    /// Returns `Ok(false)` if `body` already carries it, and an error if
    /// another body does.
    pub(crate) fn claim(&mut self, id: GeomId, body: BodyKey) -> Result<bool, BackendError> {
        let geom = self
            .geoms
            .get_mut(id)
            .ok_or_else(|| BackendError::UnknownGeom(format!("{id:?}")))?;
        match geom.body {
            Some(owner) if owner == body => Ok(false),
            Some(owner) => Err(BackendError::GeomOwned {
                geom: format!("{id:?}"),
                owner: format!("{owner:?}"),
            }),
            None => {
                geom.body = Some(body);
                Ok(true)
            }
        }
    }

    /// Clear the owner of `id` if it is `body`. Returns whether it was.
    pub(crate) fn release(&mut self, id: GeomId, body: BodyKey) -> bool {
        match self.geoms.get_mut(id) {
            Some(geom) if geom.body == Some(body) => {
                geom.body = None;
                true
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate mass properties
// ---------------------------------------------------------------------------

/// Centre of mass and inertia of a body assembled from its geoms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateMass {
    /// Centre of mass in the body frame.
    pub center_of_mass: Vector3<f64>,
    /// Inertia about the centre of mass, body-frame axes.
    pub inertia: Matrix3<f64>,
}

/// Distribute `total_mass` over the geoms by mass weight and compose their
/// inertias about the common centre of mass.
///
/// Returns `None` when the geoms carry no weight (no geoms, or all
/// zero-volume/zero-density).
pub fn aggregate_mass_properties(
    geoms: &GeomSet,
    ids: &[GeomId],
    total_mass: f64,
) -> Option<AggregateMass> {
    let parts: Vec<&Geom> = ids.iter().filter_map(|id| geoms.get(*id)).collect();
    let total_weight: f64 = parts.iter().map(|g| g.mass_weight()).sum();
    if total_weight <= 0.0 {
        return None;
    }

    let mut com = Vector3::zeros();
    for geom in &parts {
        let m = total_mass * geom.mass_weight() / total_weight;
        com += geom.relative_pose.translation.vector * m;
    }
    com /= total_mass;

    let mut inertia = Matrix3::zeros();
    for geom in &parts {
        let m = total_mass * geom.mass_weight() / total_weight;
        let rot = geom.relative_pose.rotation.to_rotation_matrix();
        let local = rot.matrix() * geom.shape.inertia(m) * rot.matrix().transpose();
        // Parallel-axis shift to the aggregate centre of mass.
        let d = geom.relative_pose.translation.vector - com;
        let shift = (Matrix3::identity() * d.norm_squared() - d * d.transpose()) * m;
        inertia += local + shift;
    }

    Some(AggregateMass {
        center_of_mass: com,
        inertia,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
