//! Aggregation of a body's geoms into one rapier collider.
//!
//! A single geom becomes a plain collider offset by its relative pose; more
//! than one become a compound shape. Colliders carry zero density, so the
//! body's mass properties are exactly those supplied by the wrapper.

use std::f32::consts::FRAC_PI_2;

use rapier3d::math::{Isometry, Real, Vector};
use rapier3d::prelude::{ColliderBuilder, ColliderHandle, RigidBodyHandle, SharedShape};

use crate::convert::rapier::to_rapier_isometry;
use crate::geom::{GeomId, GeomSet, Shape};

use super::context::RapierWorld;

/// Rapier shape for `shape` plus the local correction that puts its axis
/// on Z.
#[allow(clippy::cast_possible_truncation)]
pub fn rapier_shape(shape: &Shape) -> (SharedShape, Isometry<Real>) {
    match *shape {
        Shape::Sphere { radius } => (SharedShape::ball(radius as Real), Isometry::identity()),
        Shape::Box { half_extents: h } => (
            SharedShape::cuboid(h.x as Real, h.y as Real, h.z as Real),
            Isometry::identity(),
        ),
        Shape::Cylinder {
            radius,
            half_height,
        } => (
            // rapier cylinders run along Y
            SharedShape::cylinder(half_height as Real, radius as Real),
            Isometry::rotation(Vector::x() * FRAC_PI_2),
        ),
        Shape::Capsule {
            radius,
            half_height,
        } => (
            SharedShape::capsule_z(half_height as Real, radius as Real),
            Isometry::identity(),
        ),
    }
}

/// Collision shape of a whole body and its pose in the body frame.
pub struct CompoundShape {
    pub shape: SharedShape,
    pub local_pose: Isometry<Real>,
    pub parts: usize,
}

impl CompoundShape {
    /// Build from the geoms in `ids`. `None` when no geom resolves.
    pub fn build(geoms: &GeomSet, ids: &[GeomId]) -> Option<Self> {
        let mut parts: Vec<(Isometry<Real>, SharedShape)> = ids
            .iter()
            .filter_map(|id| geoms.get(*id))
            .map(|geom| {
                let (shape, correction) = rapier_shape(&geom.shape);
                (to_rapier_isometry(&geom.relative_pose) * correction, shape)
            })
            .collect();

        match parts.len() {
            0 => None,
            1 => parts.pop().map(|(local_pose, shape)| Self {
                shape,
                local_pose,
                parts: 1,
            }),
            n => Some(Self {
                shape: SharedShape::compound(parts),
                local_pose: Isometry::identity(),
                parts: n,
            }),
        }
    }
}

/// Replace the collider of `body` with one built from `ids`.
///
/// Removes `previous` if given. Returns the new collider handle, or `None`
/// when the body carries no geoms.
pub fn rebuild_collider(
    world: &mut RapierWorld,
    body: RigidBodyHandle,
    previous: Option<ColliderHandle>,
    geoms: &GeomSet,
    ids: &[GeomId],
) -> Option<ColliderHandle> {
    if let Some(handle) = previous {
        world.collider_set.remove(
            handle,
            &mut world.island_manager,
            &mut world.rigid_body_set,
            true,
        );
    }
    let compound = CompoundShape::build(geoms, ids)?;
    let collider = ColliderBuilder::new(compound.shape)
        .position(compound.local_pose)
        .density(0.0)
        .build();
    Some(
        world
            .collider_set
            .insert_with_parent(collider, body, &mut world.rigid_body_set),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use nalgebra::{Isometry3, Vector3};
    use rapier3d::prelude::RigidBodyBuilder;

    use super::*;
    use crate::geom::Geom;

    #[test]
    fn no_geoms_no_shape() {
        assert!(CompoundShape::build(&GeomSet::new(), &[]).is_none());
    }

    #[test]
    fn single_geom_keeps_relative_pose() {
        let mut geoms = GeomSet::new();
        let id = geoms.insert(
            Geom::new("ball", Shape::Sphere { radius: 0.2 })
                .with_relative_pose(Isometry3::translation(0.0, 0.0, 1.0)),
        );
        let compound = CompoundShape::build(&geoms, &[id]).unwrap();
        assert_eq!(compound.parts, 1);
        assert!((compound.local_pose.translation.z - 1.0).abs() < 1e-6);
        assert!(compound.shape.as_ball().is_some());
    }

    #[test]
    fn several_geoms_make_a_compound() {
        let mut geoms = GeomSet::new();
        let a = geoms.insert(Geom::new("a", Shape::Sphere { radius: 0.2 }));
        let b = geoms.insert(Geom::new(
            "b",
            Shape::Box {
                half_extents: Vector3::new(0.1, 0.2, 0.3),
            },
        ));
        let compound = CompoundShape::build(&geoms, &[a, b]).unwrap();
        assert_eq!(compound.parts, 2);
        assert!(compound.shape.as_compound().is_some());
    }

    #[test]
    fn cylinder_axis_is_turned_onto_z() {
        let (_, correction) = rapier_shape(&Shape::Cylinder {
            radius: 0.1,
            half_height: 1.0,
        });
        let axis = correction * Vector::y();
        assert!((axis.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rebuild_replaces_previous_collider() {
        let mut world = RapierWorld::new();
        let body = world
            .rigid_body_set
            .insert(RigidBodyBuilder::dynamic().build());
        let mut geoms = GeomSet::new();
        let a = geoms.insert(Geom::new("a", Shape::Sphere { radius: 0.2 }));

        let first = rebuild_collider(&mut world, body, None, &geoms, &[a]);
        assert!(first.is_some());
        assert_eq!(world.collider_set.len(), 1);

        let second = rebuild_collider(&mut world, body, first, &geoms, &[a]);
        assert_eq!(world.collider_set.len(), 1);
        assert_ne!(first, second);

        assert!(rebuild_collider(&mut world, body, second, &geoms, &[]).is_none());
        assert_eq!(world.collider_set.len(), 0);
    }

    #[test]
    fn collider_has_no_mass() {
        let mut world = RapierWorld::new();
        let body = world
            .rigid_body_set
            .insert(RigidBodyBuilder::dynamic().build());
        let mut geoms = GeomSet::new();
        let a = geoms.insert(Geom::new("a", Shape::Sphere { radius: 1.0 }));
        let handle = rebuild_collider(&mut world, body, None, &geoms, &[a]).unwrap();
        assert!(world.collider_set[handle].mass().abs() < 1e-9);
    }
}
