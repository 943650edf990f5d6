//! Conversions between the simulator's math types and each backend's native
//! representation.
//!
//! The simulator works in `f64` nalgebra types ([`Vector3`], [`UnitQuaternion`],
//! [`Isometry3`]). Configuration files use the flat array form ([`FlatPose`]),
//! with quaternions written `[w, x, y, z]`. The native backend speaks
//! ODE-style arrays (also `[w, x, y, z]`), while rapier stores `f32`
//! quaternions as `[x, y, z, w]` internally.
//!
//! All conversions are component-wise and never renormalise, so a value
//! taken to a backend and back only loses what the backend's scalar width
//! loses.

use nalgebra::{Isometry3, Matrix3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// FlatPose
// ---------------------------------------------------------------------------

/// Array form of a pose as it appears in body descriptions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatPose {
    pub position: [f64; 3],
    /// `[w, x, y, z]`
    pub orientation: [f64; 4],
}

impl Default for FlatPose {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            orientation: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

pub fn vector_from_array(v: [f64; 3]) -> Vector3<f64> {
    Vector3::new(v[0], v[1], v[2])
}

pub fn vector_to_array(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

/// `[w, x, y, z]` to a unit quaternion, components copied as-is.
pub fn quaternion_from_wxyz(q: [f64; 4]) -> UnitQuaternion<f64> {
    UnitQuaternion::new_unchecked(Quaternion::new(q[0], q[1], q[2], q[3]))
}

pub fn quaternion_to_wxyz(q: &UnitQuaternion<f64>) -> [f64; 4] {
    [q.w, q.i, q.j, q.k]
}

/// Flat pose to isometry. The orientation is normalised here, since this is
/// the entry point for hand-written configuration.
pub fn pose_from_flat(flat: &FlatPose) -> Isometry3<f64> {
    let [w, x, y, z] = flat.orientation;
    Isometry3::from_parts(
        Translation3::new(flat.position[0], flat.position[1], flat.position[2]),
        UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)),
    )
}

pub fn pose_to_flat(pose: &Isometry3<f64>) -> FlatPose {
    FlatPose {
        position: vector_to_array(&pose.translation.vector),
        orientation: quaternion_to_wxyz(&pose.rotation),
    }
}

/// Upper-triangle `[ixx, ixy, ixz, iyy, iyz, izz]` to a symmetric tensor.
pub fn inertia_from_upper(i: [f64; 6]) -> Matrix3<f64> {
    Matrix3::new(i[0], i[1], i[2], i[1], i[3], i[4], i[2], i[4], i[5])
}

// ---------------------------------------------------------------------------
// Native (ODE-style arrays)
// ---------------------------------------------------------------------------

/// Conversions for the in-crate native world.
pub mod native {
    use super::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};

    /// Native vector, `[x, y, z]`.
    pub type NativeVec3 = [f64; 3];
    /// Native quaternion, `[w, x, y, z]`.
    pub type NativeQuat = [f64; 4];

    /// Position and orientation as the native world stores them.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct NativeTransform {
        pub position: NativeVec3,
        pub rotation: NativeQuat,
    }

    impl NativeTransform {
        pub const IDENTITY: Self = Self {
            position: [0.0; 3],
            rotation: [1.0, 0.0, 0.0, 0.0],
        };
    }

    pub fn to_native_vector(v: &Vector3<f64>) -> NativeVec3 {
        [v.x, v.y, v.z]
    }

    pub fn from_native_vector(v: &NativeVec3) -> Vector3<f64> {
        Vector3::new(v[0], v[1], v[2])
    }

    pub fn to_native_quaternion(q: &UnitQuaternion<f64>) -> NativeQuat {
        [q.w, q.i, q.j, q.k]
    }

    pub fn from_native_quaternion(q: &NativeQuat) -> UnitQuaternion<f64> {
        UnitQuaternion::new_unchecked(Quaternion::new(q[0], q[1], q[2], q[3]))
    }

    pub fn to_native_transform(pose: &Isometry3<f64>) -> NativeTransform {
        NativeTransform {
            position: to_native_vector(&pose.translation.vector),
            rotation: to_native_quaternion(&pose.rotation),
        }
    }

    pub fn from_native_transform(t: &NativeTransform) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(t.position[0], t.position[1], t.position[2]),
            from_native_quaternion(&t.rotation),
        )
    }
}

// ---------------------------------------------------------------------------
// Rapier (f32 nalgebra types re-exported by rapier3d)
// ---------------------------------------------------------------------------

/// Conversions for the rapier backend.
#[allow(clippy::cast_possible_truncation)]
pub mod rapier {
    use rapier3d::math::{Isometry, Point, Real, Rotation, Vector};
    use rapier3d::na;

    use super::{Isometry3, Matrix3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};

    pub fn to_rapier_vector(v: &Vector3<f64>) -> Vector<Real> {
        Vector::new(v.x as Real, v.y as Real, v.z as Real)
    }

    pub fn from_rapier_vector(v: &Vector<Real>) -> Vector3<f64> {
        Vector3::new(f64::from(v.x), f64::from(v.y), f64::from(v.z))
    }

    pub fn to_rapier_point(p: &Point3<f64>) -> Point<Real> {
        Point::new(p.x as Real, p.y as Real, p.z as Real)
    }

    pub fn from_rapier_point(p: &Point<Real>) -> Point3<f64> {
        Point3::new(f64::from(p.x), f64::from(p.y), f64::from(p.z))
    }

    /// Components are copied by name; rapier's storage order is `[x, y, z, w]`.
    pub fn to_rapier_rotation(q: &UnitQuaternion<f64>) -> Rotation<Real> {
        Rotation::new_unchecked(na::Quaternion::new(
            q.w as Real,
            q.i as Real,
            q.j as Real,
            q.k as Real,
        ))
    }

    pub fn from_rapier_rotation(q: &Rotation<Real>) -> UnitQuaternion<f64> {
        UnitQuaternion::new_unchecked(Quaternion::new(
            f64::from(q.w),
            f64::from(q.i),
            f64::from(q.j),
            f64::from(q.k),
        ))
    }

    pub fn to_rapier_isometry(pose: &Isometry3<f64>) -> Isometry<Real> {
        Isometry::from_parts(
            na::Translation3::from(to_rapier_vector(&pose.translation.vector)),
            to_rapier_rotation(&pose.rotation),
        )
    }

    pub fn from_rapier_isometry(iso: &Isometry<Real>) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(from_rapier_vector(&iso.translation.vector)),
            from_rapier_rotation(&iso.rotation),
        )
    }

    pub fn to_rapier_matrix(m: &Matrix3<f64>) -> na::Matrix3<Real> {
        na::Matrix3::new(
            m[(0, 0)] as Real,
            m[(0, 1)] as Real,
            m[(0, 2)] as Real,
            m[(1, 0)] as Real,
            m[(1, 1)] as Real,
            m[(1, 2)] as Real,
            m[(2, 0)] as Real,
            m[(2, 1)] as Real,
            m[(2, 2)] as Real,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use bodyworks_test_utils::{random_pose, random_vector, seeded_rng};

    use super::native::*;
    use super::rapier::*;
    use super::*;

    #[test]
    fn native_vector_preserves_components() {
        let v = Vector3::new(1.5, -2.25, 1e-9);
        assert_eq!(to_native_vector(&v), [1.5, -2.25, 1e-9]);
        assert_eq!(from_native_vector(&to_native_vector(&v)), v);
    }

    #[test]
    fn native_quaternion_is_wxyz() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.5);
        let n = to_native_quaternion(&q);
        assert_eq!(n[0], q.w);
        assert_eq!(n[1], q.i);
        assert_eq!(n[2], q.j);
        assert_eq!(n[3], q.k);
    }

    #[test]
    fn native_pose_round_trip_is_bit_identical() {
        let mut rng = seeded_rng(7);
        for _ in 0..500 {
            let pose = random_pose(&mut rng, 50.0);
            let back = from_native_transform(&to_native_transform(&pose));
            assert_eq!(back.translation.vector, pose.translation.vector);
            assert_eq!(back.rotation.coords, pose.rotation.coords);
        }
    }

    #[test]
    fn rapier_rotation_keeps_component_names() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 1.0);
        let r = to_rapier_rotation(&q);
        assert_relative_eq!(f64::from(r.w), q.w, epsilon = 1e-7);
        assert_relative_eq!(f64::from(r.i), q.i, epsilon = 1e-7);
        assert_relative_eq!(f64::from(r.j), q.j, epsilon = 1e-7);
        assert_relative_eq!(f64::from(r.k), q.k, epsilon = 1e-7);
    }

    #[test]
    fn rapier_pose_round_trip_within_f32() {
        let mut rng = seeded_rng(11);
        for _ in 0..500 {
            let pose = random_pose(&mut rng, 50.0);
            let back = from_rapier_isometry(&to_rapier_isometry(&pose));
            assert_relative_eq!(
                back.translation.vector,
                pose.translation.vector,
                epsilon = 1e-4
            );
            assert_relative_eq!(back.rotation.coords, pose.rotation.coords, epsilon = 1e-6);
        }
    }

    #[test]
    fn rapier_vector_round_trip_within_f32() {
        let mut rng = seeded_rng(3);
        for _ in 0..200 {
            let v = random_vector(&mut rng, 100.0);
            let back = from_rapier_vector(&to_rapier_vector(&v));
            assert_relative_eq!(back, v, epsilon = 1e-4);
        }
    }

    #[test]
    fn rapier_f32_values_round_trip_exactly() {
        // Values already representable in f32 survive bit-for-bit.
        let v = Vector3::new(0.5, -3.0, 1024.25);
        assert_eq!(from_rapier_vector(&to_rapier_vector(&v)), v);
    }

    #[test]
    fn flat_pose_round_trip() {
        let mut rng = seeded_rng(5);
        for _ in 0..200 {
            let pose = random_pose(&mut rng, 10.0);
            let back = pose_from_flat(&pose_to_flat(&pose));
            assert_relative_eq!(back, pose, epsilon = 1e-12);
        }
    }

    #[test]
    fn flat_pose_normalizes_orientation() {
        let flat = FlatPose {
            position: [1.0, 2.0, 3.0],
            orientation: [2.0, 0.0, 0.0, 0.0],
        };
        let pose = pose_from_flat(&flat);
        assert_relative_eq!(pose.rotation.w, 1.0);
        assert_relative_eq!(pose.translation.vector, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn wxyz_helpers_match_nalgebra_layout() {
        let q = quaternion_from_wxyz([0.0, 1.0, 0.0, 0.0]);
        // nalgebra stores [x, y, z, w]
        assert_eq!(q.coords.as_slice(), &[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(quaternion_to_wxyz(&q), [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn inertia_from_upper_is_symmetric() {
        let m = inertia_from_upper([1.0, 0.1, 0.2, 2.0, 0.3, 3.0]);
        assert_eq!(m, m.transpose());
        assert_eq!(m[(0, 1)], 0.1);
        assert_eq!(m[(1, 2)], 0.3);
        assert_eq!(m[(2, 2)], 3.0);
    }
}
