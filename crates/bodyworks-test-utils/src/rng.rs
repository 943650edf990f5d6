//! Deterministic RNG utilities for reproducible tests.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Vector with each component uniform in `[-extent, extent]`.
pub fn random_vector(rng: &mut impl Rng, extent: f64) -> Vector3<f64> {
    Vector3::new(
        rng.gen_range(-extent..=extent),
        rng.gen_range(-extent..=extent),
        rng.gen_range(-extent..=extent),
    )
}

/// Pose with translation inside `[-extent, extent]^3` and a uniformly
/// distributed rotation.
pub fn random_pose(rng: &mut impl Rng, extent: f64) -> Isometry3<f64> {
    // Shoemake's method: three uniforms to a unit quaternion.
    let u1: f64 = rng.r#gen();
    let u2: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
    let u3: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
    let a = (1.0 - u1).sqrt();
    let b = u1.sqrt();
    let q = nalgebra::Quaternion::new(b * u3.cos(), a * u2.sin(), a * u2.cos(), b * u3.sin());
    Isometry3::from_parts(
        Translation3::from(random_vector(rng, extent)),
        UnitQuaternion::from_quaternion(q),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
