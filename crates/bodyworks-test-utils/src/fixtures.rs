//! Canned body configurations and geoms.

use bodyworks_core::BodyConfig;
use nalgebra::Vector3;
use bodyworks_physics::geom::{Geom, Shape};

/// Dynamic 1 kg body at `height` on the z axis, undamped, gravity on.
pub fn falling_body_config(height: f64) -> BodyConfig {
    BodyConfig {
        name: "falling".into(),
        mass: 1.0,
        position: [0.0, 0.0, height],
        ..BodyConfig::default()
    }
}

/// Kinematic body moving at constant `velocity`.
pub fn kinematic_body_config(velocity: [f64; 3]) -> BodyConfig {
    BodyConfig {
        name: "kinematic".into(),
        kinematic: true,
        linear_velocity: velocity,
        ..BodyConfig::default()
    }
}

/// Unit cube geom of `mass` at the body origin.
pub fn unit_box_geom(mass: f64) -> Geom {
    Geom::new(
        "unit_box",
        Shape::Box {
            half_extents: Vector3::repeat(0.5),
        },
    )
    .with_density(mass)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
