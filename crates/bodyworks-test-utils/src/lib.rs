//! Shared test fixtures and utilities for bodyworks crates.
//!
//! Provides seeded RNG and random pose generators, canned body
//! configurations, and a Bevy test-app builder.

pub mod app;
pub mod fixtures;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use app::physics_test_app;
pub use fixtures::{falling_body_config, kinematic_body_config, unit_box_geom};
pub use rng::{random_pose, random_vector, seeded_rng};
