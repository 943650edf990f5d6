//! Raw `rapier3d` physics backend.
//!
//! We own the [`PhysicsPipeline`](rapier3d::pipeline::PhysicsPipeline), call
//! `step()` ourselves, and route transforms back to the bodies through one
//! motion-state bridge per rigid body.

pub mod backend;
pub mod body;
pub mod compound;
pub mod context;
pub mod motion_state;

pub use backend::RapierBackend;
pub use body::RapierBody;
pub use context::{RapierEngine, RapierWorld};
pub use motion_state::MotionState;
