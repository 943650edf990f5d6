//! ECS components linking entities to simulated bodies.
//!
//! The entity that owns a body (its parent) carries a [`BodyLink`]; the step
//! system mirrors the body's world pose into [`BodyPose`] after every step.

use bevy::prelude::*;
use nalgebra::Isometry3;

use crate::body::BodyKey;

/// Marks the parent entity of a simulated body.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLink(pub BodyKey);

/// World pose of the linked body after the last step.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct BodyPose(pub Isometry3<f64>);

impl Default for BodyPose {
    fn default() -> Self {
        Self(Isometry3::identity())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
