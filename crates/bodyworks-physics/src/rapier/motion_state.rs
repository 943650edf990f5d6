//! Motion-state bridge between a rapier rigid body and its owning body.
//!
//! The context holds one [`MotionState`] per live rapier body. After each
//! pipeline step it hands the bridge the body's new transform; a changed
//! transform becomes a [`PoseRefresh`] for the owner.

use rapier3d::math::{Isometry, Real};

use crate::body::BodyKey;
use crate::convert::rapier::from_rapier_isometry;
use crate::engine::PoseRefresh;

#[derive(Debug, Clone)]
pub struct MotionState {
    body: BodyKey,
    world_transform: Isometry<Real>,
    refreshes: u64,
}

impl MotionState {
    pub fn new(body: BodyKey, initial: Isometry<Real>) -> Self {
        Self {
            body,
            world_transform: initial,
            refreshes: 0,
        }
    }

    pub fn body(&self) -> BodyKey {
        self.body
    }

    /// Last transform seen by the bridge.
    pub fn world_transform(&self) -> Isometry<Real> {
        self.world_transform
    }

    /// Number of refreshes emitted so far.
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    /// Engine-side write. Returns a refresh when the transform moved.
    pub fn set_world_transform(&mut self, transform: &Isometry<Real>) -> Option<PoseRefresh> {
        if *transform == self.world_transform {
            return None;
        }
        self.world_transform = *transform;
        self.refreshes += 1;
        Some(PoseRefresh {
            body: self.body,
            pose: from_rapier_isometry(transform),
        })
    }

    /// Wrapper-side write after a teleport. Emits nothing.
    pub fn sync(&mut self, transform: Isometry<Real>) {
        self.world_transform = transform;
    }
}
