//! Bevy systems driving a [`Simulation`].

use bevy::prelude::*;

use crate::body::Body;
use crate::components::{BodyLink, BodyPose};
use crate::engine::PhysicsEngine;
use crate::simulation::Simulation;

/// Run one engine step and mirror body poses onto their parent entities.
#[allow(clippy::needless_pass_by_value)]
pub fn step_simulation<E: PhysicsEngine>(
    mut sim: ResMut<Simulation<E>>,
    mut poses: Query<(&BodyLink, &mut BodyPose)>,
) {
    if let Err(err) = sim.step() {
        tracing::warn!(%err, engine = sim.engine().name(), "physics step skipped");
        return;
    }
    for (link, mut pose) in &mut poses {
        if let Some(body) = sim.body(link.0) {
            pose.0 = body.world_pose();
        }
    }
}
