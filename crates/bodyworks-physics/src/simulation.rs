//! Fixed-step simulation loop over one engine context.
//!
//! [`Simulation`] owns a context and every body created in it. One call to
//! [`Simulation::step`] runs exactly one engine step, routes the pose
//! refreshes produced during it to their bodies, then ticks every body once.
//! All other mutation happens between steps.

use bevy::prelude::{Entity, Resource};
use nalgebra::{Isometry3, Vector3};
use slotmap::SlotMap;

use bodyworks_core::{BackendError, BodyConfig, BodyError, ConfigError, EngineKind, PhysicsConfig};

use crate::body::{Body, BodyKey};
use crate::engine::PhysicsEngine;
use crate::geom::{Geom, GeomId};
use crate::native::NativeEngine;
use crate::rapier::RapierEngine;

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// One engine context plus the bodies living in it.
#[derive(Resource)]
pub struct Simulation<E: PhysicsEngine> {
    config: PhysicsConfig,
    engine: E,
    bodies: SlotMap<BodyKey, E::Body>,
    steps: u64,
}

impl<E: PhysicsEngine> Simulation<E> {
    /// Validate `config`, build the context and initialise it.
    pub fn new(config: PhysicsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut engine = E::from_config(&config);
        engine.init();
        Ok(Self {
            config,
            engine,
            bodies: SlotMap::with_key(),
            steps: 0,
        })
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Steps taken since construction.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Simulated time in seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn time(&self) -> f64 {
        self.steps as f64 * self.engine.step_size()
    }

    // -- Geoms --

    pub fn add_geom(&mut self, geom: Geom) -> GeomId {
        self.engine.geoms_mut().insert(geom)
    }

    /// Destroy a geom that no body carries.
    pub fn remove_geom(&mut self, id: GeomId) -> Result<Geom, BackendError> {
        self.engine.geoms_mut().remove(id)
    }

    pub fn geom(&self, id: GeomId) -> Option<&Geom> {
        self.engine.geoms().get(id)
    }

    // -- Bodies --

    /// Load, attach `geoms`, and initialise a new body.
    ///
    /// Nothing is left behind on failure: the body is removed and any geoms
    /// it had claimed are released.
    pub fn spawn_body(
        &mut self,
        parent: Entity,
        config: &BodyConfig,
        geoms: &[GeomId],
    ) -> Result<BodyKey, BodyError> {
        let engine = &mut self.engine;
        let key = self
            .bodies
            .insert_with_key(|key| engine.create_body(parent, key));

        let result = realise(&mut self.bodies[key], engine, config, geoms);
        if let Err(err) = result {
            if let Some(mut body) = self.bodies.remove(key) {
                body.remove_from_physics(engine);
            }
            tracing::warn!(%err, body = %config.name, "body spawn failed");
            return Err(err);
        }
        Ok(key)
    }

    pub fn body(&self, key: BodyKey) -> Option<&E::Body> {
        self.bodies.get(key)
    }

    /// Run `f` with mutable access to one body and the context.
    pub fn with_body<R>(
        &mut self,
        key: BodyKey,
        f: impl FnOnce(&mut E::Body, &mut E) -> R,
    ) -> Option<R> {
        let body = self.bodies.get_mut(key)?;
        Some(f(body, &mut self.engine))
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyKey, &E::Body)> {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Detach a body from physics and drop it. Its geoms stay in the set.
    pub fn remove_body(&mut self, key: BodyKey) -> Option<E::Body> {
        let mut body = self.bodies.remove(key)?;
        body.remove_from_physics(&mut self.engine);
        Some(body)
    }

    // -- Convenience accessors --

    pub fn world_pose(&self, key: BodyKey) -> Option<Isometry3<f64>> {
        self.body(key).map(Body::world_pose)
    }

    pub fn set_world_pose(&mut self, key: BodyKey, pose: Isometry3<f64>) -> bool {
        self.with_body(key, |body, engine| body.set_world_pose(engine, pose))
            .is_some()
    }

    pub fn world_linear_vel(&self, key: BodyKey) -> Option<Vector3<f64>> {
        self.body(key).map(|b| b.world_linear_vel(&self.engine))
    }

    pub fn world_angular_vel(&self, key: BodyKey) -> Option<Vector3<f64>> {
        self.body(key).map(|b| b.world_angular_vel(&self.engine))
    }

    // -- Stepping --

    /// Advance by exactly one engine step.
    pub fn step(&mut self) -> Result<(), BackendError> {
        self.engine.step()?;

        for refresh in self.engine.drain_pose_refreshes() {
            match self.bodies.get_mut(refresh.body) {
                Some(body) => body.on_pose_refresh(&mut self.engine, refresh.pose),
                None => tracing::trace!(body = ?refresh.body, "refresh for a removed body"),
            }
        }
        for body in self.bodies.values_mut() {
            body.update(&mut self.engine);
        }

        self.steps += 1;
        Ok(())
    }

    /// Step `round(seconds / step_size)` times. Returns the number of steps.
    pub fn step_for(&mut self, seconds: f64) -> Result<usize, BackendError> {
        let n = self.config.steps_for(seconds);
        for _ in 0..n {
            self.step()?;
        }
        Ok(n)
    }

    /// Tear the context down and build it again, re-initialising every body
    /// in the new world. State cached in the bodies carries over.
    ///
    /// A body that fails to initialise does not stop the others; the first
    /// failure is returned once every body has been tried.
    pub fn reinitialize(&mut self) -> Result<(), BackendError> {
        for body in self.bodies.values_mut() {
            body.fini(&mut self.engine);
        }
        self.engine.fini();
        self.engine.init();

        let mut first_err = None;
        for body in self.bodies.values_mut() {
            if let Err(err) = body.init(&mut self.engine) {
                tracing::warn!(%err, body = %body.name(), "body not re-initialised");
                first_err.get_or_insert(err);
            }
        }
        tracing::debug!(
            engine = self.engine.name(),
            epoch = self.engine.epoch(),
            bodies = self.bodies.len(),
            "simulation reinitialised"
        );
        first_err.map_or(Ok(()), Err)
    }
}

fn realise<E: PhysicsEngine>(
    body: &mut E::Body,
    engine: &mut E,
    config: &BodyConfig,
    geoms: &[GeomId],
) -> Result<(), BodyError> {
    body.load(config)?;
    for geom in geoms {
        body.attach_geom(engine, *geom)?;
    }
    body.init(engine)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// AnySimulation
// ---------------------------------------------------------------------------

/// A simulation on whichever backend the configuration names.
#[derive(Resource)]
pub enum AnySimulation {
    Native(Simulation<NativeEngine>),
    Rapier(Simulation<RapierEngine>),
}

macro_rules! dispatch {
    ($self:expr, $sim:ident => $body:expr) => {
        match $self {
            AnySimulation::Native($sim) => $body,
            AnySimulation::Rapier($sim) => $body,
        }
    };
}

impl AnySimulation {
    pub fn from_config(config: PhysicsConfig) -> Result<Self, ConfigError> {
        Ok(match config.engine {
            EngineKind::Native => Self::Native(Simulation::new(config)?),
            EngineKind::Rapier => Self::Rapier(Simulation::new(config)?),
        })
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            Self::Native(_) => EngineKind::Native,
            Self::Rapier(_) => EngineKind::Rapier,
        }
    }

    pub fn engine_name(&self) -> &'static str {
        dispatch!(self, sim => sim.engine().name())
    }

    pub fn time(&self) -> f64 {
        dispatch!(self, sim => sim.time())
    }

    pub fn body_count(&self) -> usize {
        dispatch!(self, sim => sim.body_count())
    }

    pub fn add_geom(&mut self, geom: Geom) -> GeomId {
        dispatch!(self, sim => sim.add_geom(geom))
    }

    pub fn spawn_body(
        &mut self,
        parent: Entity,
        config: &BodyConfig,
        geoms: &[GeomId],
    ) -> Result<BodyKey, BodyError> {
        dispatch!(self, sim => sim.spawn_body(parent, config, geoms))
    }

    pub fn remove_body(&mut self, key: BodyKey) -> bool {
        dispatch!(self, sim => sim.remove_body(key).is_some())
    }

    pub fn world_pose(&self, key: BodyKey) -> Option<Isometry3<f64>> {
        dispatch!(self, sim => sim.world_pose(key))
    }

    pub fn set_world_pose(&mut self, key: BodyKey, pose: Isometry3<f64>) -> bool {
        dispatch!(self, sim => sim.set_world_pose(key, pose))
    }

    pub fn world_linear_vel(&self, key: BodyKey) -> Option<Vector3<f64>> {
        dispatch!(self, sim => sim.world_linear_vel(key))
    }

    pub fn step(&mut self) -> Result<(), BackendError> {
        dispatch!(self, sim => sim.step())
    }

    pub fn step_for(&mut self, seconds: f64) -> Result<usize, BackendError> {
        dispatch!(self, sim => sim.step_for(seconds))
    }

    pub fn reinitialize(&mut self) -> Result<(), BackendError> {
        dispatch!(self, sim => sim.reinitialize())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
