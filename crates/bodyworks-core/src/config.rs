use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_step_size() -> f64 {
    0.001
}
const fn default_gravity() -> [f64; 3] {
    [0.0, 0.0, -9.81]
}
const fn default_orientation() -> [f64; 4] {
    [1.0, 0.0, 0.0, 0.0]
}
const fn default_true() -> bool {
    true
}
const fn default_mass() -> f64 {
    1.0
}
const fn default_linear_threshold() -> f64 {
    0.01
}
const fn default_angular_threshold() -> f64 {
    0.01
}
const fn default_idle_steps() -> u32 {
    10
}
const fn default_solver_iterations() -> usize {
    4
}
fn default_body_name() -> String {
    "body".into()
}

fn check_finite(values: &[f64], field: &'static str) -> Result<(), ConfigError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ConfigError::NonFinite(field))
    }
}

// ---------------------------------------------------------------------------
// EngineKind
// ---------------------------------------------------------------------------

/// Which physics backend a context is built on.
///
/// Chosen once, when the context is constructed; bodies of different
/// backends never share a simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// In-crate ID-addressed world (ODE-style arrays, move notifications).
    #[default]
    Native,
    /// `rapier3d` world (motion-state bridge, compound colliders).
    Rapier,
}

// ---------------------------------------------------------------------------
// AutoDisableConfig
// ---------------------------------------------------------------------------

/// Automatic disabling of bodies that have come to rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoDisableConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Linear speed (m/s) below which a body counts as idle.
    #[serde(default = "default_linear_threshold")]
    pub linear_threshold: f64,
    /// Angular speed (rad/s) below which a body counts as idle.
    #[serde(default = "default_angular_threshold")]
    pub angular_threshold: f64,
    /// Consecutive idle steps before the body is disabled.
    #[serde(default = "default_idle_steps")]
    pub idle_steps: u32,
}

impl Default for AutoDisableConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            linear_threshold: default_linear_threshold(),
            angular_threshold: default_angular_threshold(),
            idle_steps: default_idle_steps(),
        }
    }
}

// ---------------------------------------------------------------------------
// PhysicsConfig
// ---------------------------------------------------------------------------

/// Global parameters of a physics engine context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
pub struct PhysicsConfig {
    /// Backend the context is built on (default: native).
    #[serde(default)]
    pub engine: EngineKind,

    /// Fixed step size in seconds (default: 0.001 = 1000 Hz).
    #[serde(default = "default_step_size")]
    pub step_size: f64,

    /// Gravity vector [x, y, z] in m/s^2.
    #[serde(default = "default_gravity")]
    pub gravity: [f64; 3],

    /// Constraint solver iterations per step (rapier only).
    #[serde(default = "default_solver_iterations")]
    pub solver_iterations: usize,

    #[serde(default)]
    pub auto_disable: AutoDisableConfig,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            step_size: default_step_size(),
            gravity: default_gravity(),
            solver_iterations: default_solver_iterations(),
            auto_disable: AutoDisableConfig::default(),
        }
    }
}

impl PhysicsConfig {
    /// Default configuration on the given backend.
    pub fn for_engine(engine: EngineKind) -> Self {
        Self {
            engine,
            ..Self::default()
        }
    }

    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(ConfigError::InvalidStepSize(self.step_size));
        }
        check_finite(&self.gravity, "gravity")?;
        if self.solver_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "solver_iterations".into(),
                message: "must be at least 1".into(),
            });
        }
        let ad = &self.auto_disable;
        check_finite(
            &[ad.linear_threshold, ad.angular_threshold],
            "auto_disable",
        )?;
        if ad.linear_threshold < 0.0 || ad.angular_threshold < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "auto_disable".into(),
                message: "thresholds must be >= 0".into(),
            });
        }
        Ok(())
    }

    /// Number of fixed steps covering `seconds` of simulated time.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn steps_for(&self, seconds: f64) -> usize {
        (seconds / self.step_size).round().max(0.0) as usize
    }

    /// Step rate in Hz.
    pub fn step_hz(&self) -> f64 {
        1.0 / self.step_size
    }

    /// Parse and validate from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

// ---------------------------------------------------------------------------
// BodyConfig
// ---------------------------------------------------------------------------

/// Description of one rigid body, consumed by `Body::load`.
///
/// Orientation is stored as `[w, x, y, z]`. Inertia, when given, is the
/// upper triangle `[ixx, ixy, ixz, iyy, iyz, izz]` about the centre of mass;
/// when absent it is computed from the attached geoms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    #[serde(default = "default_body_name")]
    pub name: String,
    #[serde(default = "default_mass")]
    pub mass: f64,
    #[serde(default)]
    pub inertia: Option<[f64; 6]>,
    #[serde(default)]
    pub center_of_mass: [f64; 3],
    #[serde(default)]
    pub position: [f64; 3],
    #[serde(default = "default_orientation")]
    pub orientation: [f64; 4],
    #[serde(default)]
    pub linear_velocity: [f64; 3],
    #[serde(default)]
    pub angular_velocity: [f64; 3],
    #[serde(default)]
    pub linear_damping: f64,
    #[serde(default)]
    pub angular_damping: f64,
    #[serde(default = "default_true")]
    pub gravity: bool,
    #[serde(default)]
    pub kinematic: bool,
    #[serde(default)]
    pub self_collide: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            name: default_body_name(),
            mass: default_mass(),
            inertia: None,
            center_of_mass: [0.0; 3],
            position: [0.0; 3],
            orientation: default_orientation(),
            linear_velocity: [0.0; 3],
            angular_velocity: [0.0; 3],
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity: true,
            kinematic: false,
            self_collide: false,
            enabled: true,
        }
    }
}

impl BodyConfig {
    /// Default configuration with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Validate configuration. Returns Err on physically invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.mass.is_finite() {
            return Err(ConfigError::NonFinite("mass"));
        }
        if self.mass <= 0.0 {
            return Err(ConfigError::NonPositiveMass(self.mass));
        }
        check_finite(&self.position, "position")?;
        check_finite(&self.orientation, "orientation")?;
        check_finite(&self.center_of_mass, "center_of_mass")?;
        check_finite(&self.linear_velocity, "linear_velocity")?;
        check_finite(&self.angular_velocity, "angular_velocity")?;

        let norm_sq: f64 = self.orientation.iter().map(|q| q * q).sum();
        if norm_sq < 1e-12 {
            return Err(ConfigError::InvalidValue {
                field: "orientation".into(),
                message: "zero-norm quaternion".into(),
            });
        }

        for (field, value) in [
            ("linear_damping", self.linear_damping),
            ("angular_damping", self.angular_damping),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite(field));
            }
            if value < 0.0 {
                return Err(ConfigError::NegativeDamping { field, value });
            }
        }

        if let Some(inertia) = &self.inertia {
            check_finite(inertia, "inertia")?;
            let [ixx, _, _, iyy, _, izz] = *inertia;
            if ixx <= 0.0 || iyy <= 0.0 || izz <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: "inertia".into(),
                    message: "principal moments must be > 0".into(),
                });
            }
        }
        Ok(())
    }

    /// Parse and validate from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
