// bodyworks-core: Errors and configuration for the backend-neutral body layer.

pub mod config;
pub mod error;

pub use config::{BodyConfig, EngineKind, PhysicsConfig};
pub use error::{BackendError, BodyError, ConfigError, UnsupportedOperation};
