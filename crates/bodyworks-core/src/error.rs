use thiserror::Error;

/// Top-level error type for body operations.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Unsupported operation: {0}")]
    Unsupported(#[from] UnsupportedOperation),
}

/// Malformed or physically invalid body/physics description.
///
/// Fatal to the `load` of the body that produced it, never to the whole
/// simulation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid mass: {0} (must be > 0)")]
    NonPositiveMass(f64),

    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("Invalid step_size: {0} (must be > 0)")]
    InvalidStepSize(f64),

    #[error("Negative damping for {field}: {value}")]
    NegativeDamping { field: &'static str, value: f64 },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Lifecycle violations against a physics engine context.
///
/// These indicate a contract breach by the caller (double `init`, use of a
/// handle from a destroyed world) and abort initialisation of the affected
/// body only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Physics engine context is not initialized")]
    ContextUninitialized,

    #[error("Body '{0}' is already initialized")]
    AlreadyInitialized(String),

    #[error("Body '{0}' has not been loaded")]
    NotLoaded(String),

    #[error("Body '{0}' holds a handle from a previous engine epoch")]
    StaleHandle(String),

    #[error("Unknown geom: {0}")]
    UnknownGeom(String),

    #[error("Geom {geom} is already attached to body '{owner}'")]
    GeomOwned { geom: String, owner: String },
}

/// A capability the active backend does not implement.
///
/// Copy + static strings so callers can match on it cheaply and distinguish
/// capability gaps from silent no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{operation} is not supported by the {backend} backend")]
pub struct UnsupportedOperation {
    pub backend: &'static str,
    pub operation: &'static str,
}

impl UnsupportedOperation {
    pub const fn new(backend: &'static str, operation: &'static str) -> Self {
        Self { backend, operation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_error_from_config_error() {
        let err = ConfigError::NonPositiveMass(-1.0);
        let body_err: BodyError = err.into();
        assert!(matches!(body_err, BodyError::Config(_)));
        assert!(body_err.to_string().contains("-1"));
    }

    #[test]
    fn body_error_from_backend_error() {
        let err = BackendError::ContextUninitialized;
        let body_err: BodyError = err.into();
        assert!(matches!(body_err, BodyError::Backend(_)));
        assert!(body_err.to_string().contains("not initialized"));
    }

    #[test]
    fn body_error_from_unsupported() {
        let err = UnsupportedOperation::new("rapier3d", "set_max_vel");
        let body_err: BodyError = err.into();
        assert!(matches!(body_err, BodyError::Unsupported(_)));
    }

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::Io(_)));
    }

    #[test]
    fn unsupported_is_copy() {
        let err = UnsupportedOperation::new("rapier3d", "set_min_depth");
        let err2 = err;
        assert_eq!(err, err2);
    }

    #[test]
    fn config_error_display_messages() {
        assert_eq!(
            ConfigError::NonPositiveMass(0.0).to_string(),
            "Invalid mass: 0 (must be > 0)"
        );
        assert_eq!(
            ConfigError::NonFinite("position").to_string(),
            "Non-finite value in position"
        );
        assert_eq!(
            ConfigError::InvalidStepSize(-0.5).to_string(),
            "Invalid step_size: -0.5 (must be > 0)"
        );
        assert_eq!(
            ConfigError::NegativeDamping {
                field: "linear_damping",
                value: -0.1
            }
            .to_string(),
            "Negative damping for linear_damping: -0.1"
        );
        assert_eq!(
            ConfigError::InvalidValue {
                field: "orientation".into(),
                message: "zero-norm quaternion".into()
            }
            .to_string(),
            "Invalid value for orientation: zero-norm quaternion"
        );
    }

    #[test]
    fn backend_error_display_messages() {
        assert_eq!(
            BackendError::AlreadyInitialized("box".into()).to_string(),
            "Body 'box' is already initialized"
        );
        assert_eq!(
            BackendError::NotLoaded("box".into()).to_string(),
            "Body 'box' has not been loaded"
        );
        assert_eq!(
            BackendError::StaleHandle("box".into()).to_string(),
            "Body 'box' holds a handle from a previous engine epoch"
        );
        assert_eq!(
            BackendError::GeomOwned {
                geom: "GeomId(1v1)".into(),
                owner: "arm".into()
            }
            .to_string(),
            "Geom GeomId(1v1) is already attached to body 'arm'"
        );
    }

    #[test]
    fn unsupported_display_message() {
        assert_eq!(
            UnsupportedOperation::new("rapier3d", "set_max_vel").to_string(),
            "set_max_vel is not supported by the rapier3d backend"
        );
    }
}
