//! The main physics plugin that delegates to a concrete backend.

use bevy::app::{App, Plugin};

use bodyworks_core::PhysicsConfig;

use crate::backend::{PhysicsBackend, backend_for};

/// Bevy plugin that wires a [`PhysicsBackend`] into the app.
///
/// # Usage
///
/// ```ignore
/// app.add_plugins(BodyworksPhysicsPlugin::new(RapierBackend));
/// ```
///
/// The plugin delegates all setup to the backend's [`build`](PhysicsBackend::build)
/// method, which inserts the `Simulation` resource and registers the step
/// system on `FixedUpdate`.
pub struct BodyworksPhysicsPlugin {
    backend: Box<dyn PhysicsBackend>,
    config: Option<PhysicsConfig>,
}

impl BodyworksPhysicsPlugin {
    /// Create a new physics plugin with the given backend.
    pub fn new(backend: impl PhysicsBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            config: None,
        }
    }

    /// Plugin whose backend is chosen by `config.engine`. The configuration is
    /// inserted as a resource before the backend builds.
    pub fn from_config(config: PhysicsConfig) -> Self {
        Self {
            backend: backend_for(config.engine),
            config: Some(config),
        }
    }

    /// The name of the active physics backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

impl Plugin for BodyworksPhysicsPlugin {
    fn build(&self, app: &mut App) {
        if let Some(config) = &self.config {
            app.insert_resource(config.clone());
        }
        self.backend.build(app);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use bodyworks_core::EngineKind;

    use super::*;
    use crate::native::{NativeBackend, NativeEngine};
    use crate::rapier::RapierEngine;
    use crate::simulation::Simulation;

    struct TestBackend {
        name: &'static str,
    }

    impl PhysicsBackend for TestBackend {
        fn build(&self, _app: &mut App) {}
        fn name(&self) -> &str {
            self.name
        }
    }

    #[test]
    fn plugin_delegates_name() {
        let plugin = BodyworksPhysicsPlugin::new(TestBackend { name: "test" });
        assert_eq!(plugin.backend_name(), "test");
    }

    #[test]
    fn plugin_builds_without_panic() {
        let plugin = BodyworksPhysicsPlugin::new(TestBackend { name: "test" });
        let mut app = App::new();
        plugin.build(&mut app);
    }

    #[test]
    fn native_backend_inserts_simulation() {
        let mut app = App::new();
        BodyworksPhysicsPlugin::new(NativeBackend).build(&mut app);
        assert!(app.world().contains_resource::<Simulation<NativeEngine>>());
    }

    #[test]
    fn from_config_selects_engine() {
        let config = PhysicsConfig {
            engine: EngineKind::Rapier,
            ..PhysicsConfig::default()
        };
        let plugin = BodyworksPhysicsPlugin::from_config(config);
        assert_eq!(plugin.backend_name(), "rapier3d");

        let mut app = App::new();
        plugin.build(&mut app);
        assert!(app.world().contains_resource::<Simulation<RapierEngine>>());
        assert!(!app.world().contains_resource::<Simulation<NativeEngine>>());
    }
}
