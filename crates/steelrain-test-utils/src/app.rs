//! Bevy test app builders with various plugin combinations.

use bevy::prelude::*;
use steelrain_core::config::BridgeConfig;
use steelrain_core::time::TickClock;
use steelrain_env::episode::EpisodeController;

/// Default tick length used by test apps, in seconds.
pub const TEST_TICK_SECS: f32 = 0.016;

/// Create a minimal test app with only the core plugin.
///
/// Provides `BridgeSet` ordering and a fixed-step [`TickClock`] but no
/// episode controller.
pub fn minimal_test_app() -> App {
    let mut app = App::new();
    app.insert_resource(TickClock::fixed(TEST_TICK_SECS));
    app.add_plugins(steelrain_core::SteelrainCorePlugin);
    app.finish();
    app.cleanup();
    app
}

/// Create a test app with core and environment plugins and a default
/// [`EpisodeController`] built from `config`.
///
/// The clock uses `config.tick.fixed_delta_secs`, falling back to
/// [`TEST_TICK_SECS`]. Bridge plugins are not included; add them in the
/// test that needs them.
pub fn env_test_app(config: BridgeConfig) -> App {
    let controller = EpisodeController::new(config.clone());
    env_test_app_with(config, controller)
}

/// Like [`env_test_app`] but with a caller-built controller.
pub fn env_test_app_with(config: BridgeConfig, controller: EpisodeController) -> App {
    let mut app = env_test_app_builder(config, controller);
    app.finish();
    app.cleanup();
    app
}

/// Unfinished env app, so callers can add more plugins before
/// `finish()`/`cleanup()`.
pub fn env_test_app_builder(config: BridgeConfig, controller: EpisodeController) -> App {
    let dt = config.tick.fixed_delta_secs.unwrap_or(TEST_TICK_SECS);
    let mut app = App::new();
    app.insert_resource(TickClock::fixed(dt));
    app.insert_resource(config);
    app.insert_resource(controller);
    app.add_plugins(steelrain_core::SteelrainCorePlugin);
    app.add_plugins(steelrain_env::SteelrainEnvPlugin);
    app
}

/// Small grid config (6x4) that keeps observations short in tests.
pub fn small_grid_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.sensor.grid_width = 6;
    config.sensor.grid_height = 4;
    config
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
