//! Shared test fixtures and utilities for SteelRain crates.
//!
//! Provides mock host collaborators, Bevy test app builders and
//! deterministic RNG setup.

pub mod app;
pub mod mocks;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use app::{
    env_test_app, env_test_app_builder, env_test_app_with, minimal_test_app, small_grid_config,
};
pub use mocks::{CountingFire, ManualClock, ScriptedRayCaster, SharedAim, SphereTargetCaster};
pub use rng::{random_actions, random_step_action, seeded_rng};
