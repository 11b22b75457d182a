//! Episode lifecycle, reward accounting and the ray-grid sensor for SteelRain.
//!
//! This crate holds everything that runs on the simulation thread: the
//! [`EpisodeController`](episode::EpisodeController) resource, its
//! [`RewardAccumulator`](reward::RewardAccumulator) and
//! [`SensorSampler`](sensors::SensorSampler), and the Bevy system that ticks
//! them every frame.

pub mod episode;
pub mod reward;
pub mod sensors;
pub mod systems;

use bevy::prelude::*;

use steelrain_core::config::BridgeConfig;
use steelrain_core::{BridgeSet, simulation_running};

use crate::episode::EpisodeController;

// ---------------------------------------------------------------------------
// SteelrainEnvPlugin
// ---------------------------------------------------------------------------

/// Bevy plugin that ticks the [`EpisodeController`] each unpaused frame.
///
/// Uses an existing controller resource when the app provides one (so hosts
/// can inject their collaborators), otherwise builds a default controller
/// from the app's [`BridgeConfig`]. A config that fails
/// [`BridgeConfig::validate`] is replaced by the defaults with a warning.
/// Expects
/// [`SteelrainCorePlugin`](steelrain_core::SteelrainCorePlugin) for set
/// ordering and the tick clock.
pub struct SteelrainEnvPlugin;

impl Plugin for SteelrainEnvPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<EpisodeController>() {
            let config = app
                .world()
                .get_resource::<BridgeConfig>()
                .cloned()
                .unwrap_or_default();
            app.insert_resource(EpisodeController::new(checked_config(config)));
        }
        app.add_systems(
            Update,
            systems::episode_tick_system
                .in_set(BridgeSet::Evaluate)
                .run_if(simulation_running),
        );
    }
}

fn checked_config(config: BridgeConfig) -> BridgeConfig {
    match config.validate() {
        Ok(()) => config,
        Err(e) => {
            warn!("invalid bridge config ({e}); falling back to defaults");
            BridgeConfig::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        SteelrainEnvPlugin,
        episode::{
            ControllerState, EpisodeController, EpisodeStats, FireLimiter, HitscanFire, StoredAim,
            TargetError,
        },
        reward::{RewardAccumulator, RewardBreakdown},
        sensors::{SamplingDegraded, SensorFrame, SensorSampler, TargetMetrics},
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
