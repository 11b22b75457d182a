//! Bevy systems driving the episode controller each frame.

use bevy::prelude::*;

use steelrain_core::time::TickClock;

use crate::episode::EpisodeController;

// ---------------------------------------------------------------------------
// episode_tick_system
// ---------------------------------------------------------------------------

/// Feeds the frame's delta time into the controller's reward pipeline.
///
/// Runs in [`BridgeSet::Evaluate`](steelrain_core::BridgeSet::Evaluate) and is
/// skipped while the simulation is paused.
#[allow(clippy::needless_pass_by_value)]
pub fn episode_tick_system(mut controller: ResMut<EpisodeController>, clock: Res<TickClock>) {
    controller.tick(clock.delta_secs());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
