//! Shared types, configuration, errors and the tick clock for the SteelRain
//! control bridge.
//!
//! Every other crate in the workspace builds on the pieces defined here:
//!
//! - [`config::BridgeConfig`]: static configuration loaded from TOML
//! - [`types`]: pose, commands and step results
//! - [`traits`]: host collaborators (ray casting, aim control, firing, clock)
//! - [`time::TickClock`]: per-frame delta time seen by the reward pipeline
//! - [`BridgeSet`]: ordering of the per-frame systems

pub mod config;
pub mod error;
pub mod time;
pub mod traits;
pub mod types;

use bevy::prelude::*;

use crate::time::TickClock;
use crate::types::RunState;

// ---------------------------------------------------------------------------
// BridgeSet
// ---------------------------------------------------------------------------

/// Per-frame system ordering. The sets run chained in declaration order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeSet {
    /// Advance the [`TickClock`].
    Clock,
    /// Episode tick: target metrics and reward accumulation.
    Evaluate,
    /// Drain controller commands queued by the listener thread.
    Communicate,
}

// ---------------------------------------------------------------------------
// SimulationState
// ---------------------------------------------------------------------------

/// Whether the simulation loop is paused by the controller.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationState {
    pub paused: bool,
}

impl SimulationState {
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        if self.paused {
            RunState::Paused
        } else {
            RunState::Running
        }
    }
}

/// Run condition: true while the simulation is not paused.
#[allow(clippy::needless_pass_by_value)]
pub fn simulation_running(state: Res<SimulationState>) -> bool {
    !state.paused
}

// ---------------------------------------------------------------------------
// SteelrainCorePlugin
// ---------------------------------------------------------------------------

/// Configures [`BridgeSet`] ordering and advances the [`TickClock`] each frame.
///
/// Inserts default [`TickClock`] and [`SimulationState`] resources unless the
/// app already provides them.
pub struct SteelrainCorePlugin;

impl Plugin for SteelrainCorePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TickClock>()
            .init_resource::<SimulationState>()
            .configure_sets(
                Update,
                (BridgeSet::Clock, BridgeSet::Evaluate, BridgeSet::Communicate).chain(),
            )
            .add_systems(Update, tick_clock_system.in_set(BridgeSet::Clock));
    }
}

/// Records one frame on the [`TickClock`], using Bevy's `Time` when present.
#[allow(clippy::needless_pass_by_value)]
pub fn tick_clock_system(
    mut clock: ResMut<TickClock>,
    state: Res<SimulationState>,
    time: Option<Res<Time>>,
) {
    let host_delta = time.map_or(0.0, |t| t.delta_secs());
    clock.advance(host_delta, state.paused);
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        BridgeSet, SimulationState, SteelrainCorePlugin,
        config::BridgeConfig,
        error::ConfigError,
        simulation_running,
        time::{MonotonicClock, SimTime, TickClock},
        traits::{AimController, FireAction, FireClock, FireOutcome, RayCaster, RayHit, Shot},
        types::{AimBasis, AngleRange, Command, CommandReply, Pose, RunState, StepAction, StepResult},
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
