//! Wiring between the listener thread and the simulation thread.
//!
//! [`Bridge`] lives on the listener side and turns each [`Request`] into a
//! rendezvous call. [`BridgePlugin`] installs the matching inbox on the Bevy
//! app and drains it once per frame in [`BridgeSet::Communicate`], after the
//! episode tick.

use std::time::Duration;

use bevy::log::{info, warn};
use bevy::prelude::*;
use parking_lot::Mutex;

use steelrain_core::config::ListenerConfig;
use steelrain_core::types::{Command, CommandReply};
use steelrain_core::{BridgeSet, SimulationState};
use steelrain_env::episode::EpisodeController;

use crate::protocol::{Request, Response};
use crate::rendezvous::{self, RendezvousError, RendezvousExecutor, RendezvousInbox};
use crate::server::{ListenerService, ServerError};

/// Listener-side rendezvous handle for bridge commands.
pub type BridgeExecutor = RendezvousExecutor<Command, CommandReply>;

/// Simulation-side rendezvous handle, stored as a Bevy resource.
pub type BridgeInbox = RendezvousInbox<Command, CommandReply>;

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Listener-side half of the bridge.
#[derive(Clone)]
pub struct Bridge {
    executor: BridgeExecutor,
}

impl Bridge {
    /// Create a bridge and the plugin that serves it on the simulation thread.
    #[must_use]
    pub fn new(config: &ListenerConfig) -> (Self, BridgePlugin) {
        let (executor, inbox) =
            rendezvous::channel(Duration::from_millis(config.rendezvous_timeout_ms));
        (
            Self { executor },
            BridgePlugin {
                inbox: Mutex::new(Some(inbox)),
            },
        )
    }

    /// Apply `command` on the simulation thread and wait for the reply.
    pub fn execute(&self, command: Command) -> Result<CommandReply, RendezvousError> {
        let name = command.name();
        self.executor
            .execute(command)
            .inspect_err(|e| warn!("{name} command failed: {e}"))
    }

    /// Handle one parsed request.
    pub fn handle(&self, request: Request) -> Result<Response, RendezvousError> {
        self.execute(request.into()).map(Response::from_reply)
    }

    /// Start a [`ListenerService`] that forwards every request to this bridge.
    pub fn serve(self, config: &ListenerConfig) -> Result<ListenerService, ServerError> {
        ListenerService::start(config, move |request: Request| self.handle(request))
    }
}

// ---------------------------------------------------------------------------
// Command application
// ---------------------------------------------------------------------------

/// Apply one command to the simulation state. Runs on the simulation thread.
///
/// Pause and resume also stop and restart Bevy's virtual clock when present.
pub fn apply_command(
    command: Command,
    controller: &mut EpisodeController,
    state: &mut SimulationState,
    time: Option<&mut Time<Virtual>>,
) -> CommandReply {
    match command {
        Command::Reset => CommandReply::Step(controller.reset()),
        Command::Step(action) => CommandReply::Step(controller.step(action)),
        Command::Pause => {
            if !state.paused {
                info!("simulation paused by controller");
            }
            state.paused = true;
            if let Some(time) = time {
                time.pause();
            }
            CommandReply::Status(state.run_state())
        }
        Command::Resume => {
            if state.paused {
                info!("simulation resumed by controller");
            }
            state.paused = false;
            if let Some(time) = time {
                time.unpause();
            }
            CommandReply::Status(state.run_state())
        }
    }
}

// ---------------------------------------------------------------------------
// BridgePlugin
// ---------------------------------------------------------------------------

/// Installs the [`BridgeInbox`] and drains it every frame, paused or not.
///
/// Requires an [`EpisodeController`] resource (see
/// [`SteelrainEnvPlugin`](steelrain_env::SteelrainEnvPlugin)).
pub struct BridgePlugin {
    inbox: Mutex<Option<BridgeInbox>>,
}

impl Plugin for BridgePlugin {
    fn build(&self, app: &mut App) {
        match self.inbox.lock().take() {
            Some(inbox) => {
                app.insert_resource(inbox);
            }
            None => warn!("BridgePlugin inbox already installed"),
        }
        app.init_resource::<SimulationState>().add_systems(
            Update,
            bridge_drain_system.in_set(BridgeSet::Communicate),
        );
    }
}

/// Apply queued controller commands, at most
/// `listener.max_commands_per_tick` per frame.
#[allow(clippy::needless_pass_by_value)]
pub fn bridge_drain_system(
    inbox: Res<BridgeInbox>,
    mut controller: ResMut<EpisodeController>,
    mut state: ResMut<SimulationState>,
    mut time: Option<ResMut<Time<Virtual>>>,
) {
    let max = controller.config().listener.max_commands_per_tick;
    inbox.drain(max, |command| {
        apply_command(command, &mut controller, &mut state, time.as_deref_mut())
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
