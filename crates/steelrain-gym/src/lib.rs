//! TCP control bridge between an external controller and the SteelRain
//! simulation thread.
//!
//! - [`protocol`]: request/response types and error enums
//! - [`framing`]: length-prefixed JSON wire format (4-byte LE `u32` + payload)
//! - [`rendezvous`]: synchronous hand-off of one command to the simulation
//!   thread
//! - [`server`]: [`ListenerService`], the single-client loopback listener
//! - [`bridge`]: [`Bridge`] and [`BridgePlugin`] wiring the two threads
//!   together
//!
//! A typical host builds the pair with [`Bridge::new`], adds the plugin to
//! its Bevy app and calls [`Bridge::serve`].

pub mod bridge;
pub mod framing;
pub mod protocol;
pub mod rendezvous;
pub mod server;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use bridge::{Bridge, BridgeExecutor, BridgeInbox, BridgePlugin, apply_command};
pub use protocol::{FramingError, MAX_MESSAGE_SIZE, ProtocolError, Request, Response, Status};
pub use rendezvous::{RendezvousError, RendezvousExecutor, RendezvousInbox};
pub use server::{CommandHandler, ListenerService, ListenerState, ServerError};

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Bridge, BridgePlugin, CommandHandler, ListenerService, ListenerState, ServerError,
        protocol::{FramingError, ProtocolError, Request, Response, Status},
        rendezvous::RendezvousError,
    };
}
