//! Controller message protocol.
//!
//! Requests are JSON objects tagged by a `cmd` field:
//!
//! ```text
//! {"cmd":"reset"}
//! {"cmd":"step","action":[pitch_delta, yaw_delta, fire_flag]}
//! {"cmd":"pause"}
//! {"cmd":"resume"}
//! ```
//!
//! Replies are untagged: reset and step answer with
//! `{"obs":[..],"reward":r,"done":d,"delta_time":dt}`, pause and resume with
//! `{"status":"paused"|"resumed"}`. A request that is well framed but not
//! understood is answered with `{"error":"..."}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use steelrain_core::types::{Command, CommandReply, RunState, StepAction, StepResult};

/// Maximum payload size accepted or sent (16 MiB).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Command names understood by the bridge.
pub const COMMANDS: [&str; 4] = ["reset", "step", "pause", "resume"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Wire-level failures. All of them end the connection.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("stream closed inside the length header ({received} of 4 bytes)")]
    ShortHeader { received: usize },

    #[error("stream closed inside a {expected}-byte payload")]
    ShortPayload { expected: usize },

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a JSON object with a string `cmd` field")]
    MissingCommand,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A well-framed request the bridge cannot act on. Answered on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid {command} request: {message}")]
    BadRequest { command: String, message: String },
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A request from the controller.
///
/// # Example
///
/// ```
/// use steelrain_gym::protocol::Request;
///
/// let req: Request = serde_json::from_str(r#"{"cmd":"step","action":[1.0,-2.0,1]}"#).unwrap();
/// assert_eq!(req, Request::Step { action: [1.0, -2.0, 1.0] });
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Request {
    Reset,
    Step {
        /// `[pitch_delta, yaw_delta, fire_flag]`.
        action: [f32; 3],
    },
    Pause,
    Resume,
}

impl Request {
    /// Interpret a framed JSON object.
    ///
    /// The object must already carry a string `cmd`; unknown names and
    /// malformed bodies become [`ProtocolError`]s.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let cmd = value
            .get("cmd")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        if !COMMANDS.contains(&cmd.as_str()) {
            return Err(ProtocolError::UnknownCommand(cmd));
        }
        serde_json::from_value(value).map_err(|e| ProtocolError::BadRequest {
            command: cmd,
            message: e.to_string(),
        })
    }
}

impl From<Request> for Command {
    fn from(request: Request) -> Self {
        match request {
            Request::Reset => Self::Reset,
            Request::Step { action } => Self::Step(StepAction::from_triple(action)),
            Request::Pause => Self::Pause,
            Request::Resume => Self::Resume,
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Value of the `status` field in pause/resume replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Paused,
    Resumed,
}

impl From<RunState> for Status {
    fn from(state: RunState) -> Self {
        match state {
            RunState::Paused => Self::Paused,
            RunState::Running => Self::Resumed,
        }
    }
}

/// A reply to the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// Result of a reset or step.
    Step {
        obs: Vec<f32>,
        reward: f32,
        done: bool,
        delta_time: f32,
    },
    /// Acknowledgement of pause or resume.
    Status { status: Status },
    /// The request was understood at the framing level only.
    Error { error: String },
}

impl Response {
    #[must_use]
    pub fn from_step(result: StepResult) -> Self {
        Self::Step {
            obs: result.observation,
            reward: result.reward,
            done: result.done,
            delta_time: result.delta_time,
        }
    }

    #[must_use]
    pub fn from_reply(reply: CommandReply) -> Self {
        match reply {
            CommandReply::Step(result) => Self::from_step(result),
            CommandReply::Status(state) => Self::Status {
                status: state.into(),
            },
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
