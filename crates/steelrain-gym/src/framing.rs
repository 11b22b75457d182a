//! Length-prefixed JSON framing for the wire protocol.
//!
//! Every message on the wire is a 4-byte **little-endian** `u32` length prefix
//! followed by that many bytes of UTF-8 JSON payload.
//!
//! # Wire format
//!
//! ```text
//! +----------------+------------------+
//! | Length (4B LE) | JSON Payload     |
//! +----------------+------------------+
//! ```
//!
//! There is no resynchronization: any [`FramingError`] ends the connection.

use std::io::{ErrorKind, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::protocol::{FramingError, MAX_MESSAGE_SIZE};

/// Serialize `msg` into a complete frame (header + payload).
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, FramingError> {
    let payload = serde_json::to_vec(msg)?;
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(FramingError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    // MAX_MESSAGE_SIZE (16 MiB) fits in u32.
    let len = u32::try_from(payload.len()).map_err(|_| FramingError::PayloadTooLarge {
        size: payload.len(),
        max: MAX_MESSAGE_SIZE,
    })?;
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Write a length-prefixed JSON message to a stream and flush it.
pub fn write_message<T: Serialize>(writer: &mut impl Write, msg: &T) -> Result<(), FramingError> {
    let frame = encode(msg)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Read one raw payload.
///
/// Returns `Ok(None)` if the stream ends before any header byte (clean
/// disconnect).
pub fn read_payload(reader: &mut impl Read) -> Result<Option<Vec<u8>>, FramingError> {
    let mut header = [0u8; 4];
    let mut received = 0;
    while received < header.len() {
        match reader.read(&mut header[received..]) {
            Ok(0) if received == 0 => return Ok(None),
            Ok(0) => return Err(FramingError::ShortHeader { received }),
            Ok(n) => received += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(FramingError::Io(e)),
        }
    }

    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(FramingError::PayloadTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            FramingError::ShortPayload { expected: len }
        } else {
            FramingError::Io(e)
        }
    })?;
    Ok(Some(payload))
}

/// Read a length-prefixed JSON message from a stream.
///
/// Returns `Ok(None)` on a clean disconnect.
pub fn read_message<T: DeserializeOwned>(
    reader: &mut impl Read,
) -> Result<Option<T>, FramingError> {
    match read_payload(reader)? {
        Some(payload) => Ok(Some(serde_json::from_slice(&payload)?)),
        None => Ok(None),
    }
}

/// Read a request frame: a JSON object carrying a string `cmd` field.
///
/// The command itself is not interpreted here; see
/// [`Request::from_value`](crate::protocol::Request::from_value).
pub fn read_command_frame(reader: &mut impl Read) -> Result<Option<Value>, FramingError> {
    let Some(value) = read_message::<Value>(reader)? else {
        return Ok(None);
    };
    if value.get("cmd").and_then(Value::as_str).is_none() {
        return Err(FramingError::MissingCommand);
    }
    Ok(Some(value))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
