use std::fmt;
use std::time::{Duration, Instant};

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::traits::FireClock;

// ---------------------------------------------------------------------------
// SimTime
// ---------------------------------------------------------------------------

/// Integer-nanosecond simulation clock.
///
/// Avoids floating-point accumulation errors by tracking elapsed time as a
/// monotonically increasing `u64` nanosecond count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SimTime {
    nanos: u64,
}

impl SimTime {
    /// Create a new `SimTime` at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { nanos: 0 }
    }

    /// Raw nanosecond count.
    #[must_use]
    pub const fn nanos(&self) -> u64 {
        self.nanos
    }

    /// Elapsed seconds as `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn secs_f64(&self) -> f64 {
        self.nanos as f64 / 1_000_000_000.0
    }

    /// Advance the clock by `delta_secs` seconds. Negative deltas are ignored.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn advance_secs(&mut self, delta_secs: f64) {
        if delta_secs <= 0.0 {
            return;
        }
        let delta_nanos = (delta_secs * 1_000_000_000.0) as u64;
        self.nanos = self.nanos.saturating_add(delta_nanos);
    }

    /// Reset the clock to zero.
    pub const fn reset(&mut self) {
        self.nanos = 0;
    }

    /// Convert to a standard [`Duration`].
    #[must_use]
    pub const fn to_duration(&self) -> Duration {
        Duration::from_nanos(self.nanos)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.secs_f64())
    }
}

// ---------------------------------------------------------------------------
// TickClock
// ---------------------------------------------------------------------------

/// Per-frame delta time seen by the episode pipeline.
///
/// With `fixed_delta` set every unpaused tick advances by exactly that amount,
/// which keeps reward accounting reproducible. Otherwise the delta comes from
/// Bevy's `Time` resource when present.
#[derive(Debug, Clone, Default, Resource)]
pub struct TickClock {
    delta_secs: f32,
    fixed_delta: Option<f32>,
    elapsed: SimTime,
    frame: u64,
}

impl TickClock {
    /// Clock driven by the host frame time.
    #[must_use]
    pub fn variable() -> Self {
        Self::default()
    }

    /// Clock that advances by `delta_secs` every unpaused frame.
    #[must_use]
    pub fn fixed(delta_secs: f32) -> Self {
        Self {
            fixed_delta: Some(delta_secs),
            ..Self::default()
        }
    }

    /// Record one frame. `host_delta` is ignored in fixed mode; paused frames
    /// report a zero delta.
    pub fn advance(&mut self, host_delta: f32, paused: bool) {
        self.frame += 1;
        self.delta_secs = if paused {
            0.0
        } else {
            self.fixed_delta.unwrap_or(host_delta).max(0.0)
        };
        self.elapsed.advance_secs(f64::from(self.delta_secs));
    }

    /// Delta time of the most recent frame, in seconds.
    #[must_use]
    pub const fn delta_secs(&self) -> f32 {
        self.delta_secs
    }

    #[must_use]
    pub const fn fixed_delta(&self) -> Option<f32> {
        self.fixed_delta
    }

    /// Simulated time accumulated over unpaused frames.
    #[must_use]
    pub const fn elapsed(&self) -> SimTime {
        self.elapsed
    }

    /// Number of frames recorded.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }
}

// ---------------------------------------------------------------------------
// MonotonicClock
// ---------------------------------------------------------------------------

/// Wall-clock [`FireClock`] backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FireClock for MonotonicClock {
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
