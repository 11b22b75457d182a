//! Pending-reward accounting.
//!
//! Reward accrues continuously: every simulation tick applies a time penalty
//! and distance shaping, and discrete events (hits, shots) add or subtract
//! fixed amounts. The controller only ever sees the change since its last
//! poll via [`RewardAccumulator::poll_delta`].

use bevy::log::debug;

use steelrain_core::config::RewardConfig;

// ---------------------------------------------------------------------------
// RewardBreakdown
// ---------------------------------------------------------------------------

/// Components contributed by the most recent tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RewardBreakdown {
    /// Amount subtracted as time penalty (non-negative).
    pub time_penalty: f32,
    pub shaping: f32,
    pub delta_shaping: f32,
    pub delta_time: f32,
}

impl RewardBreakdown {
    /// Net change to the pending reward.
    #[must_use]
    pub fn net(&self) -> f32 {
        self.shaping + self.delta_shaping - self.time_penalty
    }
}

// ---------------------------------------------------------------------------
// RewardAccumulator
// ---------------------------------------------------------------------------

/// Accumulates reward between controller polls.
#[derive(Debug, Clone)]
pub struct RewardAccumulator {
    config: RewardConfig,
    pending: f32,
    snapshot: f32,
    previous_distance: f32,
    last: RewardBreakdown,
}

impl RewardAccumulator {
    #[must_use]
    pub fn new(config: RewardConfig) -> Self {
        Self {
            config,
            pending: 0.0,
            snapshot: 0.0,
            previous_distance: 0.0,
            last: RewardBreakdown::default(),
        }
    }

    /// Per-tick pipeline.
    ///
    /// `normalized_distance` is `Some` only while exactly one target is
    /// active; shaping is skipped otherwise.
    pub fn tick(&mut self, delta_time: f32, normalized_distance: Option<f32>) -> RewardBreakdown {
        let mut breakdown = RewardBreakdown {
            delta_time,
            ..RewardBreakdown::default()
        };

        if self.config.penalty_per_second > 0.0 {
            breakdown.time_penalty = self.config.penalty_per_second * delta_time;
            self.pending -= breakdown.time_penalty;
        }

        if let Some(nd) = normalized_distance {
            breakdown.shaping = self.config.max_shaping_reward * nd.powf(self.config.shaping_exponent);
            self.pending += breakdown.shaping;

            if self.config.delta_shaping_scale != 0.0 {
                breakdown.delta_shaping =
                    self.config.delta_shaping_scale * (nd - self.previous_distance).max(0.0);
                self.pending += breakdown.delta_shaping;
            }
            self.previous_distance = nd;
        }

        if self.config.log_breakdown {
            debug!(
                "reward tick: dt={:.4} penalty={:.4} shaping={:.4} delta_shaping={:.4} pending={:.4}",
                breakdown.delta_time,
                breakdown.time_penalty,
                breakdown.shaping,
                breakdown.delta_shaping,
                self.pending
            );
        }

        self.last = breakdown;
        breakdown
    }

    pub fn add_hit(&mut self) {
        self.pending += self.config.hit_reward;
        debug!("hit reward +{:.1}, pending={:.4}", self.config.hit_reward, self.pending);
    }

    pub fn add_shot_penalty(&mut self) {
        self.pending -= self.config.per_shot_penalty;
        debug!(
            "shot penalty -{:.1}, pending={:.4}",
            self.config.per_shot_penalty, self.pending
        );
    }

    /// Reward accrued since the previous poll.
    pub fn poll_delta(&mut self) -> f32 {
        let delta = self.pending - self.snapshot;
        self.snapshot = self.pending;
        delta
    }

    pub fn on_episode_reset(&mut self) {
        self.pending = 0.0;
        self.snapshot = 0.0;
        self.previous_distance = 0.0;
        self.last = RewardBreakdown::default();
    }

    #[must_use]
    pub const fn pending(&self) -> f32 {
        self.pending
    }

    /// Breakdown of the most recent tick.
    #[must_use]
    pub const fn last_breakdown(&self) -> RewardBreakdown {
        self.last
    }

    #[must_use]
    pub const fn config(&self) -> &RewardConfig {
        &self.config
    }
}

impl Default for RewardAccumulator {
    fn default() -> Self {
        Self::new(RewardConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RewardConfig {
        RewardConfig::default()
    }

    #[test]
    fn time_penalty_accrues() {
        let mut acc = RewardAccumulator::new(config());
        let b = acc.tick(0.5, None);
        assert!((b.time_penalty - 0.5).abs() < 1e-6);
        assert!((acc.pending() + 0.5).abs() < 1e-6);
        assert!((b.net() + 0.5).abs() < 1e-6);
    }

    #[test]
    fn non_positive_penalty_disables_time_penalty() {
        let mut acc = RewardAccumulator::new(RewardConfig {
            penalty_per_second: 0.0,
            ..config()
        });
        acc.tick(1.0, None);
        assert!(acc.pending().abs() < f32::EPSILON);
    }

    #[test]
    fn shaping_uses_power_of_distance() {
        let mut acc = RewardAccumulator::new(RewardConfig {
            penalty_per_second: 0.0,
            ..config()
        });
        let b = acc.tick(0.016, Some(0.5));
        assert!((b.shaping - 0.1 * 0.25).abs() < 1e-6);
        assert!(b.delta_shaping.abs() < f32::EPSILON);
    }

    #[test]
    fn shaping_skipped_without_target() {
        let mut acc = RewardAccumulator::new(RewardConfig {
            penalty_per_second: 0.0,
            ..config()
        });
        let b = acc.tick(0.016, None);
        assert!(b.shaping.abs() < f32::EPSILON);
        assert!(acc.pending().abs() < f32::EPSILON);
    }

    #[test]
    fn delta_shaping_rewards_only_improvement() {
        let mut acc = RewardAccumulator::new(RewardConfig {
            penalty_per_second: 0.0,
            max_shaping_reward: 0.0,
            delta_shaping_scale: 2.0,
            ..config()
        });
        let first = acc.tick(0.016, Some(0.25));
        assert!((first.delta_shaping - 0.5).abs() < 1e-6);
        let worse = acc.tick(0.016, Some(0.1));
        assert!(worse.delta_shaping.abs() < f32::EPSILON);
        let better = acc.tick(0.016, Some(0.6));
        assert!((better.delta_shaping - 1.0).abs() < 1e-5);
    }

    #[test]
    fn events_adjust_pending() {
        let mut acc = RewardAccumulator::new(config());
        acc.add_hit();
        acc.add_shot_penalty();
        assert!((acc.pending() - 249.0).abs() < 1e-4);
    }

    #[test]
    fn poll_delta_is_idempotent_without_tick() {
        let mut acc = RewardAccumulator::new(config());
        acc.tick(0.1, None);
        let first = acc.poll_delta();
        let second = acc.poll_delta();
        assert!((first + 0.1).abs() < 1e-6);
        assert!(second.abs() < f32::EPSILON);
    }

    #[test]
    fn episode_reset_clears_everything() {
        let mut acc = RewardAccumulator::new(RewardConfig {
            delta_shaping_scale: 1.0,
            ..config()
        });
        acc.tick(0.1, Some(0.9));
        acc.add_hit();
        acc.on_episode_reset();
        assert!(acc.pending().abs() < f32::EPSILON);
        assert!(acc.poll_delta().abs() < f32::EPSILON);
        assert_eq!(acc.last_breakdown(), RewardBreakdown::default());
        // previous distance is back to zero, so the full distance counts again
        let b = acc.tick(0.0, Some(0.9));
        assert!((b.delta_shaping - 0.9).abs() < 1e-6);
    }
}
