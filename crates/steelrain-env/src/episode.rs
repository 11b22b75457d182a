//! Episode state machine: reset, step, fire-rate limiting and the done handshake.
//!
//! The [`EpisodeController`] resource owns every piece of mutable episode state
//! on the simulation thread. Host collaborators (aim control, ray casting,
//! firing, the fire clock) are injected when the controller is built.

use bevy::log::{debug, info};
use bevy::math::Vec3;
use bevy::prelude::Resource;
use thiserror::Error;

use steelrain_core::config::{BridgeConfig, FireConfig};
use steelrain_core::time::MonotonicClock;
use steelrain_core::traits::{AimController, FireAction, FireClock, FireOutcome, RayCaster, Shot};
use steelrain_core::types::{Pose, StepAction, StepResult};

use crate::reward::{RewardAccumulator, RewardBreakdown};
use crate::sensors::{SensorFrame, SensorSampler, TargetMetrics};

// ---------------------------------------------------------------------------
// ControllerState
// ---------------------------------------------------------------------------

/// Lifecycle state of the controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// Before the first reset.
    #[default]
    Uninitialized,
    /// Reset at least once; reset and step keep it here.
    Ready,
}

/// Target registry errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("a target is already registered")]
    AlreadyRegistered,
    #[error("no target is registered")]
    NotRegistered,
}

// ---------------------------------------------------------------------------
// FireLimiter
// ---------------------------------------------------------------------------

/// Minimum-interval gate on shots.
#[derive(Clone, Debug, PartialEq)]
pub struct FireLimiter {
    min_interval: f64,
    last_fire: Option<f64>,
}

impl FireLimiter {
    /// Limiter allowing at most `config.max_rounds_per_minute` shots per
    /// minute.
    #[must_use]
    pub fn new(config: &FireConfig) -> Self {
        Self {
            min_interval: config.min_interval_secs(),
            last_fire: None,
        }
    }

    /// Record a shot at `now` unless it falls inside the cooldown.
    pub fn try_fire(&mut self, now: f64) -> bool {
        if self.last_fire.is_some_and(|last| now - last < self.min_interval) {
            return false;
        }
        self.last_fire = Some(now);
        true
    }

    /// Forget the last shot; the next request always fires.
    pub const fn reset(&mut self) {
        self.last_fire = None;
    }

    #[must_use]
    pub const fn min_interval(&self) -> f64 {
        self.min_interval
    }

    #[must_use]
    pub const fn last_fire(&self) -> Option<f64> {
        self.last_fire
    }
}

// ---------------------------------------------------------------------------
// Bundled collaborators
// ---------------------------------------------------------------------------

/// [`AimController`] that simply stores the pose.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StoredAim {
    pose: Pose,
}

impl StoredAim {
    #[must_use]
    pub const fn new(pose: Pose) -> Self {
        Self { pose }
    }
}

impl AimController for StoredAim {
    fn orientation(&self) -> Pose {
        self.pose
    }

    fn set_orientation(&mut self, pose: Pose) {
        self.pose = pose;
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "StoredAim"
    }
}

/// Instant-hit [`FireAction`]: a shot hits whenever the forward trace is on
/// the target.
#[derive(Clone, Copy, Debug, Default)]
pub struct HitscanFire;

impl FireAction for HitscanFire {
    fn fire(&mut self, shot: &Shot) -> FireOutcome {
        if shot.on_target {
            FireOutcome::Hit
        } else {
            FireOutcome::Miss
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "HitscanFire"
    }
}

// ---------------------------------------------------------------------------
// EpisodeStats
// ---------------------------------------------------------------------------

/// Episode counters. `episodes` counts from app start, the rest restart
/// with every reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EpisodeStats {
    /// Resets so far.
    pub episodes: u64,
    pub steps: u64,
    pub shots: u64,
    pub hits: u64,
}

// ---------------------------------------------------------------------------
// EpisodeController
// ---------------------------------------------------------------------------

/// Owns pose, reward, sensor frame and done flag for the running episode.
#[derive(Resource)]
pub struct EpisodeController {
    config: BridgeConfig,
    state: ControllerState,
    aim: Box<dyn AimController>,
    sampler: SensorSampler,
    fire: Box<dyn FireAction>,
    clock: Box<dyn FireClock>,
    limiter: FireLimiter,
    reward: RewardAccumulator,
    target: Option<Vec3>,
    frame: SensorFrame,
    metrics: TargetMetrics,
    done: bool,
    last_delta: f32,
    stats: EpisodeStats,
}

impl EpisodeController {
    /// Controller with bundled collaborators: [`StoredAim`] at the default
    /// pose, no ray caster, [`HitscanFire`] and a [`MonotonicClock`].
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        let cells = config.sensor.cell_count();
        Self {
            aim: Box::new(StoredAim::new(config.pose.default_pose)),
            sampler: SensorSampler::detached(),
            fire: Box::new(HitscanFire),
            clock: Box::new(MonotonicClock::new()),
            limiter: FireLimiter::new(&config.fire),
            reward: RewardAccumulator::new(config.reward.clone()),
            state: ControllerState::Uninitialized,
            target: None,
            frame: SensorFrame::zeroed(cells),
            metrics: TargetMetrics::default(),
            done: false,
            last_delta: 0.0,
            stats: EpisodeStats::default(),
            config,
        }
    }

    /// Builder: attach the world's ray caster.
    #[must_use]
    pub fn with_ray_caster(mut self, caster: impl RayCaster) -> Self {
        self.sampler = SensorSampler::new(caster);
        self
    }

    /// Builder: use a host pose controller.
    #[must_use]
    pub fn with_aim(mut self, aim: impl AimController) -> Self {
        self.aim = Box::new(aim);
        self
    }

    /// Builder: use a host fire action.
    #[must_use]
    pub fn with_fire_action(mut self, fire: impl FireAction) -> Self {
        self.fire = Box::new(fire);
        self
    }

    /// Builder: measure the fire cooldown on `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: impl FireClock) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // -- commands --

    /// Start a new episode.
    pub fn reset(&mut self) -> StepResult {
        self.reward.on_episode_reset();
        self.aim.set_orientation(self.config.pose.default_pose);
        self.done = false;
        self.limiter.reset();
        self.refresh_frame();
        self.state = ControllerState::Ready;
        self.stats.episodes += 1;
        self.stats.steps = 0;
        self.stats.shots = 0;
        self.stats.hits = 0;
        debug!("episode {} reset", self.stats.episodes);

        StepResult {
            observation: self.frame.observation(),
            reward: 0.0,
            done: false,
            delta_time: 0.0,
        }
    }

    /// Apply one controller action and report the result.
    pub fn step(&mut self, action: StepAction) -> StepResult {
        if self.state == ControllerState::Uninitialized {
            debug!("step before first reset");
            self.state = ControllerState::Ready;
        }

        let pose = self
            .aim
            .orientation()
            .offset(action.pitch_delta, action.yaw_delta)
            .clamped(&self.config.pose.pitch, &self.config.pose.yaw);
        self.aim.set_orientation(pose);
        self.refresh_frame();

        if action.wants_fire() {
            self.try_fire(pose);
        }

        self.stats.steps += 1;
        let reward = self.reward.poll_delta();
        let done = std::mem::take(&mut self.done);

        StepResult {
            observation: self.frame.observation(),
            reward,
            done,
            delta_time: self.last_delta,
        }
    }

    /// Per-frame update: refresh target metrics and run the reward pipeline.
    pub fn tick(&mut self, delta_time: f32) -> RewardBreakdown {
        self.last_delta = delta_time;
        let basis = self.aim.orientation().basis();
        self.metrics = self.sampler.target_metrics(
            self.config.sensor.origin(),
            basis.forward,
            self.target,
            &self.config.target,
        );
        let distance = self.target.map(|_| self.metrics.normalized_distance);
        self.reward.tick(delta_time, distance)
    }

    /// Raise the terminal flag. The next step reports it once.
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    fn try_fire(&mut self, pose: Pose) {
        let now = self.clock.now_secs();
        if !self.limiter.try_fire(now) {
            debug!("fire dropped: inside {:.3}s cooldown", self.limiter.min_interval());
            return;
        }

        let shot = Shot {
            origin: self.config.sensor.origin(),
            direction: pose.basis().forward,
            on_target: self.frame.metrics.is_overlapping(),
        };
        match self.fire.fire(&shot) {
            FireOutcome::Hit => {
                self.stats.shots += 1;
                self.stats.hits += 1;
                self.reward.add_hit();
                self.reward.add_shot_penalty();
                self.mark_done();
                info!("target hit after {} steps", self.stats.steps + 1);
            }
            FireOutcome::Miss => {
                self.stats.shots += 1;
                self.reward.add_shot_penalty();
            }
            FireOutcome::Ignored => {}
        }
    }

    fn refresh_frame(&mut self) {
        let pose = self.aim.orientation();
        self.frame = self.sampler.frame(pose, &self.config, self.target);
        self.metrics = self.frame.metrics;
    }

    // -- target registry --

    /// Make `position` the active target.
    pub fn register_target(&mut self, position: Vec3) -> Result<(), TargetError> {
        if self.target.is_some() {
            return Err(TargetError::AlreadyRegistered);
        }
        self.target = Some(position);
        Ok(())
    }

    /// Remove the active target, returning its last position.
    pub fn unregister_target(&mut self) -> Option<Vec3> {
        self.target.take()
    }

    /// Move the active target.
    pub fn update_target_position(&mut self, position: Vec3) -> Result<(), TargetError> {
        match self.target.as_mut() {
            Some(target) => {
                *target = position;
                Ok(())
            }
            None => Err(TargetError::NotRegistered),
        }
    }

    // -- accessors --

    #[must_use]
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    #[must_use]
    pub fn pose(&self) -> Pose {
        self.aim.orientation()
    }

    #[must_use]
    pub const fn target(&self) -> Option<Vec3> {
        self.target
    }

    /// Most recent sensor frame, as returned by the last reset or step.
    #[must_use]
    pub const fn frame(&self) -> &SensorFrame {
        &self.frame
    }

    /// Target metrics from the most recent tick, reset or step.
    #[must_use]
    pub const fn metrics(&self) -> TargetMetrics {
        self.metrics
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.done
    }

    #[must_use]
    pub const fn last_delta_time(&self) -> f32 {
        self.last_delta
    }

    #[must_use]
    pub const fn stats(&self) -> EpisodeStats {
        self.stats
    }

    #[must_use]
    pub const fn reward(&self) -> &RewardAccumulator {
        &self.reward
    }

    #[must_use]
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    #[must_use]
    pub const fn fire_limiter(&self) -> &FireLimiter {
        &self.limiter
    }

    /// Length of every observation this controller produces.
    #[must_use]
    pub const fn observation_len(&self) -> usize {
        self.config.observation_len()
    }
}

impl Default for EpisodeController {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
