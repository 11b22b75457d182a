use bevy::math::Vec3;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{AngleRange, Pose};

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_port() -> u16 {
    7777
}
const fn default_rendezvous_timeout_ms() -> u64 {
    5000
}
const fn default_accept_poll_ms() -> u64 {
    10
}
const fn default_max_commands_per_tick() -> usize {
    1
}
const fn default_pitch_range() -> AngleRange {
    AngleRange::new(4.0, 21.0)
}
const fn default_yaw_range() -> AngleRange {
    AngleRange::new(253.0, 278.0)
}
const fn default_pose() -> Pose {
    Pose::new(13.0, 265.0)
}
const fn default_max_rounds_per_minute() -> f64 {
    840.0
}
const fn default_grid_width() -> usize {
    41
}
const fn default_grid_height() -> usize {
    27
}
const fn default_max_angle_degrees() -> f32 {
    8.0
}
const fn default_max_range() -> f32 {
    15_000.0
}
const fn default_max_aim_offset() -> f32 {
    500.0
}
const fn default_overlap_range() -> f32 {
    10_000.0
}
const fn default_hit_reward() -> f32 {
    250.0
}
const fn default_per_shot_penalty() -> f32 {
    1.0
}
const fn default_max_shaping_reward() -> f32 {
    0.1
}
const fn default_shaping_exponent() -> f32 {
    2.0
}
const fn default_penalty_per_second() -> f32 {
    1.0
}
const fn default_tick_hz() -> f64 {
    60.0
}

// ---------------------------------------------------------------------------
// ListenerConfig
// ---------------------------------------------------------------------------

/// Socket and rendezvous settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Loopback port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// How long the listener waits for the simulation thread per command.
    #[serde(default = "default_rendezvous_timeout_ms")]
    pub rendezvous_timeout_ms: u64,

    /// Poll interval of the non-blocking accept loop.
    #[serde(default = "default_accept_poll_ms")]
    pub accept_poll_ms: u64,

    /// Upper bound on commands the simulation thread applies per tick.
    #[serde(default = "default_max_commands_per_tick")]
    pub max_commands_per_tick: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            rendezvous_timeout_ms: default_rendezvous_timeout_ms(),
            accept_poll_ms: default_accept_poll_ms(),
            max_commands_per_tick: default_max_commands_per_tick(),
        }
    }
}

// ---------------------------------------------------------------------------
// PoseConfig
// ---------------------------------------------------------------------------

/// Aim bounds and episode-start pose, in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseConfig {
    #[serde(default = "default_pitch_range")]
    pub pitch: AngleRange,
    #[serde(default = "default_yaw_range")]
    pub yaw: AngleRange,
    /// Pose restored on reset.
    #[serde(default = "default_pose")]
    pub default_pose: Pose,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            pitch: default_pitch_range(),
            yaw: default_yaw_range(),
            default_pose: default_pose(),
        }
    }
}

// ---------------------------------------------------------------------------
// FireConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireConfig {
    #[serde(default = "default_max_rounds_per_minute")]
    pub max_rounds_per_minute: f64,
}

impl Default for FireConfig {
    fn default() -> Self {
        Self {
            max_rounds_per_minute: default_max_rounds_per_minute(),
        }
    }
}

impl FireConfig {
    /// Minimum seconds between two shots.
    #[must_use]
    pub fn min_interval_secs(&self) -> f64 {
        60.0 / self.max_rounds_per_minute
    }
}

// ---------------------------------------------------------------------------
// SensorConfig
// ---------------------------------------------------------------------------

/// Peripheral ray grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Columns (left to right).
    #[serde(default = "default_grid_width")]
    pub grid_width: usize,
    /// Rows (top to bottom).
    #[serde(default = "default_grid_height")]
    pub grid_height: usize,
    /// Vertical half-angle of the grid.
    #[serde(default = "default_max_angle_degrees")]
    pub max_angle_degrees: f32,
    #[serde(default = "default_max_range")]
    pub max_range: f32,
    /// World-space origin of every sensor ray.
    #[serde(default)]
    pub origin: [f32; 3],
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            grid_width: default_grid_width(),
            grid_height: default_grid_height(),
            max_angle_degrees: default_max_angle_degrees(),
            max_range: default_max_range(),
            origin: [0.0; 3],
        }
    }
}

impl SensorConfig {
    /// Number of grid flags.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.grid_width * self.grid_height
    }

    #[must_use]
    pub const fn origin(&self) -> Vec3 {
        Vec3::from_array(self.origin)
    }
}

// ---------------------------------------------------------------------------
// TargetConfig
// ---------------------------------------------------------------------------

/// Normalization of target features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Aim-line offset at which the normalized distance reaches zero.
    #[serde(default = "default_max_aim_offset")]
    pub max_aim_offset: f32,
    /// Length of the forward overlap trace.
    #[serde(default = "default_overlap_range")]
    pub overlap_range: f32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            max_aim_offset: default_max_aim_offset(),
            overlap_range: default_overlap_range(),
        }
    }
}

// ---------------------------------------------------------------------------
// RewardConfig
// ---------------------------------------------------------------------------

/// Reward shaping constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "default_hit_reward")]
    pub hit_reward: f32,
    #[serde(default = "default_per_shot_penalty")]
    pub per_shot_penalty: f32,
    #[serde(default = "default_max_shaping_reward")]
    pub max_shaping_reward: f32,
    #[serde(default = "default_shaping_exponent")]
    pub shaping_exponent: f32,
    /// Scale of the improvement term; `0` disables it.
    #[serde(default)]
    pub delta_shaping_scale: f32,
    /// Time penalty per second; `<= 0` disables it.
    #[serde(default = "default_penalty_per_second")]
    pub penalty_per_second: f32,
    /// Log the per-tick breakdown at debug level.
    #[serde(default)]
    pub log_breakdown: bool,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            hit_reward: default_hit_reward(),
            per_shot_penalty: default_per_shot_penalty(),
            max_shaping_reward: default_max_shaping_reward(),
            shaping_exponent: default_shaping_exponent(),
            delta_shaping_scale: 0.0,
            penalty_per_second: default_penalty_per_second(),
            log_breakdown: false,
        }
    }
}

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Simulation loop rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickConfig {
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f64,
    /// When set, every tick advances reward time by exactly this many seconds.
    #[serde(default)]
    pub fixed_delta_secs: Option<f32>,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            fixed_delta_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// BridgeConfig
// ---------------------------------------------------------------------------

/// Complete static configuration of the bridge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Resource)]
pub struct BridgeConfig {
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub pose: PoseConfig,
    #[serde(default)]
    pub fire: FireConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub reward: RewardConfig,
    #[serde(default)]
    pub tick: TickConfig,
}

impl BridgeConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("pose.pitch", &self.pose.pitch)?;
        check_range("pose.yaw", &self.pose.yaw)?;
        if !self.pose.pitch.contains(self.pose.default_pose.pitch) {
            return Err(ConfigError::invalid(
                "pose.default_pose.pitch",
                "outside pose.pitch bounds",
            ));
        }
        if !self.pose.yaw.contains(self.pose.default_pose.yaw) {
            return Err(ConfigError::invalid(
                "pose.default_pose.yaw",
                "outside pose.yaw bounds",
            ));
        }
        if self.fire.max_rounds_per_minute <= 0.0 {
            return Err(ConfigError::invalid(
                "fire.max_rounds_per_minute",
                "must be > 0",
            ));
        }
        if self.sensor.grid_width == 0 || self.sensor.grid_height == 0 {
            return Err(ConfigError::EmptyGrid {
                width: self.sensor.grid_width,
                height: self.sensor.grid_height,
            });
        }
        if !(0.0..90.0).contains(&self.sensor.max_angle_degrees) {
            return Err(ConfigError::invalid(
                "sensor.max_angle_degrees",
                "must be in [0, 90)",
            ));
        }
        if self.sensor.max_range <= 0.0 {
            return Err(ConfigError::invalid("sensor.max_range", "must be > 0"));
        }
        if self.target.max_aim_offset <= 0.0 {
            return Err(ConfigError::invalid("target.max_aim_offset", "must be > 0"));
        }
        if self.tick.tick_hz <= 0.0 {
            return Err(ConfigError::invalid("tick.tick_hz", "must be > 0"));
        }
        if self.listener.rendezvous_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "listener.rendezvous_timeout_ms",
                "must be > 0",
            ));
        }
        if self.listener.max_commands_per_tick == 0 {
            return Err(ConfigError::invalid(
                "listener.max_commands_per_tick",
                "must be > 0",
            ));
        }
        Ok(())
    }

    /// Observation length: one flag per grid cell plus five scalar features.
    #[must_use]
    pub const fn observation_len(&self) -> usize {
        self.sensor.cell_count() + 5
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML, e.g. to seed a config file.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn check_range(field: &str, range: &AngleRange) -> Result<(), ConfigError> {
    if range.min > range.max {
        return Err(ConfigError::InvalidRange {
            field: field.into(),
            min: range.min,
            max: range.max,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_toml_roundtrip() {
        let config = BridgeConfig::default();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[listener]"));
        assert_eq!(BridgeConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn default_config_is_valid() {
        let config = BridgeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.listener.port, 7777);
        assert_eq!(config.sensor.grid_width, 41);
        assert_eq!(config.sensor.grid_height, 27);
        assert_eq!(config.observation_len(), 41 * 27 + 5);
    }

    #[test]
    fn fire_interval_from_rpm() {
        let fire = FireConfig::default();
        assert!((fire.min_interval_secs() - 60.0 / 840.0).abs() < 1e-12);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = BridgeConfig::from_toml_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn partial_toml_deserialization() {
        let toml_str = r"
            [listener]
            port = 9000

            [pose]
            pitch = { min = -10.0, max = 10.0 }
            default_pose = { pitch = 0.0, yaw = 265.0 }

            [sensor]
            grid_width = 6
            grid_height = 4
            origin = [0.0, 0.0, 150.0]

            [reward]
            penalty_per_second = 0.5
            delta_shaping_scale = 2.0

            [tick]
            fixed_delta_secs = 0.016
        ";
        let config = BridgeConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.listener.accept_poll_ms, 10);
        assert!((config.pose.pitch.min - (-10.0)).abs() < f32::EPSILON);
        assert!((config.pose.yaw.max - 278.0).abs() < f32::EPSILON);
        assert_eq!(config.sensor.cell_count(), 24);
        assert!((config.sensor.origin().z - 150.0).abs() < f32::EPSILON);
        assert!((config.reward.penalty_per_second - 0.5).abs() < f32::EPSILON);
        assert!((config.reward.hit_reward - 250.0).abs() < f32::EPSILON);
        assert_eq!(config.tick.fixed_delta_secs, Some(0.016));
    }

    #[test]
    fn inverted_range_rejected() {
        let mut config = BridgeConfig::default();
        config.pose.pitch = AngleRange::new(21.0, 4.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn default_pose_outside_bounds_rejected() {
        let mut config = BridgeConfig::default();
        config.pose.default_pose = Pose::new(30.0, 265.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn empty_grid_rejected() {
        let mut config = BridgeConfig::default();
        config.sensor.grid_height = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyGrid { width: 41, height: 0 })
        ));
    }

    #[test]
    fn zero_rpm_rejected() {
        let mut config = BridgeConfig::default();
        config.fire.max_rounds_per_minute = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = BridgeConfig::from_toml_str("[listener]\nport = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BridgeConfig::from_file("/nonexistent/steelrain.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn config_serde_roundtrip() {
        let config = BridgeConfig::default();
        let text = toml::to_string(&config).unwrap();
        let back: BridgeConfig = toml::from_str(&text).unwrap();
        assert_eq!(config, back);
    }
}
