//! Peripheral ray-grid sensor and target features.
//!
//! The [`SensorSampler`] casts a `grid_width x grid_height` pyramid of rays
//! around the aim direction and flags the rays whose first hit is the target.
//! Together with the pose and target features this forms a [`SensorFrame`],
//! which flattens into the observation vector:
//!
//! ```text
//! [flag_0 .. flag_{w*h-1}, norm_pitch, norm_yaw, normalized_distance, signed_angle, overlap]
//! ```

use std::f32::consts::PI;

use bevy::log::warn_once;
use bevy::math::Vec3;
use thiserror::Error;

use steelrain_core::config::{BridgeConfig, SensorConfig, TargetConfig};
use steelrain_core::traits::RayCaster;
use steelrain_core::types::{AimBasis, Pose};

/// Number of scalar features appended after the grid flags.
pub const SCALAR_FEATURES: usize = 5;

/// Horizontal extent of the grid relative to its vertical extent.
pub const ASPECT_RATIO: f32 = 1.5;

/// The sampler has no ray caster; the frame was zero-filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no ray caster available, sensor frame zero-filled")]
pub struct SamplingDegraded;

// ---------------------------------------------------------------------------
// TargetMetrics
// ---------------------------------------------------------------------------

/// Aim quality relative to the active target. All zero without a target.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetMetrics {
    /// `1.0` when the aim line passes through the target centre, falling to
    /// `0.0` at `max_aim_offset`.
    pub normalized_distance: f32,
    /// Horizontal angle to the target in `[-1, 1]`; positive is counterclockwise.
    pub signed_angle: f32,
    /// `1.0` when the forward trace hits the target first.
    pub overlap: f32,
}

impl TargetMetrics {
    #[must_use]
    pub fn is_overlapping(&self) -> bool {
        self.overlap > 0.5
    }
}

// ---------------------------------------------------------------------------
// SensorFrame
// ---------------------------------------------------------------------------

/// One complete sensor reading. Always rebuilt as a whole.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorFrame {
    /// Row-major grid flags, top-left first.
    pub flags: Vec<f32>,
    pub norm_pitch: f32,
    pub norm_yaw: f32,
    pub metrics: TargetMetrics,
}

impl SensorFrame {
    /// All-zero frame for a grid of `cells` rays.
    #[must_use]
    pub fn zeroed(cells: usize) -> Self {
        Self {
            flags: vec![0.0; cells],
            ..Self::default()
        }
    }

    /// Length of [`observation`](Self::observation).
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len() + SCALAR_FEATURES
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into the observation vector.
    #[must_use]
    pub fn observation(&self) -> Vec<f32> {
        let mut obs = Vec::with_capacity(self.len());
        obs.extend_from_slice(&self.flags);
        obs.extend_from_slice(&[
            self.norm_pitch,
            self.norm_yaw,
            self.metrics.normalized_distance,
            self.metrics.signed_angle,
            self.metrics.overlap,
        ]);
        obs
    }

    /// Number of grid rays currently on the target.
    #[must_use]
    pub fn target_cells(&self) -> usize {
        self.flags.iter().filter(|&&f| f > 0.5).count()
    }
}

// ---------------------------------------------------------------------------
// Grid geometry
// ---------------------------------------------------------------------------

/// Map an index in `0..count` to `[-1, 1]`. A single cell maps to 0.
#[allow(clippy::cast_precision_loss)]
fn axis_coord(index: usize, count: usize) -> f32 {
    if count <= 1 {
        return 0.0;
    }
    (index as f32 / (count - 1) as f32).mul_add(2.0, -1.0)
}

/// Unit direction of the grid ray at (`col`, `row`).
///
/// Columns run left to right, rows top to bottom.
#[must_use]
pub fn grid_ray_direction(
    basis: &AimBasis,
    col: usize,
    row: usize,
    grid: &SensorConfig,
) -> Vec3 {
    let vertical_scale = grid.max_angle_degrees.to_radians().tan();
    let horizontal_scale = ASPECT_RATIO * vertical_scale;
    let nx = axis_coord(col, grid.grid_width);
    let ny = -axis_coord(row, grid.grid_height);
    (basis.forward + basis.right * (nx * horizontal_scale) + basis.up * (ny * vertical_scale))
        .normalize_or(basis.forward)
}

/// Normalized pitch and yaw of `pose` across the configured bounds.
#[must_use]
pub fn pose_features(pose: Pose, config: &BridgeConfig) -> (f32, f32) {
    (
        config.pose.pitch.normalize(pose.pitch),
        config.pose.yaw.normalize(pose.yaw),
    )
}

/// Distance from `target` to the closest point on the forward ray.
fn aim_offset(origin: Vec3, forward: Vec3, target: Vec3) -> f32 {
    let to_target = target - origin;
    let along = to_target.dot(forward);
    if along < 0.0 {
        return to_target.length();
    }
    (to_target - forward * along).length()
}

/// Signed horizontal angle from `forward` to `to_target`, divided by PI.
fn signed_horizontal_angle(forward: Vec3, to_target: Vec3) -> f32 {
    let f = forward.truncate();
    let t = to_target.truncate();
    if f.length_squared() <= f32::EPSILON || t.length_squared() <= f32::EPSILON {
        return 0.0;
    }
    f.perp_dot(t).atan2(f.dot(t)) / PI
}

// ---------------------------------------------------------------------------
// SensorSampler
// ---------------------------------------------------------------------------

/// Casts the ray grid and computes target features through a host [`RayCaster`].
pub struct SensorSampler {
    caster: Option<Box<dyn RayCaster>>,
}

impl SensorSampler {
    pub fn new(caster: impl RayCaster) -> Self {
        Self {
            caster: Some(Box::new(caster)),
        }
    }

    /// Sampler without a world to query. Every frame is zero-filled.
    #[must_use]
    pub const fn detached() -> Self {
        Self { caster: None }
    }

    /// Name of the attached caster, if any.
    pub fn caster_name(&self) -> Option<&str> {
        self.caster.as_deref().map(RayCaster::name)
    }

    /// Cast the grid. Fails only when no caster is attached.
    pub fn try_sample(
        &self,
        origin: Vec3,
        basis: &AimBasis,
        grid: &SensorConfig,
    ) -> Result<Vec<f32>, SamplingDegraded> {
        let caster = self.caster.as_deref().ok_or(SamplingDegraded)?;
        let mut flags = Vec::with_capacity(grid.cell_count());
        for row in 0..grid.grid_height {
            for col in 0..grid.grid_width {
                let dir = grid_ray_direction(basis, col, row, grid);
                let hit = caster.cast(origin, dir, grid.max_range);
                flags.push(if hit.is_some_and(|h| h.on_target) { 1.0 } else { 0.0 });
            }
        }
        Ok(flags)
    }

    /// Cast the grid, zero-filling when degraded.
    pub fn sample(&self, origin: Vec3, basis: &AimBasis, grid: &SensorConfig) -> Vec<f32> {
        self.try_sample(origin, basis, grid).unwrap_or_else(|err| {
            warn_once!("sensor sampling degraded: {err}");
            vec![0.0; grid.cell_count()]
        })
    }

    /// Aim features relative to `target`. All zero when `target` is `None`.
    pub fn target_metrics(
        &self,
        origin: Vec3,
        forward: Vec3,
        target: Option<Vec3>,
        config: &TargetConfig,
    ) -> TargetMetrics {
        let Some(target) = target else {
            return TargetMetrics::default();
        };
        let offset = aim_offset(origin, forward, target);
        let normalized_distance = 1.0 - (offset / config.max_aim_offset).clamp(0.0, 1.0);
        let signed_angle = signed_horizontal_angle(forward, target - origin);
        let on_target = self
            .caster
            .as_deref()
            .and_then(|c| c.cast(origin, forward, config.overlap_range))
            .is_some_and(|h| h.on_target);
        TargetMetrics {
            normalized_distance,
            signed_angle,
            overlap: if on_target { 1.0 } else { 0.0 },
        }
    }

    /// Build a full frame for `pose`.
    pub fn frame(&self, pose: Pose, config: &BridgeConfig, target: Option<Vec3>) -> SensorFrame {
        let basis = pose.basis();
        let origin = config.sensor.origin();
        let (norm_pitch, norm_yaw) = pose_features(pose, config);
        SensorFrame {
            flags: self.sample(origin, &basis, &config.sensor),
            norm_pitch,
            norm_yaw,
            metrics: self.target_metrics(origin, basis.forward, target, &config.target),
        }
    }
}

impl std::fmt::Debug for SensorSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSampler")
            .field("caster", &self.caster_name())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
