use bevy::math::Vec3;

use crate::types::Pose;

// ---------------------------------------------------------------------------
// RayCaster
// ---------------------------------------------------------------------------

/// First intersection along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// Whether the hit object is the tagged target (as opposed to an obstacle).
    pub on_target: bool,
}

/// Host-provided ray intersection primitive.
pub trait RayCaster: Send + Sync + 'static {
    /// Cast a ray from `origin` along the unit vector `direction`, returning
    /// the closest hit within `max_range`.
    fn cast(&self, origin: Vec3, direction: Vec3, max_range: f32) -> Option<RayHit>;

    /// Human-readable name for this ray caster.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// AimController
// ---------------------------------------------------------------------------

/// Host-provided pose control: reads and writes the control orientation.
pub trait AimController: Send + Sync + 'static {
    /// Current control orientation.
    fn orientation(&self) -> Pose;

    /// Apply a new control orientation.
    fn set_orientation(&mut self, pose: Pose);

    /// Human-readable name for this controller.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// FireAction
// ---------------------------------------------------------------------------

/// The shot handed to a [`FireAction`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub origin: Vec3,
    pub direction: Vec3,
    /// Whether the forward trace currently strikes the target first.
    pub on_target: bool,
}

/// How the host resolved a shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// The shot struck the target.
    Hit,
    /// The shot was taken and missed.
    Miss,
    /// The host declined to fire (no shot penalty).
    Ignored,
}

/// Host-side fire action, invoked only when the rate limiter lets a shot through.
pub trait FireAction: Send + Sync + 'static {
    fn fire(&mut self, shot: &Shot) -> FireOutcome;

    /// Human-readable name for this action.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// FireClock
// ---------------------------------------------------------------------------

/// Monotonic seconds used for fire-rate limiting.
pub trait FireClock: Send + Sync + 'static {
    fn now_secs(&self) -> f64;
}
