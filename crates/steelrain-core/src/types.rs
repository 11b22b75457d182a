use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AngleRange
// ---------------------------------------------------------------------------

/// Closed interval `[min, max]` in the same units as the angles it bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleRange {
    pub min: f32,
    pub max: f32,
}

impl AngleRange {
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into `[min, max]` (both ends inclusive).
    ///
    /// Unlike [`f32::clamp`] this never panics: an inverted range pins every
    /// value to `max`.
    #[must_use]
    pub fn clamp(&self, value: f32) -> f32 {
        value.max(self.min).min(self.max)
    }

    /// Map `value` to `[0, 1]` across the range. A degenerate range maps to 0.
    #[must_use]
    pub fn normalize(&self, value: f32) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    /// Whether `value` lies inside the closed interval.
    #[must_use]
    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// Control orientation of the aiming rig, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub pitch: f32,
    pub yaw: f32,
}

impl Pose {
    #[must_use]
    pub const fn new(pitch: f32, yaw: f32) -> Self {
        Self { pitch, yaw }
    }

    /// Raw pose after adding deltas, before any clamping.
    #[must_use]
    pub fn offset(self, pitch_delta: f32, yaw_delta: f32) -> Self {
        Self {
            pitch: self.pitch + pitch_delta,
            yaw: self.yaw + yaw_delta,
        }
    }

    /// Clamp each axis independently into its bound.
    #[must_use]
    pub fn clamped(self, pitch: &AngleRange, yaw: &AngleRange) -> Self {
        Self {
            pitch: pitch.clamp(self.pitch),
            yaw: yaw.clamp(self.yaw),
        }
    }

    /// Orthonormal sensor basis for this pose in a Z-up world.
    ///
    /// Yaw rotates about +Z starting from +X, pitch raises the forward vector
    /// towards +Z.
    #[must_use]
    pub fn basis(&self) -> AimBasis {
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        let forward = Vec3::new(cp * cy, cp * sy, sp);
        let right = forward.cross(Vec3::Z).try_normalize().unwrap_or(Vec3::new(sy, -cy, 0.0));
        let up = right.cross(forward);
        AimBasis { forward, right, up }
    }
}

/// Forward/right/up unit vectors of the sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimBasis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

// ---------------------------------------------------------------------------
// Sphere
// ---------------------------------------------------------------------------

/// Sphere in world space. Targets and obstacles are modelled as spheres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    #[must_use]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Distance along the unit ray `direction` to the first surface crossing.
    ///
    /// A ray starting inside the sphere reports the exit point. Crossings
    /// behind the origin are ignored.
    #[must_use]
    pub fn intersect(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let oc = origin - self.center;
        let b = oc.dot(direction);
        let c = self.radius.mul_add(-self.radius, oc.length_squared());
        let disc = b.mul_add(b, -c);
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        let near = -b - root;
        let t = if near >= 0.0 { near } else { -b + root };
        (t >= 0.0).then_some(t)
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// Step action as sent by the controller: `[pitch_delta, yaw_delta, fire_flag]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StepAction {
    pub pitch_delta: f32,
    pub yaw_delta: f32,
    /// Non-zero requests a shot.
    pub fire_flag: i32,
}

impl StepAction {
    #[must_use]
    pub const fn new(pitch_delta: f32, yaw_delta: f32, fire_flag: i32) -> Self {
        Self {
            pitch_delta,
            yaw_delta,
            fire_flag,
        }
    }

    /// Build from the wire triple. The fire component is truncated to an
    /// integer, so `0.7` does not fire.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_triple(values: [f32; 3]) -> Self {
        Self::new(values[0], values[1], values[2] as i32)
    }

    #[must_use]
    pub const fn wants_fire(&self) -> bool {
        self.fire_flag != 0
    }
}

/// A parsed controller command. Consumed exactly once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Reset,
    Step(StepAction),
    Pause,
    Resume,
}

impl Command {
    /// Wire name of the command.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Step(_) => "step",
            Self::Pause => "pause",
            Self::Resume => "resume",
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Result of a reset or step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Vec<f32>,
    pub reward: f32,
    pub done: bool,
    /// Delta time of the last simulation tick (0 on reset).
    pub delta_time: f32,
}

/// Whether the simulation loop is advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Running,
    Paused,
}

/// What the simulation thread hands back for a [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Step(StepResult),
    Status(RunState),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_range_clamp_is_inclusive() {
        let r = AngleRange::new(4.0, 21.0);
        assert!((r.clamp(21.0) - 21.0).abs() < f32::EPSILON);
        assert!((r.clamp(4.0) - 4.0).abs() < f32::EPSILON);
        assert!((r.clamp(121.0) - 21.0).abs() < f32::EPSILON);
        assert!((r.clamp(-50.0) - 4.0).abs() < f32::EPSILON);
        assert!(r.contains(4.0) && r.contains(21.0));
    }

    #[test]
    fn inverted_range_clamps_without_panicking() {
        let r = AngleRange::new(21.0, 4.0);
        assert!((r.clamp(13.0) - 4.0).abs() < f32::EPSILON);
        assert!((r.clamp(-100.0) - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn sphere_intersection_from_outside() {
        let s = Sphere::new(Vec3::new(10.0, 0.0, 0.0), 2.0);
        let t = s.intersect(Vec3::ZERO, Vec3::X).unwrap();
        assert!((t - 8.0).abs() < 1e-5);
        assert!(s.intersect(Vec3::ZERO, Vec3::Y).is_none());
        assert!(s.intersect(Vec3::ZERO, -Vec3::X).is_none());
    }

    #[test]
    fn sphere_intersection_from_inside() {
        let s = Sphere::new(Vec3::ZERO, 5.0);
        let t = s.intersect(Vec3::ZERO, Vec3::X).unwrap();
        assert!((t - 5.0).abs() < 1e-5);
    }

    #[test]
    fn sphere_grazing_ray_touches_once() {
        let s = Sphere::new(Vec3::new(10.0, 1.0, 0.0), 1.0);
        let t = s.intersect(Vec3::ZERO, Vec3::X).unwrap();
        assert!((t - 10.0).abs() < 1e-3);
    }

    #[test]
    fn angle_range_normalize() {
        let r = AngleRange::new(253.0, 278.0);
        assert!(r.normalize(253.0).abs() < f32::EPSILON);
        assert!((r.normalize(278.0) - 1.0).abs() < f32::EPSILON);
        assert!((r.normalize(265.5) - 0.5).abs() < 1e-6);
        assert!((r.normalize(400.0) - 1.0).abs() < f32::EPSILON);
        assert!(AngleRange::new(1.0, 1.0).normalize(1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn pose_offset_then_clamp() {
        let pitch = AngleRange::new(4.0, 21.0);
        let yaw = AngleRange::new(253.0, 278.0);
        let p = Pose::new(13.0, 265.0).offset(100.0, -100.0).clamped(&pitch, &yaw);
        assert!((p.pitch - 21.0).abs() < f32::EPSILON);
        assert!((p.yaw - 253.0).abs() < f32::EPSILON);
    }

    #[test]
    fn basis_is_orthonormal() {
        let b = Pose::new(13.0, 265.0).basis();
        assert!((b.forward.length() - 1.0).abs() < 1e-5);
        assert!((b.right.length() - 1.0).abs() < 1e-5);
        assert!((b.up.length() - 1.0).abs() < 1e-5);
        assert!(b.forward.dot(b.right).abs() < 1e-5);
        assert!(b.forward.dot(b.up).abs() < 1e-5);
        assert!(b.up.z > 0.0);
    }

    #[test]
    fn basis_level_pose_points_along_x() {
        let b = Pose::new(0.0, 0.0).basis();
        assert!((b.forward - Vec3::X).length() < 1e-6);
        assert!((b.right - Vec3::NEG_Y).length() < 1e-6);
        assert!((b.up - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn basis_straight_up_uses_fallback_right() {
        let b = Pose::new(90.0, 0.0).basis();
        assert!((b.right.length() - 1.0).abs() < 1e-5);
        assert!(b.forward.dot(b.right).abs() < 1e-5);
    }

    #[test]
    fn step_action_fire_truncates() {
        assert!(!StepAction::from_triple([0.0, 0.0, 0.7]).wants_fire());
        assert!(StepAction::from_triple([0.0, 0.0, 1.0]).wants_fire());
        assert!(StepAction::from_triple([0.0, 0.0, -1.0]).wants_fire());
    }

    #[test]
    fn command_names() {
        assert_eq!(Command::Reset.name(), "reset");
        assert_eq!(Command::Step(StepAction::default()).name(), "step");
        assert_eq!(Command::Pause.name(), "pause");
        assert_eq!(Command::Resume.name(), "resume");
    }

    #[test]
    fn step_result_serde_roundtrip() {
        let r = StepResult {
            observation: vec![0.0, 1.0, 0.5],
            reward: -0.016,
            done: true,
            delta_time: 0.016,
        };
        let json = serde_json::to_string(&r).unwrap();
        let r2: StepResult = serde_json::from_str(&json).unwrap();
        assert_eq!(r, r2);
    }
}
