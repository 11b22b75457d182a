//! Mock implementations of the host collaborator traits.
//!
//! Every mock is cheap to clone and clones share state, so a test can hand
//! one copy to the controller and keep another to drive or inspect it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bevy::math::Vec3;
use parking_lot::{Mutex, RwLock};
use steelrain_core::traits::{AimController, FireAction, FireClock, FireOutcome, RayCaster, RayHit, Shot};
use steelrain_core::types::{Pose, Sphere};

// ---------------------------------------------------------------------------
// ScriptedRayCaster
// ---------------------------------------------------------------------------

type CastFn = dyn Fn(Vec3, Vec3, f32) -> Option<RayHit> + Send + Sync;

/// A ray caster whose answer comes from a closure.
#[derive(Clone)]
pub struct ScriptedRayCaster {
    script: Arc<CastFn>,
    casts: Arc<AtomicUsize>,
}

impl ScriptedRayCaster {
    /// Answer every cast with `script(origin, direction, max_range)`.
    pub fn from_fn(script: impl Fn(Vec3, Vec3, f32) -> Option<RayHit> + Send + Sync + 'static) -> Self {
        Self {
            script: Arc::new(script),
            casts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every ray misses.
    pub fn empty() -> Self {
        Self::from_fn(|_, _, _| None)
    }

    /// Every ray hits the target at `distance` (if within range).
    pub fn target(distance: f32) -> Self {
        Self::from_fn(move |_, _, range| {
            (distance <= range).then_some(RayHit {
                distance,
                on_target: true,
            })
        })
    }

    /// Every ray hits an obstacle at `distance` (if within range).
    pub fn obstacle(distance: f32) -> Self {
        Self::from_fn(move |_, _, range| {
            (distance <= range).then_some(RayHit {
                distance,
                on_target: false,
            })
        })
    }

    /// Number of casts answered so far.
    pub fn casts(&self) -> usize {
        self.casts.load(Ordering::SeqCst)
    }
}

impl RayCaster for ScriptedRayCaster {
    fn cast(&self, origin: Vec3, direction: Vec3, max_range: f32) -> Option<RayHit> {
        self.casts.fetch_add(1, Ordering::SeqCst);
        (self.script)(origin, direction, max_range)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ScriptedRayCaster"
    }
}

// ---------------------------------------------------------------------------
// SphereTargetCaster
// ---------------------------------------------------------------------------

/// Exact ray/sphere intersection against a single movable target sphere.
#[derive(Clone)]
pub struct SphereTargetCaster {
    center: Arc<RwLock<Vec3>>,
    radius: f32,
}

impl SphereTargetCaster {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center: Arc::new(RwLock::new(center)),
            radius,
        }
    }

    pub fn set_center(&self, center: Vec3) {
        *self.center.write() = center;
    }

    pub fn center(&self) -> Vec3 {
        *self.center.read()
    }
}

impl RayCaster for SphereTargetCaster {
    fn cast(&self, origin: Vec3, direction: Vec3, max_range: f32) -> Option<RayHit> {
        Sphere::new(self.center(), self.radius)
            .intersect(origin, direction)
            .filter(|t| *t <= max_range)
            .map(|distance| RayHit {
                distance,
                on_target: true,
            })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "SphereTargetCaster"
    }
}

// ---------------------------------------------------------------------------
// CountingFire
// ---------------------------------------------------------------------------

/// A fire action that always resolves to the same outcome and counts calls.
#[derive(Clone)]
pub struct CountingFire {
    outcome: FireOutcome,
    shots: Arc<AtomicUsize>,
}

impl CountingFire {
    pub fn new(outcome: FireOutcome) -> Self {
        Self {
            outcome,
            shots: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of times the controller actually fired.
    pub fn count(&self) -> usize {
        self.shots.load(Ordering::SeqCst)
    }
}

impl FireAction for CountingFire {
    fn fire(&mut self, _shot: &Shot) -> FireOutcome {
        self.shots.fetch_add(1, Ordering::SeqCst);
        self.outcome
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "CountingFire"
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

/// A fire clock that only moves when told to.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    /// Clock starting at zero seconds.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, secs: f64) {
        *self.now.lock() += secs;
    }

    pub fn set(&self, secs: f64) {
        *self.now.lock() = secs;
    }
}

impl FireClock for ManualClock {
    fn now_secs(&self) -> f64 {
        *self.now.lock()
    }
}

// ---------------------------------------------------------------------------
// SharedAim
// ---------------------------------------------------------------------------

/// Pose control whose state stays observable from the test.
#[derive(Clone, Default)]
pub struct SharedAim {
    pose: Arc<Mutex<Pose>>,
}

impl SharedAim {
    pub fn new(pose: Pose) -> Self {
        Self {
            pose: Arc::new(Mutex::new(pose)),
        }
    }

    pub fn pose(&self) -> Pose {
        *self.pose.lock()
    }
}

impl AimController for SharedAim {
    fn orientation(&self) -> Pose {
        self.pose()
    }

    fn set_orientation(&mut self, pose: Pose) {
        *self.pose.lock() = pose;
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "SharedAim"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_caster_respects_range_and_counts() {
        let caster = ScriptedRayCaster::target(100.0);
        assert!(caster.cast(Vec3::ZERO, Vec3::X, 200.0).is_some_and(|h| h.on_target));
        assert!(caster.cast(Vec3::ZERO, Vec3::X, 50.0).is_none());
        assert_eq!(caster.casts(), 2);
        assert!(ScriptedRayCaster::empty().cast(Vec3::ZERO, Vec3::X, 1e6).is_none());
    }

    #[test]
    fn sphere_caster_hits_front_surface() {
        let caster = SphereTargetCaster::new(Vec3::new(100.0, 0.0, 0.0), 10.0);
        let hit = caster.cast(Vec3::ZERO, Vec3::X, 1000.0).unwrap();
        assert!((hit.distance - 90.0).abs() < 1e-4);
        assert!(caster.cast(Vec3::ZERO, Vec3::Y, 1000.0).is_none());
        assert!(caster.cast(Vec3::ZERO, Vec3::NEG_X, 1000.0).is_none());
        assert!(caster.cast(Vec3::ZERO, Vec3::X, 50.0).is_none());
    }

    #[test]
    fn sphere_caster_moves_for_all_clones() {
        let caster = SphereTargetCaster::new(Vec3::X * 100.0, 10.0);
        let handle = caster.clone();
        handle.set_center(Vec3::Y * 100.0);
        assert!(caster.cast(Vec3::ZERO, Vec3::Y, 1000.0).is_some());
        assert_eq!(caster.center(), Vec3::Y * 100.0);
    }

    #[test]
    fn counting_fire_shares_counter() {
        let fire = CountingFire::new(FireOutcome::Miss);
        let mut handle = fire.clone();
        let shot = Shot {
            origin: Vec3::ZERO,
            direction: Vec3::X,
            on_target: false,
        };
        assert_eq!(handle.fire(&shot), FireOutcome::Miss);
        assert_eq!(fire.count(), 1);
    }

    #[test]
    fn manual_clock_moves_on_demand() {
        let clock = ManualClock::new();
        assert!(clock.now_secs().abs() < f64::EPSILON);
        clock.advance(0.25);
        clock.advance(0.25);
        assert!((clock.now_secs() - 0.5).abs() < 1e-12);
        clock.set(10.0);
        assert!((clock.now_secs() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn shared_aim_is_visible_through_clone() {
        let aim = SharedAim::new(Pose::new(1.0, 2.0));
        let mut handle = aim.clone();
        handle.set_orientation(Pose::new(3.0, 4.0));
        assert_eq!(aim.pose(), Pose::new(3.0, 4.0));
    }
}
