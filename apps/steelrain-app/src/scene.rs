//! Minimal sphere arena used by the headless host.
//!
//! The arena answers ray casts for the sensor grid and the fire trace. One
//! sphere is the tagged target; it moves to a fresh seeded position after
//! every hit.

use std::sync::Arc;

use bevy::log::info;
use bevy::math::Vec3;
use bevy::prelude::*;
use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use steelrain_core::config::BridgeConfig;
use steelrain_core::traits::{RayCaster, RayHit};
use steelrain_core::types::{Pose, Sphere};
use steelrain_env::episode::EpisodeController;

/// Radius of the target sphere.
pub const TARGET_RADIUS: f32 = 150.0;

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ArenaState {
    target: Option<Sphere>,
    obstacles: Vec<Sphere>,
}

/// Shared scene geometry. Clones see the same spheres.
#[derive(Resource, Clone, Debug, Default)]
pub struct Arena {
    state: Arc<RwLock<ArenaState>>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_obstacle(&self, sphere: Sphere) {
        self.state.write().obstacles.push(sphere);
    }

    pub fn set_target(&self, sphere: Sphere) {
        self.state.write().target = Some(sphere);
    }

    pub fn target(&self) -> Option<Sphere> {
        self.state.read().target
    }
}

impl RayCaster for Arena {
    fn cast(&self, origin: Vec3, direction: Vec3, max_range: f32) -> Option<RayHit> {
        let state = self.state.read();
        let target = state
            .target
            .and_then(|s| s.intersect(origin, direction))
            .map(|distance| RayHit {
                distance,
                on_target: true,
            });
        state
            .obstacles
            .iter()
            .filter_map(|s| s.intersect(origin, direction))
            .map(|distance| RayHit {
                distance,
                on_target: false,
            })
            .chain(target)
            .filter(|hit| hit.distance <= max_range)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "Arena"
    }
}

// ---------------------------------------------------------------------------
// TargetSpawner
// ---------------------------------------------------------------------------

/// Seeded source of target positions inside the aim envelope.
#[derive(Resource, Debug)]
pub struct TargetSpawner {
    rng: ChaCha8Rng,
    /// `(episodes, hits)` at the last check.
    seen: (u64, u64),
}

impl TargetSpawner {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seen: (0, 0),
        }
    }

    /// A position reachable by some pose within the configured bounds, at
    /// 20 to 80 percent of the shorter of sensor and overlap range.
    pub fn next_position(&mut self, config: &BridgeConfig) -> Vec3 {
        let pose = Pose::new(
            self.rng.gen_range(config.pose.pitch.min..=config.pose.pitch.max),
            self.rng.gen_range(config.pose.yaw.min..=config.pose.yaw.max),
        );
        let reach = spawn_reach(config);
        let distance = self.rng.gen_range(0.2 * reach..=0.8 * reach);
        config.sensor.origin() + pose.basis().forward * distance
    }
}

fn spawn_reach(config: &BridgeConfig) -> f32 {
    config.sensor.max_range.min(config.target.overlap_range)
}

/// Populate the arena: a few obstacles off the aim envelope plus the first
/// target, registered with the controller.
pub fn spawn_scene(
    arena: &Arena,
    spawner: &mut TargetSpawner,
    controller: &mut EpisodeController,
    config: &BridgeConfig,
) {
    let origin = config.sensor.origin();
    let range = config.sensor.max_range;
    for i in 0..3u8 {
        let pose = Pose::new(
            config.pose.pitch.min,
            config.pose.yaw.min + f32::from(i) * (config.pose.yaw.max - config.pose.yaw.min) / 2.0,
        );
        let center = origin + pose.basis().forward * (0.5 * range) - Vec3::Z * (0.1 * range);
        arena.add_obstacle(Sphere::new(center, 0.03 * range));
    }

    let position = spawner.next_position(config);
    arena.set_target(Sphere::new(position, TARGET_RADIUS));
    if controller.register_target(position).is_err() {
        // Host already registered a target; just move it.
        let _ = controller.update_target_position(position);
    }
    info!("target spawned at {position}");
}

/// Move the target after each hit.
#[allow(clippy::needless_pass_by_value)]
pub fn respawn_target_system(
    mut controller: ResMut<EpisodeController>,
    mut spawner: ResMut<TargetSpawner>,
    arena: Res<Arena>,
) {
    let stats = controller.stats();
    let key = (stats.episodes, stats.hits);
    if key == spawner.seen {
        return;
    }
    let new_hit =
        stats.hits > 0 && (stats.episodes != spawner.seen.0 || stats.hits > spawner.seen.1);
    spawner.seen = key;
    if !new_hit {
        return;
    }

    let position = spawner.next_position(controller.config());
    arena.set_target(Sphere::new(position, TARGET_RADIUS));
    let moved = controller
        .update_target_position(position)
        .or_else(|_| controller.register_target(position));
    if moved.is_ok() {
        info!("target respawned at {position}");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
