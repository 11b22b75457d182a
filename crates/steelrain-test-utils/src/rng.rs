//! Deterministic RNG utilities for reproducible tests.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use steelrain_core::types::StepAction;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Random step action with deltas in `[-max_delta, max_delta]` and a fire
/// flag set roughly one time in four.
pub fn random_step_action(rng: &mut impl Rng, max_delta: f32) -> StepAction {
    StepAction::new(
        rng.gen_range(-max_delta..=max_delta),
        rng.gen_range(-max_delta..=max_delta),
        i32::from(rng.gen_bool(0.25)),
    )
}

/// A reproducible sequence of `count` random actions.
pub fn random_actions(count: usize, max_delta: f32, seed: u64) -> Vec<StepAction> {
    let mut rng = seeded_rng(seed);
    (0..count)
        .map(|_| random_step_action(&mut rng, max_delta))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
