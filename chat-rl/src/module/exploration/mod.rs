use rand::Rng;

use crate::environment::Space;

/// Replaces `action` by a uniform sample from `space` with probability
/// `exploration_probability`, clamped to `[0, 1]`.
pub fn epsilon_greedy<S: Space, R: Rng>(
    exploration_probability: f64,
    space: &S,
    action: S::Element,
    rng: &mut R,
) -> S::Element {
    if rng.gen_bool(exploration_probability.clamp(0.0, 1.0)) {
        space.sample(rng)
    } else {
        action
    }
}

/// Linearly decays from `start` to `end` over `decay_steps`, then holds.
pub fn linear_decay(start: f64, end: f64, decay_steps: u64, step: u64) -> f64 {
    if decay_steps == 0 || step >= decay_steps {
        return end;
    }
    start + (end - start) * step as f64 / decay_steps as f64
}
