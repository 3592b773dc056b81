use chat_rl::environment::Space;
use rand::Rng;

/// Baseline that ignores observations and samples uniformly from an action
/// space.
pub struct RandomAgent<S: Space, R: Rng> {
    space: S,
    rng: R,
}

impl<S: Space, R: Rng> RandomAgent<S, R> {
    pub fn new(space: S, rng: R) -> Self {
        RandomAgent { space, rng }
    }

    pub fn act<O>(&mut self, _observation: &O) -> S::Element {
        self.space.sample(&mut self.rng)
    }
}
