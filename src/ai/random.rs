use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::agent::Agent;
use crate::env::{StateVector, ACTION_COUNT};

/// An agent that selects uniformly at random. Used as the evaluation baseline.
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(rng: StdRng) -> Self {
        RandomAgent { rng }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl Agent for RandomAgent {
    fn select_action(&mut self, _state: &StateVector, _explore: bool) -> usize {
        self.rng.random_range(0..ACTION_COUNT)
    }

    fn name(&self) -> &str {
        "Random"
    }
}
