//! Random legal movements, for stress-testing the engine.

use amoebot_core::{Action, Algorithm, ParticleView};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::any::Any;

/// Every movement whose precondition currently holds, plus idling.
pub fn legal_actions(particle: &ParticleView<'_>) -> Vec<Action> {
    let mut options = vec![Action::Idle];
    for label in particle.labels() {
        if particle.can_expand(label) {
            options.push(Action::Expand(label));
        }
        if particle.can_contract(label) {
            options.push(Action::Contract(label));
        }
        if particle.can_push(label) {
            options.push(Action::Push(label));
        }
        if particle.can_pull(label) {
            options.push(Action::Pull(label));
        }
    }
    options
}

/// Picks uniformly among the legal actions.
///
/// Randomness is derived from `(seed, particle id, activation count)`, so
/// clones of one prototype still make independent choices.
#[derive(Debug, Clone)]
pub struct Jiggle {
    seed: u64,
    activations: u64,
}

impl Jiggle {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            activations: 0,
        }
    }
}

impl Algorithm for Jiggle {
    fn execute(&mut self, particle: &ParticleView<'_>) -> Action {
        let stream = self
            .seed
            .wrapping_add((particle.id().index() as u64).wrapping_mul(0x9e3779b97f4a7c15))
            .wrapping_add(self.activations.wrapping_mul(0x517cc1b727220a95));
        self.activations += 1;

        let mut rng = ChaCha8Rng::seed_from_u64(stream);
        let mut options = legal_actions(particle);
        let pick = rng.gen_range(0..options.len());
        options.swap_remove(pick)
    }

    fn clone_box(&self) -> Box<dyn Algorithm> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
