//! Inchworm locomotion along a fixed label.

use amoebot_core::{Action, Algorithm, Label, ParticleView, TAIL_CONTRACTION_LABEL};
use std::any::Any;

/// Moves forward along `heading` until `budget` own movements were made.
///
/// A contracted particle expands forward, or pushes into an expanded
/// particle in front of it. An expanded particle pulls a contracted
/// follower into its tail, or otherwise contracts forward. After an
/// expansion towards `heading` the tail contraction label 5 faces
/// backward, so both moves release the tail and keep the head in front.
///
/// A particle finishes when it is contracted and either out of budget or
/// blocked by a finished particle in front of it, so termination travels
/// backwards from the front of the line.
#[derive(Debug, Clone)]
pub struct Inchworm {
    heading: Label,
    budget: u32,
    moves: u32,
    finished: bool,
}

impl Inchworm {
    /// Creates an inchworm; `heading` is a contracted label (`0..6`).
    pub fn new(heading: Label, budget: u32) -> Self {
        Self {
            heading: heading % 6,
            budget,
            moves: 0,
            finished: false,
        }
    }

    /// Movements this particle initiated.
    pub fn moves(&self) -> u32 {
        self.moves
    }

    fn spend(&mut self, action: Action) -> Action {
        self.moves += 1;
        action
    }
}

impl Algorithm for Inchworm {
    fn execute(&mut self, particle: &ParticleView<'_>) -> Action {
        self.finished = false;

        if particle.is_expanded() {
            if self.moves < self.budget && particle.can_pull(TAIL_CONTRACTION_LABEL) {
                return self.spend(Action::Pull(TAIL_CONTRACTION_LABEL));
            }
            return self.spend(Action::Contract(TAIL_CONTRACTION_LABEL));
        }

        if self.moves >= self.budget {
            self.finished = true;
            return Action::Idle;
        }

        if particle.can_expand(self.heading) {
            self.spend(Action::Expand(self.heading))
        } else if particle.can_push(self.heading) {
            self.spend(Action::Push(self.heading))
        } else {
            self.finished = particle
                .neighbor_algorithm::<Inchworm>(self.heading)
                .is_some_and(|front| front.finished);
            Action::Idle
        }
    }

    fn clone_box(&self) -> Box<dyn Algorithm> {
        Box::new(self.clone())
    }

    fn has_terminated(&self) -> bool {
        self.finished
    }

    fn head_mark_dir(&self) -> Option<u8> {
        Some(self.heading)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
