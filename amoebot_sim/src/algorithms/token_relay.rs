//! Forwarding a token along a line of particles.

use amoebot_core::{Action, Algorithm, Label, Node, ParticleView, Token};
use std::any::Any;

/// The token handed along by [`TokenRelay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beacon {
    /// Where the beacon was created
    pub origin: Node,
}

impl Token for Beacon {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Progress of one relay participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    /// Has not held the beacon yet
    #[default]
    Waiting,
    /// Passed the beacon on
    Forwarded,
    /// Holds the beacon with nobody ahead
    Delivered,
}

/// Passes every [`Beacon`] it holds to the neighbour at `label`.
#[derive(Debug, Clone)]
pub struct TokenRelay {
    label: Label,
    state: RelayState,
}

impl TokenRelay {
    pub fn new(label: Label) -> Self {
        Self {
            label: label % 6,
            state: RelayState::Waiting,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }
}

impl Algorithm for TokenRelay {
    fn execute(&mut self, particle: &ParticleView<'_>) -> Action {
        let Some(index) = particle.tokens().position_of::<Beacon>() else {
            return Action::Idle;
        };

        if particle.has_neighbor_at_label(self.label) {
            self.state = RelayState::Forwarded;
            Action::PassToken {
                index,
                label: self.label,
            }
        } else {
            self.state = RelayState::Delivered;
            Action::Idle
        }
    }

    fn clone_box(&self) -> Box<dyn Algorithm> {
        Box::new(self.clone())
    }

    fn has_terminated(&self) -> bool {
        self.state != RelayState::Waiting
    }

    fn head_mark_dir(&self) -> Option<u8> {
        (self.state == RelayState::Delivered).then_some(self.label)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
