//! The algorithm interface consumed by the engine.

use crate::particle::ParticleView;
use crate::shape::Label;
use crate::token::TokenRef;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;

/// Kind of state change an activation produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    Idle,
    Expand,
    Contract,
    Push,
    Pull,
    PutToken,
    TakeToken,
    PassToken,
}

impl MovementKind {
    /// Progress weight fed into the movement counter.
    pub fn weight(&self) -> u64 {
        match self {
            MovementKind::Expand | MovementKind::Contract => 1,
            MovementKind::Push | MovementKind::Pull => 2,
            MovementKind::Idle
            | MovementKind::PutToken
            | MovementKind::TakeToken
            | MovementKind::PassToken => 0,
        }
    }

    /// True for push and pull.
    pub fn is_handover(&self) -> bool {
        matches!(self, MovementKind::Push | MovementKind::Pull)
    }

    pub fn name(&self) -> &'static str {
        match self {
            MovementKind::Idle => "idle",
            MovementKind::Expand => "expand",
            MovementKind::Contract => "contract",
            MovementKind::Push => "push",
            MovementKind::Pull => "pull",
            MovementKind::PutToken => "put_token",
            MovementKind::TakeToken => "take_token",
            MovementKind::PassToken => "pass_token",
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The decision an algorithm returns for one activation.
#[derive(Debug, Clone)]
pub enum Action {
    /// Do nothing this activation
    Idle,
    Expand(Label),
    Contract(Label),
    Push(Label),
    Pull(Label),
    /// Append `token` to the neighbour at `label`
    PutToken { label: Label, token: TokenRef },
    /// Remove the own token at `index`
    TakeToken { index: usize },
    /// Remove the own token at `index` and hand it to the neighbour at `label`
    PassToken { index: usize, label: Label },
}

impl Action {
    pub fn kind(&self) -> MovementKind {
        match self {
            Action::Idle => MovementKind::Idle,
            Action::Expand(_) => MovementKind::Expand,
            Action::Contract(_) => MovementKind::Contract,
            Action::Push(_) => MovementKind::Push,
            Action::Pull(_) => MovementKind::Pull,
            Action::PutToken { .. } => MovementKind::PutToken,
            Action::TakeToken { .. } => MovementKind::TakeToken,
            Action::PassToken { .. } => MovementKind::PassToken,
        }
    }
}

/// A per-particle decision strategy.
///
/// Every particle owns its own instance, created from a prototype with
/// [`Algorithm::clone_box`]. The engine calls [`Algorithm::execute`] once
/// per activation and applies the returned [`Action`]; an action whose
/// precondition does not hold aborts the round.
pub trait Algorithm: Debug + Send {
    /// Decides the action for this activation.
    fn execute(&mut self, particle: &ParticleView<'_>) -> Action;

    /// Independent copy with no shared mutable state.
    fn clone_box(&self) -> Box<dyn Algorithm>;

    /// Algorithm-defined termination for this particle.
    fn has_terminated(&self) -> bool {
        false
    }

    /// Local direction of the head marker shown by front ends.
    fn head_mark_dir(&self) -> Option<u8> {
        None
    }

    /// Local direction of the tail marker shown by front ends.
    fn tail_mark_dir(&self) -> Option<u8> {
        None
    }

    /// Downcast hook so neighbours can read this algorithm's state.
    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn Algorithm> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
