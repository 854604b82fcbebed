//! Error types for the amoebot engine.

use crate::algorithm::MovementKind;
use crate::node::Node;
use crate::particle::ParticleId;
use thiserror::Error;

/// A movement request that violates the protocol.
///
/// These are programming errors in an algorithm (or the engine). A round
/// that hits one is aborted; the movement is never silently skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MovementError {
    /// Label outside `0..6` (contracted) or `0..10` (expanded)
    #[error("{particle}: label {label} out of range (expected < {max})")]
    LabelOutOfRange {
        particle: ParticleId,
        label: u8,
        max: u8,
    },

    /// The `can_*` predicate for the movement does not hold
    #[error("{particle} at {node}: precondition for {movement} (label {label}) violated")]
    Precondition {
        particle: ParticleId,
        movement: MovementKind,
        label: u8,
        node: Node,
    },

    /// Token index past the end of the inventory
    #[error("{particle}: no token at index {index}")]
    MissingToken { particle: ParticleId, index: usize },

    /// Id does not belong to this system
    #[error("unknown particle {0}")]
    UnknownParticle(ParticleId),
}

/// Errors raised by the system outside a single movement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SystemError {
    /// A new particle would overlap an existing one
    #[error("node {0} is already occupied")]
    NodeOccupied(Node),

    /// No particle occupies the given node
    #[error("no particle at {0}")]
    NoParticleAt(Node),

    /// Particle construction with a tail direction outside 0..6
    #[error("invalid direction {0}")]
    InvalidDirection(u8),

    /// A movement fault inside an activation
    #[error(transparent)]
    Movement(#[from] MovementError),

    /// Occupancy map and particle geometry disagree
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl SystemError {
    /// Creates an invariant violation error.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// True for faults caused by an algorithm's movement request.
    pub fn is_movement_fault(&self) -> bool {
        matches!(self, Self::Movement(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_message_names_operation_and_node() {
        let err = MovementError::Precondition {
            particle: ParticleId(3),
            movement: MovementKind::Push,
            label: 2,
            node: Node::new(1, -1),
        };
        let msg = err.to_string();
        assert!(msg.contains("push"));
        assert!(msg.contains("(1, -1)"));
        assert!(msg.contains("#3"));
    }

    #[test]
    fn test_movement_error_converts() {
        let err: SystemError = MovementError::UnknownParticle(ParticleId(9)).into();
        assert!(err.is_movement_fault());
        assert!(!SystemError::invariant("x").is_movement_fault());
    }
}
