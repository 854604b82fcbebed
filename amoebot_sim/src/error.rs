//! Error types for the simulation driver.

use amoebot_core::SystemError;
use thiserror::Error;

/// Errors raised by the simulator and its collaborators.
#[derive(Debug, Error)]
pub enum SimError {
    /// The engine rejected an operation
    #[error(transparent)]
    System(#[from] SystemError),

    /// Simulator used before a system was loaded
    #[error("no particle system loaded")]
    NoSystem,

    /// A movement fault stopped the simulation; load a new system to continue
    #[error("simulation halted after a movement fault")]
    Halted,

    /// Export file could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Export serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SimError {
    /// True if the error comes from an algorithm's invalid movement.
    pub fn is_movement_fault(&self) -> bool {
        matches!(self, Self::System(err) if err.is_movement_fault())
    }
}
