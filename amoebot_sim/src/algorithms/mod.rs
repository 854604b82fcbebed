//! Demonstration algorithms for exercising the engine.
//!
//! These are not part of the engine. Each one is a small strategy that
//! drives a particular part of the movement protocol:
//!
//! - [`Dummy`]: never acts; every round after the first is a deadlock
//! - [`Inchworm`]: marches along one label using expand/contract/push/pull
//! - [`TokenRelay`]: forwards a [`Beacon`] token along one label
//! - [`Jiggle`]: picks a random legal action every activation

mod dummy;
mod inchworm;
mod jiggle;
mod token_relay;

pub use dummy::Dummy;
pub use inchworm::Inchworm;
pub use jiggle::{legal_actions, Jiggle};
pub use token_relay::{Beacon, RelayState, TokenRelay};
