//! Amoebot Core - movement/occupancy engine for self-organizing particle systems
//!
//! Particles live on the nodes of a triangular lattice. A particle is either
//! *contracted* (one node) or *expanded* (head and tail on two adjacent
//! nodes) and moves by four operations:
//!
//! - **expand**: move the head into an empty neighbouring node
//! - **contract**: release either the head or the tail
//! - **push**: expand into a node an expanded neighbour releases in the same step
//! - **pull**: release a node into which a contracted neighbour expands in the same step
//!
//! The [`System`] owns every particle and the occupancy map, applies all
//! movements, and schedules rounds in which each particle's [`Algorithm`] is
//! activated once, in a fresh random order, to emulate an asynchronous
//! scheduler with a single thread.
//!
//! # Example
//!
//! ```ignore
//! use amoebot_core::{Node, ParticleShape, System};
//!
//! let mut system = System::with_seed(42);
//! system.insert_particle(ParticleShape::contracted(Node::new(0, 0), 0)?, Box::new(MyAlg))?;
//! let summary = system.round()?;
//! assert!(system.is_valid());
//! ```

pub mod algorithm;
pub mod error;
pub mod node;
pub mod particle;
pub mod shape;
pub mod system;
pub mod token;

pub use algorithm::{Action, Algorithm, MovementKind};
pub use error::{MovementError, SystemError};
pub use node::{opposite, Direction, Node, NUM_DIRECTIONS};
pub use particle::{Particle, ParticleId, ParticleView};
pub use shape::{Label, ParticleShape, HEAD_CONTRACTION_LABEL, TAIL_CONTRACTION_LABEL};
pub use system::{RoundSummary, System, SystemEvent};
pub use token::{Token, TokenInventory, TokenRef};
