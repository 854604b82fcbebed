//! Particles and the read-only view algorithms decide from.

use crate::algorithm::Algorithm;
use crate::node::{Direction, Node};
use crate::shape::{Label, ParticleShape};
use crate::system::System;
use crate::token::TokenInventory;
use serde::{Deserialize, Serialize};

/// Handle to a particle inside its [`System`].
///
/// Particles never hold references to each other or to the system; every
/// cross-particle access goes through an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticleId(pub usize);

impl ParticleId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ParticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One agent: geometry, tokens and its own algorithm instance.
#[derive(Debug)]
pub struct Particle {
    pub(crate) shape: ParticleShape,
    pub(crate) tokens: TokenInventory,
    /// `None` only while the particle is being activated
    pub(crate) algorithm: Option<Box<dyn Algorithm>>,
}

impl Particle {
    pub(crate) fn new(shape: ParticleShape, algorithm: Box<dyn Algorithm>) -> Self {
        Self {
            shape,
            tokens: TokenInventory::new(),
            algorithm: Some(algorithm),
        }
    }

    pub fn shape(&self) -> &ParticleShape {
        &self.shape
    }

    pub fn tokens(&self) -> &TokenInventory {
        &self.tokens
    }

    pub fn algorithm(&self) -> Option<&dyn Algorithm> {
        self.algorithm.as_deref()
    }

    pub fn has_terminated(&self) -> bool {
        self.algorithm().is_some_and(|alg| alg.has_terminated())
    }

    /// Global direction of the algorithm's head marker.
    pub fn head_mark_global_dir(&self) -> Option<Direction> {
        self.algorithm()
            .and_then(|alg| alg.head_mark_dir())
            .map(|dir| self.shape.local_to_global_dir(dir % 6))
    }

    /// Global direction of the algorithm's tail marker.
    pub fn tail_mark_global_dir(&self) -> Option<Direction> {
        self.algorithm()
            .and_then(|alg| alg.tail_mark_dir())
            .map(|dir| self.shape.local_to_global_dir(dir % 6))
    }
}

/// Read-only view of one particle and its neighbourhood.
///
/// Handed to [`Algorithm::execute`]. Label arguments outside the current
/// label range make every predicate return `false`.
pub struct ParticleView<'a> {
    system: &'a System,
    id: ParticleId,
    particle: &'a Particle,
}

impl<'a> ParticleView<'a> {
    pub(crate) fn new(system: &'a System, id: ParticleId, particle: &'a Particle) -> Self {
        Self {
            system,
            id,
            particle,
        }
    }

    pub fn id(&self) -> ParticleId {
        self.id
    }

    pub fn shape(&self) -> &'a ParticleShape {
        &self.particle.shape
    }

    pub fn tokens(&self) -> &'a TokenInventory {
        &self.particle.tokens
    }

    pub fn head(&self) -> Node {
        self.particle.shape.head()
    }

    pub fn tail(&self) -> Node {
        self.particle.shape.tail()
    }

    pub fn is_contracted(&self) -> bool {
        self.particle.shape.is_contracted()
    }

    pub fn is_expanded(&self) -> bool {
        self.particle.shape.is_expanded()
    }

    pub fn labels(&self) -> std::ops::Range<Label> {
        self.particle.shape.labels()
    }

    pub fn has_neighbor_at_label(&self, label: Label) -> bool {
        self.neighbor_at_label(label).is_some()
    }

    /// Id of the particle occupying the node reached via `label`.
    pub fn neighbor_at_label(&self, label: Label) -> Option<ParticleId> {
        self.system.neighbor_at_label(self.id, label)
    }

    pub fn neighbor_shape(&self, label: Label) -> Option<&'a ParticleShape> {
        let neighbor = self.neighbor_at_label(label)?;
        self.system.particle(neighbor).map(Particle::shape)
    }

    pub fn neighbor_tokens(&self, label: Label) -> Option<&'a TokenInventory> {
        let neighbor = self.neighbor_at_label(label)?;
        self.system.particle(neighbor).map(Particle::tokens)
    }

    /// True if the neighbouring node at `label` is some particle's head.
    pub fn has_head_at_label(&self, label: Label) -> bool {
        let Some(shape) = self.neighbor_shape(label) else {
            return false;
        };
        self.particle.shape.neighboring_node(label) == Some(shape.head())
    }

    /// True if the neighbouring node at `label` is an expanded particle's tail.
    pub fn has_tail_at_label(&self, label: Label) -> bool {
        let Some(shape) = self.neighbor_shape(label) else {
            return false;
        };
        shape.is_expanded() && self.particle.shape.neighboring_node(label) == Some(shape.tail())
    }

    /// Algorithm state of the neighbour at `label`, downcast to `T`.
    pub fn neighbor_algorithm<T: Algorithm + 'static>(&self, label: Label) -> Option<&'a T> {
        let neighbor = self.neighbor_at_label(label)?;
        self.system
            .particle(neighbor)?
            .algorithm()?
            .as_any()
            .downcast_ref::<T>()
    }

    pub fn can_expand(&self, label: Label) -> bool {
        self.system.can_expand(self.id, label).unwrap_or(false)
    }

    pub fn can_contract(&self, label: Label) -> bool {
        self.system.can_contract(self.id, label).unwrap_or(false)
    }

    pub fn can_push(&self, label: Label) -> bool {
        self.system.can_push(self.id, label).unwrap_or(false)
    }

    pub fn can_pull(&self, label: Label) -> bool {
        self.system.can_pull(self.id, label).unwrap_or(false)
    }
}
