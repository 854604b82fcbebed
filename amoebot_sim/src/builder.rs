//! Initial particle configurations.
//!
//! Builds a [`System`] from a shape family and a prototype algorithm. Every
//! particle receives its own clone of the prototype. Orientations are either
//! shared (a common compass) or drawn from the builder's seeded RNG.

use amoebot_core::{Algorithm, Direction, Node, ParticleId, ParticleShape, System, SystemError};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

/// How particle orientations are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Every particle uses the same orientation
    Fixed(Direction),
    /// Uniformly random per particle
    Random,
}

/// Builds reproducible initial configurations.
pub struct SystemBuilder {
    /// Seed handed to the system's scheduler
    scheduler_seed: u64,

    /// RNG for layouts and orientations
    layout_rng: ChaCha8Rng,

    orientation: Orientation,
}

impl SystemBuilder {
    /// Creates a builder. The scheduler and the layout draw from separate
    /// seeds so that changing the layout does not change activation order.
    pub fn new(seed: u64) -> Self {
        let layout_seed = seed.wrapping_mul(0x9e3779b97f4a7c15);
        Self {
            scheduler_seed: seed,
            layout_rng: ChaCha8Rng::seed_from_u64(layout_seed),
            orientation: Orientation::Random,
        }
    }

    /// Sets the orientation policy.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Contracted particles on a straight line from the origin along `dir`.
    pub fn line(
        &mut self,
        count: usize,
        dir: Direction,
        prototype: &dyn Algorithm,
    ) -> Result<System, SystemError> {
        let mut node = Node::new(0, 0);
        let mut nodes = Vec::with_capacity(count);
        for _ in 0..count {
            nodes.push(node);
            node = node.node_in_dir(dir);
        }
        self.populate(&nodes, prototype)
    }

    /// Contracted particles filling a hexagon of the given radius.
    pub fn hexagon(&mut self, radius: i32, prototype: &dyn Algorithm) -> Result<System, SystemError> {
        let mut nodes = Vec::new();
        for x in -radius..=radius {
            for y in -radius..=radius {
                if (x + y).abs() <= radius {
                    nodes.push(Node::new(x, y));
                }
            }
        }
        self.populate(&nodes, prototype)
    }

    /// A connected blob grown by attaching each particle to a random free
    /// neighbour of the blob.
    pub fn random_blob(
        &mut self,
        count: usize,
        prototype: &dyn Algorithm,
    ) -> Result<System, SystemError> {
        let mut nodes = Vec::with_capacity(count);
        let mut taken = HashSet::new();
        if count > 0 {
            nodes.push(Node::new(0, 0));
            taken.insert(Node::new(0, 0));
        }

        while nodes.len() < count {
            let Some(&anchor) = nodes.choose(&mut self.layout_rng) else {
                break;
            };
            let candidate = anchor.node_in_dir(self.layout_rng.gen_range(0..6));
            if taken.insert(candidate) {
                nodes.push(candidate);
            }
        }
        self.populate(&nodes, prototype)
    }

    /// Contracted particles on explicit nodes.
    pub fn populate(
        &mut self,
        nodes: &[Node],
        prototype: &dyn Algorithm,
    ) -> Result<System, SystemError> {
        let mut system = System::with_seed(self.scheduler_seed);
        for &node in nodes {
            let orientation = self.next_orientation();
            let shape = ParticleShape::contracted(node, orientation)?;
            system.insert_particle(shape, prototype.clone_box())?;
        }
        Ok(system)
    }

    fn next_orientation(&mut self) -> Direction {
        match self.orientation {
            Orientation::Fixed(dir) => dir,
            Orientation::Random => self.layout_rng.gen_range(0..6),
        }
    }
}

/// The particle at the origin, where every builder shape starts.
pub fn origin_particle(system: &System) -> Option<ParticleId> {
    system.particle_at(Node::new(0, 0))
}
