//! The particle system: occupancy authority, movement protocol and scheduler.
//!
//! `System` is the only owner of particle storage and of the occupancy map.
//! Every geometry change of a particle happens inside one `System` method
//! together with the matching map update, so between two calls the map always
//! holds exactly one entry per occupied node, pointing at its owner.

use crate::algorithm::{Action, Algorithm, MovementKind};
use crate::error::{MovementError, SystemError};
use crate::node::{opposite, Node};
use crate::particle::{Particle, ParticleId, ParticleView};
use crate::shape::{
    Label, ParticleShape, CONTRACTED_LABELS, EXPANDED_LABELS, HEAD_CONTRACTION_LABEL,
    TAIL_CONTRACTION_LABEL,
};
use crate::token::TokenRef;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

/// Something observable that happened inside the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemEvent {
    /// A weight-bearing movement was applied
    Moved {
        particle: ParticleId,
        kind: MovementKind,
        weight: u64,
    },

    /// A token left `from`; `to` is `None` when it was discarded
    TokenMoved {
        from: ParticleId,
        to: Option<ParticleId>,
    },

    /// A full round finished
    RoundCompleted { round: u64, movements: u64 },
}

/// Outcome of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Round number (1-based)
    pub round: u64,

    /// Particles whose algorithm ran this round
    pub activations: usize,

    /// Particles skipped because a handover already credited them
    pub credited: usize,

    /// Movement weight produced this round
    pub movements: u64,
}

/// A particle system on the triangular lattice.
pub struct System {
    particles: Vec<Particle>,
    occupancy: HashMap<Node, ParticleId>,

    /// Cumulative movement weight
    num_movements: u64,

    /// Completed rounds
    num_rounds: u64,

    /// Activation bookkeeping for the current round
    activated: Vec<bool>,

    /// Weight produced by the last completed round
    last_round_movements: Option<u64>,

    /// Scheduler RNG
    rng: ChaCha8Rng,
    seed: Option<u64>,

    events: Vec<SystemEvent>,
}

impl System {
    /// Creates an empty system with an entropy-seeded scheduler.
    pub fn new() -> Self {
        Self::with_rng(ChaCha8Rng::from_entropy(), None)
    }

    /// Creates an empty system whose activation order is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed), Some(seed))
    }

    fn with_rng(rng: ChaCha8Rng, seed: Option<u64>) -> Self {
        Self {
            particles: Vec::new(),
            occupancy: HashMap::new(),
            num_movements: 0,
            num_rounds: 0,
            activated: Vec::new(),
            last_round_movements: None,
            rng,
            seed,
            events: Vec::new(),
        }
    }

    /// Adds a particle. Fails if any of its nodes is already taken.
    pub fn insert_particle(
        &mut self,
        shape: ParticleShape,
        algorithm: Box<dyn Algorithm>,
    ) -> Result<ParticleId, SystemError> {
        if let Some(node) = shape.nodes().find(|node| self.occupancy.contains_key(node)) {
            return Err(SystemError::NodeOccupied(node));
        }

        let id = ParticleId(self.particles.len());
        for node in shape.nodes() {
            self.occupancy.insert(node, id);
        }
        self.particles.push(Particle::new(shape, algorithm));
        self.activated.push(false);
        Ok(id)
    }

    /// Appends a token to a particle's inventory.
    pub fn put_token(&mut self, id: ParticleId, token: TokenRef) -> Result<(), MovementError> {
        self.particle_mut(id)?.tokens.put(token);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(id.0)
    }

    /// All particles with their ids, in insertion order.
    pub fn particles(&self) -> impl Iterator<Item = (ParticleId, &Particle)> {
        self.particles
            .iter()
            .enumerate()
            .map(|(index, particle)| (ParticleId(index), particle))
    }

    /// Owner of `node`, if any.
    pub fn particle_at(&self, node: Node) -> Option<ParticleId> {
        self.occupancy.get(&node).copied()
    }

    /// Read-only view of a particle, as its algorithm sees it.
    pub fn view(&self, id: ParticleId) -> Option<ParticleView<'_>> {
        let particle = self.particle(id)?;
        Some(ParticleView::new(self, id, particle))
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn num_movements(&self) -> u64 {
        self.num_movements
    }

    pub fn num_rounds(&self) -> u64 {
        self.num_rounds
    }

    /// Number of occupied nodes.
    pub fn num_occupied(&self) -> usize {
        self.occupancy.len()
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Weight produced by the last completed round.
    pub fn last_round_movements(&self) -> Option<u64> {
        self.last_round_movements
    }

    /// Hands over all events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<SystemEvent> {
        std::mem::take(&mut self.events)
    }

    /// Particle occupying the node reached from `id` via `label`.
    pub fn neighbor_at_label(&self, id: ParticleId, label: Label) -> Option<ParticleId> {
        let node = self.particle(id)?.shape.neighboring_node(label)?;
        self.particle_at(node)
    }

    // ---------------------------------------------------------------------
    // Movement protocol
    // ---------------------------------------------------------------------

    pub fn can_expand(&self, id: ParticleId, label: Label) -> Result<bool, MovementError> {
        let shape = self.shape_checked(id, label, CONTRACTED_LABELS)?;
        Ok(shape.is_contracted() && self.neighbor_at_label(id, label).is_none())
    }

    pub fn can_contract(&self, id: ParticleId, label: Label) -> Result<bool, MovementError> {
        let shape = self.shape_checked(id, label, EXPANDED_LABELS)?;
        Ok(shape.is_expanded()
            && (label == HEAD_CONTRACTION_LABEL || label == TAIL_CONTRACTION_LABEL))
    }

    pub fn can_push(&self, id: ParticleId, label: Label) -> Result<bool, MovementError> {
        let shape = self.shape_checked(id, label, CONTRACTED_LABELS)?;
        Ok(shape.is_contracted()
            && self
                .neighbor_at_label(id, label)
                .is_some_and(|neighbor| self.particles[neighbor.0].shape.is_expanded()))
    }

    pub fn can_pull(&self, id: ParticleId, label: Label) -> Result<bool, MovementError> {
        let shape = self.shape_checked(id, label, EXPANDED_LABELS)?;
        Ok(shape.is_expanded()
            && self
                .neighbor_at_label(id, label)
                .is_some_and(|neighbor| self.particles[neighbor.0].shape.is_contracted()))
    }

    /// Expands the head into the empty node at `label`.
    pub fn expand(&mut self, id: ParticleId, label: Label) -> Result<(), MovementError> {
        let ok = self.can_expand(id, label)?;
        self.require(ok, id, MovementKind::Expand, label)?;

        let shape = &mut self.particles[id.0].shape;
        let dir = shape.local_to_global_dir(label);
        shape.expand_towards(dir);
        let head = shape.head;
        self.occupancy.insert(head, id);

        self.register_movement(id, MovementKind::Expand);
        Ok(())
    }

    /// Contracts out of the head (head contraction label) into the tail,
    /// or out of the tail (tail contraction label) into the head.
    pub fn contract(&mut self, id: ParticleId, label: Label) -> Result<(), MovementError> {
        let ok = self.can_contract(id, label)?;
        self.require(ok, id, MovementKind::Contract, label)?;

        let shape = &mut self.particles[id.0].shape;
        let released = if label == HEAD_CONTRACTION_LABEL {
            shape.contract_into_tail()
        } else {
            shape.contract_into_head()
        };
        self.occupancy.remove(&released);

        self.register_movement(id, MovementKind::Contract);
        Ok(())
    }

    /// Expands into a node of the expanded neighbour at `label`, which
    /// contracts out of it in the same step.
    pub fn push(&mut self, id: ParticleId, label: Label) -> Result<(), MovementError> {
        let ok = self.can_push(id, label)?;
        self.require(ok, id, MovementKind::Push, label)?;
        let neighbor = self.handover_partner(id, label, MovementKind::Push)?;

        let shape = &mut self.particles[id.0].shape;
        let dir = shape.local_to_global_dir(label);
        shape.expand_towards(dir);
        let handover = shape.head;

        let other = &mut self.particles[neighbor.0].shape;
        if other.head == handover {
            other.contract_into_tail();
        } else {
            other.contract_into_head();
        }
        self.occupancy.insert(handover, id);

        self.register_movement(id, MovementKind::Push);
        self.register_activation(neighbor);
        Ok(())
    }

    /// Contracts out of the node the label is anchored to and lets the
    /// contracted neighbour at `label` expand into it in the same step.
    pub fn pull(&mut self, id: ParticleId, label: Label) -> Result<(), MovementError> {
        let ok = self.can_pull(id, label)?;
        self.require(ok, id, MovementKind::Pull, label)?;
        let neighbor = self.handover_partner(id, label, MovementKind::Pull)?;

        let shape = &mut self.particles[id.0].shape;
        let pull_dir = shape
            .label_to_global_dir(label)
            .ok_or(MovementError::LabelOutOfRange {
                particle: id,
                label,
                max: EXPANDED_LABELS,
            })?;
        let handover = if shape.is_head_label(label) {
            shape.contract_into_tail()
        } else {
            shape.contract_into_head()
        };

        self.particles[neighbor.0]
            .shape
            .expand_towards(opposite(pull_dir));
        self.occupancy.insert(handover, neighbor);

        self.register_movement(id, MovementKind::Pull);
        self.register_activation(neighbor);
        Ok(())
    }

    /// Runs the particle's algorithm once and applies its action.
    pub fn activate(&mut self, id: ParticleId) -> Result<MovementKind, SystemError> {
        let mut algorithm = self
            .particle_mut(id)?
            .algorithm
            .take()
            .ok_or_else(|| SystemError::invariant(format!("{id} activated while active")))?;

        let action = {
            let particle = &self.particles[id.0];
            algorithm.execute(&ParticleView::new(self, id, particle))
        };
        self.particles[id.0].algorithm = Some(algorithm);

        Ok(self.apply(id, action)?)
    }

    /// Activates the particle occupying `node`, outside round bookkeeping.
    pub fn activate_at(&mut self, node: Node) -> Result<MovementKind, SystemError> {
        let id = self
            .particle_at(node)
            .ok_or(SystemError::NoParticleAt(node))?;
        self.activate(id)
    }

    /// Applies an action on behalf of `id`.
    pub fn apply(&mut self, id: ParticleId, action: Action) -> Result<MovementKind, MovementError> {
        let kind = action.kind();
        match action {
            Action::Idle => {
                self.particle_mut(id)?;
            }
            Action::Expand(label) => self.expand(id, label)?,
            Action::Contract(label) => self.contract(id, label)?,
            Action::Push(label) => self.push(id, label)?,
            Action::Pull(label) => self.pull(id, label)?,
            Action::PutToken { label, token } => {
                let to = self.token_target(id, label, kind)?;
                self.particles[to.0].tokens.put(token);
                self.events.push(SystemEvent::TokenMoved { from: id, to: Some(to) });
            }
            Action::TakeToken { index } => {
                self.particle_mut(id)?
                    .tokens
                    .take(index)
                    .ok_or(MovementError::MissingToken { particle: id, index })?;
                self.events.push(SystemEvent::TokenMoved { from: id, to: None });
            }
            Action::PassToken { index, label } => {
                let to = self.token_target(id, label, kind)?;
                let token = self.particles[id.0]
                    .tokens
                    .take(index)
                    .ok_or(MovementError::MissingToken { particle: id, index })?;
                self.particles[to.0].tokens.put(token);
                self.events.push(SystemEvent::TokenMoved { from: id, to: Some(to) });
            }
        }
        Ok(kind)
    }

    // ---------------------------------------------------------------------
    // Scheduler
    // ---------------------------------------------------------------------

    /// Runs one round: every particle is activated once, in a fresh uniform
    /// random order. Particles credited by a handover are skipped.
    ///
    /// A movement fault aborts the round; the map stays consistent, since
    /// the faulty movement was rejected before any mutation.
    pub fn round(&mut self) -> Result<RoundSummary, SystemError> {
        let movements_before = self.num_movements;

        let mut order: Vec<ParticleId> = (0..self.particles.len()).map(ParticleId).collect();
        order.shuffle(&mut self.rng);
        self.activated.iter_mut().for_each(|flag| *flag = false);

        let mut activations = 0;
        for id in order {
            if self.activated[id.0] {
                continue;
            }
            self.activated[id.0] = true;
            self.activate(id)?;
            activations += 1;
        }

        self.num_rounds += 1;
        let movements = self.num_movements - movements_before;
        self.last_round_movements = Some(movements);
        self.events.push(SystemEvent::RoundCompleted {
            round: self.num_rounds,
            movements,
        });

        let summary = RoundSummary {
            round: self.num_rounds,
            activations,
            credited: self.particles.len() - activations,
            movements,
        };
        debug!(
            "round {} complete: {} activations, {} credited, +{} movements",
            summary.round, summary.activations, summary.credited, summary.movements
        );
        Ok(summary)
    }

    // ---------------------------------------------------------------------
    // Consistency
    // ---------------------------------------------------------------------

    /// Checks the single-owner invariant of the occupancy map.
    pub fn check_validity(&self) -> Result<(), SystemError> {
        let mut occupied = 0;
        for (id, particle) in self.particles() {
            for node in particle.shape.nodes() {
                occupied += 1;
                match self.particle_at(node) {
                    Some(owner) if owner == id => {}
                    Some(owner) => {
                        return Err(SystemError::invariant(format!(
                            "{id} occupies {node} but the map assigns it to {owner}"
                        )))
                    }
                    None => {
                        return Err(SystemError::invariant(format!(
                            "{id} occupies {node} but the map has no entry"
                        )))
                    }
                }
            }
            if particle.algorithm.is_none() {
                return Err(SystemError::invariant(format!("{id} has no algorithm bound")));
            }
        }
        if occupied != self.occupancy.len() {
            return Err(SystemError::invariant(format!(
                "map has {} entries but particles occupy {} nodes",
                self.occupancy.len(),
                occupied
            )));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.check_validity().is_ok()
    }

    /// True if occupied nodes form one connected component.
    pub fn is_connected(&self) -> bool {
        let Some(&start) = self.occupancy.keys().next() else {
            return true;
        };

        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut reached = HashSet::new();
        while let Some(node) = queue.pop_front() {
            if let Some(owner) = self.particle_at(node) {
                reached.insert(owner);
            }
            for next in node.neighbors() {
                if self.occupancy.contains_key(&next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        reached.len() == self.particles.len()
    }

    /// True once every particle's algorithm reports termination.
    pub fn is_terminated(&self) -> bool {
        self.particles.iter().all(Particle::has_terminated)
    }

    /// True if the last completed round produced no movement weight.
    pub fn is_deadlocked(&self) -> bool {
        self.last_round_movements == Some(0)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn particle_mut(&mut self, id: ParticleId) -> Result<&mut Particle, MovementError> {
        self.particles
            .get_mut(id.0)
            .ok_or(MovementError::UnknownParticle(id))
    }

    fn shape_checked(
        &self,
        id: ParticleId,
        label: Label,
        max: Label,
    ) -> Result<&ParticleShape, MovementError> {
        let shape = &self
            .particle(id)
            .ok_or(MovementError::UnknownParticle(id))?
            .shape;
        if label >= max {
            return Err(MovementError::LabelOutOfRange {
                particle: id,
                label,
                max,
            });
        }
        Ok(shape)
    }

    fn precondition(&self, id: ParticleId, movement: MovementKind, label: Label) -> MovementError {
        MovementError::Precondition {
            particle: id,
            movement,
            label,
            node: self.particles[id.0].shape.head,
        }
    }

    fn require(
        &self,
        ok: bool,
        id: ParticleId,
        movement: MovementKind,
        label: Label,
    ) -> Result<(), MovementError> {
        if ok {
            Ok(())
        } else {
            Err(self.precondition(id, movement, label))
        }
    }

    fn handover_partner(
        &self,
        id: ParticleId,
        label: Label,
        movement: MovementKind,
    ) -> Result<ParticleId, MovementError> {
        self.neighbor_at_label(id, label)
            .ok_or_else(|| self.precondition(id, movement, label))
    }

    fn token_target(
        &self,
        id: ParticleId,
        label: Label,
        movement: MovementKind,
    ) -> Result<ParticleId, MovementError> {
        let shape = &self
            .particle(id)
            .ok_or(MovementError::UnknownParticle(id))?
            .shape;
        if !shape.is_valid_label(label) {
            return Err(MovementError::LabelOutOfRange {
                particle: id,
                label,
                max: shape.label_count(),
            });
        }
        self.handover_partner(id, label, movement)
    }

    fn register_movement(&mut self, id: ParticleId, kind: MovementKind) {
        let weight = kind.weight();
        self.num_movements += weight;
        trace!("{id} {kind} (+{weight})");
        self.events.push(SystemEvent::Moved {
            particle: id,
            kind,
            weight,
        });
    }

    /// Credits `id` with its activation for the current round.
    fn register_activation(&mut self, id: ParticleId) {
        if let Some(flag) = self.activated.get_mut(id.0) {
            *flag = true;
        }
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("particles", &self.particles.len())
            .field("occupied", &self.occupancy.len())
            .field("num_movements", &self.num_movements)
            .field("num_rounds", &self.num_rounds)
            .field("seed", &self.seed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Replays a fixed list of actions, then idles.
    #[derive(Debug, Clone, Default)]
    struct Scripted {
        actions: VecDeque<Action>,
        executed: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(actions: Vec<Action>) -> Self {
            Self {
                actions: actions.into(),
                executed: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Algorithm for Scripted {
        fn execute(&mut self, _particle: &ParticleView<'_>) -> Action {
            self.executed.fetch_add(1, Ordering::SeqCst);
            self.actions.pop_front().unwrap_or(Action::Idle)
        }

        fn clone_box(&self) -> Box<dyn Algorithm> {
            Box::new(self.clone())
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[derive(Debug)]
    struct Note(&'static str);

    impl Token for Note {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn idle() -> Box<dyn Algorithm> {
        Box::new(Scripted::default())
    }

    fn contracted(system: &mut System, x: i32, y: i32) -> ParticleId {
        let shape = ParticleShape::contracted(Node::new(x, y), 0).unwrap();
        system.insert_particle(shape, idle()).unwrap()
    }

    fn expanded(system: &mut System, head: Node, tail_dir: u8) -> ParticleId {
        let shape = ParticleShape::new(head, Some(tail_dir), 0).unwrap();
        system.insert_particle(shape, idle()).unwrap()
    }

    fn shape(system: &System, id: ParticleId) -> ParticleShape {
        *system.particle(id).unwrap().shape()
    }

    #[test]
    fn test_expand_into_empty_node() {
        let mut system = System::with_seed(1);
        let a = contracted(&mut system, 0, 0);

        assert!(system.can_expand(a, 0).unwrap());
        system.expand(a, 0).unwrap();

        let s = shape(&system, a);
        assert_eq!(s.head(), Node::new(1, 0));
        assert_eq!(s.tail(), Node::new(0, 0));
        assert_eq!(system.num_occupied(), 2);
        assert_eq!(system.particle_at(Node::new(1, 0)), Some(a));
        assert_eq!(system.particle_at(Node::new(0, 0)), Some(a));
        assert_eq!(system.num_movements(), 1);
        assert!(system.is_valid());
    }

    #[test]
    fn test_expand_into_occupied_node_rejected() {
        let mut system = System::with_seed(1);
        let a = contracted(&mut system, 0, 0);
        contracted(&mut system, 1, 0);

        assert!(!system.can_expand(a, 0).unwrap());
        let err = system.expand(a, 0).unwrap_err();
        assert!(matches!(
            err,
            MovementError::Precondition {
                movement: MovementKind::Expand,
                ..
            }
        ));
        assert_eq!(system.num_movements(), 0);
        assert!(system.is_valid());
    }

    #[test]
    fn test_label_out_of_range_is_a_fault() {
        let mut system = System::with_seed(1);
        let a = contracted(&mut system, 0, 0);

        assert_eq!(
            system.expand(a, 6),
            Err(MovementError::LabelOutOfRange {
                particle: a,
                label: 6,
                max: 6
            })
        );
        assert!(system.can_pull(a, 10).is_err());
        assert!(system.expand(ParticleId(7), 0).is_err());
    }

    #[test]
    fn test_contracting_a_contracted_particle_rejected() {
        let mut system = System::with_seed(1);
        let a = contracted(&mut system, 0, 0);

        assert!(!system.can_contract(a, 0).unwrap());
        assert!(system.contract(a, 0).is_err());
        assert!(shape(&system, a).is_contracted());
        assert_eq!(system.num_movements(), 0);
    }

    #[test]
    fn test_contract_out_of_head_or_tail() {
        let mut system = System::with_seed(1);
        let a = expanded(&mut system, Node::new(1, 0), 3);
        let b = expanded(&mut system, Node::new(1, 2), 3);

        // head contraction label releases the head
        system.contract(a, HEAD_CONTRACTION_LABEL).unwrap();
        assert_eq!(shape(&system, a).head(), Node::new(0, 0));
        assert_eq!(system.particle_at(Node::new(1, 0)), None);
        assert_eq!(system.particle_at(Node::new(0, 0)), Some(a));

        // tail contraction label releases the tail
        system.contract(b, TAIL_CONTRACTION_LABEL).unwrap();
        assert_eq!(shape(&system, b).head(), Node::new(1, 2));
        assert_eq!(system.particle_at(Node::new(0, 2)), None);
        assert_eq!(system.particle_at(Node::new(1, 2)), Some(b));

        assert_eq!(system.num_movements(), 2);
        assert!(system.is_valid());
    }

    #[test]
    fn test_contract_with_non_contraction_label_rejected() {
        let mut system = System::with_seed(1);
        let a = expanded(&mut system, Node::new(1, 0), 3);
        assert!(!system.can_contract(a, 3).unwrap());
        assert!(system.contract(a, 3).is_err());
        assert!(shape(&system, a).is_expanded());
    }

    #[test]
    fn test_push_hands_over_neighbor_head() {
        let mut system = System::with_seed(1);
        let a = contracted(&mut system, 0, 0);
        // head (1,0), tail (2,0)
        let b = expanded(&mut system, Node::new(1, 0), 0);

        assert!(system.can_push(a, 0).unwrap());
        system.push(a, 0).unwrap();

        let sa = shape(&system, a);
        let sb = shape(&system, b);
        assert_eq!((sa.head(), sa.tail()), (Node::new(1, 0), Node::new(0, 0)));
        assert!(sb.is_contracted());
        assert_eq!(sb.head(), Node::new(2, 0));
        assert_eq!(system.particle_at(Node::new(1, 0)), Some(a));
        assert_eq!(system.num_occupied(), 3);
        assert_eq!(system.num_movements(), 2);
        assert!(system.is_valid());
    }

    #[test]
    fn test_push_hands_over_neighbor_tail() {
        let mut system = System::with_seed(1);
        let a = contracted(&mut system, 0, 0);
        // head (2,0), tail (1,0)
        let b = expanded(&mut system, Node::new(2, 0), 3);

        system.push(a, 0).unwrap();
        assert_eq!(shape(&system, a).head(), Node::new(1, 0));
        assert_eq!(shape(&system, b).head(), Node::new(2, 0));
        assert!(shape(&system, b).is_contracted());
        assert!(system.is_valid());
    }

    #[test]
    fn test_push_into_contracted_neighbor_rejected() {
        let mut system = System::with_seed(1);
        let a = contracted(&mut system, 0, 0);
        contracted(&mut system, 1, 0);

        assert!(!system.can_push(a, 0).unwrap());
        assert!(system.push(a, 0).is_err());
        assert!(!system.can_push(a, 1).unwrap());
    }

    #[test]
    fn test_pull_from_head_side() {
        let mut system = System::with_seed(1);
        // head (1,0), tail (0,0)
        let a = expanded(&mut system, Node::new(1, 0), 3);
        let b = contracted(&mut system, 2, 0);

        assert!(system.can_pull(a, 0).unwrap());
        system.pull(a, 0).unwrap();

        let sa = shape(&system, a);
        let sb = shape(&system, b);
        assert!(sa.is_contracted());
        assert_eq!(sa.head(), Node::new(0, 0));
        assert_eq!((sb.head(), sb.tail()), (Node::new(1, 0), Node::new(2, 0)));
        assert_eq!(system.particle_at(Node::new(0, 0)), Some(a));
        assert_eq!(system.particle_at(Node::new(1, 0)), Some(b));
        assert_eq!(system.particle_at(Node::new(2, 0)), Some(b));
        assert_eq!(system.num_movements(), 2);
        assert!(system.is_valid());
    }

    #[test]
    fn test_pull_from_tail_side() {
        let mut system = System::with_seed(1);
        let a = expanded(&mut system, Node::new(1, 0), 3);
        let c = contracted(&mut system, -1, 0);

        system.pull(a, 5).unwrap();
        assert_eq!(shape(&system, a).head(), Node::new(1, 0));
        let sc = shape(&system, c);
        assert_eq!((sc.head(), sc.tail()), (Node::new(0, 0), Node::new(-1, 0)));
        assert!(system.is_valid());
    }

    #[test]
    fn test_movements_keep_orientation() {
        let mut system = System::with_seed(1);
        let shape_a = ParticleShape::contracted(Node::new(0, 0), 4).unwrap();
        let a = system.insert_particle(shape_a, idle()).unwrap();

        system.expand(a, 2).unwrap();
        system.contract(a, 5).unwrap();
        system.expand(a, 3).unwrap();
        system.contract(a, 0).unwrap();
        assert_eq!(shape(&system, a).orientation(), 4);
        assert!(system.is_valid());
    }

    #[test]
    fn test_handover_credits_neighbor() {
        let mut saw_credit = false;
        let mut saw_both = false;

        for seed in 0..32 {
            let mut system = System::with_seed(seed);
            let puller = Scripted::new(vec![Action::Pull(0)]);
            let pulled = Scripted::new(vec![]);
            let pulled_count = Arc::clone(&pulled.executed);

            let a_shape = ParticleShape::new(Node::new(1, 0), Some(3), 0).unwrap();
            let b_shape = ParticleShape::contracted(Node::new(2, 0), 0).unwrap();
            system.insert_particle(a_shape, Box::new(puller)).unwrap();
            system.insert_particle(b_shape, Box::new(pulled)).unwrap();

            let summary = system.round().unwrap();
            assert_eq!(summary.movements, 2);
            assert_eq!(summary.activations + summary.credited, 2);
            match pulled_count.load(Ordering::SeqCst) {
                0 => {
                    assert_eq!(summary.credited, 1);
                    saw_credit = true;
                }
                1 => {
                    assert_eq!(summary.credited, 0);
                    saw_both = true;
                }
                n => panic!("pulled particle activated {n} times"),
            }
        }

        assert!(saw_credit && saw_both);
    }

    #[test]
    fn test_push_credits_neighbor() {
        let mut saw_credit = false;
        let mut saw_both = false;

        for seed in 0..32 {
            let mut system = System::with_seed(seed);
            let pusher = Scripted::new(vec![Action::Push(0)]);
            let pushed = Scripted::new(vec![]);
            let pushed_count = Arc::clone(&pushed.executed);

            let a_shape = ParticleShape::contracted(Node::new(0, 0), 0).unwrap();
            // head (1,0), tail (2,0)
            let b_shape = ParticleShape::new(Node::new(1, 0), Some(0), 0).unwrap();
            let a = system.insert_particle(a_shape, Box::new(pusher)).unwrap();
            let b = system.insert_particle(b_shape, Box::new(pushed)).unwrap();

            let summary = system.round().unwrap();
            assert_eq!(summary.movements, 2);
            assert_eq!(summary.activations + summary.credited, 2);
            assert_eq!(shape(&system, a).head(), Node::new(1, 0));
            assert_eq!(shape(&system, b).head(), Node::new(2, 0));
            assert!(shape(&system, b).is_contracted());
            match pushed_count.load(Ordering::SeqCst) {
                0 => {
                    assert_eq!(summary.credited, 1);
                    saw_credit = true;
                }
                1 => {
                    assert_eq!(summary.credited, 0);
                    saw_both = true;
                }
                n => panic!("pushed particle activated {n} times"),
            }
        }

        assert!(saw_credit && saw_both);
    }

    #[test]
    fn test_every_particle_activated_once_per_round() {
        let mut system = System::with_seed(9);
        let mut counters = Vec::new();
        for x in 0..12 {
            let alg = Scripted::new(vec![]);
            counters.push(Arc::clone(&alg.executed));
            let shape = ParticleShape::contracted(Node::new(x, 0), (x % 6) as u8).unwrap();
            system.insert_particle(shape, Box::new(alg)).unwrap();
        }

        for round in 1..=5 {
            let summary = system.round().unwrap();
            assert_eq!(summary.activations, 12);
            assert_eq!(summary.credited, 0);
            for counter in &counters {
                assert_eq!(counter.load(Ordering::SeqCst), round);
            }
        }
        assert_eq!(system.num_rounds(), 5);
    }

    #[test]
    fn test_deadlock_detection() {
        let mut system = System::with_seed(3);
        let mover = Scripted::new(vec![Action::Expand(0)]);
        system
            .insert_particle(ParticleShape::contracted(Node::new(0, 0), 0).unwrap(), Box::new(mover))
            .unwrap();
        contracted(&mut system, 0, 1);

        assert!(!system.is_deadlocked());
        system.round().unwrap();
        assert!(!system.is_deadlocked());
        system.round().unwrap();
        assert!(system.is_deadlocked());
        assert_eq!(system.last_round_movements(), Some(0));
    }

    #[test]
    fn test_connectivity_breaks_when_gap_opens() {
        let mut system = System::with_seed(1);
        contracted(&mut system, 0, 0);
        contracted(&mut system, 1, 0);
        let c = contracted(&mut system, 2, 0);
        assert!(system.is_connected());

        system.expand(c, 0).unwrap();
        assert!(system.is_connected());

        system.contract(c, TAIL_CONTRACTION_LABEL).unwrap();
        assert_eq!(shape(&system, c).head(), Node::new(3, 0));
        assert!(!system.is_connected());
        assert!(system.is_valid());
    }

    #[test]
    fn test_empty_system_queries() {
        let mut system = System::with_seed(1);
        assert!(system.is_connected());
        assert!(system.is_valid());
        assert!(system.is_terminated());
        let summary = system.round().unwrap();
        assert_eq!(summary.activations, 0);
        assert!(system.is_deadlocked());
    }

    #[test]
    fn test_insert_overlapping_particle_rejected() {
        let mut system = System::with_seed(1);
        expanded(&mut system, Node::new(1, 0), 3);
        let overlap = ParticleShape::contracted(Node::new(0, 0), 0).unwrap();
        assert_eq!(
            system.insert_particle(overlap, idle()).unwrap_err(),
            SystemError::NodeOccupied(Node::new(0, 0))
        );
        assert_eq!(system.num_particles(), 1);
    }

    #[test]
    fn test_activate_at() {
        let mut system = System::with_seed(1);
        let mover = Scripted::new(vec![Action::Expand(1)]);
        system
            .insert_particle(ParticleShape::contracted(Node::new(0, 0), 0).unwrap(), Box::new(mover))
            .unwrap();

        assert_eq!(system.activate_at(Node::new(0, 0)), Ok(MovementKind::Expand));
        assert_eq!(system.num_rounds(), 0);
        assert_eq!(
            system.activate_at(Node::new(5, 5)),
            Err(SystemError::NoParticleAt(Node::new(5, 5)))
        );
    }

    #[test]
    fn test_faulty_action_aborts_round() {
        let mut system = System::with_seed(1);
        let bad = Scripted::new(vec![Action::Contract(0)]);
        system
            .insert_particle(ParticleShape::contracted(Node::new(0, 0), 0).unwrap(), Box::new(bad))
            .unwrap();

        let err = system.round().unwrap_err();
        assert!(err.is_movement_fault());
        assert_eq!(system.num_rounds(), 0);
        assert!(system.is_valid());
    }

    #[test]
    fn test_token_actions() {
        let mut system = System::with_seed(1);
        let a = contracted(&mut system, 0, 0);
        let b = contracted(&mut system, 1, 0);
        system.put_token(a, Arc::new(Note("hello"))).unwrap();

        system
            .apply(a, Action::PassToken { index: 0, label: 0 })
            .unwrap();
        assert!(system.particle(a).unwrap().tokens().is_empty());
        assert_eq!(
            system.particle(b).unwrap().tokens().peek::<Note>().map(|n| n.0),
            Some("hello")
        );

        assert_eq!(
            system.apply(a, Action::TakeToken { index: 0 }),
            Err(MovementError::MissingToken { particle: a, index: 0 })
        );
        assert!(system
            .apply(
                a,
                Action::PutToken {
                    label: 3,
                    token: Arc::new(Note("lost"))
                }
            )
            .is_err());

        system.apply(b, Action::TakeToken { index: 0 }).unwrap();
        assert!(system.particle(b).unwrap().tokens().is_empty());
        assert_eq!(system.num_movements(), 0);
    }

    #[test]
    fn test_view_distinguishes_head_and_tail() {
        let mut system = System::with_seed(1);
        let a = contracted(&mut system, 0, 0);
        // head (1,0), tail (2,0)
        expanded(&mut system, Node::new(1, 0), 0);
        // head (-1,1), tail (-1,0)
        expanded(&mut system, Node::new(-1, 1), 4);

        let view = system.view(a).unwrap();
        assert!(view.has_head_at_label(0));
        assert!(!view.has_tail_at_label(0));
        assert!(view.has_tail_at_label(3));
        assert!(view.has_head_at_label(2));
        assert!(!view.has_neighbor_at_label(4));
        assert!(!view.has_neighbor_at_label(9));
        assert!(view.can_push(0));
        assert!(!view.can_expand(0));
        assert!(view.can_expand(4));
    }

    #[test]
    fn test_view_reads_neighbor_algorithm() {
        let mut system = System::with_seed(1);
        let a = contracted(&mut system, 0, 0);
        let marker = Scripted::new(vec![Action::Idle, Action::Idle]);
        system
            .insert_particle(ParticleShape::contracted(Node::new(1, 0), 0).unwrap(), Box::new(marker))
            .unwrap();

        let view = system.view(a).unwrap();
        let neighbor = view.neighbor_algorithm::<Scripted>(0).unwrap();
        assert_eq!(neighbor.actions.len(), 2);
        assert!(view.neighbor_algorithm::<Scripted>(1).is_none());
    }

    #[test]
    fn test_events_are_recorded() {
        let mut system = System::with_seed(1);
        let a = contracted(&mut system, 0, 0);
        system.expand(a, 0).unwrap();
        system.round().unwrap();

        let events = system.drain_events();
        assert_eq!(
            events,
            vec![
                SystemEvent::Moved {
                    particle: a,
                    kind: MovementKind::Expand,
                    weight: 1
                },
                SystemEvent::RoundCompleted {
                    round: 1,
                    movements: 0
                },
            ]
        );
        assert!(system.drain_events().is_empty());
    }
}
