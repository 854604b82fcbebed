//! Particle geometry: head, optional tail and label resolution.
//!
//! A particle never sees global directions. It addresses its neighbourhood
//! through *labels*: `0..6` while contracted (one per direction, rotated by
//! the particle's orientation) and `0..10` while expanded (five slots around
//! the head, five around the tail, the shared internal edge excluded).
//!
//! Expanded labels run counter-clockwise starting at the head slot directly
//! opposite the tail. With `t` the tail direction in the particle's local
//! frame:
//!
//! ```text
//! label   0    1    2    3    4    5    6    7    8    9
//! anchor  H    H    H    T    T    T    T    T    H    H
//! dir    t+3  t+4  t+5  t+4  t+5  t    t+1  t+2  t+1  t+2
//! ```
//!
//! Labels 2/3 and 8/7 reach the same node from different halves.

use crate::error::SystemError;
use crate::node::{opposite, Direction, Node, NUM_DIRECTIONS};
use serde::{Deserialize, Serialize};

/// A particle-relative neighbour slot.
pub type Label = u8;

/// Labels of a contracted particle.
pub const CONTRACTED_LABELS: Label = 6;

/// Labels of an expanded particle.
pub const EXPANDED_LABELS: Label = 10;

/// Contract out of the head; the head slot facing away from the tail.
pub const HEAD_CONTRACTION_LABEL: Label = 0;

/// Contract out of the tail; the tail slot facing away from the head.
pub const TAIL_CONTRACTION_LABEL: Label = 5;

/// `(anchored at head, offset from local tail direction)` per expanded label.
const EXPANDED_LAYOUT: [(bool, u8); EXPANDED_LABELS as usize] = [
    (true, 3),
    (true, 4),
    (true, 5),
    (false, 4),
    (false, 5),
    (false, 0),
    (false, 1),
    (false, 2),
    (true, 1),
    (true, 2),
];

/// Geometric state of one particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleShape {
    /// Node of the head (the only node when contracted)
    pub(crate) head: Node,

    /// Global direction from head to tail; `None` when contracted
    pub(crate) global_tail_dir: Option<Direction>,

    /// Rotation from local labels to global directions
    orientation: Direction,
}

impl ParticleShape {
    /// Creates a shape, validating the direction arguments.
    pub fn new(
        head: Node,
        global_tail_dir: Option<Direction>,
        orientation: Direction,
    ) -> Result<Self, SystemError> {
        if orientation >= NUM_DIRECTIONS {
            return Err(SystemError::InvalidDirection(orientation));
        }
        if let Some(dir) = global_tail_dir.filter(|&dir| dir >= NUM_DIRECTIONS) {
            return Err(SystemError::InvalidDirection(dir));
        }
        Ok(Self {
            head,
            global_tail_dir,
            orientation,
        })
    }

    /// Creates a contracted shape at `head`.
    pub fn contracted(head: Node, orientation: Direction) -> Result<Self, SystemError> {
        Self::new(head, None, orientation)
    }

    pub fn head(&self) -> Node {
        self.head
    }

    /// Tail node; equal to the head while contracted.
    pub fn tail(&self) -> Node {
        match self.global_tail_dir {
            Some(dir) => self.head.node_in_dir(dir),
            None => self.head,
        }
    }

    pub fn global_tail_dir(&self) -> Option<Direction> {
        self.global_tail_dir
    }

    pub fn orientation(&self) -> Direction {
        self.orientation
    }

    pub fn is_contracted(&self) -> bool {
        self.global_tail_dir.is_none()
    }

    pub fn is_expanded(&self) -> bool {
        self.global_tail_dir.is_some()
    }

    /// Nodes occupied by this particle (head first).
    pub fn nodes(&self) -> impl Iterator<Item = Node> {
        let head = self.head;
        std::iter::once(head).chain(self.global_tail_dir.map(|dir| head.node_in_dir(dir)))
    }

    /// True if the particle occupies `node`.
    pub fn occupies(&self, node: Node) -> bool {
        self.head == node || (self.is_expanded() && self.tail() == node)
    }

    pub fn local_to_global_dir(&self, dir: Direction) -> Direction {
        (dir + self.orientation) % NUM_DIRECTIONS
    }

    pub fn global_to_local_dir(&self, dir: Direction) -> Direction {
        (dir + NUM_DIRECTIONS - self.orientation) % NUM_DIRECTIONS
    }

    /// Tail direction in the particle's own frame.
    pub fn local_tail_dir(&self) -> Option<Direction> {
        self.global_tail_dir.map(|dir| self.global_to_local_dir(dir))
    }

    /// Number of valid labels in the current state.
    pub fn label_count(&self) -> Label {
        if self.is_contracted() {
            CONTRACTED_LABELS
        } else {
            EXPANDED_LABELS
        }
    }

    pub fn is_valid_label(&self, label: Label) -> bool {
        label < self.label_count()
    }

    /// All valid labels in the current state.
    pub fn labels(&self) -> std::ops::Range<Label> {
        0..self.label_count()
    }

    /// `(anchored at head, local direction)` of a label in the current state.
    fn slot(&self, label: Label) -> Option<(bool, Direction)> {
        if !self.is_valid_label(label) {
            return None;
        }
        Some(match self.local_tail_dir() {
            None => (true, label),
            Some(tail_dir) => {
                let (at_head, offset) = EXPANDED_LAYOUT[label as usize];
                (at_head, (tail_dir + offset) % NUM_DIRECTIONS)
            }
        })
    }

    /// Local direction of a label; `None` outside the current label range.
    pub fn label_to_dir(&self, label: Label) -> Option<Direction> {
        self.slot(label).map(|(_, dir)| dir)
    }

    pub fn label_to_global_dir(&self, label: Label) -> Option<Direction> {
        self.label_to_dir(label)
            .map(|dir| self.local_to_global_dir(dir))
    }

    /// True if the label is anchored at the head. Every label of a
    /// contracted particle is both a head and a tail label; labels outside
    /// the current range are neither.
    pub fn is_head_label(&self, label: Label) -> bool {
        self.slot(label).is_some_and(|(at_head, _)| at_head)
    }

    pub fn is_tail_label(&self, label: Label) -> bool {
        self.slot(label)
            .is_some_and(|(at_head, _)| self.is_contracted() || !at_head)
    }

    /// The occupied node the label is anchored to.
    pub fn label_anchor(&self, label: Label) -> Option<Node> {
        let (at_head, _) = self.slot(label)?;
        Some(if at_head { self.head } else { self.tail() })
    }

    /// The node one step from the label's anchor.
    pub fn neighboring_node(&self, label: Label) -> Option<Node> {
        let anchor = self.label_anchor(label)?;
        let dir = self.label_to_global_dir(label)?;
        Some(anchor.node_in_dir(dir))
    }

    /// Label that releases the head and keeps the tail.
    pub fn head_contraction_label(&self) -> Option<Label> {
        self.is_expanded().then_some(HEAD_CONTRACTION_LABEL)
    }

    /// Label that releases the tail and keeps the head.
    pub fn tail_contraction_label(&self) -> Option<Label> {
        self.is_expanded().then_some(TAIL_CONTRACTION_LABEL)
    }

    /// Head label pointing in local direction `dir`, if any.
    pub fn dir_to_head_label(&self, dir: Direction) -> Option<Label> {
        self.find_label(dir, true)
    }

    /// Tail label pointing in local direction `dir`, if any.
    pub fn dir_to_tail_label(&self, dir: Direction) -> Option<Label> {
        self.find_label(dir, false)
    }

    fn find_label(&self, dir: Direction, head: bool) -> Option<Label> {
        let dir = dir % NUM_DIRECTIONS;
        if self.is_contracted() {
            return Some(dir);
        }
        self.labels().find(|&label| {
            self.is_head_label(label) == head && self.label_to_dir(label) == Some(dir)
        })
    }

    /// Moves the head one step in `global_dir`; the old head becomes the tail.
    pub(crate) fn expand_towards(&mut self, global_dir: Direction) {
        self.head = self.head.node_in_dir(global_dir);
        self.global_tail_dir = Some(opposite(global_dir));
    }

    /// Keeps the head, drops the tail. Returns the released node.
    pub(crate) fn contract_into_head(&mut self) -> Node {
        let released = self.tail();
        self.global_tail_dir = None;
        released
    }

    /// Keeps the tail as the new head. Returns the released node.
    pub(crate) fn contract_into_tail(&mut self) -> Node {
        let released = self.head;
        self.head = self.tail();
        self.global_tail_dir = None;
        released
    }
}
