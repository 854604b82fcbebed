//! Lattice coordinates for the triangular grid.

use serde::{Deserialize, Serialize};

/// One of the six lattice directions, numbered counter-clockwise from +x.
pub type Direction = u8;

/// Number of directions around a node.
pub const NUM_DIRECTIONS: Direction = 6;

/// Unit offsets for directions 0..6 in axial coordinates.
const OFFSETS: [(i32, i32); 6] = [(1, 0), (0, 1), (-1, 1), (-1, 0), (0, -1), (1, -1)];

/// A node of the triangular lattice.
///
/// Uses axial coordinates: the six neighbours of `(x, y)` are given by
/// [`Node::node_in_dir`] for directions `0..6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Node {
    pub x: i32,
    pub y: i32,
}

impl Node {
    /// Creates a node from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the neighbouring node in the given direction (mod 6).
    pub fn node_in_dir(&self, dir: Direction) -> Node {
        let (dx, dy) = OFFSETS[(dir % NUM_DIRECTIONS) as usize];
        Node::new(self.x + dx, self.y + dy)
    }

    /// Returns all six neighbours, ordered by direction.
    pub fn neighbors(&self) -> impl Iterator<Item = Node> {
        let node = *self;
        (0..NUM_DIRECTIONS).map(move |dir| node.node_in_dir(dir))
    }

    /// Returns the direction leading from `self` to `other`, if adjacent.
    pub fn dir_to(&self, other: Node) -> Option<Direction> {
        (0..NUM_DIRECTIONS).find(|&dir| self.node_in_dir(dir) == other)
    }

    /// True if `other` is one step away.
    pub fn is_adjacent(&self, other: Node) -> bool {
        self.dir_to(other).is_some()
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Returns the direction pointing the opposite way.
pub fn opposite(dir: Direction) -> Direction {
    (dir + 3) % NUM_DIRECTIONS
}
