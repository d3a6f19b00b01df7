use crate::error::{EnvError, Result};
use std::fmt;

/// Sweep direction, named after the end of the chain the cursor moves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    First,
    Last,
}

impl Direction {
    /// Order in which sites are visited when sweeping toward this end.
    pub fn sites(self, len: usize) -> Vec<usize> {
        match self {
            Direction::Last => (0..len).collect(),
            Direction::First => (0..len).rev().collect(),
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::First => Direction::Last,
            Direction::Last => Direction::First,
        }
    }

    fn step(self) -> isize {
        match self {
            Direction::First => -1,
            Direction::Last => 1,
        }
    }
}

/// Directed cut between two neighbouring positions. The boundary tensor at
/// `(from, to)` holds the contraction of every site on the `from` side;
/// `-1` and `len` stand for the two outer ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bond {
    pub from: isize,
    pub to: isize,
}

impl Bond {
    pub fn new(from: isize, to: isize) -> Self {
        Self { from, to }
    }

    /// Bond entering site `n` from the left: `(n - 1, n)`.
    pub fn left_of(n: usize) -> Self {
        Self::new(n as isize - 1, n as isize)
    }

    /// Bond entering site `n` from the right: `(n + 1, n)`.
    pub fn right_of(n: usize) -> Self {
        Self::new(n as isize + 1, n as isize)
    }

    /// Bond written by an update of site `n` in direction `to`.
    pub fn produced_by(n: usize, to: Direction) -> Self {
        Self::new(n as isize, n as isize + to.step())
    }

    /// Bond an update of site `n` in direction `to` reads from.
    pub fn consumed_by(n: usize, to: Direction) -> Self {
        Self::new(n as isize - to.step(), n as isize)
    }

    pub fn reversed(self) -> Self {
        Self::new(self.to, self.from)
    }

    pub fn is_adjacent(self) -> bool {
        (self.from - self.to).abs() == 1
    }

    pub fn direction(self) -> Option<Direction> {
        match self.to - self.from {
            1 => Some(Direction::Last),
            -1 => Some(Direction::First),
            _ => None,
        }
    }

    /// Same cut, oriented toward the last site.
    pub fn ascending(self) -> Self {
        if self.from > self.to {
            self.reversed()
        } else {
            self
        }
    }

    /// The two chain sites joined by this bond, in ascending order.
    pub fn sites(self, len: usize) -> Result<(usize, usize)> {
        let b = self.ascending();
        if !b.is_adjacent() || b.from < 0 || b.to >= len as isize {
            return Err(EnvError::InvalidBond { bond: self, len });
        }
        Ok((b.from as usize, b.to as usize))
    }
}

impl Default for Bond {
    /// The left terminal `(-1, 0)`.
    fn default() -> Self {
        Self::new(-1, 0)
    }
}

impl From<(isize, isize)> for Bond {
    fn from((from, to): (isize, isize)) -> Self {
        Self::new(from, to)
    }
}

impl fmt::Display for Bond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.from, self.to)
    }
}
