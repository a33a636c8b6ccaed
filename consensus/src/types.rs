//! Consensus types shared across the crate.
//!
//! - [`Height`]: The sequential position of a block in the chain. Messages for a height are
//!   cached together and evicted together once the chain has moved far enough past them.
//!
//! - [`Round`]: A counter within a single height, representing one attempt to reach agreement on
//!   a proposed block. Rounds advance on timeout or when a quorum is not reached.
//!
//! - [`HeightDelta`]: A distance measured in heights, such as how many recent heights of messages
//!   to retain.
//!
//! Explicit constructors (`Height::new()`, `Round::new()`) are required to create instances from
//! raw integers so a height is never passed where a round is expected.

use std::fmt::{self, Display, Formatter};

/// The sequential position of a block in the chain.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Height(u64);

impl Height {
    /// Creates a new height from a u64 value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying u64 value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Subtracts a delta from this height, returning `None` if it would underflow.
    pub fn checked_sub(self, delta: HeightDelta) -> Option<Self> {
        self.0.checked_sub(delta.0).map(Self)
    }
}

impl Display for Height {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One attempt to agree on a block at a given [Height].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Round(u64);

impl Round {
    /// Creates a new round from a u64 value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying u64 value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for Round {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A distance between two [Height]s.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeightDelta(u64);

impl HeightDelta {
    /// Creates a new delta from a u64 value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}
