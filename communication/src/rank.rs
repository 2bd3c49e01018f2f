//! Participant identities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The identity of a participant, out of `0 .. size`.
///
/// Rank zero is the master, and is easily confused with "false" by code that tests
/// a rank for truth. A `Rank` has no conversion to `bool`, so such tests do not compile:
///
/// ```compile_fail
/// use relay_communication::Rank;
///
/// let rank = Rank::new(0);
/// if rank { println!("not reached"); }
/// ```
///
/// Ask the intended question instead:
///
/// ```
/// use relay_communication::Rank;
///
/// let rank = Rank::new(0);
/// assert!(rank.is_master());
/// assert_eq!(rank.is_master(), rank == Rank::MASTER);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rank(usize);

impl Rank {
    /// The rank of the master participant.
    pub const MASTER: Rank = Rank(0);

    /// Wraps a participant index.
    pub const fn new(index: usize) -> Self {
        Rank(index)
    }

    /// The participant index, for addressing into per-participant collections.
    pub const fn index(self) -> usize {
        self.0
    }

    /// True for the master participant.
    pub fn is_master(self) -> bool {
        self == Rank::MASTER
    }

    /// Iterates over all ranks of `size` participants.
    pub fn all(size: usize) -> impl Iterator<Item = Rank> {
        (0 .. size).map(Rank)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
