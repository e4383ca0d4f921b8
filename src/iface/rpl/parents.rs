use core::fmt;

use super::rank::Rank;
use crate::wire::Ipv6Address;

/// A neighbor selected as parent, with the rank it last advertised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer {
    pub address: Ipv6Address,
    pub rank: Rank,
}

impl Peer {
    pub fn new(address: Ipv6Address, rank: Rank) -> Self {
        Self { address, rank }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (rank {})", self.address, self.rank)
    }
}

/// The single preferred parent of a DODAG.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParentSlot {
    parent: Option<Peer>,
}

impl ParentSlot {
    /// Return the current parent, if any.
    pub fn get(&self) -> Option<&Peer> {
        self.parent.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_none()
    }

    /// Offer an advertising neighbor as parent.
    ///
    /// The candidate replaces the current parent in place when its rank is
    /// not worse. Returns `true` when the candidate was accepted.
    pub fn offer(&mut self, candidate: Peer) -> bool {
        match &mut self.parent {
            Some(parent) if candidate.rank > parent.rank => false,
            Some(parent) => {
                *parent = candidate;
                true
            }
            None => {
                self.parent = Some(candidate);
                true
            }
        }
    }
}
