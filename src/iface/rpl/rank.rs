use core::fmt;

/// The distance of a node from its DODAG root; lower is closer.
///
/// rpld advances one unit per hop, so a root has rank 1 and its children 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rank(pub(crate) u16);

impl Rank {
    pub const ROOT: Self = Rank(1);
    pub const INFINITE: Self = Rank(0xffff);

    pub const fn new(value: u16) -> Self {
        Rank(value)
    }

    pub const fn value(&self) -> u16 {
        self.0
    }

    /// The rank a node takes when it selects a parent of this rank.
    pub const fn child_rank(&self) -> Self {
        Rank(self.0.saturating_add(1))
    }

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl From<u16> for Rank {
    fn from(value: u16) -> Self {
        Rank(value)
    }
}

impl From<Rank> for u16 {
    fn from(rank: Rank) -> Self {
        rank.0
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INFINITE {
            write!(f, "inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn child_rank() {
        assert_eq!(Rank::ROOT.child_rank(), Rank(2));
        assert_eq!(Rank(5).child_rank(), Rank(6));
        assert_eq!(Rank::INFINITE.child_rank(), Rank::INFINITE);
        assert!(Rank::ROOT < Rank(2));
    }
}
