use std::collections::BTreeMap;

use crate::wire::Ipv6Address;

/// A downstream node reachable through this DODAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Child {
    pub address: Ipv6Address,
    /// The neighbor the child was learned from.
    pub via: Ipv6Address,
}

impl core::fmt::Display for Child {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} via {}", self.address, self.via)
    }
}

/// The children of a DODAG, keyed by address.
#[derive(Debug, Default, Clone)]
pub struct Children {
    children: BTreeMap<Ipv6Address, Child>,
}

impl Children {
    /// Return the child with `address`, creating it with next hop `via` if
    /// it is not known yet.
    ///
    /// The second element is `true` when the child was created. Repeated
    /// registrations leave the recorded next hop untouched.
    pub fn find_or_create(&mut self, address: Ipv6Address, via: Ipv6Address) -> (&Child, bool) {
        let mut created = false;
        let child = self.children.entry(address).or_insert_with(|| {
            created = true;
            Child { address, via }
        });
        (child, created)
    }

    pub fn find(&self, address: &Ipv6Address) -> Option<&Child> {
        self.children.get(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Child> + '_ {
        self.children.values()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// A DODAG without children is a leaf.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const T: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 1, 0, 0, 0, 0, 7);
    const N1: Ipv6Address = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
    const N2: Ipv6Address = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 2);

    #[test]
    fn registration_is_idempotent() {
        let mut children = Children::default();
        assert!(children.is_empty());

        let (child, created) = children.find_or_create(T, N1);
        assert!(created);
        assert_eq!(child.via, N1);

        let (child, created) = children.find_or_create(T, N2);
        assert!(!created);
        assert_eq!(child.via, N1);

        assert_eq!(children.len(), 1);
        assert_eq!(children.find(&T).map(|c| c.via), Some(N1));
    }
}
