//! Downward route tree of a DODAG.
//!
//! Nodes live in an arena and refer to each other by index, so dropping the
//! tree is dropping one vector.

use crate::wire::Ipv6Address;

/// Index of a node in a [RouteTree].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The root of every tree.
    pub const ROOT: NodeId = NodeId(0);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    address: Ipv6Address,
    target: Ipv6Address,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTree {
    nodes: Vec<Node>,
}

impl RouteTree {
    /// Create a tree holding only its root.
    pub fn new(address: Ipv6Address, target: Ipv6Address) -> Self {
        Self {
            nodes: vec![Node {
                address,
                target,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Attach a new node below the first node, in depth-first order, whose
    /// address is `parent`.
    ///
    /// Returns `None` when no such node exists; detached nodes are never
    /// created.
    pub fn insert(
        &mut self,
        parent: &Ipv6Address,
        address: Ipv6Address,
        target: Ipv6Address,
    ) -> Option<NodeId> {
        let parent_id = self.find(parent)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            address,
            target,
            parent: Some(parent_id),
            children: Vec::new(),
        });
        self.nodes[parent_id.0].children.push(id);
        Some(id)
    }

    /// Depth-first search from the root for the node whose address is `address`.
    pub fn find(&self, address: &Ipv6Address) -> Option<NodeId> {
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.address == *address {
                return Some(id);
            }
            // Reversed so that earlier children are visited first.
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Whether any node already routes towards `target`.
    pub fn contains_target(&self, target: &Ipv6Address) -> bool {
        self.nodes.iter().any(|n| n.target == *target)
    }

    /// The (address, target) pairs from `node` up to and including the root.
    pub fn path(&self, node: NodeId) -> Vec<(Ipv6Address, Ipv6Address)> {
        let mut path = Vec::new();
        let mut next = self.nodes.get(node.0).map(|_| node);
        while let Some(id) = next {
            let node = &self.nodes[id.0];
            path.push((node.address, node.target));
            next = node.parent;
        }
        path
    }

    /// Number of nodes, root included.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn root_address(&self) -> Ipv6Address {
        self.nodes[NodeId::ROOT.0].address
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn addr(last: u16) -> Ipv6Address {
        Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, last)
    }

    #[test]
    fn chain_path() {
        let root = addr(1);
        let mut tree = RouteTree::new(root, root);
        tree.insert(&addr(1), addr(2), addr(2)).unwrap();
        tree.insert(&addr(2), addr(3), addr(3)).unwrap();
        let n3 = tree.insert(&addr(3), addr(4), addr(4)).unwrap();

        let path: Vec<_> = tree.path(n3).into_iter().map(|(a, _)| a).collect();
        assert_eq!(path, vec![addr(4), addr(3), addr(2), addr(1)]);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn missing_parent() {
        let mut tree = RouteTree::new(addr(1), addr(1));
        assert_eq!(tree.insert(&addr(9), addr(2), addr(2)), None);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn depth_first_order() {
        let mut tree = RouteTree::new(addr(1), addr(1));
        let a = tree.insert(&addr(1), addr(2), addr(20)).unwrap();
        tree.insert(&addr(1), addr(3), addr(30)).unwrap();
        // A second node with address 2, below 3.
        tree.insert(&addr(3), addr(2), addr(21)).unwrap();

        assert_eq!(tree.find(&addr(2)), Some(a));
        assert!(tree.contains_target(&addr(21)));
        assert_eq!(tree.path(NodeId::ROOT), vec![(addr(1), addr(1))]);
    }
}
