const NONE: u32 = u32::MAX;
const REMOVED: u32 = u32::MAX - 1;

/// A doubly linked list over the nodes `0..n`, stored densely by node.
///
/// The list is built once from an ordering of all nodes. Nodes can then be
/// removed in O(1), and the neighbors of every remaining node can be queried
/// in O(1).
#[derive(Clone, Debug)]
pub struct OrderedNodeList {
    prev: Vec<u32>,
    next: Vec<u32>,
}

impl OrderedNodeList {
    /// Create a list containing the nodes in the order of `nodes`, which must
    /// be a permutation of `0..nodes.len()`.
    pub fn new(nodes: &[usize]) -> Self {
        let n = nodes.len();
        debug_assert!(n < REMOVED as usize);
        let mut prev = vec![NONE; n];
        let mut next = vec![NONE; n];
        let mut last = NONE;
        for &u in nodes {
            debug_assert_eq!(prev[u], NONE, "node {u} appears twice");
            prev[u] = last;
            if last != NONE {
                next[last as usize] = u as u32;
            }
            last = u as u32;
        }
        Self { prev, next }
    }

    /// Returns the number of nodes the list was created with.
    pub fn len(&self) -> usize {
        self.next.len()
    }

    /// Returns `true` if the list was created without nodes.
    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }

    /// Returns the node after `u`, or `None` if `u` is the last node.
    #[inline]
    pub fn next(&self, u: usize) -> Option<usize> {
        debug_assert_ne!(self.next[u], REMOVED, "node {u} was removed");
        Self::to_node(self.next[u])
    }

    /// Returns the node before `u`, or `None` if `u` is the first node.
    #[inline]
    pub fn prev(&self, u: usize) -> Option<usize> {
        debug_assert_ne!(self.prev[u], REMOVED, "node {u} was removed");
        Self::to_node(self.prev[u])
    }

    /// Unlinks `u`. Every node can be removed at most once.
    pub fn remove(&mut self, u: usize) {
        debug_assert_ne!(self.next[u], REMOVED, "node {u} was already removed");
        let prev = std::mem::replace(&mut self.prev[u], REMOVED);
        let next = std::mem::replace(&mut self.next[u], REMOVED);
        if prev != NONE {
            self.next[prev as usize] = next;
        }
        if next != NONE {
            self.prev[next as usize] = prev;
        }
    }

    #[inline(always)]
    fn to_node(x: u32) -> Option<usize> {
        (x != NONE).then_some(x as usize)
    }
}
