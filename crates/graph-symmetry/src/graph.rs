use petgraph::visit::{IntoNeighbors, NodeCompactIndexable};

/// Adjacency lists of all nodes in a single flat array.
///
/// The neighbors of node `u` are `heads[offsets[u]..offsets[u + 1]]`.
#[derive(Clone, Debug)]
struct Csr {
    offsets: Vec<usize>,
    heads: Vec<usize>,
}

impl Csr {
    #[inline(always)]
    fn neighbors(&self, u: usize) -> &[usize] {
        &self.heads[self.offsets[u]..self.offsets[u + 1]]
    }

    /// Every arc `u -> v` of `self` becomes `v -> u`.
    fn reversed(&self) -> Self {
        let n = self.offsets.len() - 1;
        let mut offsets = vec![0; n + 1];
        for &v in &self.heads {
            offsets[v + 1] += 1;
        }
        for u in 0..n {
            offsets[u + 1] += offsets[u];
        }
        let mut cursor = offsets.clone();
        let mut tails = vec![0; self.heads.len()];
        for u in 0..n {
            for &v in self.neighbors(u) {
                tails[cursor[v]] = u;
                cursor[v] += 1;
            }
        }
        Self { offsets, heads: tails }
    }
}

/// A read-only copy of the input graph with dense node indices.
///
/// Symmetric graphs, i.e. undirected graphs and directed graphs whose arcs
/// come in reverse pairs, only store the outgoing adjacency. All other
/// graphs also store the tails of the incoming arcs of every node.
#[derive(Clone, Debug)]
pub(crate) struct CompactGraph {
    outgoing: Csr,
    incoming: Option<Csr>,
}

impl CompactGraph {
    pub(crate) fn new<G>(graph: G, symmetric: bool) -> Self
    where
        G: NodeCompactIndexable + IntoNeighbors,
    {
        let n = graph.node_bound();
        let mut offsets = Vec::with_capacity(n + 1);
        let mut heads = vec![];
        offsets.push(0);
        for u in 0..n {
            heads.extend(graph.neighbors(graph.from_index(u)).map(|v| graph.to_index(v)));
            offsets.push(heads.len());
        }
        let outgoing = Csr { offsets, heads };
        let incoming = (!symmetric).then(|| outgoing.reversed());
        let graph = Self { outgoing, incoming };
        debug_assert!(!symmetric || graph.has_reverse_arcs(), "the arcs do not come in reverse pairs");
        graph
    }

    #[inline(always)]
    pub(crate) fn node_count(&self) -> usize {
        self.outgoing.offsets.len() - 1
    }

    pub(crate) fn arc_count(&self) -> usize {
        self.outgoing.heads.len()
    }

    /// Returns `true` if only the outgoing adjacency is stored.
    pub(crate) fn is_symmetric(&self) -> bool {
        self.incoming.is_none()
    }

    #[inline(always)]
    pub(crate) fn out_neighbors(&self, u: usize) -> &[usize] {
        self.outgoing.neighbors(u)
    }

    /// Returns the tails of the arcs entering `u`.
    #[inline(always)]
    pub(crate) fn in_neighbors(&self, u: usize) -> &[usize] {
        self.incoming.as_ref().unwrap_or(&self.outgoing).neighbors(u)
    }

    pub(crate) fn out_degree(&self, u: usize) -> usize {
        self.out_neighbors(u).len()
    }

    pub(crate) fn in_degree(&self, u: usize) -> usize {
        self.in_neighbors(u).len()
    }

    /// Returns `true` if the multiset of arcs is invariant under reversal.
    fn has_reverse_arcs(&self) -> bool {
        let reversed = self.outgoing.reversed();
        (0..self.node_count()).all(|u| {
            let mut a = self.out_neighbors(u).to_vec();
            let mut b = reversed.neighbors(u).to_vec();
            a.sort_unstable();
            b.sort_unstable();
            a == b
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use petgraph::graph::{DiGraph, UnGraph};

    #[test]
    fn directed_graph_has_incoming_lists() {
        let graph = DiGraph::<(), ()>::from_edges([(0, 1), (0, 2), (2, 1), (3, 3)]);
        let graph = CompactGraph::new(&graph, false);
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.arc_count(), 4);
        assert!(!graph.is_symmetric());

        let mut out = graph.out_neighbors(0).to_vec();
        out.sort_unstable();
        assert_eq!(out, [1, 2]);
        let mut incoming = graph.in_neighbors(1).to_vec();
        incoming.sort_unstable();
        assert_eq!(incoming, [0, 2]);
        assert!(graph.in_neighbors(0).is_empty());
        assert_eq!(graph.in_neighbors(3), [3]);
        assert_eq!(graph.in_degree(2), 1);
        assert_eq!(graph.out_degree(1), 0);
    }

    #[test]
    fn undirected_graph_is_symmetric() {
        let graph = UnGraph::<(), ()>::from_edges([(0, 1), (1, 2)]);
        let graph = CompactGraph::new(&graph, true);
        assert!(graph.is_symmetric());
        assert_eq!(graph.arc_count(), 4);
        let mut neighbors = graph.in_neighbors(1).to_vec();
        neighbors.sort_unstable();
        assert_eq!(neighbors, [0, 2]);
    }

    #[test]
    fn reverse_pairs() {
        let graph = DiGraph::<(), ()>::from_edges([(0, 1), (1, 0), (1, 2), (2, 1)]);
        assert!(CompactGraph::new(&graph, false).has_reverse_arcs());
        let graph = DiGraph::<(), ()>::from_edges([(0, 1), (1, 2)]);
        assert!(!CompactGraph::new(&graph, false).has_reverse_arcs());
    }
}
