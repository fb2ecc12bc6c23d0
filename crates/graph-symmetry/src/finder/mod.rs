mod refinement;
mod search;

use petgraph::visit::{GraphProp, IntoNeighbors, NodeCompactIndexable};
use tracing::{debug, info, instrument, trace};

use crate::disjoint_set::DisjointSetMerger;
use crate::graph::CompactGraph;
use crate::incremental_permutation::IncrementalPermutation;
use crate::ordered_node_list::OrderedNodeList;
use crate::partition::{PartIndex, PartitionSorting, RefinablePartition};
use crate::sparse_permutation::SparsePermutation;
use crate::symmetries::{DeadlineExceeded, InvalidClassesError, SearchStatus, Symmetries};
use crate::time_limit::TimeLimit;
use search::SearchState;

/// Tie-breaking policies of the search.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SearchOptions {
    /// Prefer mapping nodes to themselves when the search has to pick a
    /// mapping, and do not close open cycles first. This tends to give
    /// generators with a smaller support, but the search is usually slower.
    pub minimize_support: bool,
}

#[derive(Copy, Clone, Debug)]
struct InvariantDiveState {
    invariant_node: usize,
    num_parts_before_refinement: usize,
}

/// Computes generators of the automorphism group of a graph.
///
/// An automorphism is a permutation of the nodes that maps arcs to arcs. The
/// search only considers automorphisms that map every node into its initial
/// class, see [find_symmetries](SymmetryFinder::find_symmetries).
///
/// The finder owns a copy of the adjacency and all scratch buffers of the
/// search, so it can be reused for several searches on the same graph.
#[derive(Debug)]
pub struct SymmetryFinder {
    graph: CompactGraph,
    options: SearchOptions,
    time_limit: TimeLimit,

    search_states: Vec<SearchState>,
    tmp_permutation: IncrementalPermutation,

    // Scratch buffers. They are empty, zero or false between calls and are
    // cleaned up sparsely.
    tmp_degree: Vec<u32>,
    tmp_stack: Vec<usize>,
    tmp_nodes_with_degree: Vec<Vec<usize>>,
    tmp_part_mask: Vec<bool>,
    tmp_node_mask: Vec<bool>,
    tmp_arc_count: Vec<u32>,
    tmp_merger: DisjointSetMerger,
}

impl SymmetryFinder {
    /// Create a finder for `graph`. Undirected graphs are treated as
    /// directed graphs with a pair of reverse arcs for every edge.
    pub fn new<G>(graph: G) -> Self
    where
        G: NodeCompactIndexable + IntoNeighbors + GraphProp,
    {
        Self::from_compact_graph(CompactGraph::new(graph, !graph.is_directed()))
    }

    /// Create a finder for a directed graph in which every arc `u -> v` has a
    /// matching reverse arc `v -> u`. The incoming arcs are then not indexed.
    pub fn with_symmetric_arcs<G>(graph: G) -> Self
    where
        G: NodeCompactIndexable + IntoNeighbors,
    {
        Self::from_compact_graph(CompactGraph::new(graph, true))
    }

    fn from_compact_graph(graph: CompactGraph) -> Self {
        let n = graph.node_count();
        let max_degree = (0..n).map(|u| graph.out_degree(u).max(graph.in_degree(u))).max().unwrap_or(0);
        Self {
            options: SearchOptions::default(),
            time_limit: TimeLimit::infinite(),
            search_states: vec![],
            tmp_permutation: IncrementalPermutation::new(n),
            tmp_degree: vec![0; n],
            tmp_stack: vec![],
            tmp_nodes_with_degree: vec![vec![]; max_degree + 1],
            tmp_part_mask: vec![false; n],
            tmp_node_mask: vec![false; n],
            tmp_arc_count: vec![0; n],
            tmp_merger: DisjointSetMerger::new(n),
            graph,
        }
    }

    /// Set the tie-breaking policies.
    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the tie-breaking policies.
    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Returns the number of nodes of the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of arcs of the graph. Undirected edges count twice.
    pub fn arc_count(&self) -> usize {
        self.graph.arc_count()
    }

    /// Returns the limit of the last search, including the deterministic time
    /// it used up.
    pub fn time_limit(&self) -> &TimeLimit {
        &self.time_limit
    }

    /// Set the limit for calls that refine partitions outside of
    /// [find_symmetries](SymmetryFinder::find_symmetries).
    pub fn set_time_limit(&mut self, time_limit: TimeLimit) {
        self.time_limit = time_limit;
    }

    /// Computes generators of all automorphisms that map every node `u` to a
    /// node `v` with `classes[u] == classes[v]`.
    ///
    /// Class ids can be arbitrary integers. The result contains the orbits of
    /// the nodes and the factors of the group order. If `time_limit` is
    /// reached, the partial result is returned with
    /// [SearchStatus::DeadlineExceeded].
    ///
    /// # Errors
    ///
    /// Returns an `InvalidClassesError` if `classes` does not have one entry
    /// per node. No work is done in that case.
    #[instrument(skip_all)]
    pub fn find_symmetries(
        &mut self,
        classes: &[usize],
        time_limit: TimeLimit,
    ) -> Result<Symmetries, InvalidClassesError> {
        let n = self.node_count();
        if classes.len() != n {
            return Err(InvalidClassesError { expected: n, actual: classes.len() });
        }
        self.time_limit = time_limit;

        let mut base_partition = self.initial_partition(classes);
        let dive = self
            .refine_partition_by_adjacency(PartIndex::new(0), &mut base_partition)
            .and_then(|()| self.invariant_dive(&mut base_partition));
        let Ok(dive) = dive else {
            info!(number_of_nodes = n, "time limit reached before the search");
            return Ok(Symmetries::interrupted(n));
        };

        let symmetries = self.unroll_invariant_dive(dive, base_partition);
        info!(
            number_of_nodes = n,
            number_of_arcs = self.arc_count(),
            number_of_generators = symmetries.generators.len(),
            number_of_orbits = symmetries.num_orbits(),
            log10_group_size = symmetries.log10_group_size(),
            status = ?symmetries.status
        );
        Ok(symmetries)
    }

    /// Distinguishes nodes of non-singleton parts one after the other until
    /// all parts are singletons.
    #[instrument(skip_all)]
    fn invariant_dive(
        &mut self,
        partition: &mut RefinablePartition,
    ) -> Result<Vec<InvariantDiveState>, DeadlineExceeded> {
        let mut stack = vec![];
        for node in 0..self.node_count() {
            if partition.elements_in_same_part_as(node).len() == 1 {
                continue;
            }
            stack.push(InvariantDiveState { invariant_node: node, num_parts_before_refinement: partition.num_parts() });
            self.distinguish_node_in_partition(node, partition, None)?;
            trace!(invariant_node = node, partition = partition.debug_string(PartitionSorting::ByPart));
            if self.time_limit.limit_reached() {
                return Err(DeadlineExceeded);
            }
        }
        debug!(depth = stack.len(), "invariant dive");
        Ok(stack)
    }

    /// Walks the invariant dive back up. On each level, every other
    /// representative of the dive node's part is tried as its image.
    ///
    /// Level `i` only finds permutations that fix the dive nodes above it, so
    /// the orbit of its dive node is one factor of the group order.
    #[instrument(skip_all)]
    fn unroll_invariant_dive(
        &mut self,
        mut dive: Vec<InvariantDiveState>,
        mut base_partition: RefinablePartition,
    ) -> Symmetries {
        let n = self.node_count();
        let mut image_partition = base_partition.clone();
        let mut representatives = OrderedNodeList::new(base_partition.elements_in_hierarchical_order());
        let mut node_equivalence_classes = DisjointSetMerger::new(n);
        let mut permutations_displacing_node: Vec<Vec<usize>> = vec![vec![]; n];
        let mut generators: Vec<SparsePermutation> = vec![];
        let mut group_size_factors = vec![];
        let mut potential_root_image_nodes = vec![];
        let mut status = SearchStatus::Complete;

        while let Some(InvariantDiveState { invariant_node: root_node, num_parts_before_refinement }) = dive.pop() {
            if self.time_limit.limit_reached() {
                status = SearchStatus::DeadlineExceeded;
                break;
            }
            base_partition.undo_refine_until_num_parts_equal(num_parts_before_refinement);
            image_partition.undo_refine_until_num_parts_equal(num_parts_before_refinement);

            // Permutations of deeper levels fix the root node.
            debug_assert_eq!(node_equivalence_classes.get_root(root_node), root_node);
            get_all_other_representatives_in_same_part_as(
                root_node,
                &base_partition,
                &representatives,
                &mut potential_root_image_nodes,
            );
            debug!(root_node, candidates = potential_root_image_nodes.len(), "dive level");

            // Candidates are tried from the back.
            while let Some(&root_image_node) = potential_root_image_nodes.last() {
                if self.time_limit.limit_reached() {
                    status = SearchStatus::DeadlineExceeded;
                    break;
                }
                let permutation = match self.find_one_suitable_permutation(
                    root_node,
                    root_image_node,
                    &mut base_partition,
                    &mut image_partition,
                    &generators,
                    &permutations_displacing_node,
                ) {
                    Ok(permutation) => permutation,
                    Err(DeadlineExceeded) => {
                        status = SearchStatus::DeadlineExceeded;
                        break;
                    }
                };

                if let Some(permutation) = permutation {
                    merge_node_equivalence_classes_according_to_permutation(
                        &permutation,
                        &mut node_equivalence_classes,
                        Some(&mut representatives),
                    );
                    // Keep root_image_node as the one node of its class, it
                    // is removed below.
                    swap_front_and_back(&mut potential_root_image_nodes);
                    node_equivalence_classes.keep_only_one_node_per_part(&mut potential_root_image_nodes);
                    swap_front_and_back(&mut potential_root_image_nodes);

                    let index = generators.len();
                    for &node in permutation.support() {
                        permutations_displacing_node[node].push(index);
                    }
                    debug!(%permutation, "found generator");
                    generators.push(permutation);
                }
                potential_root_image_nodes.pop();
            }

            group_size_factors.push(node_equivalence_classes.num_nodes_in_same_part_as(root_node));
            if status == SearchStatus::DeadlineExceeded {
                break;
            }
        }

        let mut equivalence_classes = vec![];
        node_equivalence_classes.fill_equivalence_classes(&mut equivalence_classes);
        Symmetries { equivalence_classes, generators, group_size_factors, status }
    }
}

/// Collects the representatives next to `node` in `representatives` that are
/// in the same part. This finds all of them as long as the parts of
/// `partition` are contiguous in `representatives`.
fn get_all_other_representatives_in_same_part_as(
    node: usize,
    partition: &RefinablePartition,
    representatives: &OrderedNodeList,
    pruned_other_nodes: &mut Vec<usize>,
) {
    pruned_other_nodes.clear();
    let part = partition.part_of(node);
    let mut repr = node;
    while let Some(prev) = representatives.prev(repr) {
        if partition.part_of(prev) != part {
            break;
        }
        pruned_other_nodes.push(prev);
        repr = prev;
    }
    repr = node;
    while let Some(next) = representatives.next(repr) {
        if partition.part_of(next) != part {
            break;
        }
        pruned_other_nodes.push(next);
        repr = next;
    }
}

/// Merges the classes of all nodes on a common cycle of `permutation`.
/// Representatives that stop being the root of their class are removed from
/// `representatives`.
fn merge_node_equivalence_classes_according_to_permutation(
    permutation: &SparsePermutation,
    node_equivalence_classes: &mut DisjointSetMerger,
    mut representatives: Option<&mut OrderedNodeList>,
) {
    for cycle in permutation.cycles() {
        for pair in cycle.windows(2) {
            let removed = node_equivalence_classes.merge_parts_of(pair[0], pair[1]);
            if let (Some(list), Some(removed)) = (representatives.as_deref_mut(), removed) {
                list.remove(removed);
            }
        }
    }
}

fn swap_front_and_back(nodes: &mut [usize]) {
    if let Some(last) = nodes.len().checked_sub(1) {
        nodes.swap(0, last);
    }
}
