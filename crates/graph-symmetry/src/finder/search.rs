use std::fmt::{Display, Formatter};

use tracing::{instrument, trace};

use crate::finder::{merge_node_equivalence_classes_according_to_permutation, swap_front_and_back, SymmetryFinder};
use crate::graph::CompactGraph;
use crate::incremental_permutation::IncrementalPermutation;
use crate::partition::{PartIndex, PartitionSorting, RefinablePartition};
use crate::sparse_permutation::SparsePermutation;
use crate::symmetries::DeadlineExceeded;

/// One level of the search for a permutation.
///
/// The base partition has already been refined by `base_node`. The image
/// partition still has `num_parts_before_trying_to_map_base_node` parts and
/// gets refined by one image candidate after the other.
#[derive(Clone, Debug)]
pub(crate) struct SearchState {
    base_node: usize,
    /// The first candidate. The other candidates are only computed once it
    /// failed, pruned by the generators found so far.
    first_image_node: Option<usize>,
    /// Candidates, tried from the back.
    remaining_pruned_image_nodes: Vec<usize>,
    num_parts_before_trying_to_map_base_node: usize,
    /// All parts before this index are known to be equal in both partitions.
    min_potential_mismatching_part_index: usize,
}

impl Display for SearchState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "base_node={} first_image_node={:?} remaining_pruned_image_nodes={:?} num_parts_before={} min_mismatch={}",
            self.base_node,
            self.first_image_node,
            self.remaining_pruned_image_nodes,
            self.num_parts_before_trying_to_map_base_node,
            self.min_potential_mismatching_part_index,
        )
    }
}

/// What to do after both partitions were refined by a base and image node.
enum Decision {
    /// All non-singleton parts are equal, the singletons define a candidate.
    FullMatch,
    /// Deepen the search by trying to map `base_node` to `image_node`.
    Map { base_node: usize, image_node: usize },
}

enum Step {
    Backtrack,
    Deepen { base_node: usize, image_node: usize },
}

impl SymmetryFinder {
    /// Returns `true` if `permutation` is a permutation that maps the arcs
    /// of the graph onto the arcs of the graph, counting parallel arcs.
    ///
    /// Nodes without a mapping are mapped to themselves. Returns `false` if
    /// the mappings do not close into cycles yet.
    pub fn is_graph_automorphism(&mut self, permutation: &IncrementalPermutation) -> bool {
        debug_assert_eq!(permutation.size(), self.node_count());
        is_graph_automorphism(&self.graph, permutation, &mut self.tmp_arc_count)
    }

    /// Searches for an automorphism that maps `root_node` to `root_image_node`
    /// and is compatible with the base partition.
    ///
    /// Both partitions must be equal. They are restored to their current
    /// number of parts before returning.
    #[instrument(
        level = "debug",
        skip(self, base_partition, image_partition, generators, permutations_displacing_node)
    )]
    pub(crate) fn find_one_suitable_permutation(
        &mut self,
        root_node: usize,
        root_image_node: usize,
        base_partition: &mut RefinablePartition,
        image_partition: &mut RefinablePartition,
        generators: &[SparsePermutation],
        permutations_displacing_node: &[Vec<usize>],
    ) -> Result<Option<SparsePermutation>, DeadlineExceeded> {
        debug_assert!(self.search_states.is_empty());
        debug_assert!(self.tmp_permutation.all_mappings_src().is_empty());
        debug_assert_eq!(base_partition.num_parts(), image_partition.num_parts());

        let num_parts = base_partition.num_parts();
        let result = self.search(
            root_node,
            root_image_node,
            base_partition,
            image_partition,
            generators,
            permutations_displacing_node,
        );
        if result.is_err() {
            base_partition.undo_refine_until_num_parts_equal(num_parts);
            image_partition.undo_refine_until_num_parts_equal(num_parts);
            self.tmp_permutation.reset();
            self.search_states.clear();
        }
        debug_assert!(self.search_states.is_empty());
        result
    }

    fn search(
        &mut self,
        root_node: usize,
        root_image_node: usize,
        base_partition: &mut RefinablePartition,
        image_partition: &mut RefinablePartition,
        generators: &[SparsePermutation],
        permutations_displacing_node: &[Vec<usize>],
    ) -> Result<Option<SparsePermutation>, DeadlineExceeded> {
        let mut base_singletons = vec![];
        let mut image_singletons = vec![];

        // The caller tries the other images of the root node, so the root
        // state only gets this one.
        let num_parts = base_partition.num_parts();
        self.search_states.push(SearchState {
            base_node: root_node,
            first_image_node: None,
            remaining_pruned_image_nodes: vec![root_image_node],
            num_parts_before_trying_to_map_base_node: num_parts,
            min_potential_mismatching_part_index: num_parts,
        });
        self.distinguish_node_in_partition(root_node, base_partition, Some(&mut base_singletons))?;

        while let Some(state) = self.search_states.last() {
            if self.time_limit.limit_reached() {
                return Err(DeadlineExceeded);
            }
            let image_node = match state.first_image_node {
                Some(node) => node,
                None => state.remaining_pruned_image_nodes[state.remaining_pruned_image_nodes.len() - 1],
            };
            let num_parts_before = state.num_parts_before_trying_to_map_base_node;
            let mut min_potential_mismatching_part_index = state.min_potential_mismatching_part_index;
            debug_assert_eq!(image_partition.num_parts(), num_parts_before);
            trace!(depth = self.search_states.len(), %state, image_node);

            self.distinguish_node_in_partition(image_node, image_partition, Some(&mut image_singletons))?;
            trace!(
                base = base_partition.debug_string(PartitionSorting::ByPart),
                image = image_partition.debug_string(PartitionSorting::ByPart)
            );

            let step = if !partitions_are_compatible_after_part_index(
                base_partition,
                image_partition,
                min_potential_mismatching_part_index,
            ) {
                Step::Backtrack
            } else {
                self.tmp_permutation.add_mappings(&base_singletons, &image_singletons);
                match self.confirm_full_match_or_find_next_mapping_decision(
                    base_partition,
                    image_partition,
                    &mut min_potential_mismatching_part_index,
                ) {
                    Decision::Map { base_node, image_node } => Step::Deepen { base_node, image_node },
                    Decision::FullMatch => {
                        debug_assert_eq!(min_potential_mismatching_part_index, base_partition.num_parts());
                        // Fingerprints can collide, the arcs decide.
                        if is_graph_automorphism(&self.graph, &self.tmp_permutation, &mut self.tmp_arc_count) {
                            let permutation = self.tmp_permutation.create_sparse_permutation();
                            let num_parts = self.search_states[0].num_parts_before_trying_to_map_base_node;
                            base_partition.undo_refine_until_num_parts_equal(num_parts);
                            image_partition.undo_refine_until_num_parts_equal(num_parts);
                            self.tmp_permutation.reset();
                            self.search_states.clear();
                            trace!(%permutation, "automorphism");
                            return Ok(Some(permutation));
                        }
                        trace!("candidate is not an automorphism");
                        let non_singleton_part = (0..base_partition.num_parts())
                            .map(PartIndex::new)
                            .find(|&part| base_partition.size_of_part(part) > 1);
                        match non_singleton_part {
                            Some(part) => {
                                self.time_limit.advance_deterministic_time(1e-9 * part.index() as f64);
                                let (base_node, image_node) =
                                    self.get_best_mapping(base_partition, image_partition, part);
                                Step::Deepen { base_node, image_node }
                            }
                            None => {
                                // Fully refined, there is nothing left to decide.
                                self.tmp_permutation.undo_last_mappings(&mut base_singletons);
                                Step::Backtrack
                            }
                        }
                    }
                }
            };

            match step {
                Step::Backtrack => self.backtrack(
                    base_partition,
                    image_partition,
                    generators,
                    permutations_displacing_node,
                    &mut base_singletons,
                ),
                Step::Deepen { base_node, image_node } => {
                    trace!(base_node, image_node, "deepen");
                    self.search_states.push(SearchState {
                        base_node,
                        first_image_node: Some(image_node),
                        remaining_pruned_image_nodes: vec![],
                        num_parts_before_trying_to_map_base_node: base_partition.num_parts(),
                        min_potential_mismatching_part_index,
                    });
                    self.distinguish_node_in_partition(base_node, base_partition, Some(&mut base_singletons))?;
                }
            }
        }
        Ok(None)
    }

    /// Drops the image candidate of the last state. States without candidates
    /// left are popped, together with their refinement of the base partition
    /// and the mappings of their parent.
    ///
    /// `base_singletons` is set to the singletons of the base node of the new
    /// last state, which are exactly the sources of the undone mappings.
    fn backtrack(
        &mut self,
        base_partition: &mut RefinablePartition,
        image_partition: &mut RefinablePartition,
        generators: &[SparsePermutation],
        permutations_displacing_node: &[Vec<usize>],
        base_singletons: &mut Vec<usize>,
    ) {
        while let Some(depth) = self.search_states.len().checked_sub(1) {
            let num_parts = self.search_states[depth].num_parts_before_trying_to_map_base_node;
            image_partition.undo_refine_until_num_parts_equal(num_parts);

            if let Some(first_image_node) = self.search_states[depth].first_image_node.take() {
                // No automorphism compatible with the partition maps the base
                // node to first_image_node, so none maps it into the orbit of
                // first_image_node under such automorphisms either.
                let mut remaining = std::mem::take(&mut self.search_states[depth].remaining_pruned_image_nodes);
                remaining.push(first_image_node);
                let others = image_partition.elements_in_same_part_as(first_image_node);
                remaining.extend(others.iter().filter(|&&e| e != first_image_node));
                self.prune_orbits_under_permutations_compatible_with_partition(
                    image_partition,
                    generators,
                    &permutations_displacing_node[first_image_node],
                    &mut remaining,
                );
                swap_front_and_back(&mut remaining);
                debug_assert_eq!(remaining.last(), Some(&first_image_node));
                self.search_states[depth].remaining_pruned_image_nodes = remaining;
            }

            let state = &mut self.search_states[depth];
            state.remaining_pruned_image_nodes.pop();
            if !state.remaining_pruned_image_nodes.is_empty() {
                break;
            }

            trace!(depth, "backtrack");
            base_partition.undo_refine_until_num_parts_equal(num_parts);
            // Does nothing for the root state.
            self.tmp_permutation.undo_last_mappings(base_singletons);
            self.search_states.pop();
        }
    }

    /// Picks the next mapping, or confirms that all non-singleton parts are
    /// equal.
    ///
    /// Open paths of the permutation have to be continued anyway, so they are
    /// tried first, preferably by closing a cycle. Otherwise the first part
    /// from `min_potential_mismatching_part_index` on whose fingerprint
    /// differs, or whose parent's fingerprint differs, decides. The cursor is
    /// advanced past all parts that are known to be equal.
    fn confirm_full_match_or_find_next_mapping_decision(
        &self,
        base_partition: &RefinablePartition,
        image_partition: &RefinablePartition,
        min_potential_mismatching_part_index: &mut usize,
    ) -> Decision {
        if !self.options.minimize_support {
            let mut next_base_node = None;
            for &loose_node in self.tmp_permutation.loose_ends() {
                debug_assert!(base_partition.elements_in_same_part_as(loose_node).len() > 1);
                let root = self.tmp_permutation.root_of(loose_node);
                debug_assert_ne!(root, loose_node);
                if image_partition.part_of(root) == base_partition.part_of(loose_node) {
                    return Decision::Map { base_node: loose_node, image_node: root };
                }
                next_base_node = Some(loose_node);
            }
            if let Some(base_node) = next_base_node {
                let image_node = image_partition.elements_in_part(base_partition.part_of(base_node))[0];
                return Decision::Map { base_node, image_node };
            }
        }

        let initial_min_potential_mismatching_part_index = *min_potential_mismatching_part_index;
        while *min_potential_mismatching_part_index < base_partition.num_parts() {
            let part = PartIndex::new(*min_potential_mismatching_part_index);
            if parts_differ(base_partition, image_partition, part) {
                let (base_node, image_node) = self.get_best_mapping(base_partition, image_partition, part);
                return Decision::Map { base_node, image_node };
            }
            // A part can be equal while the rest of its parent is not.
            let parent = base_partition.parent_of_part(part);
            if parent.index() < initial_min_potential_mismatching_part_index
                && parts_differ(base_partition, image_partition, parent)
            {
                let (base_node, image_node) = self.get_best_mapping(base_partition, image_partition, parent);
                return Decision::Map { base_node, image_node };
            }
            *min_potential_mismatching_part_index += 1;
        }

        debug_assert!((0..base_partition.num_parts())
            .map(PartIndex::new)
            .all(|part| !parts_differ(base_partition, image_partition, part)));
        Decision::FullMatch
    }

    /// Picks a base node of `part` and an image node of the image part with
    /// the same index.
    ///
    /// By default, the first base node is mapped to itself if possible, else
    /// to the first image node. With `minimize_support`, any base node that
    /// can be mapped to itself is preferred.
    fn get_best_mapping(
        &self,
        base_partition: &RefinablePartition,
        image_partition: &RefinablePartition,
        part: PartIndex,
    ) -> (usize, usize) {
        let base_nodes = base_partition.elements_in_part(part);
        let first_image_node = image_partition.elements_in_part(part)[0];
        if self.options.minimize_support {
            return match base_nodes.iter().find(|&&node| image_partition.part_of(node) == part) {
                Some(&node) => (node, node),
                None => (base_nodes[0], first_image_node),
            };
        }
        let base_node = base_nodes[0];
        if image_partition.part_of(base_node) == part {
            (base_node, base_node)
        } else {
            (base_node, first_image_node)
        }
    }

    /// Keeps one node of every orbit of `nodes` under the permutations of
    /// `permutation_indices` that are compatible with `partition`, i.e. whose
    /// cycles each lie inside a single part.
    fn prune_orbits_under_permutations_compatible_with_partition(
        &mut self,
        partition: &RefinablePartition,
        permutations: &[SparsePermutation],
        permutation_indices: &[usize],
        nodes: &mut Vec<usize>,
    ) {
        if nodes.len() <= 1 {
            return;
        }
        trace!(?nodes, "prune");
        debug_assert!(self.tmp_stack.is_empty());
        for &index in permutation_indices {
            let permutation = &permutations[index];
            // Checking the cycle lengths first is cheap and rules out most
            // permutations.
            let fits = permutation
                .cycles()
                .all(|cycle| cycle.len() <= partition.size_of_part(partition.part_of(cycle[0])));
            if !fits {
                continue;
            }
            let compatible = permutation.cycles().all(|cycle| {
                let part = partition.part_of(cycle[0]);
                cycle.iter().all(|&node| partition.part_of(node) == part)
            });
            if !compatible {
                continue;
            }
            merge_node_equivalence_classes_according_to_permutation(permutation, &mut self.tmp_merger, None);
            for &node in permutation.support() {
                if !self.tmp_node_mask[node] {
                    self.tmp_node_mask[node] = true;
                    self.tmp_stack.push(node);
                }
            }
        }

        self.tmp_merger.keep_only_one_node_per_part(nodes);

        // Every merged class only contains nodes of the stack.
        for &node in &self.tmp_stack {
            self.tmp_node_mask[node] = false;
            self.tmp_merger.reset_node(node);
        }
        self.tmp_stack.clear();
    }
}

fn parts_differ(base_partition: &RefinablePartition, image_partition: &RefinablePartition, part: PartIndex) -> bool {
    base_partition.size_of_part(part) != 1
        && base_partition.fprint_of_part(part) != image_partition.fprint_of_part(part)
}

/// Returns `true` if both partitions have the same number of parts and the
/// parts from `part_index` on have the same sizes and parents.
fn partitions_are_compatible_after_part_index(
    p1: &RefinablePartition,
    p2: &RefinablePartition,
    part_index: usize,
) -> bool {
    let num_parts = p1.num_parts();
    if p2.num_parts() != num_parts {
        return false;
    }
    (part_index..num_parts).map(PartIndex::new).all(|part| {
        p1.size_of_part(part) == p2.size_of_part(part) && p1.parent_of_part(part) == p2.parent_of_part(part)
    })
}

fn is_graph_automorphism(
    graph: &CompactGraph,
    permutation: &IncrementalPermutation,
    tmp_arc_count: &mut [u32],
) -> bool {
    if !permutation.loose_ends().is_empty() {
        return false;
    }
    for &base in permutation.all_mappings_src() {
        let image = permutation.image_of(base);
        if image == base {
            continue;
        }
        if !list_maps_to_list(graph.out_neighbors(base), graph.out_neighbors(image), permutation, tmp_arc_count) {
            return false;
        }
        if !graph.is_symmetric()
            && !list_maps_to_list(graph.in_neighbors(base), graph.in_neighbors(image), permutation, tmp_arc_count)
        {
            return false;
        }
    }
    true
}

/// Returns `true` if `permutation` maps the multiset `l1` onto the multiset `l2`.
fn list_maps_to_list(l1: &[usize], l2: &[usize], permutation: &IncrementalPermutation, tmp_count: &mut [u32]) -> bool {
    if l1.len() != l2.len() {
        return false;
    }
    for &x in l2 {
        tmp_count[x] += 1;
    }
    let mut matches = true;
    for &x in l1 {
        let mapped = permutation.image_of(x);
        if tmp_count[mapped] == 0 {
            matches = false;
            break;
        }
        tmp_count[mapped] -= 1;
    }
    if !matches {
        for &x in l2 {
            tmp_count[x] = 0;
        }
    }
    matches
}
