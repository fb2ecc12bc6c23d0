use std::collections::HashMap;

use petgraph::Direction::{self, Incoming, Outgoing};
use tracing::{instrument, trace};

use crate::fast_partition::FastPartition;
use crate::finder::SymmetryFinder;
use crate::partition::{PartIndex, RefinablePartition};
use crate::symmetries::DeadlineExceeded;

/// Deterministic time of one elementary operation, calibrated to roughly
/// seconds on a desktop machine.
const DETERMINISTIC_TIME_PER_OPERATION: f64 = 1e-8;
/// Refining does several operations per element of the subset.
const OPERATIONS_PER_REFINED_ELEMENT: f64 = 3.0;

impl SymmetryFinder {
    fn directions(&self) -> &'static [Direction] {
        if self.graph.is_symmetric() {
            &[Outgoing]
        } else {
            &[Outgoing, Incoming]
        }
    }

    #[inline(always)]
    fn neighbors(&self, node: usize, direction: Direction) -> &[usize] {
        match direction {
            Outgoing => self.graph.out_neighbors(node),
            Incoming => self.graph.in_neighbors(node),
        }
    }

    /// Refines `partition` until the nodes of every part have the same number
    /// of arcs into and out of every part.
    ///
    /// The parts before `first_unrefined_part` must already have been used
    /// for refinement. When such a part is split later, one half gets a new
    /// index and is processed, which is enough to refine by the other half.
    ///
    /// # Errors
    ///
    /// Returns `DeadlineExceeded` if the time limit is reached. The partition
    /// is only partially refined then.
    pub fn refine_partition_by_adjacency(
        &mut self,
        first_unrefined_part: PartIndex,
        partition: &mut RefinablePartition,
    ) -> Result<(), DeadlineExceeded> {
        let directions = self.directions();
        let mut part = first_unrefined_part.index();
        // New parts are appended while we iterate.
        while part < partition.num_parts() {
            if self.time_limit.limit_reached() {
                return Err(DeadlineExceeded);
            }
            let mut num_operations = 0;
            for &direction in directions {
                // Count the arcs between the part and every node.
                for &node in partition.elements_in_part(PartIndex::new(part)) {
                    let neighbors = match direction {
                        Outgoing => self.graph.out_neighbors(node),
                        Incoming => self.graph.in_neighbors(node),
                    };
                    num_operations += 1 + neighbors.len();
                    for &neighbor in neighbors {
                        if self.tmp_degree[neighbor] == 0 {
                            self.tmp_stack.push(neighbor);
                        }
                        self.tmp_degree[neighbor] += 1;
                    }
                }

                let mut max_degree = 0;
                for &node in &self.tmp_stack {
                    let degree = std::mem::take(&mut self.tmp_degree[node]) as usize;
                    max_degree = max_degree.max(degree);
                    self.tmp_nodes_with_degree[degree].push(node);
                }
                num_operations += self.tmp_stack.len();
                self.tmp_stack.clear();

                for degree in 1..=max_degree {
                    let nodes = &mut self.tmp_nodes_with_degree[degree];
                    if nodes.is_empty() {
                        continue;
                    }
                    self.time_limit.advance_deterministic_time(
                        DETERMINISTIC_TIME_PER_OPERATION * OPERATIONS_PER_REFINED_ELEMENT * nodes.len() as f64,
                    );
                    partition.refine(nodes);
                    nodes.clear();
                }
            }
            self.time_limit.advance_deterministic_time(DETERMINISTIC_TIME_PER_OPERATION * num_operations as f64);
            part += 1;
        }
        Ok(())
    }

    /// Refines `partition` by `{node}` and then by adjacency.
    ///
    /// If `new_singletons` is given, it is overwritten with the elements of
    /// all parts that became singletons, in the order of their part indices.
    /// Two partitions that were equal before and get refined the same way
    /// list corresponding singletons at the same positions.
    ///
    /// # Errors
    ///
    /// Returns `DeadlineExceeded` if the time limit is reached.
    pub fn distinguish_node_in_partition(
        &mut self,
        node: usize,
        partition: &mut RefinablePartition,
        new_singletons: Option<&mut Vec<usize>>,
    ) -> Result<(), DeadlineExceeded> {
        let original_num_parts = partition.num_parts();
        partition.refine(&[node]);
        self.refine_partition_by_adjacency(partition.part_of(node), partition)?;

        let Some(new_singletons) = new_singletons else {
            return Ok(());
        };
        new_singletons.clear();
        for p in original_num_parts..partition.num_parts() {
            let part = PartIndex::new(p);
            let parent = partition.parent_of_part(part);
            // An old part can be the parent of several new parts.
            if parent.index() < original_num_parts
                && !self.tmp_part_mask[parent.index()]
                && partition.size_of_part(parent) == 1
            {
                self.tmp_part_mask[parent.index()] = true;
                new_singletons.extend_from_slice(partition.elements_in_part(parent));
            }
            if partition.size_of_part(part) == 1 {
                new_singletons.extend_from_slice(partition.elements_in_part(part));
            }
        }
        for p in original_num_parts..partition.num_parts() {
            self.tmp_part_mask[partition.parent_of_part(PartIndex::new(p)).index()] = false;
        }
        Ok(())
    }

    /// Builds the partition the search starts from: the initial classes,
    /// split by out-degree and in-degree.
    #[instrument(skip_all)]
    pub(crate) fn initial_partition(&mut self, classes: &[usize]) -> RefinablePartition {
        let mut dense_ids = HashMap::new();
        let part_of: Vec<usize> = classes
            .iter()
            .map(|class| {
                let next = dense_ids.len();
                *dense_ids.entry(class).or_insert(next)
            })
            .collect();

        let mut partition = FastPartition::from_part_of(&part_of);
        for &direction in self.directions() {
            let mut max_degree = 0;
            for node in 0..self.node_count() {
                let degree = self.neighbors(node, direction).len();
                max_degree = max_degree.max(degree);
                self.tmp_nodes_with_degree[degree].push(node);
            }
            for degree in 0..=max_degree {
                partition.refine(&self.tmp_nodes_with_degree[degree]);
                self.tmp_nodes_with_degree[degree].clear();
            }
        }
        trace!(initial_classes = dense_ids.len(), parts = partition.num_parts());

        let mut buffer = vec![];
        let parts = partition.get_parts(&mut buffer);
        RefinablePartition::from_parts(&parts)
    }
}
