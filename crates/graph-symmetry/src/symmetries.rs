use std::fmt::{Display, Formatter};

use crate::sparse_permutation::SparsePermutation;

/// Whether a search explored everything it had to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SearchStatus {
    /// The generators generate the full automorphism group.
    Complete,
    /// The time limit was reached before the search finished.
    ///
    /// Every generator is still a verified automorphism and the equivalence
    /// classes are exactly the orbits under the found generators. All group
    /// size factors but the last one are exact, the last one may be too small.
    DeadlineExceeded,
}

/// The result of [SymmetryFinder::find_symmetries](crate::SymmetryFinder::find_symmetries).
#[derive(Clone, Debug)]
pub struct Symmetries {
    /// A dense class id for every node, class 0 contains node 0. Two nodes
    /// share a class exactly if a product of generators maps one to the other.
    pub equivalence_classes: Vec<usize>,
    /// Permutations generating the automorphism group that respects the
    /// initial classes.
    pub generators: Vec<SparsePermutation>,
    /// Factors of the order of the group, one per level of the search.
    pub group_size_factors: Vec<usize>,
    /// See [SearchStatus].
    pub status: SearchStatus,
}

impl Symmetries {
    /// The result for a search that was stopped before any generator was
    /// found: every node is in its own class.
    pub(crate) fn interrupted(n: usize) -> Self {
        Self {
            equivalence_classes: (0..n).collect(),
            generators: vec![],
            group_size_factors: vec![],
            status: SearchStatus::DeadlineExceeded,
        }
    }

    /// Returns `true` if the search was not stopped by the time limit.
    pub fn is_complete(&self) -> bool {
        self.status == SearchStatus::Complete
    }

    /// Returns the number of orbits.
    pub fn num_orbits(&self) -> usize {
        self.equivalence_classes.iter().max().map_or(0, |&c| c + 1)
    }

    /// Returns the order of the group, or `None` if it does not fit into a `u128`.
    pub fn group_size(&self) -> Option<u128> {
        self.group_size_factors.iter().try_fold(1_u128, |size, &factor| size.checked_mul(factor as u128))
    }

    /// Returns the decimal logarithm of the order of the group.
    pub fn log10_group_size(&self) -> f64 {
        self.group_size_factors.iter().map(|&factor| (factor as f64).log10()).sum()
    }
}

/// The initial classes do not assign a class to every node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InvalidClassesError {
    /// The number of nodes of the graph.
    pub expected: usize,
    /// The number of classes given.
    pub actual: usize,
}

impl Display for InvalidClassesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected a class for each of the {} nodes, got {} classes", self.expected, self.actual)
    }
}

impl std::error::Error for InvalidClassesError {}

/// The [TimeLimit](crate::TimeLimit) was reached.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeadlineExceeded;

impl Display for DeadlineExceeded {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("time limit reached")
    }
}

impl std::error::Error for DeadlineExceeded {}
