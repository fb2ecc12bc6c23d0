use std::fmt::{Display, Formatter};

/// A permutation of `0..size` stored as its non-trivial cycles.
///
/// Only displaced nodes are stored, so the memory use is proportional to the
/// support of the permutation rather than to `size`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SparsePermutation {
    size: usize,
    support: Vec<usize>,
    cycle_ends: Vec<usize>,
}

impl SparsePermutation {
    /// Create the identity permutation of `0..size`.
    pub fn new(size: usize) -> Self {
        Self { size, support: vec![], cycle_ends: vec![] }
    }

    /// Create a permutation from disjoint cycles. Cycles with fewer than two
    /// nodes are skipped.
    pub fn from_cycles<C>(size: usize, cycles: impl IntoIterator<Item = C>) -> Self
    where
        C: AsRef<[usize]>,
    {
        let mut permutation = Self::new(size);
        for cycle in cycles {
            let cycle = cycle.as_ref();
            if cycle.len() < 2 {
                continue;
            }
            for &u in cycle {
                permutation.add_to_current_cycle(u);
            }
            permutation.close_current_cycle();
        }
        permutation
    }

    pub(crate) fn add_to_current_cycle(&mut self, u: usize) {
        debug_assert!(u < self.size);
        self.support.push(u);
    }

    pub(crate) fn close_current_cycle(&mut self) {
        let start = self.cycle_ends.last().copied().unwrap_or(0);
        debug_assert!(self.support.len() >= start + 2, "cycles must have at least two nodes");
        self.cycle_ends.push(self.support.len());
    }

    /// Returns the number of elements the permutation acts on.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the displaced nodes, grouped by cycle.
    pub fn support(&self) -> &[usize] {
        &self.support
    }

    /// Returns the number of non-trivial cycles.
    pub fn num_cycles(&self) -> usize {
        self.cycle_ends.len()
    }

    /// Returns the nodes of cycle `c`, each mapped to the next one and the
    /// last one mapped to the first.
    pub fn cycle(&self, c: usize) -> &[usize] {
        let start = if c == 0 { 0 } else { self.cycle_ends[c - 1] };
        &self.support[start..self.cycle_ends[c]]
    }

    /// Returns an iterator over all cycles.
    pub fn cycles(&self) -> impl Iterator<Item = &[usize]> + '_ {
        (0..self.num_cycles()).map(|c| self.cycle(c))
    }

    /// Returns the last node of cycle `c`, which is mapped to its first node.
    pub fn last_element_in_cycle(&self, c: usize) -> usize {
        self.support[self.cycle_ends[c] - 1]
    }

    /// Returns the image of every node of `0..size`.
    pub fn to_dense(&self) -> Vec<usize> {
        let mut image: Vec<usize> = (0..self.size).collect();
        for cycle in self.cycles() {
            for (i, &u) in cycle.iter().enumerate() {
                image[u] = cycle[(i + 1) % cycle.len()];
            }
        }
        image
    }
}

impl Display for SparsePermutation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (c, cycle) in self.cycles().enumerate() {
            if c > 0 {
                f.write_str(" ")?;
            }
            f.write_str("(")?;
            for (i, u) in cycle.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{u}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cycles() {
        let p = SparsePermutation::from_cycles(7, [vec![1, 4, 2], vec![3], vec![5, 6]]);
        assert_eq!(p.num_cycles(), 2);
        assert_eq!(p.cycle(0), [1, 4, 2]);
        assert_eq!(p.cycle(1), [5, 6]);
        assert_eq!(p.last_element_in_cycle(0), 2);
        assert_eq!(p.support(), [1, 4, 2, 5, 6]);
        assert_eq!(p.to_dense(), [0, 4, 1, 3, 2, 6, 5]);
        assert_eq!(p.to_string(), "(1 4 2) (5 6)");
    }

    #[test]
    fn identity() {
        let p = SparsePermutation::new(3);
        assert_eq!(p.num_cycles(), 0);
        assert_eq!(p.to_dense(), [0, 1, 2]);
        assert_eq!(p.to_string(), "");
    }
}
