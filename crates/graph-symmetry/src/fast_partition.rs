use crate::partition::PartIndex;

/// A partition of `0..n` that can only be refined.
///
/// It has the same [refine](FastPartition::refine) semantics as
/// [RefinablePartition](crate::RefinablePartition) but only keeps the part of
/// each element and the part sizes. The parts can be materialized all at
/// once with [get_parts](FastPartition::get_parts).
#[derive(Clone, Debug)]
pub struct FastPartition {
    part_of: Vec<PartIndex>,
    size_of_part: Vec<u32>,

    // Always empty or all zero / invalid between calls.
    tmp_count: Vec<u32>,
    tmp_new_part: Vec<PartIndex>,
    tmp_touched: Vec<PartIndex>,
}

impl FastPartition {
    /// Create a partition with a single part containing all elements.
    pub fn new(n: usize) -> Self {
        let size_of_part = if n > 0 { vec![n as u32] } else { vec![] };
        Self::with_parts(vec![PartIndex::new(0); n], size_of_part)
    }

    /// Create a partition from dense part indices, see
    /// [RefinablePartition::from_part_of](crate::RefinablePartition::from_part_of).
    pub fn from_part_of(part_of: &[usize]) -> Self {
        let num_parts = part_of.iter().max().map_or(0, |&p| p + 1);
        let mut size_of_part = vec![0; num_parts];
        for &p in part_of {
            size_of_part[p] += 1;
        }
        debug_assert!(size_of_part.iter().all(|&s| s > 0));
        Self::with_parts(part_of.iter().map(|&p| PartIndex::new(p)).collect(), size_of_part)
    }

    fn with_parts(part_of: Vec<PartIndex>, size_of_part: Vec<u32>) -> Self {
        Self { part_of, size_of_part, tmp_count: vec![], tmp_new_part: vec![], tmp_touched: vec![] }
    }

    /// Returns the number of elements.
    pub fn num_elements(&self) -> usize {
        self.part_of.len()
    }

    /// Returns the number of parts.
    pub fn num_parts(&self) -> usize {
        self.size_of_part.len()
    }

    /// Returns the part containing `element`.
    #[inline(always)]
    pub fn part_of(&self, element: usize) -> PartIndex {
        self.part_of[element]
    }

    /// Returns the number of elements in `part`.
    #[inline(always)]
    pub fn size_of_part(&self, part: PartIndex) -> usize {
        self.size_of_part[part.index()] as usize
    }

    /// Moves the elements of `distinguished_subset` out of every part that is
    /// not fully contained in the subset into a new part. New parts are
    /// created in increasing order of the part they were split from.
    pub fn refine(&mut self, distinguished_subset: &[usize]) {
        let num_parts = self.num_parts();
        self.tmp_count.resize(num_parts, 0);
        self.tmp_new_part.resize(num_parts, PartIndex::invalid());

        for &element in distinguished_subset {
            let part = self.part_of[element];
            if self.tmp_count[part.index()] == 0 {
                self.tmp_touched.push(part);
            }
            self.tmp_count[part.index()] += 1;
        }
        self.tmp_touched.sort_unstable();

        for &part in &self.tmp_touched {
            let count = std::mem::take(&mut self.tmp_count[part.index()]);
            if count == self.size_of_part[part.index()] {
                continue;
            }
            self.tmp_new_part[part.index()] = PartIndex::new(self.size_of_part.len());
            self.size_of_part[part.index()] -= count;
            self.size_of_part.push(count);
        }

        for &element in distinguished_subset {
            let new_part = self.tmp_new_part[self.part_of[element].index()];
            if new_part.is_valid() {
                self.part_of[element] = new_part;
            }
        }

        for part in self.tmp_touched.drain(..) {
            self.tmp_new_part[part.index()] = PartIndex::invalid();
        }
    }

    /// Returns all parts as slices of `buffer`, in increasing part index. The
    /// elements of each part are in increasing order.
    pub fn get_parts<'a>(&self, buffer: &'a mut Vec<usize>) -> Vec<&'a [usize]> {
        let n = self.num_elements();
        buffer.clear();
        buffer.resize(n, 0);

        let mut starts = Vec::with_capacity(self.num_parts() + 1);
        starts.push(0);
        for &size in &self.size_of_part {
            starts.push(starts[starts.len() - 1] + size as usize);
        }

        let mut cursor = starts.clone();
        for (element, part) in self.part_of.iter().enumerate() {
            buffer[cursor[part.index()]] = element;
            cursor[part.index()] += 1;
        }

        let buffer: &'a [usize] = buffer;
        starts.windows(2).map(|w| &buffer[w[0]..w[1]]).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::partition::RefinablePartition;

    #[test]
    fn refine_and_get_parts() {
        let mut partition = FastPartition::new(8);
        partition.refine(&[6, 1, 3]);
        partition.refine(&[0, 1, 2]);
        partition.refine(&[0, 1, 2]);

        assert_eq!(partition.num_parts(), 4);
        let mut buffer = vec![];
        let parts: Vec<Vec<usize>> = partition.get_parts(&mut buffer).iter().map(|p| p.to_vec()).collect();
        assert_eq!(parts, [vec![4, 5, 7], vec![3, 6], vec![0, 2], vec![1]]);
    }

    #[test]
    fn same_parts_as_refinable_partition() {
        let initial = [0, 1, 0, 1, 2, 2, 0, 1, 2, 0];
        let mut fast = FastPartition::from_part_of(&initial);
        let mut refinable = RefinablePartition::from_part_of(&initial);
        for subset in [&[0, 1, 2, 3][..], &[9, 8, 7], &[4], &[6, 5, 0, 2]] {
            fast.refine(subset);
            refinable.refine(subset);
            assert_eq!(fast.num_parts(), refinable.num_parts());
            for e in 0..initial.len() {
                assert_eq!(fast.part_of(e), refinable.part_of(e));
                assert_eq!(fast.size_of_part(fast.part_of(e)), refinable.size_of_part(refinable.part_of(e)));
            }
        }
    }

    #[test]
    fn subset_covering_whole_parts_is_a_no_op() {
        let mut partition = FastPartition::from_part_of(&[0, 0, 1, 1]);
        partition.refine(&[2, 3]);
        assert_eq!(partition.num_parts(), 2);
        assert_eq!(partition.part_of(3), PartIndex::new(1));
    }

    #[test]
    fn empty() {
        let partition = FastPartition::new(0);
        let mut buffer = vec![1, 2, 3];
        assert!(partition.get_parts(&mut buffer).is_empty());
        assert!(buffer.is_empty());
    }
}
