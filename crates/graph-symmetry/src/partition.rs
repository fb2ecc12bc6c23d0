use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::index::make_index;

make_index!(
    /// Index of a part in a [RefinablePartition] or a [FastPartition](crate::FastPartition).
    pub PartIndex
);
make_index!(NodePos);

const FPRINT_SEED: u64 = 0x5eed_f00d_cafe_d00d;

/// Per-element fingerprints. They only depend on the number of elements, so two
/// partitions over the same ground set always use the same values.
fn element_fprints(n: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(FPRINT_SEED);
    (0..n).map(|_| rng.gen()).collect()
}

/// Controls the order in which [RefinablePartition::debug_string] lists the parts.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PartitionSorting {
    /// Parts in increasing part index, elements in hierarchical order.
    ByPart,
    /// Elements sorted inside each part, parts sorted by their smallest element.
    Lexicographic,
}

#[derive(Copy, Clone, Debug)]
struct Part {
    start: NodePos,
    end: NodePos,
    parent: PartIndex,
    fprint: u64,
}

impl Part {
    fn len(&self) -> usize {
        self.end.index() - self.start.index()
    }
}

/// A partition of the elements `0..n` that can be refined and un-refined.
///
/// All elements of a part lie in a contiguous range of a single backing array
/// (the hierarchical order). Refining a part moves the distinguished elements
/// to the end of its range and turns that suffix into a new part, which
/// remembers the part it was split from. Undoing a refinement therefore only
/// has to move the range boundary back, the backing array is left as is.
///
/// example representation of
///         [[0 3] [2] [1 4]]  (part 1 split from part 0, part 2 split from part 1)
///  elements: [3 0 2 4 1]    position -> element
/// positions: [1 4 2 0 3]    element -> position
///   part_of: [0 2 1 0 2]    element -> part
///
/// Every part also carries the XOR of pseudo-random fingerprints of its
/// elements. Equal element sets always have equal fingerprints, which makes
/// comparing parts of two partitions an O(1) operation with a negligible
/// chance of false positives.
#[derive(Clone, Debug)]
pub struct RefinablePartition {
    elements: Vec<usize>,
    positions: Vec<NodePos>,
    part_of: Vec<PartIndex>,
    parts: Vec<Part>,
    fprints: Vec<u64>,

    tmp_counter_of_part: Vec<u32>,
    tmp_affected_parts: Vec<PartIndex>,
}

impl RefinablePartition {
    /// Create a partition with a single part containing all elements. If `n` is
    /// zero, the partition has no parts.
    pub fn new(n: usize) -> Self {
        if n == 0 {
            return Self::from_parts(&[]);
        }
        let elements: Vec<usize> = (0..n).collect();
        Self::from_parts(&[&elements])
    }

    /// Create a partition from the part of each element.
    ///
    /// The part indices must be dense, i.e. every index in `0..k` is used by
    /// at least one element.
    pub fn from_part_of(part_of: &[usize]) -> Self {
        let n = part_of.len();
        let num_parts = part_of.iter().max().map_or(0, |&p| p + 1);

        // Count the part sizes, then turn them into start positions.
        let mut starts = vec![0; num_parts + 1];
        for &p in part_of {
            starts[p + 1] += 1;
        }
        for p in 0..num_parts {
            debug_assert!(starts[p + 1] > 0, "part {p} is empty");
            starts[p + 1] += starts[p];
        }

        let mut elements = vec![0; n];
        let mut cursor = starts.clone();
        for (e, &p) in part_of.iter().enumerate() {
            elements[cursor[p]] = e;
            cursor[p] += 1;
        }

        let mut parts = Vec::with_capacity(n);
        for p in 0..num_parts {
            parts.push(Part {
                start: NodePos::new(starts[p]),
                end: NodePos::new(starts[p + 1]),
                parent: PartIndex::new(p),
                fprint: 0,
            });
        }
        Self::build(elements, parts)
    }

    /// Create a partition with the given parts, in the given order. The parts
    /// must be non-empty, disjoint and cover `0..n`.
    pub fn from_parts(parts: &[&[usize]]) -> Self {
        let mut elements = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
        let mut ranges = Vec::with_capacity(parts.len());
        for (p, part) in parts.iter().enumerate() {
            debug_assert!(!part.is_empty());
            let start = elements.len();
            elements.extend_from_slice(part);
            ranges.push(Part {
                start: NodePos::new(start),
                end: NodePos::new(elements.len()),
                parent: PartIndex::new(p),
                fprint: 0,
            });
        }
        Self::build(elements, ranges)
    }

    fn build(elements: Vec<usize>, mut parts: Vec<Part>) -> Self {
        let n = elements.len();
        let fprints = element_fprints(n);
        let mut positions = vec![NodePos::invalid(); n];
        let mut part_of = vec![PartIndex::invalid(); n];
        for (p, part) in parts.iter_mut().enumerate() {
            for pos in part.start.index()..part.end.index() {
                let e = elements[pos];
                debug_assert!(!positions[e].is_valid(), "element {e} is in more than one part");
                positions[e] = NodePos::new(pos);
                part_of[e] = PartIndex::new(p);
                part.fprint ^= fprints[e];
            }
        }
        debug_assert!(positions.iter().all(|pos| pos.is_valid()));
        Self { elements, positions, part_of, parts, fprints, tmp_counter_of_part: vec![], tmp_affected_parts: vec![] }
    }

    /// Returns the number of elements.
    #[inline(always)]
    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Returns the number of parts.
    #[inline(always)]
    pub fn num_parts(&self) -> usize {
        self.parts.len()
    }

    /// Returns the part containing `element`.
    #[inline(always)]
    pub fn part_of(&self, element: usize) -> PartIndex {
        self.part_of[element]
    }

    /// Returns the number of elements in `part`.
    #[inline(always)]
    pub fn size_of_part(&self, part: PartIndex) -> usize {
        self.parts[part.index()].len()
    }

    /// Returns the part that `part` was split from, or `part` itself if it was
    /// one of the initial parts.
    #[inline(always)]
    pub fn parent_of_part(&self, part: PartIndex) -> PartIndex {
        self.parts[part.index()].parent
    }

    /// Returns the fingerprint of `part`, the XOR of its element fingerprints.
    #[inline(always)]
    pub fn fprint_of_part(&self, part: PartIndex) -> u64 {
        self.parts[part.index()].fprint
    }

    /// Returns the elements of `part`. The order is stable between two calls
    /// unless the partition is refined in between.
    #[inline]
    pub fn elements_in_part(&self, part: PartIndex) -> &[usize] {
        let Part { start, end, .. } = self.parts[part.index()];
        &self.elements[start.index()..end.index()]
    }

    /// Returns the elements of the part containing `element`.
    pub fn elements_in_same_part_as(&self, element: usize) -> &[usize] {
        self.elements_in_part(self.part_of(element))
    }

    /// Returns all elements such that the elements of every part are
    /// contiguous and lie inside the range of their parent part.
    ///
    /// Undoing refinements does not change this order.
    pub fn elements_in_hierarchical_order(&self) -> &[usize] {
        &self.elements
    }

    /// Splits every part that has a non-trivial intersection with
    /// `distinguished_subset` in two. The distinguished elements form the new
    /// part, whose parent is the original part. New parts are created in
    /// increasing order of their parent.
    ///
    /// Parts that are fully contained in or disjoint from the subset keep
    /// their index, but their elements may be reordered.
    ///
    /// Runs in O(|S| + k log k), where k is the number of touched parts.
    pub fn refine(&mut self, distinguished_subset: &[usize]) {
        self.tmp_counter_of_part.resize(self.num_parts(), 0);
        debug_assert!(self.tmp_affected_parts.is_empty());

        for &element in distinguished_subset {
            debug_assert!(element < self.num_elements());
            let part = self.part_of[element];
            let counter = &mut self.tmp_counter_of_part[part.index()];
            *counter += 1;
            let num_distinguished = *counter as usize;
            if num_distinguished == 1 {
                self.tmp_affected_parts.push(part);
            }

            // Move the element to the end of its part.
            let old_pos = self.positions[element];
            let new_pos = NodePos::new(self.parts[part.index()].end.index() - num_distinguished);
            debug_assert!(new_pos >= old_pos, "duplicate element {element} in refine");
            let other = self.elements[new_pos.index()];
            self.positions[element] = new_pos;
            self.positions[other] = old_pos;
            self.elements.swap(old_pos.index(), new_pos.index());
        }

        self.tmp_affected_parts.sort_unstable();

        for i in 0..self.tmp_affected_parts.len() {
            let part = self.tmp_affected_parts[i];
            let Part { start, end, .. } = self.parts[part.index()];
            let num_distinguished = std::mem::take(&mut self.tmp_counter_of_part[part.index()]) as usize;
            let split = NodePos::new(end.index() - num_distinguished);
            debug_assert!(split >= start);

            if split == start {
                continue;
            }

            let new_part = PartIndex::new(self.num_parts());
            let mut new_fprint = 0;
            for &e in &self.elements[split.index()..end.index()] {
                new_fprint ^= self.fprints[e];
                self.part_of[e] = new_part;
            }

            let old = &mut self.parts[part.index()];
            old.end = split;
            old.fprint ^= new_fprint;
            self.parts.push(Part { start: split, end, parent: part, fprint: new_fprint });
        }
        self.tmp_affected_parts.clear();
    }

    /// Undoes refinements until exactly `num_parts` parts remain, by merging
    /// the most recently created parts back into their parents.
    ///
    /// Restores the part membership of the time when the partition had
    /// `num_parts` parts. The order of elements inside a part may differ.
    pub fn undo_refine_until_num_parts_equal(&mut self, num_parts: usize) {
        debug_assert!(self.num_parts() >= num_parts);
        debug_assert!(num_parts >= 1 || self.num_elements() == 0);
        while self.num_parts() > num_parts {
            let part = PartIndex::new(self.num_parts() - 1);
            let Part { start, end, parent, fprint } = self.parts[part.index()];
            debug_assert!(parent < part, "cannot undo past an initial part");

            for &e in &self.elements[start.index()..end.index()] {
                self.part_of[e] = parent;
            }
            let parent = &mut self.parts[parent.index()];
            debug_assert_eq!(parent.end, start);
            parent.end = end;
            parent.fprint ^= fprint;
            self.parts.pop();
        }
    }

    /// Renders the partition as parts separated by `|`, e.g. `0 3 | 1 2 | 4`.
    pub fn debug_string(&self, sorting: PartitionSorting) -> String {
        let mut parts: Vec<Vec<usize>> =
            (0..self.num_parts()).map(|p| self.elements_in_part(PartIndex::new(p)).to_vec()).collect();
        if sorting == PartitionSorting::Lexicographic {
            for part in &mut parts {
                part.sort_unstable();
            }
            parts.sort_unstable();
        }
        parts
            .iter()
            .map(|part| part.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::seq::SliceRandom;

    fn sorted_parts(partition: &RefinablePartition) -> Vec<Vec<usize>> {
        let s = partition.debug_string(PartitionSorting::Lexicographic);
        s.split(" | ")
            .filter(|p| !p.is_empty())
            .map(|p| p.split(' ').map(|e| e.parse().unwrap()).collect())
            .collect()
    }

    fn check_invariants(partition: &RefinablePartition) {
        let mut seen = vec![false; partition.num_elements()];
        for p in 0..partition.num_parts() {
            let part = PartIndex::new(p);
            assert!(partition.parent_of_part(part) <= part);
            assert!(partition.size_of_part(part) > 0);
            let mut fprint = 0;
            for &e in partition.elements_in_part(part) {
                assert!(!seen[e]);
                seen[e] = true;
                assert_eq!(partition.part_of(e), part);
                fprint ^= partition.fprints[e];
            }
            assert_eq!(partition.fprint_of_part(part), fprint);
        }
        assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn refine_splits_parts() {
        let mut partition = RefinablePartition::new(10);
        assert_eq!(partition.num_parts(), 1);

        partition.refine(&[5, 6]);
        assert_eq!(partition.num_parts(), 2);
        assert_eq!(sorted_parts(&partition), [vec![0, 1, 2, 3, 4, 7, 8, 9], vec![5, 6]]);
        assert_eq!(partition.parent_of_part(PartIndex::new(1)), PartIndex::new(0));
        check_invariants(&partition);

        partition.refine(&[1, 3, 7, 5]);
        assert_eq!(partition.num_parts(), 4);
        assert_eq!(partition.debug_string(PartitionSorting::Lexicographic), "0 2 4 8 9 | 1 3 7 | 5 | 6");
        // New parts are ordered by the index of the part they were split from.
        let mut new_part = partition.elements_in_part(PartIndex::new(2)).to_vec();
        new_part.sort_unstable();
        assert_eq!(new_part, [1, 3, 7]);
        assert_eq!(partition.elements_in_part(PartIndex::new(3)), [5]);
        check_invariants(&partition);
    }

    #[test]
    fn refine_without_split_keeps_parts() {
        let mut partition = RefinablePartition::from_part_of(&[0, 1, 0, 1, 2]);
        partition.refine(&[1, 3, 4]);
        assert_eq!(partition.num_parts(), 3);
        partition.refine(&[]);
        assert_eq!(partition.num_parts(), 3);
        check_invariants(&partition);
    }

    #[test]
    fn undo_restores_membership() {
        let mut partition = RefinablePartition::from_part_of(&[0, 0, 0, 1, 1, 1, 1]);
        let before = sorted_parts(&partition);
        partition.refine(&[0, 4]);
        let middle = sorted_parts(&partition);
        let middle_num_parts = partition.num_parts();
        partition.refine(&[1]);
        partition.refine(&[5, 6]);
        check_invariants(&partition);

        partition.undo_refine_until_num_parts_equal(middle_num_parts);
        assert_eq!(sorted_parts(&partition), middle);
        check_invariants(&partition);

        partition.undo_refine_until_num_parts_equal(2);
        assert_eq!(sorted_parts(&partition), before);
        check_invariants(&partition);
    }

    #[test]
    fn undo_keeps_hierarchical_order() {
        let mut partition = RefinablePartition::new(6);
        partition.refine(&[2, 4]);
        partition.refine(&[4, 5]);
        let order = partition.elements_in_hierarchical_order().to_vec();
        partition.undo_refine_until_num_parts_equal(2);
        assert_eq!(partition.elements_in_hierarchical_order(), order);
        partition.undo_refine_until_num_parts_equal(1);
        assert_eq!(partition.elements_in_hierarchical_order(), order);
    }

    #[test]
    fn fingerprints_do_not_depend_on_order() {
        let mut a = RefinablePartition::new(8);
        let mut b = RefinablePartition::new(8);
        a.refine(&[1, 2, 3, 4]);
        a.refine(&[3, 4, 5]);
        b.refine(&[5, 4, 3]);
        b.refine(&[4, 3, 2, 1]);

        let part_fprint = |p: &RefinablePartition, e: usize| p.fprint_of_part(p.part_of(e));
        for e in 0..8 {
            assert_eq!(part_fprint(&a, e), part_fprint(&b, e));
        }
        let c = RefinablePartition::from_parts(&[&[7, 6, 0], &[4, 3], &[2, 1], &[5]]);
        for e in 0..8 {
            assert_eq!(part_fprint(&a, e), part_fprint(&c, e));
        }
    }

    #[test]
    fn parent_fingerprint_is_xor_of_children() {
        let mut partition = RefinablePartition::new(9);
        let whole = partition.fprint_of_part(PartIndex::new(0));
        partition.refine(&[0, 2, 8]);
        let a = partition.fprint_of_part(PartIndex::new(0));
        let b = partition.fprint_of_part(PartIndex::new(1));
        assert_eq!(a ^ b, whole);
    }

    #[test]
    fn random_refine_and_undo() {
        let n = 40;
        let mut rng = StdRng::seed_from_u64(17);
        let mut partition = RefinablePartition::new(n);
        let mut history = vec![(partition.num_parts(), sorted_parts(&partition))];
        let mut elements: Vec<usize> = (0..n).collect();

        for _ in 0..30 {
            if rng.gen_bool(0.3) && history.len() > 1 {
                let i = rng.gen_range(0..history.len());
                history.truncate(i + 1);
                let (num_parts, parts) = history.last().unwrap();
                partition.undo_refine_until_num_parts_equal(*num_parts);
                assert_eq!(&sorted_parts(&partition), parts);
            } else {
                elements.shuffle(&mut rng);
                let k = rng.gen_range(0..n / 3);
                let before = partition.num_parts();
                partition.refine(&elements[..k]);
                if partition.num_parts() != before {
                    history.push((partition.num_parts(), sorted_parts(&partition)));
                }
            }
            check_invariants(&partition);
        }
    }

    #[test]
    fn empty_partition() {
        let partition = RefinablePartition::new(0);
        assert_eq!(partition.num_parts(), 0);
        assert_eq!(partition.num_elements(), 0);
        assert_eq!(partition.debug_string(PartitionSorting::ByPart), "");
    }
}
