use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::sparse_permutation::SparsePermutation;

/// A permutation of `0..n` that is built by adding batches of mappings
/// `src -> dst`, which can be undone in reverse order.
///
/// While incomplete, the mappings form paths and cycles. `ancestor` points
/// towards the start of the path a node was appended to, not necessarily the
/// start itself, so [root_of](IncrementalPermutation::root_of) has to chase it.
/// The end of every open path is a loose end: it is the image of some node but
/// has no image itself yet.
#[derive(Clone, Debug)]
pub struct IncrementalPermutation {
    image: Vec<usize>,
    ancestor: Vec<usize>,

    mapping_src_stack: Vec<usize>,
    mapping_src_size_stack: Vec<usize>,
    loose_ends: BTreeSet<usize>,

    // All false between calls.
    tmp_mask: Vec<bool>,
}

impl IncrementalPermutation {
    /// Create the identity permutation of `0..n`.
    pub fn new(n: usize) -> Self {
        Self {
            image: (0..n).collect(),
            ancestor: (0..n).collect(),
            mapping_src_stack: vec![],
            mapping_src_size_stack: vec![],
            loose_ends: BTreeSet::new(),
            tmp_mask: vec![false; n],
        }
    }

    /// Returns the number of elements.
    pub fn size(&self) -> usize {
        self.image.len()
    }

    /// Adds the mappings `src[i] -> dst[i]` as one batch.
    ///
    /// No source may be mapped yet and no destination may be the image of
    /// another node yet.
    pub fn add_mappings(&mut self, src: &[usize], dst: &[usize]) {
        debug_assert_eq!(src.len(), dst.len());
        self.mapping_src_size_stack.push(self.mapping_src_stack.len());
        for (&s, &d) in src.iter().zip(dst) {
            debug_assert_eq!(self.image[s], s, "{s} is already mapped");
            debug_assert_eq!(self.ancestor[d], d, "{d} is already an image");
            self.ancestor[d] = self.root_of(s);
            self.image[s] = d;
            if self.image[d] == d {
                self.loose_ends.insert(d);
            }
            // Also covers s == d.
            self.loose_ends.remove(&s);
            self.mapping_src_stack.push(s);
        }
    }

    /// Undoes the last batch of [add_mappings](IncrementalPermutation::add_mappings)
    /// and writes its sources into `undone_mapping_src`, in the order they
    /// were added. Does nothing but clear the buffer if no batch is left.
    pub fn undo_last_mappings(&mut self, undone_mapping_src: &mut Vec<usize>) {
        undone_mapping_src.clear();
        let Some(num_mappings_before) = self.mapping_src_size_stack.pop() else {
            return;
        };
        for &s in self.mapping_src_stack[num_mappings_before..].iter().rev() {
            let d = self.image[s];
            if self.ancestor[s] != s {
                self.loose_ends.insert(s);
            }
            self.loose_ends.remove(&d);
            self.ancestor[d] = d;
            self.image[s] = s;
        }
        undone_mapping_src.extend(self.mapping_src_stack.drain(num_mappings_before..));
    }

    /// Undoes all mappings. Runs in the number of mappings.
    pub fn reset(&mut self) {
        for &s in &self.mapping_src_stack {
            let d = self.image[s];
            self.ancestor[d] = d;
            self.image[s] = s;
        }
        self.mapping_src_stack.clear();
        self.mapping_src_size_stack.clear();
        self.loose_ends.clear();
    }

    /// Returns the image of `i`, which is `i` itself if `i` is not mapped.
    #[inline(always)]
    pub fn image_of(&self, i: usize) -> usize {
        self.image[i]
    }

    /// Returns the start of the path or cycle containing `i`.
    pub fn root_of(&self, mut i: usize) -> usize {
        loop {
            let j = self.ancestor[i];
            if j == i {
                return i;
            }
            i = j;
        }
    }

    /// Returns the sources of all current mappings, in the order they were added.
    pub fn all_mappings_src(&self) -> &[usize] {
        &self.mapping_src_stack
    }

    /// Returns the ends of all open paths.
    pub fn loose_ends(&self) -> &BTreeSet<usize> {
        &self.loose_ends
    }

    /// Returns the mappings as disjoint cycles. Mappings `i -> i` are left out.
    ///
    /// Every path must be closed, i.e. there must be no loose ends.
    pub fn create_sparse_permutation(&mut self) -> SparsePermutation {
        debug_assert!(self.loose_ends.is_empty(), "open paths: {:?}", self.loose_ends);
        let mut permutation = SparsePermutation::new(self.size());
        for &x in &self.mapping_src_stack {
            if self.tmp_mask[x] || self.image[x] == x {
                continue;
            }
            let root = self.root_of(x);
            let mut next = self.image[root];
            while next != root {
                self.tmp_mask[next] = true;
                permutation.add_to_current_cycle(next);
                next = self.image[next];
            }
            self.tmp_mask[root] = true;
            permutation.add_to_current_cycle(root);
            permutation.close_current_cycle();
        }
        for &x in &self.mapping_src_stack {
            self.tmp_mask[x] = false;
        }
        permutation
    }
}

impl Display for IncrementalPermutation {
    /// Renders the current mappings grouped by path or cycle, e.g. `(0 1 2) 3->4->5`.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut seen = vec![false; self.size()];
        let mut chains = vec![];
        for &x in &self.mapping_src_stack {
            if seen[x] || self.image[x] == x {
                continue;
            }
            let root = self.root_of(x);
            let mut nodes = vec![];
            let mut u = root;
            loop {
                seen[u] = true;
                nodes.push(u.to_string());
                let next = self.image[u];
                if next == u || next == root {
                    break;
                }
                u = next;
            }
            let closed = !self.loose_ends.iter().any(|&e| self.root_of(e) == root);
            chains.push(if closed { format!("({})", nodes.join(" ")) } else { nodes.join("->") });
        }
        f.write_str(&chains.join(" "))
    }
}
