/// A union-find structure over the nodes `0..n` that tracks which nodes have
/// been merged into the same equivalence class.
///
/// Merges are weighted by class size, ties are broken in favor of the smaller
/// root. Paths are compressed by [get_root_and_compress_path](DisjointSetMerger::get_root_and_compress_path).
#[derive(Clone, Debug, Default)]
pub struct DisjointSetMerger {
    parent: Vec<u32>,
    part_size: Vec<u32>,
    tmp_part_bit: Vec<bool>,
}

impl DisjointSetMerger {
    /// Create `n` singleton classes.
    pub fn new(n: usize) -> Self {
        let mut merger = Self::default();
        merger.reset(n);
        merger
    }

    /// Reset to `n` singleton classes.
    pub fn reset(&mut self, n: usize) {
        debug_assert!(n < u32::MAX as usize);
        self.parent.clear();
        self.parent.extend(0..n as u32);
        self.part_size.clear();
        self.part_size.resize(n, 1);
        self.tmp_part_bit.clear();
        self.tmp_part_bit.resize(n, false);
    }

    /// Returns the number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.parent.len()
    }

    /// Merges the classes of `a` and `b`.
    ///
    /// Returns the root that stopped being a root, or `None` if `a` and `b`
    /// were already in the same class.
    pub fn merge_parts_of(&mut self, a: usize, b: usize) -> Option<usize> {
        debug_assert!(a < self.num_nodes() && b < self.num_nodes());
        let mut root_a = self.get_root(a);
        let mut root_b = self.get_root(b);
        if root_a == root_b {
            return None;
        }
        let size_a = self.part_size[root_a];
        let size_b = self.part_size[root_b];
        if size_a < size_b || (size_a == size_b && root_a > root_b) {
            std::mem::swap(&mut root_a, &mut root_b);
        }
        // The size of the demoted root is never read again.
        self.part_size[root_a] = size_a + size_b;
        self.set_parent_along_path_to_root(a, root_a);
        self.set_parent_along_path_to_root(b, root_a);
        Some(root_b)
    }

    /// Returns the root of the class of `node` and points every node on the
    /// way directly to it.
    pub fn get_root_and_compress_path(&mut self, node: usize) -> usize {
        let root = self.get_root(node);
        self.set_parent_along_path_to_root(node, root);
        root
    }

    /// Returns the root of the class of `node` without modifying the forest.
    pub fn get_root(&self, mut node: usize) -> usize {
        loop {
            let parent = self.parent[node] as usize;
            if parent == node {
                return node;
            }
            node = parent;
        }
    }

    fn set_parent_along_path_to_root(&mut self, mut node: usize, root: usize) {
        loop {
            let parent = std::mem::replace(&mut self.parent[node], root as u32) as usize;
            if parent == node {
                return;
            }
            node = parent;
        }
    }

    /// Returns the number of nodes in the class of `node`.
    pub fn num_nodes_in_same_part_as(&mut self, node: usize) -> usize {
        let root = self.get_root_and_compress_path(node);
        self.part_size[root] as usize
    }

    /// Keeps only the first occurrence of each class in `nodes`, preserving
    /// the relative order of the kept nodes.
    pub fn keep_only_one_node_per_part(&mut self, nodes: &mut Vec<usize>) {
        let mut num_kept = 0;
        for i in 0..nodes.len() {
            let node = nodes[i];
            let root = self.get_root_and_compress_path(node);
            if !self.tmp_part_bit[root] {
                self.tmp_part_bit[root] = true;
                nodes[num_kept] = node;
                num_kept += 1;
            }
        }
        nodes.truncate(num_kept);
        // The paths are already compressed.
        for &node in nodes.iter() {
            self.tmp_part_bit[self.parent[node] as usize] = false;
        }
    }

    /// Makes `node` a singleton class again.
    ///
    /// Nodes that still have `node` as an ancestor end up in an inconsistent
    /// state. Callers must reset every node of a class, not only some of them.
    pub fn reset_node(&mut self, node: usize) {
        self.parent[node] = node as u32;
        self.part_size[node] = 1;
    }

    /// Writes a dense class id for every node into `classes` and returns the
    /// number of classes. Class ids are assigned in order of the smallest
    /// node of each class, so node 0 is always in class 0.
    pub fn fill_equivalence_classes(&mut self, classes: &mut Vec<usize>) -> usize {
        let n = self.num_nodes();
        classes.clear();
        classes.resize(n, usize::MAX);
        let mut num_classes = 0;
        for node in 0..n {
            let root = self.get_root_and_compress_path(node);
            if classes[root] == usize::MAX {
                classes[root] = num_classes;
                num_classes += 1;
            }
            classes[node] = classes[root];
        }
        num_classes
    }

    /// Renders all classes with at least two nodes, e.g. `0 2 | 1 3 4`.
    pub fn debug_string(&mut self) -> String {
        let mut classes = vec![];
        let num_classes = self.fill_equivalence_classes(&mut classes);
        let mut members = vec![vec![]; num_classes];
        for (node, &class) in classes.iter().enumerate() {
            members[class].push(node);
        }
        members
            .iter()
            .filter(|class| class.len() > 1)
            .map(|class| class.iter().map(|node| node.to_string()).collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
