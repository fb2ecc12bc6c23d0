//! This is a library to compute the [automorphism group](https://en.wikipedia.org/wiki/Graph_automorphism) of a graph.
//!
//! An *automorphism* is a permutation of the nodes that maps every arc onto
//! an arc. The automorphisms form a group. Instead of listing the group, the
//! library computes a small set of *generators*, the *orbits* of the nodes
//! (the classes of nodes that can be mapped onto each other) and the order of
//! the group as a product of factors.
//!
//! The search combines partition refinement with a backtracking search over
//! partial node mappings. Generators that were already found are used to
//! prune the search.
//!
//! # Examples
//!
//! The cycle on 5 nodes has 5 rotations and 5 reflections.
//! ```rust
//! # use std::error::Error;
//! #
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use petgraph::graph::UnGraph;
//! use graph_symmetry::{SymmetryFinder, TimeLimit};
//!
//! let graph = UnGraph::<(), ()>::from_edges([(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)]);
//! let mut finder = SymmetryFinder::new(&graph);
//! let symmetries = finder.find_symmetries(&[0; 5], TimeLimit::infinite())?;
//!
//! assert_eq!(symmetries.group_size(), Some(10));
//! assert_eq!(symmetries.num_orbits(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! Initial classes restrict the automorphisms. Here, node 0 may not be mapped
//! to the other nodes of the directed triangle.
//! ```rust
//! # use std::error::Error;
//! #
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use petgraph::graph::DiGraph;
//! use graph_symmetry::{SymmetryFinder, TimeLimit};
//!
//! let graph = DiGraph::<(), ()>::from_edges([(0, 1), (1, 2), (2, 0), (3, 4), (4, 3)]);
//! let mut finder = SymmetryFinder::new(&graph);
//!
//! let symmetries = finder.find_symmetries(&[0, 0, 0, 1, 1], TimeLimit::infinite())?;
//! assert_eq!(symmetries.equivalence_classes, [0, 0, 0, 1, 1]);
//! assert_eq!(symmetries.group_size(), Some(6));
//!
//! let symmetries = finder.find_symmetries(&[1, 0, 0, 0, 0], TimeLimit::infinite())?;
//! assert_eq!(symmetries.equivalence_classes, [0, 1, 2, 3, 3]);
//! assert_eq!(symmetries.group_size(), Some(2));
//! # Ok(())
//! # }
//! ```
//!
//! # Generics
//!
//! The algorithm is implemented for structs that implement the `petgraph`
//! traits `NodeCompactIndexable`, `IntoNeighbors`, and `GraphProp`. Graphs
//! with `GraphProp<EdgeType = Undirected>` are treated as graphs with a pair
//! of reverse arcs for every edge.
//!
//! # References
//! + \[McK81\]: Brendan D. McKay. “Practical Graph Isomorphism”. Congressus Numerantium 30, 1981.
//! + \[DLSM04\]: Paul T. Darga, Mark H. Liffiton, Karem A. Sakallah, and Igor L. Markov.
//!   “Exploiting Structure in Symmetry Detection for CNF”. <https://doi.org/10.1145/996566.996712>.

#![forbid(unsafe_code)]
#![doc(test(attr(deny(warnings, rust_2018_idioms), allow(dead_code))))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

mod disjoint_set;
mod fast_partition;
mod finder;
mod graph;
mod incremental_permutation;
mod index;
mod ordered_node_list;
mod partition;
mod sparse_permutation;
mod symmetries;
mod time_limit;


pub use disjoint_set::DisjointSetMerger;
pub use fast_partition::FastPartition;
pub use finder::{SearchOptions, SymmetryFinder};
pub use incremental_permutation::IncrementalPermutation;
pub use ordered_node_list::OrderedNodeList;
pub use partition::{PartIndex, PartitionSorting, RefinablePartition};
pub use sparse_permutation::SparsePermutation;
pub use symmetries::{DeadlineExceeded, InvalidClassesError, SearchStatus, Symmetries};
pub use time_limit::TimeLimit;

#[cfg(test)]
mod test {
    use std::collections::HashSet;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use petgraph::graph::{DiGraph, UnGraph};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    use super::*;

    fn find(finder: &mut SymmetryFinder) -> Symmetries {
        let n = finder.node_count();
        finder.find_symmetries(&vec![0; n], TimeLimit::infinite()).unwrap()
    }

    /// Applies every generator to a graph given as a set of arcs.
    fn check_generators(arcs: &[(usize, usize)], symmetries: &Symmetries) {
        let arc_set: HashSet<_> = arcs.iter().copied().collect();
        for generator in &symmetries.generators {
            let image = generator.to_dense();
            let mut sorted = image.clone();
            sorted.sort_unstable();
            assert!(sorted.iter().copied().eq(0..image.len()), "{generator} is not a permutation");
            for &(u, v) in arcs {
                assert!(arc_set.contains(&(image[u], image[v])), "{generator} does not map ({u}, {v})");
            }
            for cycle in generator.cycles() {
                for &u in cycle {
                    assert_eq!(
                        symmetries.equivalence_classes[u], symmetries.equivalence_classes[cycle[0]],
                        "cycles stay inside a class"
                    );
                }
            }
        }
    }

    fn undirected_arcs(graph: &UnGraph<(), ()>) -> Vec<(usize, usize)> {
        graph
            .edge_indices()
            .filter_map(|e| graph.edge_endpoints(e))
            .flat_map(|(u, v)| [(u.index(), v.index()), (v.index(), u.index())])
            .collect()
    }

    fn directed_arcs(graph: &DiGraph<(), ()>) -> Vec<(usize, usize)> {
        graph.edge_indices().filter_map(|e| graph.edge_endpoints(e)).map(|(u, v)| (u.index(), v.index())).collect()
    }

    /// Enumerates the group generated by `generators` by closing the identity
    /// under multiplication.
    fn brute_force_group_size(n: usize, generators: &[SparsePermutation]) -> usize {
        let generators: Vec<Vec<usize>> = generators.iter().map(|g| g.to_dense()).collect();
        let identity: Vec<usize> = (0..n).collect();
        let mut group = HashSet::from([identity.clone()]);
        let mut queue = vec![identity];
        while let Some(element) = queue.pop() {
            for generator in &generators {
                let product: Vec<usize> = element.iter().map(|&x| generator[x]).collect();
                if group.insert(product.clone()) {
                    queue.push(product);
                }
            }
        }
        group.len()
    }

    #[test]
    fn directed_chain() {
        let graph = tests::directed_path(5);
        let symmetries = find(&mut SymmetryFinder::new(&graph));
        assert_eq!(symmetries.equivalence_classes, [0, 1, 2, 3, 4]);
        assert!(symmetries.generators.is_empty());
        assert_eq!(symmetries.group_size(), Some(1));
        assert!(symmetries.is_complete());
    }

    #[test]
    fn cycle_5() {
        let graph = tests::cycle_graph(5);
        let symmetries = find(&mut SymmetryFinder::new(&graph));
        assert_eq!(symmetries.equivalence_classes, [0; 5]);
        assert_eq!(symmetries.group_size(), Some(10));
        check_generators(&undirected_arcs(&graph), &symmetries);
        assert_eq!(brute_force_group_size(5, &symmetries.generators), 10);
    }

    #[test]
    fn complete_4() {
        let graph = tests::complete_graph(4);
        let symmetries = find(&mut SymmetryFinder::new(&graph));
        assert_eq!(symmetries.equivalence_classes, [0; 4]);
        assert_eq!(symmetries.group_size(), Some(24));
        assert_eq!(brute_force_group_size(4, &symmetries.generators), 24);
    }

    #[test]
    fn complete_4_with_symmetric_arcs() {
        let graph = tests::complete_digraph(4);
        let symmetries = find(&mut SymmetryFinder::with_symmetric_arcs(&graph));
        assert_eq!(symmetries.equivalence_classes, [0; 4]);
        assert_eq!(symmetries.group_size(), Some(24));
        check_generators(&directed_arcs(&graph), &symmetries);
    }

    #[test]
    fn two_directed_cycles_and_an_isolated_node() {
        let graph = DiGraph::<(), ()>::from_edges([(1, 2), (2, 3), (3, 1), (4, 5), (5, 4)]);
        let mut finder = SymmetryFinder::new(&graph);
        let symmetries = finder.find_symmetries(&[0; 6], TimeLimit::infinite()).unwrap();
        assert_eq!(symmetries.equivalence_classes, [0, 1, 1, 1, 2, 2]);
        assert_eq!(symmetries.group_size(), Some(6));
        check_generators(&directed_arcs(&graph), &symmetries);
        assert_eq!(brute_force_group_size(6, &symmetries.generators), 6);
    }

    #[test]
    fn petersen() {
        let graph = tests::petersen_graph();
        let symmetries = find(&mut SymmetryFinder::new(&graph));
        assert_eq!(symmetries.equivalence_classes, [0; 10]);
        assert_eq!(symmetries.group_size(), Some(120));
        check_generators(&undirected_arcs(&graph), &symmetries);
        assert_eq!(brute_force_group_size(10, &symmetries.generators), 120);
    }

    #[test]
    fn petersen_minimize_support() {
        let graph = tests::petersen_graph();
        let mut finder = SymmetryFinder::new(&graph).with_options(SearchOptions { minimize_support: true });
        let symmetries = find(&mut finder);
        assert_eq!(symmetries.group_size(), Some(120));
        check_generators(&undirected_arcs(&graph), &symmetries);
    }

    #[test]
    fn small_graphs_match_brute_force() {
        let cases: Vec<(UnGraph<(), ()>, usize)> = vec![
            (tests::path_graph(6), 2),
            (tests::cycle_graph(6), 12),
            (tests::empty_graph(4), 24),
            (tests::star_graph(5), 24),
            (tests::complete_bipartite_graph(2, 3), 12),
            (tests::cube_graph(), 48),
        ];
        for (graph, size) in cases {
            let n = graph.node_count();
            let symmetries = find(&mut SymmetryFinder::new(&graph));
            assert_eq!(symmetries.group_size(), Some(size as u128));
            check_generators(&undirected_arcs(&graph), &symmetries);
            assert_eq!(brute_force_group_size(n, &symmetries.generators), size);
        }
    }

    #[test]
    fn classes_restrict_the_group() {
        let graph = tests::cycle_graph(6);
        let mut finder = SymmetryFinder::new(&graph);
        let symmetries = finder.find_symmetries(&[5, 9, 5, 9, 5, 9], TimeLimit::infinite()).unwrap();
        assert_eq!(symmetries.equivalence_classes, [0, 1, 0, 1, 0, 1]);
        assert_eq!(symmetries.group_size(), Some(6));
        assert_eq!(brute_force_group_size(6, &symmetries.generators), 6);
        for generator in &symmetries.generators {
            let image = generator.to_dense();
            assert!((0..6).all(|u| image[u] % 2 == u % 2));
        }
    }

    #[test]
    fn disjoint_copies() {
        // Two triangles and a path on three nodes.
        let graph =
            UnGraph::<(), ()>::from_edges([(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (6, 7), (7, 8)]);
        let symmetries = find(&mut SymmetryFinder::new(&graph));
        assert_eq!(symmetries.equivalence_classes, [0, 0, 0, 0, 0, 0, 1, 2, 1]);
        assert_eq!(symmetries.group_size(), Some(6 * 6 * 2 * 2));
        check_generators(&undirected_arcs(&graph), &symmetries);
    }

    #[test]
    fn random_relabeling_keeps_the_group_size() {
        let base = tests::petersen_graph();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5 {
            let mut relabel: Vec<usize> = (0..10).collect();
            relabel.shuffle(&mut rng);
            let edges: Vec<(u32, u32)> = undirected_arcs(&base)
                .into_iter()
                .filter(|(u, v)| u < v)
                .map(|(u, v)| (relabel[u] as u32, relabel[v] as u32))
                .collect();
            let graph = UnGraph::<(), ()>::from_edges(edges);
            let symmetries = find(&mut SymmetryFinder::new(&graph));
            assert_eq!(symmetries.group_size(), Some(120));
            check_generators(&undirected_arcs(&graph), &symmetries);
        }
    }

    #[test]
    fn finder_can_be_reused() {
        let graph = tests::cycle_graph(8);
        let mut finder = SymmetryFinder::new(&graph);
        for _ in 0..3 {
            assert_eq!(find(&mut finder).group_size(), Some(16));
        }
        let classes = [0, 1, 1, 1, 1, 1, 1, 1];
        let symmetries = finder.find_symmetries(&classes, TimeLimit::infinite()).unwrap();
        assert_eq!(symmetries.group_size(), Some(2));
    }

    #[test]
    fn empty_graphs() {
        let graph = tests::empty_graph(0);
        let symmetries = find(&mut SymmetryFinder::new(&graph));
        assert!(symmetries.equivalence_classes.is_empty());
        assert_eq!(symmetries.group_size(), Some(1));

        let graph = tests::empty_graph(1);
        let symmetries = find(&mut SymmetryFinder::new(&graph));
        assert_eq!(symmetries.equivalence_classes, [0]);
        assert!(symmetries.group_size_factors.is_empty());
    }

    #[test]
    fn invalid_classes() {
        let graph = tests::path_graph(4);
        let mut finder = SymmetryFinder::new(&graph);
        let err = finder.find_symmetries(&[0, 0, 0], TimeLimit::infinite()).unwrap_err();
        assert_eq!(err, InvalidClassesError { expected: 4, actual: 3 });
    }

    #[test]
    fn interrupted_before_the_search() {
        let graph = tests::petersen_graph();
        let mut finder = SymmetryFinder::new(&graph);
        let interrupt = Arc::new(AtomicBool::new(true));
        let time_limit = TimeLimit::infinite().with_interrupt(interrupt);
        let symmetries = finder.find_symmetries(&[0; 10], time_limit).unwrap();
        assert_eq!(symmetries.status, SearchStatus::DeadlineExceeded);
        assert_eq!(symmetries.equivalence_classes, (0..10).collect::<Vec<_>>());
        assert!(symmetries.generators.is_empty());

        // The finder is still usable.
        assert_eq!(find(&mut finder).group_size(), Some(120));
    }

    #[test]
    fn interrupted_during_the_search() {
        let graph = tests::cycle_graph(12);
        let arcs = undirected_arcs(&graph);
        for limit in [1e-7, 3e-7, 1e-6, 3e-6] {
            let mut finder = SymmetryFinder::new(&graph);
            let time_limit = TimeLimit::infinite().with_deterministic_limit(limit);
            let symmetries = finder.find_symmetries(&[0; 12], time_limit).unwrap();
            check_generators(&arcs, &symmetries);
            // The classes are exactly the orbits of the generators.
            let mut merger = DisjointSetMerger::new(12);
            for generator in &symmetries.generators {
                for cycle in generator.cycles() {
                    for pair in cycle.windows(2) {
                        merger.merge_parts_of(pair[0], pair[1]);
                    }
                }
            }
            let mut classes = vec![];
            merger.fill_equivalence_classes(&mut classes);
            assert_eq!(classes, symmetries.equivalence_classes);
            if symmetries.is_complete() {
                assert_eq!(symmetries.group_size(), Some(24));
            }
            assert_eq!(find(&mut finder).group_size(), Some(24));
        }
    }
}
