use petgraph::graph::{NodeIndex, UnGraph};
use std::cmp::Ordering;
use std::fs::File;
use std::io::BufRead;
use std::num::ParseIntError;
use std::path::Path;
use thiserror::Error;

use crate::io::is_comment;

#[derive(Error, Debug)]
pub enum ReadMetisError {
    #[error("missing header")]
    MissingHeader,
    #[error("invalid header (expected '(n) (m)', got {0})")]
    WrongHeader(String),
    #[error("wrong n given in header (expected {expected}, got {actual})")]
    WrongN { expected: usize, actual: usize },
    #[error("wrong m given in header (expected {expected}, got {actual})")]
    WrongM { expected: usize, actual: usize },
    #[error("found zero index (indices must be at least 1)")]
    ZeroIndex,
    #[error("found index {index} larger than n = {n}")]
    IndexOutOfRange { index: usize, n: usize },
    #[error("number of reverse edges not matching (expected {expected}, got {actual})")]
    NumReverseEdgesNotMatching { expected: usize, actual: usize },
    #[error("found self loop at node {0}")]
    SelfLoop(usize),
    #[error("parse error")]
    ParseInt(#[from] ParseIntError),
    #[error("io error")]
    IoError(#[from] std::io::Error),
}

/// Implements a subset of the metis graph format. See [metis].
///
/// The format supports undirected, unweighted, loop-less graphs and specifies
/// the number of nodes and the number edges in its header. The vertices indices
/// start with 1. Every edge is listed at both of its endpoints.
///
/// The restrictions are
/// + does only allow '(n) (m)' as header
/// + does not support vertex and edge weights
///
/// [metis]: https://people.sc.fsu.edu/~jburkardt/data/metis_graph/metis_graph.html
pub fn read_metis<P>(path: P) -> Result<UnGraph<(), ()>, ReadMetisError>
where
    P: AsRef<Path>,
{
    let file = File::open(path)?;
    let mut lines = std::io::BufReader::new(file).lines();

    let first_line = loop {
        let line = lines.next().ok_or(ReadMetisError::MissingHeader)??;
        if !is_comment(&line) {
            break line;
        }
    };

    let (n, m) = {
        let err = || ReadMetisError::WrongHeader(first_line.clone());
        let mut iter = first_line.split_ascii_whitespace();
        let n: usize = iter.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        let m: usize = iter.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        if iter.next().is_some() || n >= u32::MAX as usize || m >= u32::MAX as usize {
            return Err(err());
        }
        (n, m)
    };

    let mut graph = UnGraph::with_capacity(n, m);
    for _ in 0..n {
        graph.add_node(());
    }

    let mut m_reverse = 0;
    let mut u = 1;
    for line in lines {
        let line = line?;
        if is_comment(&line) {
            continue;
        }
        for v in line.split_ascii_whitespace() {
            let v: usize = v.parse()?;
            if v == 0 {
                return Err(ReadMetisError::ZeroIndex);
            }
            if v > n || u > n {
                return Err(ReadMetisError::IndexOutOfRange { index: v.max(u), n });
            }
            let (u, v) = (NodeIndex::new(u - 1), NodeIndex::new(v - 1));
            match u.cmp(&v) {
                Ordering::Less => {
                    graph.add_edge(u, v, ());
                }
                Ordering::Equal => return Err(ReadMetisError::SelfLoop(u.index() + 1)),
                Ordering::Greater => {
                    m_reverse += 1;
                }
            }
        }
        u += 1;
    }

    let n_actual = u - 1;
    if n_actual != n {
        return Err(ReadMetisError::WrongN { actual: n_actual, expected: n });
    }
    if graph.edge_count() != m {
        return Err(ReadMetisError::WrongM { actual: graph.edge_count(), expected: m });
    }
    if m_reverse != m {
        return Err(ReadMetisError::NumReverseEdgesNotMatching { actual: m_reverse, expected: m });
    }

    Ok(graph)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::temp_file;

    #[test]
    fn triangle_with_pendant() {
        let path = temp_file("triangle.graph", "% comment\n4 4\n2 3\n1 3\n1 2 4\n3\n");
        let graph = read_metis(&path).unwrap();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert!(graph.find_edge(2.into(), 3.into()).is_some());
    }

    #[test]
    fn isolated_nodes_have_empty_lines() {
        let path = temp_file("isolated.graph", "3 1\n2\n1\n\n");
        let graph = read_metis(&path).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn errors() {
        let cases = [
            ("empty.graph", ""),
            ("header.graph", "2 1 011\n2\n1\n"),
            ("zero.graph", "2 1\n0\n1\n"),
            ("range.graph", "2 1\n3\n1\n"),
            ("loop.graph", "2 1\n1\n\n"),
            ("n.graph", "3 1\n2\n1\n"),
            ("m.graph", "2 2\n2\n1\n"),
            ("reverse.graph", "2 1\n2\n\n"),
        ];
        let results: Vec<_> = cases.iter().map(|(name, content)| read_metis(temp_file(name, content))).collect();
        assert!(matches!(results[0], Err(ReadMetisError::MissingHeader)));
        assert!(matches!(results[1], Err(ReadMetisError::WrongHeader(_))));
        assert!(matches!(results[2], Err(ReadMetisError::ZeroIndex)));
        assert!(matches!(results[3], Err(ReadMetisError::IndexOutOfRange { index: 3, n: 2 })));
        assert!(matches!(results[4], Err(ReadMetisError::SelfLoop(1))));
        assert!(matches!(results[5], Err(ReadMetisError::WrongN { expected: 3, actual: 2 })));
        assert!(matches!(results[6], Err(ReadMetisError::WrongM { expected: 2, actual: 1 })));
        assert!(matches!(results[7], Err(ReadMetisError::NumReverseEdgesNotMatching { expected: 1, actual: 0 })));
    }
}
