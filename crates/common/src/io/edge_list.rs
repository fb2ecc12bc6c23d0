use petgraph::graph::{DiGraph, UnGraph};
use petgraph::EdgeType;
use petgraph::Graph;
use std::fs::File;
use std::io::BufRead;
use std::num::ParseIntError;
use std::path::Path;
use thiserror::Error;

use crate::io::is_comment;

#[derive(Error, Debug)]
pub enum ReadEdgeListError {
    #[error("invalid line (got {0})")]
    InvalidLine(String),
    #[error("parse int error")]
    ParseInt(#[from] ParseIntError),
    #[error("io error")]
    IoError(#[from] std::io::Error),
}

/// Reads a directed graph with one arc `u v` per line. Node indices start
/// with 0, the number of nodes is one more than the largest index. Empty lines
/// and lines starting with `#` or `%` are skipped.
pub fn read_edge_list<P>(path: P) -> Result<DiGraph<(), ()>, ReadEdgeListError>
where
    P: AsRef<Path>,
{
    read(path)
}

/// Reads an undirected graph in the format of [read_edge_list]. Every line is one edge.
pub fn read_undirected_edge_list<P>(path: P) -> Result<UnGraph<(), ()>, ReadEdgeListError>
where
    P: AsRef<Path>,
{
    read(path)
}

fn read<P, Ty>(path: P) -> Result<Graph<(), (), Ty>, ReadEdgeListError>
where
    P: AsRef<Path>,
    Ty: EdgeType,
{
    let file = File::open(path)?;

    let mut n = 0;
    let mut edges = vec![];
    for line in std::io::BufReader::new(file).lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || is_comment(trimmed) {
            continue;
        }
        let mut tokens = trimmed.split_ascii_whitespace();
        let (Some(a), Some(b), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(ReadEdgeListError::InvalidLine(line));
        };

        let u: u32 = a.parse()?;
        let v: u32 = b.parse()?;
        if u == u32::MAX || v == u32::MAX {
            return Err(ReadEdgeListError::InvalidLine(line));
        }
        edges.push((u, v));
        n = n.max(u + 1).max(v + 1);
    }

    let mut graph = Graph::with_capacity(n as usize, edges.len());
    for _ in 0..n {
        graph.add_node(());
    }
    graph.extend_with_edges(edges);
    Ok(graph)
}
