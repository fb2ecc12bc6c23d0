mod classes;
mod edge_list;
mod metis;

use clap::ValueEnum;
pub use classes::{read_classes, ReadClassesError};
pub use edge_list::{read_edge_list, read_undirected_edge_list, ReadEdgeListError};
pub use metis::{read_metis, ReadMetisError};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum GraphFileType {
    Metis,
    EdgeList,
}

/// Lines starting with one of these characters are ignored by the line based formats.
pub(crate) fn is_comment(line: &str) -> bool {
    line.starts_with('%') || line.starts_with('#')
}

#[cfg(test)]
pub(crate) fn temp_file(name: &str, content: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("common-io-{}-{name}", std::process::id()));
    std::fs::write(&path, content).unwrap();
    path
}
