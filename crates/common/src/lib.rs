//! Readers for graph and node class files.

pub mod io;
