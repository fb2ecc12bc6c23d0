use std::fs::File;
use std::io::BufRead;
use std::num::ParseIntError;
use std::path::Path;
use thiserror::Error;

use crate::io::is_comment;

#[derive(Error, Debug)]
pub enum ReadClassesError {
    #[error("invalid line {line} (expected a single class id, got {content})")]
    InvalidLine { line: usize, content: String },
    #[error("parse int error")]
    ParseInt(#[from] ParseIntError),
    #[error("io error")]
    IoError(#[from] std::io::Error),
}

/// Reads one class id per line, the `i`-th id belongs to node `i`. Lines
/// starting with `#` or `%` are skipped.
pub fn read_classes<P>(path: P) -> Result<Vec<usize>, ReadClassesError>
where
    P: AsRef<Path>,
{
    let file = File::open(path)?;
    let mut classes = vec![];
    for (i, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if is_comment(trimmed) {
            continue;
        }
        let mut tokens = trimmed.split_ascii_whitespace();
        let (Some(class), None) = (tokens.next(), tokens.next()) else {
            return Err(ReadClassesError::InvalidLine { line: i + 1, content: line });
        };
        classes.push(class.parse()?);
    }
    Ok(classes)
}
