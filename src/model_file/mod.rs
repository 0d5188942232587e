pub mod binary;
pub mod text;

use crate::vectors::KeyedVectors;
use anyhow::Result;
use std::{fmt::Display, path::PathBuf};

use self::{binary::parse_binary, text::parse_text};

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum FileType {
    Binary,
    Text,
}

impl Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileType::Binary => write!(f, "BINARY"),
            FileType::Text => write!(f, "TEXT"),
        }
    }
}

/// A word2vec-layout vectors file waiting to be read.
#[derive(Clone, Debug)]
pub struct ModelFile {
    pub path: PathBuf,
    pub file_type: FileType,
}

impl Display for ModelFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {{ path: {} }}",
            self.file_type,
            self.path.display()
        )
    }
}

pub fn match_file(path: PathBuf) -> ModelFile {
    let file_type = match path.extension().and_then(|e| e.to_str()) {
        Some("bin") => FileType::Binary,
        _ => FileType::Text,
    };
    ModelFile { path, file_type }
}

impl From<ModelFile> for Result<KeyedVectors> {
    fn from(file: ModelFile) -> Result<KeyedVectors> {
        match file.file_type {
            FileType::Binary => parse_binary(file),
            FileType::Text => parse_text(file),
        }
    }
}

/// Parses a `<count> <dim>` header line.
fn parse_header(line: &str) -> Option<(usize, usize)> {
    let mut fields = line.split_whitespace();
    let count = fields.next()?.parse().ok()?;
    let dim = fields.next()?.parse().ok()?;
    match fields.next() {
        Some(_) => None,
        None => Some((count, dim)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_type_follows_extension() {
        assert_eq!(match_file(PathBuf::from("vectors.bin")).file_type, FileType::Binary);
        assert_eq!(match_file(PathBuf::from("vectors.txt")).file_type, FileType::Text);
        assert_eq!(match_file(PathBuf::from("vectors")).file_type, FileType::Text);
    }

    #[test]
    fn header_needs_exactly_two_counts() {
        assert_eq!(parse_header("10000 300"), Some((10000, 300)));
        assert_eq!(parse_header(" 3 2 \n"), Some((3, 2)));
        assert_eq!(parse_header("a 0.5"), None);
        assert_eq!(parse_header("3 2 1"), None);
        assert_eq!(parse_header("3"), None);
    }
}
