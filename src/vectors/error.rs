use thiserror::Error;

/// Failures of a vocabulary lookup or a similarity query.
///
/// A query that fails returns none of its partial results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimilarityError {
    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("id {id} out of range for vocabulary of {len}")]
    OutOfRange { id: usize, len: usize },

    #[error("vector has zero norm, direction undefined")]
    DegenerateVector,

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("duplicate token: {0}")]
    DuplicateToken(String),

    #[error("row {row} has a non-finite component")]
    NonFinite { row: usize },

    #[error("vocabulary has {tokens} tokens but table has {rows} rows")]
    SizeMismatch { tokens: usize, rows: usize },
}

pub type Result<T> = std::result::Result<T, SimilarityError>;
