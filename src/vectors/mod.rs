// A vocabulary maps tokens to contiguous ids 0..N, and row i of the embedding
// table is the vector of id i. Both are built once and only read afterwards,
// so a `KeyedVectors` can be shared between threads behind an `Arc` without
// locking.

pub mod error;
pub mod keyed;
pub mod matching;
pub mod table;
pub mod vocab;

pub use error::{Result, SimilarityError};
pub use keyed::{KeyedVectors, SearchOptions, Similar, SimilarList};
pub use matching::cosine_similarity;
pub use table::EmbeddingTable;
pub use vocab::Vocabulary;
