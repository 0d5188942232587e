use super::error::{Result, SimilarityError};
use super::matching::{cosine_similarity, match_top_n, match_top_n_par, unit, Matched};
use super::table::EmbeddingTable;
use super::vocab::Vocabulary;
use serde::Serialize;
use std::fmt::Display;
use std::ops::Deref;
use std::time::Instant;

/// How a similarity query is ranked and cut.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SearchOptions {
    pub top_n: usize,
    /// Drop the query token's own row from the ranking.
    pub exclude_self: bool,
    /// Rows per parallel shard; `None` scans sequentially.
    pub shard_rows: Option<usize>,
}

impl SearchOptions {
    pub fn new(top_n: usize) -> Self {
        Self {
            top_n,
            exclude_self: false,
            shard_rows: None,
        }
    }

    pub fn exclude_self(mut self, exclude_self: bool) -> Self {
        self.exclude_self = exclude_self;
        self
    }

    pub fn parallel(mut self, shard_rows: usize) -> Self {
        self.shard_rows = Some(shard_rows);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Similar {
    pub token: String,
    pub score: f32,
}

impl Display for Similar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:.6}", self.token, self.score)
    }
}

/// Ranked query result, best first.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SimilarList(pub Vec<Similar>);

impl Deref for SimilarList {
    type Target = [Similar];

    fn deref(&self) -> &[Similar] {
        &self.0
    }
}

impl Display for SimilarList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for similar in self.0.iter() {
            writeln!(f, "{}", similar)?;
        }
        Ok(())
    }
}

/// A vocabulary and its embedding table, immutable once built.
#[derive(Clone, Debug, Default)]
pub struct KeyedVectors {
    vocab: Vocabulary,
    table: EmbeddingTable,
}

impl KeyedVectors {
    pub fn new(vocab: Vocabulary, table: EmbeddingTable) -> Result<Self> {
        if vocab.len() != table.len() {
            return Err(SimilarityError::SizeMismatch {
                tokens: vocab.len(),
                rows: table.len(),
            });
        }
        Ok(Self { vocab, table })
    }

    pub fn from_pairs<I, S>(dim: usize, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let (tokens, rows): (Vec<S>, Vec<Vec<f32>>) = pairs.into_iter().unzip();
        Self::new(
            Vocabulary::from_tokens(tokens)?,
            EmbeddingTable::from_rows(dim, rows)?,
        )
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn table(&self) -> &EmbeddingTable {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.table.dim()
    }

    pub fn vector(&self, token: &str) -> Result<&[f32]> {
        self.table.row(self.vocab.id_of(token)?)
    }

    /// Top `top_n` tokens by cosine similarity to `token`, self included.
    pub fn most_similar(&self, token: &str, top_n: usize) -> Result<SimilarList> {
        self.most_similar_with(token, &SearchOptions::new(top_n))
    }

    pub fn most_similar_with(&self, token: &str, options: &SearchOptions) -> Result<SimilarList> {
        let id = self.vocab.id_of(token)?;
        let query = unit(self.table.row(id)?)?;
        let exclude = if options.exclude_self { vec![id] } else { vec![] };
        self.rank(&query, options, &exclude)
    }

    pub fn most_similar_to_vector(&self, vector: &[f32], top_n: usize) -> Result<SimilarList> {
        self.most_similar_to_vector_with(vector, &SearchOptions::new(top_n))
    }

    /// `exclude_self` has no meaning for a raw vector and is ignored.
    pub fn most_similar_to_vector_with(
        &self,
        vector: &[f32],
        options: &SearchOptions,
    ) -> Result<SimilarList> {
        let query = self.unit_query(vector)?;
        self.rank(&query, options, &[])
    }

    /// Cosine similarity between two vocabulary tokens.
    pub fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        cosine_similarity(self.vector(a)?, self.vector(b)?)
    }

    /// Analogy query: ranks rows against the mean of the unit vectors of
    /// `positive` minus those of `negative`. Input tokens never appear in the
    /// result.
    pub fn most_similar_combination(
        &self,
        positive: &[&str],
        negative: &[&str],
        options: &SearchOptions,
    ) -> Result<SimilarList> {
        let weighted = positive
            .iter()
            .map(|token| (token, 1.0f32))
            .chain(negative.iter().map(|token| (token, -1.0f32)));

        let mut mean = vec![0.0f32; self.dim()];
        let mut exclude = Vec::with_capacity(positive.len() + negative.len());
        for (token, weight) in weighted {
            let id = self.vocab.id_of(token)?;
            for (acc, x) in mean.iter_mut().zip(unit(self.table.row(id)?)?) {
                *acc += weight * x;
            }
            exclude.push(id);
        }
        let count = exclude.len().max(1) as f32;
        mean.iter_mut().for_each(|x| *x /= count);

        let query = unit(&mean)?;
        self.rank(&query, options, &exclude)
    }

    fn unit_query(&self, vector: &[f32]) -> Result<Vec<f32>> {
        if vector.len() != self.dim() {
            return Err(SimilarityError::DimensionMismatch {
                expected: self.dim(),
                actual: vector.len(),
            });
        }
        unit(vector)
    }

    fn rank(&self, query: &[f32], options: &SearchOptions, exclude: &[usize]) -> Result<SimilarList> {
        let start = Instant::now();
        let top_n = match options.shard_rows {
            Some(shard_rows) => match_top_n_par(&self.table, query, options.top_n, exclude, shard_rows),
            None => match_top_n(&self.table, query, options.top_n, exclude),
        };
        let list = top_n
            .into_iter()
            .map(|Matched { index, similarity }| {
                Ok(Similar {
                    token: self.vocab.token_of(index)?.to_string(),
                    score: similarity,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "ranked {} rows in {}s, returned {}",
            self.table.len(),
            start.elapsed().as_secs_f64(),
            list.len()
        );
        Ok(SimilarList(list))
    }
}
