use super::error::{Result, SimilarityError};
use super::table::EmbeddingTable;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::ops::Range;

/// A scored table row.
///
/// Ordering is total: higher similarity is greater, and on equal similarity
/// the lower row index is greater, so a descending sort ranks ties by id.
#[derive(Copy, Clone, Debug)]
pub struct Matched {
    pub index: usize,
    pub similarity: f32,
}

impl PartialOrd for Matched {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Matched {
    fn cmp(&self, other: &Self) -> Ordering {
        self.similarity
            .total_cmp(&other.similarity)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialEq for Matched {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Matched {}

/// Scores every row not in `exclude` and keeps the best `n`, best first.
///
/// `query` must already be unit length and of the table's dimension.
pub fn match_top_n(table: &EmbeddingTable, query: &[f32], n: usize, exclude: &[usize]) -> Vec<Matched> {
    if n == 0 {
        return Vec::new();
    }
    let mut top_n = score_range(table, query, 0..table.len(), exclude);
    select_top(&mut top_n, n);
    debug!("top_n: {:?}", top_n);

    top_n
}

/// Same ranking as [`match_top_n`], computed over shards of `shard_rows`
/// rows in parallel and merged.
pub fn match_top_n_par(
    table: &EmbeddingTable,
    query: &[f32],
    n: usize,
    exclude: &[usize],
    shard_rows: usize,
) -> Vec<Matched> {
    if n == 0 {
        return Vec::new();
    }
    let shard_rows = shard_rows.max(1);
    let len = table.len();
    let shards = (0..len)
        .step_by(shard_rows)
        .map(|start| start..(start + shard_rows).min(len))
        .collect::<Vec<_>>();
    debug!("parallel match over {} shards of {} rows", shards.len(), shard_rows);

    let mut top_n = shards
        .into_par_iter()
        .flat_map_iter(|range| {
            let mut local = score_range(table, query, range, exclude);
            select_top(&mut local, n);
            local
        })
        .collect::<Vec<_>>();
    select_top(&mut top_n, n);
    debug!("top_n: {:?}", top_n);

    top_n
}

fn score_range(
    table: &EmbeddingTable,
    query: &[f32],
    range: Range<usize>,
    exclude: &[usize],
) -> Vec<Matched> {
    range
        .filter(|index| !exclude.contains(index))
        .map(|index| Matched {
            index,
            similarity: unit_similarity(query, table.row_unchecked(index)),
        })
        .collect()
}

fn select_top(matched: &mut Vec<Matched>, n: usize) {
    if matched.len() > n {
        matched.select_nth_unstable_by(n - 1, |a, b| b.cmp(a));
        matched.truncate(n);
    }
    matched.sort_unstable_by(|a, b| b.cmp(a));
}

// `unit_query` is unit length; a zero row has no direction and scores 0.
fn unit_similarity(unit_query: &[f32], row: &[f32]) -> f32 {
    let mag = magnitude(row);
    if mag == 0.0 {
        return 0.0;
    }
    unit_query.iter().zip(row.iter()).map(|(q, r)| q * (r / mag)).sum()
}

pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn magnitude(a: &[f32]) -> f32 {
    a.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// `v / ||v||`, failing when the norm is zero.
pub fn unit(v: &[f32]) -> Result<Vec<f32>> {
    let mag = magnitude(v);
    if mag == 0.0 || !mag.is_finite() {
        return Err(SimilarityError::DegenerateVector);
    }
    Ok(v.iter().map(|x| x / mag).collect())
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(dot_product(&unit(a)?, &unit(b)?))
}
