use super::error::{Result, SimilarityError};

/// N x D matrix stored row-major; row i belongs to vocabulary id i.
#[derive(Clone, Debug, Default)]
pub struct EmbeddingTable {
    dim: usize,
    rows: usize,
    data: Vec<f32>,
}

impl EmbeddingTable {
    pub fn from_rows<I, R>(dim: usize, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[f32]>,
    {
        let mut table = Self {
            dim,
            rows: 0,
            data: Vec::new(),
        };
        for row in rows {
            let row = row.as_ref();
            if row.len() != dim {
                return Err(SimilarityError::DimensionMismatch {
                    expected: dim,
                    actual: row.len(),
                });
            }
            if row.iter().any(|x| !x.is_finite()) {
                return Err(SimilarityError::NonFinite { row: table.rows });
            }
            table.data.extend_from_slice(row);
            table.rows += 1;
        }
        Ok(table)
    }

    /// Builds a table from `rows * dim` concatenated values.
    pub fn from_flat(dim: usize, rows: usize, data: Vec<f32>) -> Result<Self> {
        let expected = rows.checked_mul(dim).unwrap_or(usize::MAX);
        if data.len() != expected {
            return Err(SimilarityError::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }
        if let Some(at) = data.iter().position(|x| !x.is_finite()) {
            return Err(SimilarityError::NonFinite { row: at / dim });
        }
        Ok(Self { dim, rows, data })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row(&self, id: usize) -> Result<&[f32]> {
        if id >= self.rows {
            return Err(SimilarityError::OutOfRange {
                id,
                len: self.rows,
            });
        }
        Ok(self.row_unchecked(id))
    }

    // caller guarantees id < rows
    pub(crate) fn row_unchecked(&self, id: usize) -> &[f32] {
        let start = id * self.dim;
        &self.data[start..start + self.dim]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        (0..self.rows).map(move |id| self.row_unchecked(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_keep_their_order() {
        let table = EmbeddingTable::from_rows(2, [[1.0f32, 0.0], [0.0, 1.0], [1.0, 1.0]]).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.dim(), 2);
        assert_eq!(table.row(2).unwrap(), &[1.0f32, 1.0][..]);
        assert_eq!(table.rows().count(), 3);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows: Vec<Vec<f32>> = vec![vec![1.0, 0.0], vec![1.0]];
        assert_eq!(
            EmbeddingTable::from_rows(2, rows).unwrap_err(),
            SimilarityError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn flat_length_must_match_shape() {
        assert!(EmbeddingTable::from_flat(2, 2, vec![0.0; 4]).is_ok());
        assert!(EmbeddingTable::from_flat(2, 2, vec![0.0; 5]).is_err());
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let rows: Vec<Vec<f32>> = vec![vec![1.0, 0.0], vec![f32::NAN, 0.0]];
        assert_eq!(
            EmbeddingTable::from_rows(2, rows).unwrap_err(),
            SimilarityError::NonFinite { row: 1 }
        );
        assert_eq!(
            EmbeddingTable::from_flat(2, 2, vec![1.0, 0.0, 0.0, f32::INFINITY]).unwrap_err(),
            SimilarityError::NonFinite { row: 1 }
        );
    }

    #[test]
    fn row_past_end_is_out_of_range() {
        let table = EmbeddingTable::from_rows(1, [[1.0f32]]).unwrap();
        assert_eq!(
            table.row(1).unwrap_err(),
            SimilarityError::OutOfRange { id: 1, len: 1 }
        );
    }

    #[test]
    fn zero_dimension_rows() {
        let rows: Vec<Vec<f32>> = vec![vec![], vec![]];
        let table = EmbeddingTable::from_rows(0, rows).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.row(1).unwrap().is_empty());
    }
}
