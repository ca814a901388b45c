use crate::error::MetricError;

/// Index into a fixed vocabulary. The blank id is one past the last valid id.
pub type TokenId = usize;

/// Which axis of a prediction batch indexes samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchDim {
    /// `[Batch, Time]`
    #[default]
    First,
    /// `[Time, Batch]`
    Second,
}

impl BatchDim {
    pub fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

impl TryFrom<usize> for BatchDim {
    type Error = MetricError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Self::First),
            1 => Ok(Self::Second),
            other => Err(MetricError::invalid_input(format!(
                "batch_dim_index must be 0 or 1, got {other}"
            ))),
        }
    }
}

/// Unit a decoded string is split into before edit distance is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorUnit {
    /// Whitespace-delimited words (WER).
    Word,
    /// Unicode scalar values (CER).
    Character,
}

impl ErrorUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Character => "character",
        }
    }
}

/// Rectangular, row-major block of token ids.
///
/// The batch does not know its own orientation; callers pass a [`BatchDim`]
/// when reading samples so the same storage can hold `[B, T]` or `[T, B]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBatch {
    ids: Vec<TokenId>,
    rows: usize,
    cols: usize,
}

impl TokenBatch {
    pub fn from_flat(ids: Vec<TokenId>, rows: usize, cols: usize) -> Result<Self, MetricError> {
        if ids.len() != rows * cols {
            return Err(MetricError::shape_mismatch("flat token buffer", rows * cols, ids.len()));
        }
        Ok(Self { ids, rows, cols })
    }

    /// Builds a batch from equally sized rows.
    pub fn from_rows(rows: Vec<Vec<TokenId>>) -> Result<Self, MetricError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let n_rows = rows.len();
        let mut ids = Vec::with_capacity(n_rows * cols);
        for row in rows {
            if row.len() != cols {
                return Err(MetricError::shape_mismatch("batch row", cols, row.len()));
            }
            ids.extend(row);
        }
        Ok(Self {
            ids,
            rows: n_rows,
            cols,
        })
    }

    /// Right-pads ragged rows with `pad_id` up to the longest row.
    pub fn padded(rows: &[Vec<TokenId>], pad_id: TokenId) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut ids = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            ids.extend_from_slice(row);
            ids.resize(ids.len() + cols - row.len(), pad_id);
        }
        Self {
            ids,
            rows: rows.len(),
            cols,
        }
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn batch_size(&self, batch_dim: BatchDim) -> usize {
        match batch_dim {
            BatchDim::First => self.rows,
            BatchDim::Second => self.cols,
        }
    }

    /// Declared (padded) sequence capacity along the time axis.
    pub fn max_len(&self, batch_dim: BatchDim) -> usize {
        match batch_dim {
            BatchDim::First => self.cols,
            BatchDim::Second => self.rows,
        }
    }

    /// First `len` ids of sample `index`. Positions past `len` are never read.
    pub(crate) fn sample_prefix(&self, index: usize, len: usize, batch_dim: BatchDim) -> Vec<TokenId> {
        match batch_dim {
            BatchDim::First => {
                let start = index * self.cols;
                self.ids[start..start + len].to_vec()
            }
            BatchDim::Second => (0..len).map(|t| self.ids[t * self.cols + index]).collect(),
        }
    }
}

/// Decoded hypothesis for one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hypothesis {
    pub text: String,
    /// Ids after folding and blank removal, i.e. what was fed to the codec.
    pub token_ids: Vec<TokenId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_dim_from_index() {
        assert_eq!(BatchDim::try_from(0).unwrap(), BatchDim::First);
        assert_eq!(BatchDim::try_from(1).unwrap(), BatchDim::Second);
        assert!(BatchDim::try_from(2).is_err());
        assert_eq!(BatchDim::Second.index(), 1);
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = TokenBatch::from_rows(vec![vec![1, 2], vec![3]]).unwrap_err();
        assert!(matches!(err, MetricError::ShapeMismatch { .. }));
    }

    #[test]
    fn from_flat_checks_size() {
        assert!(TokenBatch::from_flat(vec![1, 2, 3], 2, 2).is_err());
        let batch = TokenBatch::from_flat(vec![1, 2, 3, 4], 2, 2).unwrap();
        assert_eq!(batch.dims(), (2, 2));
    }

    #[test]
    fn padded_fills_short_rows() {
        let batch = TokenBatch::padded(&[vec![1], vec![2, 3, 4]], 9);
        assert_eq!(batch.dims(), (2, 3));
        assert_eq!(batch.sample_prefix(0, 3, BatchDim::First), vec![1, 9, 9]);
    }

    #[test]
    fn sample_prefix_reads_both_orientations() {
        // [[1, 2, 3], [4, 5, 6]] read batch-first vs time-first
        let batch = TokenBatch::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        assert_eq!(batch.batch_size(BatchDim::First), 2);
        assert_eq!(batch.max_len(BatchDim::First), 3);
        assert_eq!(batch.sample_prefix(1, 2, BatchDim::First), vec![4, 5]);

        assert_eq!(batch.batch_size(BatchDim::Second), 3);
        assert_eq!(batch.max_len(BatchDim::Second), 2);
        assert_eq!(batch.sample_prefix(2, 2, BatchDim::Second), vec![3, 6]);
    }

    #[test]
    fn empty_batch() {
        let batch = TokenBatch::from_rows(Vec::new()).unwrap();
        assert_eq!(batch.dims(), (0, 0));
        assert_eq!(batch.batch_size(BatchDim::First), 0);
    }
}
