//! candle `Tensor` entry points. Tensors are copied to host `usize` data;
//! negative values are rejected rather than wrapped.

use candle_core::{DType, Tensor};

use crate::error::MetricError;
use crate::metrics::error_rate::{BatchScore, ErrorRate};
use crate::types::{TokenBatch, TokenId};

impl TokenBatch {
    /// Rank-2 integer tensor in its stored orientation.
    pub fn from_tensor(tensor: &Tensor) -> Result<Self, MetricError> {
        if tensor.rank() != 2 {
            return Err(MetricError::invalid_input(format!(
                "token id tensor must have rank 2 (got shape {:?}); probabilities must be reduced to ids first",
                tensor.dims()
            )));
        }
        let rows = tensor
            .to_dtype(DType::I64)
            .and_then(|t| t.to_vec2::<i64>())
            .map_err(|e| MetricError::runtime("token tensor to_vec2", e))?;
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(to_index).collect::<Result<Vec<TokenId>, _>>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rows(rows)
    }
}

/// Rank-1 integer tensor of valid lengths.
pub fn lengths_from_tensor(tensor: &Tensor) -> Result<Vec<usize>, MetricError> {
    if tensor.rank() != 1 {
        return Err(MetricError::invalid_input(format!(
            "length tensor must have rank 1 (got shape {:?})",
            tensor.dims()
        )));
    }
    tensor
        .to_dtype(DType::I64)
        .and_then(|t| t.to_vec1::<i64>())
        .map_err(|e| MetricError::runtime("length tensor to_vec1", e))?
        .into_iter()
        .map(to_index)
        .collect()
}

fn to_index(value: i64) -> Result<usize, MetricError> {
    usize::try_from(value)
        .map_err(|_| MetricError::invalid_input(format!("negative id or length {value}")))
}

impl ErrorRate {
    /// [`ErrorRate::update`] for tensors: `predictions` `[B, T]` or `[T, B]`
    /// per the configured batch dimension, `targets` `[B, T]`, lengths `[B]`.
    pub fn update_tensors(
        &mut self,
        predictions: &Tensor,
        prediction_lengths: Option<&Tensor>,
        targets: &Tensor,
        target_lengths: &Tensor,
    ) -> Result<BatchScore, MetricError> {
        let predictions = TokenBatch::from_tensor(predictions)?;
        let prediction_lengths = prediction_lengths.map(lengths_from_tensor).transpose()?;
        let targets = TokenBatch::from_tensor(targets)?;
        let target_lengths = lengths_from_tensor(target_lengths)?;
        self.update(
            &predictions,
            prediction_lengths.as_deref(),
            &targets,
            &target_lengths,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use candle_core::Device;

    use super::*;
    use crate::config::ErrorRateConfig;
    use crate::decoding::codec::CharCodec;
    use crate::metrics::state::AccumulatorState;

    #[test]
    fn from_tensor_reads_rows() {
        let t = Tensor::new(&[[1u32, 2, 3], [4, 5, 6]], &Device::Cpu).unwrap();
        let batch = TokenBatch::from_tensor(&t).unwrap();
        assert_eq!(batch.dims(), (2, 3));
        assert_eq!(batch, TokenBatch::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap());
    }

    #[test]
    fn from_tensor_rejects_wrong_rank() {
        let t = Tensor::zeros((2, 3, 4), DType::F32, &Device::Cpu).unwrap();
        assert!(matches!(
            TokenBatch::from_tensor(&t),
            Err(MetricError::InvalidInput { .. })
        ));
    }

    #[test]
    fn negative_values_are_rejected() {
        let t = Tensor::new(&[3i64, -1], &Device::Cpu).unwrap();
        assert!(lengths_from_tensor(&t).is_err());
        let ids = Tensor::new(&[[0i64, -2]], &Device::Cpu).unwrap();
        assert!(TokenBatch::from_tensor(&ids).is_err());
    }

    #[test]
    fn update_tensors_time_major() {
        // a=0 b=1 c=2 |=3 blank=4
        let codec = Arc::new(CharCodec::from_chars("abc|".chars()));
        let config = ErrorRateConfig {
            use_cer: true,
            batch_dim_index: 1,
            log_prediction: false,
            ..ErrorRateConfig::default()
        };
        let mut metric = ErrorRate::new(codec, config).unwrap();
        // [T=4, B=2]: sample0 = a a b blank, sample1 = c blank c c
        let predictions =
            Tensor::new(&[[0u32, 2], [0, 4], [1, 2], [4, 2]], &Device::Cpu).unwrap();
        let prediction_lengths = Tensor::new(&[4u32, 3], &Device::Cpu).unwrap();
        let targets = Tensor::new(&[[0u32, 1, 0], [2, 2, 0]], &Device::Cpu).unwrap();
        let target_lengths = Tensor::new(&[2u32, 3], &Device::Cpu).unwrap();

        let score = metric
            .update_tensors(&predictions, Some(&prediction_lengths), &targets, &target_lengths)
            .unwrap();
        // "ab" vs "ab", "cc" vs "cca"
        assert_eq!(score.total, AccumulatorState::new(1, 5));
        assert_eq!(metric.state(), AccumulatorState::new(1, 5));
    }
}
