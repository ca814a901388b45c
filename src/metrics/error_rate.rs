use std::sync::Arc;

use serde::Serialize;

use crate::config::ErrorRateConfig;
use crate::decoding::ctc::decode_references;
use crate::error::MetricError;
use crate::metrics::edit_distance::{score_pair, PairScore};
use crate::metrics::state::AccumulatorState;
use crate::pipeline::defaults::CtcFoldingDecoder;
use crate::pipeline::traits::{HypothesisDecoder, StateReducer, TokenCodec};
use crate::types::{BatchDim, ErrorUnit, TokenBatch};

/// Word or character error rate accumulated over many batches.
///
/// Each worker owns one instance and feeds it only local batches. Totals
/// from several workers are combined with [`ErrorRate::merge`] or through a
/// [`StateReducer`]; the instance itself does no locking, so concurrent
/// `update` calls on one instance must be serialized by the caller.
pub struct ErrorRate {
    codec: Arc<dyn TokenCodec>,
    decoder: Box<dyn HypothesisDecoder>,
    unit: ErrorUnit,
    batch_dim: BatchDim,
    log_prediction: bool,
    fold_consecutive: bool,
    state: AccumulatorState,
}

pub(crate) struct ErrorRateParts {
    pub codec: Arc<dyn TokenCodec>,
    pub decoder: Box<dyn HypothesisDecoder>,
    pub config: ErrorRateConfig,
}

/// `(rate, distance_sum, reference_unit_count)` as floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorRateResult {
    pub rate: f64,
    pub distance_sum: f64,
    pub reference_unit_count: f64,
}

impl From<AccumulatorState> for ErrorRateResult {
    fn from(state: AccumulatorState) -> Self {
        Self {
            rate: state.rate(),
            distance_sum: state.distance_sum as f64,
            reference_unit_count: state.reference_unit_count as f64,
        }
    }
}

impl From<ErrorRateResult> for (f64, f64, f64) {
    fn from(result: ErrorRateResult) -> Self {
        (result.rate, result.distance_sum, result.reference_unit_count)
    }
}

/// What a single `update` call contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchScore {
    /// Per-sample scores in batch order.
    pub pairs: Vec<PairScore>,
    pub total: AccumulatorState,
}

impl ErrorRate {
    /// Accumulator using the plain folding CTC decoder.
    pub fn new(codec: Arc<dyn TokenCodec>, config: ErrorRateConfig) -> Result<Self, MetricError> {
        config.batch_dim()?;
        let decoder = Box::new(CtcFoldingDecoder::new(Arc::clone(&codec)));
        Ok(Self::from_parts(ErrorRateParts {
            codec,
            decoder,
            config,
        }))
    }

    pub(crate) fn from_parts(parts: ErrorRateParts) -> Self {
        let config = parts.config;
        Self {
            codec: parts.codec,
            decoder: parts.decoder,
            unit: config.unit(),
            batch_dim: config.batch_dim().unwrap_or_default(),
            log_prediction: config.log_prediction,
            fold_consecutive: config.fold_consecutive,
            state: AccumulatorState::ZERO,
        }
    }

    pub fn unit(&self) -> ErrorUnit {
        self.unit
    }

    pub fn batch_dim(&self) -> BatchDim {
        self.batch_dim
    }

    pub fn codec(&self) -> &dyn TokenCodec {
        self.codec.as_ref()
    }

    /// Decode one batch and add its totals.
    ///
    /// `targets` is always `[Batch, Time]`; `predictions` follows the
    /// configured batch dimension. On error the totals are left untouched.
    pub fn update(
        &mut self,
        predictions: &TokenBatch,
        prediction_lengths: Option<&[usize]>,
        targets: &TokenBatch,
        target_lengths: &[usize],
    ) -> Result<BatchScore, MetricError> {
        let batch_size = targets.batch_size(BatchDim::First);
        let predicted = predictions.batch_size(self.batch_dim);
        if predicted != batch_size {
            return Err(MetricError::shape_mismatch("predictions batch", batch_size, predicted));
        }

        let references = decode_references(self.codec.as_ref(), targets, target_lengths)?;
        let hypotheses = self.decoder.decode_hypotheses(
            predictions,
            prediction_lengths,
            self.batch_dim,
            self.fold_consecutive,
        )?;
        let hypotheses: Vec<String> = hypotheses.into_iter().map(|h| h.text).collect();
        self.update_decoded(&hypotheses, &references)
    }

    /// Add totals for hypotheses produced by an external decoder.
    pub fn update_decoded<H, R>(
        &mut self,
        hypotheses: &[H],
        references: &[R],
    ) -> Result<BatchScore, MetricError>
    where
        H: AsRef<str>,
        R: AsRef<str>,
    {
        if hypotheses.len() != references.len() {
            return Err(MetricError::shape_mismatch(
                "hypotheses",
                references.len(),
                hypotheses.len(),
            ));
        }

        if self.log_prediction {
            if let (Some(reference), Some(predicted)) = (references.first(), hypotheses.first()) {
                tracing::info!(
                    reference = reference.as_ref(),
                    predicted = predicted.as_ref(),
                    "error rate: sample prediction"
                );
            }
        }

        let pairs: Vec<PairScore> = hypotheses
            .iter()
            .zip(references)
            .map(|(h, r)| score_pair(h.as_ref(), r.as_ref(), self.unit))
            .collect();
        let total: AccumulatorState = pairs
            .iter()
            .map(|p| AccumulatorState::new(p.distance as u64, p.reference_units as u64))
            .sum();

        if total.reference_unit_count == 0 && !pairs.is_empty() {
            tracing::warn!(
                batch_size = pairs.len(),
                "error rate: batch has no reference units"
            );
        }

        self.state += total;
        tracing::debug!(
            unit = self.unit.as_str(),
            batch_size = pairs.len(),
            batch_distance = total.distance_sum,
            batch_reference_units = total.reference_unit_count,
            distance_sum = self.state.distance_sum,
            reference_unit_count = self.state.reference_unit_count,
            "error rate: batch accumulated"
        );
        Ok(BatchScore { pairs, total })
    }

    /// Current rate and totals. Does not guard against zero reference units.
    pub fn compute(&self) -> ErrorRateResult {
        ErrorRateResult::from(self.state)
    }

    /// Rate over the totals of every worker, as reported by `reducer`.
    /// Local totals are not modified.
    pub fn compute_synced(&self, reducer: &dyn StateReducer) -> Result<ErrorRateResult, MetricError> {
        reducer.all_reduce(self.state).map(ErrorRateResult::from)
    }

    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    /// Fold another worker's totals into this instance.
    pub fn merge(&mut self, other: AccumulatorState) {
        self.state += other;
    }

    pub fn reset(&mut self) {
        self.state = AccumulatorState::ZERO;
    }
}

impl std::fmt::Debug for ErrorRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorRate")
            .field("unit", &self.unit)
            .field("batch_dim", &self.batch_dim)
            .field("log_prediction", &self.log_prediction)
            .field("fold_consecutive", &self.fold_consecutive)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
