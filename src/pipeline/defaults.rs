use std::sync::Arc;

use crate::decoding::ctc::decode_hypotheses;
use crate::error::MetricError;
use crate::metrics::state::AccumulatorState;
use crate::pipeline::traits::{HypothesisDecoder, StateReducer, TokenCodec};
use crate::types::{BatchDim, Hypothesis, TokenBatch};

/// Plain CTC decoding of already-selected ids: fold, drop blanks, detokenize.
pub struct CtcFoldingDecoder {
    codec: Arc<dyn TokenCodec>,
}

impl CtcFoldingDecoder {
    pub fn new(codec: Arc<dyn TokenCodec>) -> Self {
        Self { codec }
    }
}

impl HypothesisDecoder for CtcFoldingDecoder {
    fn decode_hypotheses(
        &self,
        predictions: &TokenBatch,
        lengths: Option<&[usize]>,
        batch_dim: BatchDim,
        fold_consecutive: bool,
    ) -> Result<Vec<Hypothesis>, MetricError> {
        decode_hypotheses(
            self.codec.as_ref(),
            predictions,
            lengths,
            batch_dim,
            fold_consecutive,
        )
    }
}

/// Single-process reduction: the local state is the global state.
pub struct LocalReducer;

impl StateReducer for LocalReducer {
    fn all_reduce(&self, local: AccumulatorState) -> Result<AccumulatorState, MetricError> {
        Ok(local)
    }
}

/// Reduction over peer states that were already gathered by the host
/// (for example received as JSON from other workers).
pub struct GatheredReducer {
    peers: Vec<AccumulatorState>,
}

impl GatheredReducer {
    pub fn new(peers: Vec<AccumulatorState>) -> Self {
        Self { peers }
    }
}

impl StateReducer for GatheredReducer {
    fn all_reduce(&self, local: AccumulatorState) -> Result<AccumulatorState, MetricError> {
        Ok(self.peers.iter().fold(local, |acc, peer| acc.merge(*peer)))
    }
}
