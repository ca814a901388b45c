use crate::error::MetricError;
use crate::metrics::state::AccumulatorState;
use crate::types::{BatchDim, Hypothesis, TokenBatch, TokenId};

/// Mapping between token ids and text, owned by the tokenizer.
pub trait TokenCodec: Send + Sync {
    fn ids_to_text(&self, ids: &[TokenId]) -> Result<String, MetricError>;

    fn ids_to_tokens(&self, ids: &[TokenId]) -> Result<Vec<String>, MetricError>;

    fn vocab_size(&self) -> usize;

    /// Reserved "no emission" id, one past the last vocabulary entry.
    fn blank_id(&self) -> TokenId {
        self.vocab_size()
    }
}

/// Turns a padded batch of predicted ids into hypotheses, one per sample,
/// in batch order.
pub trait HypothesisDecoder: Send + Sync {
    fn decode_hypotheses(
        &self,
        predictions: &TokenBatch,
        lengths: Option<&[usize]>,
        batch_dim: BatchDim,
        fold_consecutive: bool,
    ) -> Result<Vec<Hypothesis>, MetricError>;
}

/// Cross-worker reduce-sum hook. Implementations must combine states with
/// [`AccumulatorState::merge`] so the result is independent of worker order.
pub trait StateReducer: Send + Sync {
    fn all_reduce(&self, local: AccumulatorState) -> Result<AccumulatorState, MetricError>;
}
