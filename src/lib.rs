pub mod config;
pub mod decoding;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod tensor;
pub mod types;

pub use config::ErrorRateConfig;
pub use decoding::codec::{CharCodec, CodecKind, SentencePieceCodec};
pub use error::MetricError;
pub use metrics::error_rate::{BatchScore, ErrorRate, ErrorRateResult};
pub use metrics::state::AccumulatorState;
pub use pipeline::builder::ErrorRateBuilder;
pub use pipeline::defaults::{CtcFoldingDecoder, GatheredReducer, LocalReducer};
pub use pipeline::traits::{HypothesisDecoder, StateReducer, TokenCodec};
pub use report::{aggregate_reports, compute_utterance_report, Meta, Report, UtteranceReport};
pub use types::{BatchDim, ErrorUnit, Hypothesis, TokenBatch, TokenId};
