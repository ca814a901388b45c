use thiserror::Error;

use crate::types::TokenId;

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{context}: {message}")]
    Runtime {
        context: &'static str,
        message: String,
    },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("shape mismatch: {what} has {actual} entries, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{what}[{index}] = {length} exceeds sequence capacity {capacity}")]
    LengthOutOfRange {
        what: &'static str,
        index: usize,
        length: usize,
        capacity: usize,
    },
    #[error("token id {id} is outside the vocabulary (size {vocab_size})")]
    UnknownToken { id: TokenId, vocab_size: usize },
}

impl MetricError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub(crate) fn runtime(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Runtime {
            context,
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn shape_mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            what,
            expected,
            actual,
        }
    }

    pub(crate) fn unknown_token(id: TokenId, vocab_size: usize) -> Self {
        Self::UnknownToken { id, vocab_size }
    }
}
