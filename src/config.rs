use std::path::Path;

use crate::error::MetricError;
use crate::types::{BatchDim, ErrorUnit};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ErrorRateConfig {
    /// Character error rate instead of word error rate.
    pub use_cer: bool,
    /// Log the first reference/hypothesis pair of every batch.
    pub log_prediction: bool,
    /// Collapse repeated ids before blank removal when decoding hypotheses.
    pub fold_consecutive: bool,
    /// 0 for `[Batch, Time]` predictions, 1 for `[Time, Batch]`.
    pub batch_dim_index: usize,
}

impl Default for ErrorRateConfig {
    fn default() -> Self {
        Self {
            use_cer: false,
            log_prediction: true,
            fold_consecutive: true,
            batch_dim_index: 0,
        }
    }
}

impl ErrorRateConfig {
    pub fn load(path: &Path) -> Result<Self, MetricError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| MetricError::io("read error rate config", e))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| MetricError::json("parse error rate config", e))?;
        config.batch_dim()?;
        Ok(config)
    }

    pub fn unit(&self) -> ErrorUnit {
        if self.use_cer {
            ErrorUnit::Character
        } else {
            ErrorUnit::Word
        }
    }

    pub fn batch_dim(&self) -> Result<BatchDim, MetricError> {
        BatchDim::try_from(self.batch_dim_index)
    }
}
