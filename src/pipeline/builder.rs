use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ErrorRateConfig;
use crate::decoding::codec::{load_codec, CodecKind};
use crate::error::MetricError;
use crate::metrics::error_rate::{ErrorRate, ErrorRateParts};
use crate::pipeline::defaults::CtcFoldingDecoder;
use crate::pipeline::traits::{HypothesisDecoder, TokenCodec};

pub struct ErrorRateBuilder {
    config: ErrorRateConfig,
    codec: Option<Arc<dyn TokenCodec>>,
    vocab: Option<(PathBuf, CodecKind)>,
    decoder: Option<Box<dyn HypothesisDecoder>>,
}

impl ErrorRateBuilder {
    pub fn new(config: ErrorRateConfig) -> Self {
        Self {
            config,
            codec: None,
            vocab: None,
            decoder: None,
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn TokenCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Load the codec from a vocabulary file at build time. Ignored when a
    /// codec was supplied with [`Self::with_codec`].
    pub fn with_vocab_file(mut self, path: impl AsRef<Path>, kind: CodecKind) -> Self {
        self.vocab = Some((path.as_ref().to_path_buf(), kind));
        self
    }

    pub fn with_decoder(mut self, decoder: Box<dyn HypothesisDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn build(self) -> Result<ErrorRate, MetricError> {
        self.config.batch_dim()?;

        let codec = match (self.codec, self.vocab) {
            (Some(codec), _) => codec,
            (None, Some((path, kind))) => Arc::from(load_codec(&path, kind)?),
            (None, None) => {
                return Err(MetricError::invalid_input(
                    "no token codec: call with_codec or with_vocab_file",
                ))
            }
        };

        let decoder = self
            .decoder
            .unwrap_or_else(|| Box::new(CtcFoldingDecoder::new(Arc::clone(&codec))));

        Ok(ErrorRate::from_parts(ErrorRateParts {
            codec,
            decoder,
            config: self.config,
        }))
    }
}
