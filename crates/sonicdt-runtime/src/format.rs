//! Artifact decoding with ordered format fallback
//!
//! An artifact file carries no format metadata, so decoders are tried in a
//! fixed order and the first success wins. A format-specific failure moves on
//! to the next decoder; any other failure stops the chain.

use sonicdt_core::{SonicError, SonicResult};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::estimator::{ModelArtifact, ARTIFACT_VERSION};
use crate::traits::Predictor;

/// Errors from a single decode attempt
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Corrupt or foreign byte stream
    #[error("invalid {format} stream: {message}")]
    InvalidFormat {
        format: &'static str,
        message: String,
    },

    /// Well-formed but written by an unknown layout version
    #[error("unsupported {format} artifact version {found} (expected {expected})")]
    UnsupportedVersion {
        format: &'static str,
        found: u32,
        expected: u32,
    },

    /// Decoded object does not fit the expected model schema
    #[error("{format} artifact schema mismatch: {message}")]
    Schema {
        format: &'static str,
        message: String,
    },

    /// Failure unrelated to the encoding
    #[error("{0}")]
    Other(String),
}

impl DecodeError {
    /// Whether the next decoder in the chain should be tried
    pub fn is_format_specific(&self) -> bool {
        !matches!(self, DecodeError::Other(_))
    }
}

/// One serialization format able to produce a predictor from raw bytes
pub trait ArtifactDecoder: Send + Sync {
    /// Format name used in logs and status output
    fn format(&self) -> &'static str;

    /// Decode `bytes` into an invocable model
    fn decode(&self, bytes: &[u8]) -> Result<Arc<dyn Predictor>, DecodeError>;
}

/// Primary format: bincode
pub struct BincodeDecoder;

impl ArtifactDecoder for BincodeDecoder {
    fn format(&self) -> &'static str {
        "bincode"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Arc<dyn Predictor>, DecodeError> {
        let artifact: ModelArtifact =
            bincode::deserialize(bytes).map_err(|e| DecodeError::InvalidFormat {
                format: self.format(),
                message: e.to_string(),
            })?;
        checked(self.format(), artifact)
    }
}

/// Secondary format: JSON
pub struct JsonDecoder;

impl ArtifactDecoder for JsonDecoder {
    fn format(&self) -> &'static str {
        "json"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Arc<dyn Predictor>, DecodeError> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes).map_err(|e| {
            use serde_json::error::Category;
            match e.classify() {
                Category::Data => DecodeError::Schema {
                    format: self.format(),
                    message: e.to_string(),
                },
                Category::Syntax | Category::Eof => DecodeError::InvalidFormat {
                    format: self.format(),
                    message: e.to_string(),
                },
                Category::Io => DecodeError::Other(e.to_string()),
            }
        })?;
        checked(self.format(), artifact)
    }
}

fn checked(format: &'static str, artifact: ModelArtifact) -> Result<Arc<dyn Predictor>, DecodeError> {
    if artifact.version != ARTIFACT_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            format,
            found: artifact.version,
            expected: ARTIFACT_VERSION,
        });
    }
    artifact
        .validate()
        .map_err(|message| DecodeError::Schema { format, message })?;
    Ok(Arc::new(artifact))
}

/// Encode an artifact in the primary format
pub fn to_bincode(artifact: &ModelArtifact) -> SonicResult<Vec<u8>> {
    bincode::serialize(artifact)
        .map_err(|e| SonicError::InvalidInput(format!("Failed to encode artifact: {}", e)))
}

/// Encode an artifact in the secondary format
pub fn to_json(artifact: &ModelArtifact) -> SonicResult<Vec<u8>> {
    serde_json::to_vec_pretty(artifact)
        .map_err(|e| SonicError::InvalidInput(format!("Failed to encode artifact: {}", e)))
}

/// Result of a successful chain decode
pub struct Decoded {
    /// The invocable model
    pub model: Arc<dyn Predictor>,
    /// Format that succeeded
    pub format: &'static str,
    /// Formats tried, in order, including the successful one
    pub attempts: Vec<&'static str>,
}

/// Ordered list of decoders tried until one succeeds
pub struct DecoderChain {
    decoders: Vec<Box<dyn ArtifactDecoder>>,
}

impl DecoderChain {
    pub fn new(decoders: Vec<Box<dyn ArtifactDecoder>>) -> Self {
        Self { decoders }
    }

    /// bincode first, then JSON
    pub fn standard() -> Self {
        Self::new(vec![Box::new(BincodeDecoder), Box::new(JsonDecoder)])
    }

    /// Format names in priority order
    pub fn formats(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|d| d.format()).collect()
    }

    /// Try each decoder in order; on total failure return the last error
    pub fn decode(&self, bytes: &[u8]) -> Result<Decoded, DecodeError> {
        let mut attempts = Vec::with_capacity(self.decoders.len());
        let mut last_error = DecodeError::Other("no decoders configured".to_string());

        for decoder in &self.decoders {
            let format = decoder.format();
            attempts.push(format);
            debug!(format = format, bytes = bytes.len(), "Attempting artifact decode");

            match decoder.decode(bytes) {
                Ok(model) => {
                    return Ok(Decoded {
                        model,
                        format,
                        attempts,
                    })
                }
                Err(e) if e.is_format_specific() => {
                    warn!(format = format, error = %e, "Artifact decode failed, trying next format");
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }
}

impl Default for DecoderChain {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::sample_forest;
    use sonicdt_core::{FeatureVector, InputFrame};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting<D> {
        inner: D,
        calls: Arc<AtomicUsize>,
    }

    impl<D: ArtifactDecoder> ArtifactDecoder for Counting<D> {
        fn format(&self) -> &'static str {
            self.inner.format()
        }

        fn decode(&self, bytes: &[u8]) -> Result<Arc<dyn Predictor>, DecodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.decode(bytes)
        }
    }

    struct Broken;

    impl ArtifactDecoder for Broken {
        fn format(&self) -> &'static str {
            "broken"
        }

        fn decode(&self, _bytes: &[u8]) -> Result<Arc<dyn Predictor>, DecodeError> {
            Err(DecodeError::Other("decoder crashed".to_string()))
        }
    }

    fn counting_chain() -> (DecoderChain, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let chain = DecoderChain::new(vec![
            Box::new(Counting {
                inner: BincodeDecoder,
                calls: a.clone(),
            }),
            Box::new(Counting {
                inner: JsonDecoder,
                calls: b.clone(),
            }),
        ]);
        (chain, a, b)
    }

    #[test]
    fn test_primary_format_never_tries_secondary() {
        let (chain, a, b) = counting_chain();
        let bytes = to_bincode(&sample_forest()).unwrap();

        let decoded = chain.decode(&bytes).unwrap();
        assert_eq!(decoded.format, "bincode");
        assert_eq!(decoded.attempts, vec!["bincode"]);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 0);

        let out = decoded
            .model
            .predict(&InputFrame::single(&FeatureVector::default()))
            .unwrap();
        assert_eq!(out, vec![75.0]);
    }

    #[test]
    fn test_secondary_format_fallback() {
        let (chain, a, b) = counting_chain();
        let bytes = to_json(&sample_forest()).unwrap();

        let decoded = chain.decode(&bytes).unwrap();
        assert_eq!(decoded.format, "json");
        assert_eq!(decoded.attempts, vec!["bincode", "json"]);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_garbage_fails_with_last_error() {
        let chain = DecoderChain::standard();
        let err = chain.decode(b"definitely not a model").err().unwrap();
        assert!(matches!(err, DecodeError::InvalidFormat { format: "json", .. }));
    }

    #[test]
    fn test_non_format_error_stops_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = DecoderChain::new(vec![
            Box::new(Broken),
            Box::new(Counting {
                inner: JsonDecoder,
                calls: calls.clone(),
            }),
        ]);
        let bytes = to_json(&sample_forest()).unwrap();

        let err = chain.decode(&bytes).err().unwrap();
        assert_eq!(err, DecodeError::Other("decoder crashed".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_version_mismatch_is_format_specific() {
        let mut artifact = sample_forest();
        artifact.version = 99;
        let err = BincodeDecoder
            .decode(&to_bincode(&artifact).unwrap())
            .err()
            .unwrap();
        assert_eq!(
            err,
            DecodeError::UnsupportedVersion {
                format: "bincode",
                found: 99,
                expected: 1
            }
        );
        assert!(err.is_format_specific());
    }

    #[test]
    fn test_json_schema_mismatch() {
        let err = JsonDecoder
            .decode(br#"{"version": 1, "feature_names": []}"#)
            .err()
            .unwrap();
        assert!(matches!(err, DecodeError::Schema { format: "json", .. }));

        let mut artifact = sample_forest();
        artifact.feature_names.reverse();
        let err = JsonDecoder
            .decode(&to_json(&artifact).unwrap())
            .err()
            .unwrap();
        assert!(err.to_string().contains("feature names"));
    }

    #[test]
    fn test_empty_chain() {
        let chain = DecoderChain::new(vec![]);
        assert!(chain.formats().is_empty());
        assert!(matches!(chain.decode(b"x"), Err(DecodeError::Other(_))));
    }

    #[test]
    fn test_standard_formats() {
        assert_eq!(DecoderChain::default().formats(), vec!["bincode", "json"]);
    }
}
