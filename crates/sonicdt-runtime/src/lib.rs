//! sonicdt-runtime: Model loading and inference
//!
//! This crate turns a resolved artifact into a callable model:
//! - Predictor trait (the model's inference entry point)
//! - Built-in regression estimators
//! - Ordered decoder chain (bincode, then JSON)
//! - Gateway caching the loaded model for the process lifetime

pub mod estimator;
pub mod format;
pub mod gateway;
pub mod traits;

pub use estimator::{
    BoostedModel, Estimator, ForestModel, LinearModel, ModelArtifact, RegressionTree, TreeNode,
};
pub use format::{ArtifactDecoder, BincodeDecoder, DecodeError, DecoderChain, JsonDecoder};
pub use gateway::{LoadedModel, ModelGateway};
pub use traits::{InferenceError, Predictor};
