//! Inference trait definitions

use sonicdt_core::InputFrame;
use thiserror::Error;

/// Errors raised by a model's own inference code
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// The frame has no rows
    #[error("input has no rows")]
    EmptyInput,

    /// A column the model was trained on is absent
    #[error("input is missing column '{0}'")]
    MissingColumn(String),

    /// A row is shorter than the column list
    #[error("row {row} has {found} values, expected {expected}")]
    ShapeMismatch {
        row: usize,
        found: usize,
        expected: usize,
    },

    /// NaN or infinite input value
    #[error("input contains non-finite value {value} in column '{column}'")]
    NonFiniteInput { column: String, value: f64 },

    /// NaN or infinite model output
    #[error("model produced non-finite output {0}")]
    NonFiniteOutput(f64),

    /// Any other failure inside the model
    #[error("{0}")]
    Failed(String),
}

/// Inference entry point of a loaded model
///
/// Receives a frame of named columns and returns one output per row.
pub trait Predictor: Send + Sync {
    /// Run inference over every row of `input`
    fn predict(&self, input: &InputFrame) -> Result<Vec<f64>, InferenceError>;

    /// Short human-readable description of the model
    fn describe(&self) -> String;
}
