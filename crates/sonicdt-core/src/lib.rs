//! sonicdt-core: Core types for the sonicdt prediction service
//!
//! This crate provides the fundamental types shared by every sonicdt crate:
//! - Feature vectors, input frames and predictions
//! - Model lifecycle state
//! - Configuration types
//! - Error handling

pub mod config;
pub mod error;
pub mod model;

pub use config::*;
pub use error::*;
pub use model::*;
