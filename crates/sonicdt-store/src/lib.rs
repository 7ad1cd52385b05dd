//! sonicdt-store: Model artifact storage
//!
//! This crate makes sure a usable model file exists on local disk:
//! - Local path checks
//! - Remote download with cache-hit detection
//! - Non-empty validation before any load attempt

pub mod fetch;
pub mod resolver;

pub use fetch::{ArtifactFetcher, HttpFetcher};
pub use resolver::{ModelResolver, ResolvedArtifact};
