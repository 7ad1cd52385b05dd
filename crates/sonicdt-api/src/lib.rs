//! sonicdt-api: HTTP surface for sonicdt
//!
//! This crate serves the prediction form and a small JSON API:
//! - Form page and submission
//! - JSON prediction
//! - Model status and health

pub mod page;
pub mod rest;

pub use rest::create_router;
