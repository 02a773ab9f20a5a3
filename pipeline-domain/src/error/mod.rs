//! # Domain Error System
//!
//! Errors for the integration execution pipeline, organized the way the
//! rest of this domain layer is: a single hierarchical enum with category
//! and recoverability helpers rather than one type per module.

mod integration_error;

pub use integration_error::IntegrationError;
