//! # Domain Entities
//!
//! Identity-bearing objects whose state moves through the execution
//! lattice in [`crate::value_objects::ExecutionState`]: [`Run`], [`Stream`],
//! and [`Data`], plus the read-mostly [`IntegrationSnapshot`] they carry a
//! reference to.

mod data;
mod integration;
mod run;
mod stream;

pub use data::Data;
pub use integration::IntegrationSnapshot;
pub use run::Run;
pub use stream::Stream;
