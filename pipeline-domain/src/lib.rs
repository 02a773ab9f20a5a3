//! # Pipeline Domain
//!
//! Core business logic for the integration execution pipeline: the
//! Run/Stream/Data entities and their shared execution-state lattice, the
//! handler contract platform plugins implement, and the repository/queue/
//! cache ports the application layer wires up to concrete adapters.
//!
//! This crate is independent of any runtime, database, or queue
//! technology. It implements Domain-Driven Design patterns:
//!
//! ## Entities
//! Objects with identity that persists through state changes: [`Run`],
//! [`Stream`], [`Data`], and the read-mostly [`IntegrationSnapshot`].
//!
//! ## Value Objects
//! Immutable, identity-free values: the typed ids in `value_objects`, the
//! [`ExecutionState`] lattice, and [`ErrorInfo`].
//!
//! ## Domain Services / Ports
//! [`IntegrationHandler`] is the per-platform plugin contract; [`Queue`],
//! [`RunCache`], and the repository traits are the infrastructure ports
//! this domain depends on without knowing their implementations.

pub mod entities;
pub mod error;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::{Data, IntegrationSnapshot, Run, Stream};
pub use error::IntegrationError;
pub use value_objects::{DataId, ErrorInfo, ExecutionState, IntegrationId, RunId, StreamId, TenantId};
