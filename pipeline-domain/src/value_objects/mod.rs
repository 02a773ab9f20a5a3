//! # Domain Value Objects
//!
//! Immutable, identity-free objects used throughout the integration
//! pipeline: typed ids, the shared execution-state lattice, and the
//! structured error payload persisted on failed rows.

mod error_info;
mod ids;
mod states;

pub use error_info::ErrorInfo;
pub use ids::{DataId, IntegrationId, RunId, StreamId, TenantId};
pub use states::ExecutionState;
