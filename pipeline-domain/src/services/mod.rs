//! # Domain Services
//!
//! Stateless collaborators and ports that don't belong to one entity: the
//! handler contract, the queue abstraction, and the per-run cache.

mod cache;
mod handler;
mod queue;

pub use cache::RunCache;
pub use handler::{DataContext, IntegrationHandler, RunContext, StreamContext};
pub use queue::{Queue, QueueMessage, ReceivedMessage};
