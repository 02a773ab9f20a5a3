//! # Repositories
//!
//! Persistence ports. The domain depends only on these traits; the
//! `pipeline` crate supplies Postgres-backed adapters and in-memory fakes
//! supply test doubles.

mod data_repository;
mod integration_repository;
mod run_repository;
mod stream_repository;

pub use data_repository::DataRepository;
pub use integration_repository::IntegrationRepository;
pub use run_repository::RunRepository;
pub use stream_repository::StreamRepository;
