// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Postgres-backed repository adapters.

pub mod postgres_data_repository;
pub mod postgres_integration_repository;
pub mod postgres_run_repository;
pub mod postgres_stream_repository;

pub use postgres_data_repository::PostgresDataRepository;
pub use postgres_integration_repository::PostgresIntegrationRepository;
pub use postgres_run_repository::PostgresRunRepository;
pub use postgres_stream_repository::PostgresStreamRepository;
