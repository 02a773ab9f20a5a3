// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Layer
//!
//! Concrete adapters for the ports the domain layer defines: Postgres
//! repositories, the SQS (or in-memory) queue, the per-run Moka cache,
//! Prometheus metrics, tracing-subscriber logging, and configuration
//! loading. Nothing in `pipeline_domain` depends on anything here; this
//! layer depends on the domain's traits, never the reverse.
//!
//! ## Module Structure
//!
//! - `config` - layered TOML + environment configuration
//! - `logging` - tracing-subscriber initialization
//! - `metrics` - Prometheus registry and scrape endpoint
//! - `queue` - `Queue` adapters (SQS, in-memory)
//! - `cache` - `RunCache` adapter (Moka)
//! - `repositories` - Postgres repository adapters
//! - `runtime` - supervised task spawning and the delay sweeper

pub mod cache;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod queue;
pub mod repositories;
pub mod runtime;
