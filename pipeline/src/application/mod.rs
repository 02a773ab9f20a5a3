// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Layer
//!
//! Orchestrates the domain to handle one queue message at a time. Depends
//! on `pipeline_domain`'s ports (repositories, queue, cache, handler
//! contract) and nothing else; owns no infrastructure detail itself.
//!
//! - `registry` - maps an integration's platform string to its handler
//! - `services` - one service per execution stage

pub mod registry;
pub mod services;

pub use registry::PlatformRegistry;
pub use services::{DataService, RunService, StreamService};
