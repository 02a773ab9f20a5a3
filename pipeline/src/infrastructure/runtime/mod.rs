// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Runtime infrastructure: supervised task spawning and the delay sweeper.

pub mod sweeper;
pub mod supervisor;

pub use supervisor::{join_supervised, spawn_supervised, AppResult};
pub use sweeper::Sweeper;
