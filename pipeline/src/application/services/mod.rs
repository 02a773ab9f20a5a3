// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Services
//!
//! One service per execution stage, each handling the queue message that
//! drives it: [`RunService`] for `ProcessRun`, [`StreamService`] for
//! `ProcessStream` and `StreamError`, [`DataService`] for `ProcessData`.

mod data_service;
mod run_service;
mod stream_service;

pub use data_service::DataService;
pub use run_service::RunService;
pub use stream_service::StreamService;
