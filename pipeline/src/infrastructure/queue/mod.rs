// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Concrete [`Queue`](pipeline_domain::services::Queue) adapters.

pub mod in_memory_queue;
pub mod sqs_queue;

pub use in_memory_queue::InMemoryQueue;
pub use sqs_queue::SqsQueue;
