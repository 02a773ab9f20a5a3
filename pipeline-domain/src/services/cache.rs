// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Per-run scratch cache. Handlers use this to stash values (an auth
//! token, a paginated listing) that should outlive one stream's handler
//! call but not the run itself.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::IntegrationError;
use crate::value_objects::RunId;

#[async_trait]
pub trait RunCache: Send + Sync {
    async fn get(&self, run_id: RunId, key: &str) -> Result<Option<Value>, IntegrationError>;

    async fn set(&self, run_id: RunId, key: &str, value: Value) -> Result<(), IntegrationError>;
}
