// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Per-Run Cache
//!
//! [`RunCache`] implementation over `moka::future::Cache`, keyed by
//! `(run_id, key)` so entries from concurrent runs never collide. Entries
//! expire on a fixed TTL after last write; there is no explicit eviction API
//! since the state machine guarantees a run eventually terminates and its
//! cache entries simply age out.

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use std::time::Duration;

use pipeline_domain::services::RunCache;
use pipeline_domain::{IntegrationError, RunId};

#[derive(Clone)]
pub struct MokaRunCache {
    inner: Cache<(RunId, String), Value>,
}

impl MokaRunCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().max_capacity(max_capacity).time_to_live(ttl).build(),
        }
    }
}

#[async_trait]
impl RunCache for MokaRunCache {
    async fn get(&self, run_id: RunId, key: &str) -> Result<Option<Value>, IntegrationError> {
        Ok(self.inner.get(&(run_id, key.to_string())).await)
    }

    async fn set(&self, run_id: RunId, key: &str, value: Value) -> Result<(), IntegrationError> {
        self.inner.insert((run_id, key.to_string()), value).await;
        Ok(())
    }
}
