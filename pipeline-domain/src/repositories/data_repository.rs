// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::Data;
use crate::error::IntegrationError;
use crate::value_objects::{DataId, ErrorInfo};

#[async_trait]
pub trait DataRepository: Send + Sync {
    async fn save(&self, data: &Data) -> Result<(), IntegrationError>;

    async fn find_by_id(&self, id: DataId) -> Result<Data, IntegrationError>;

    async fn mark_processing(&self, id: DataId) -> Result<(), IntegrationError>;

    async fn mark_processed(&self, id: DataId) -> Result<(), IntegrationError>;

    async fn mark_error(&self, id: DataId, error: ErrorInfo) -> Result<(), IntegrationError>;

    async fn mark_delayed(&self, id: DataId, until: DateTime<Utc>) -> Result<(), IntegrationError>;

    async fn find_due_for_resume(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Data>, IntegrationError>;

    async fn resume(&self, id: DataId) -> Result<(), IntegrationError>;

    /// Rate-limit reset: a guarded `PROCESSING -> PENDING` update that
    /// leaves `retries` untouched. The owning run is paused instead.
    async fn reset_for_rate_limit(&self, id: DataId) -> Result<(), IntegrationError>;
}
