// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;
use serde_json::Value;

use crate::entities::IntegrationSnapshot;
use crate::error::IntegrationError;
use crate::value_objects::IntegrationId;

/// Narrow read/patch port onto an integration this pipeline does not own
/// the lifecycle of. `update_settings` always applies the shallow merge
/// described on [`IntegrationSnapshot::merged_settings`] scoped to the
/// whole integration, never to a single run or stream.
#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    async fn find_by_id(&self, id: IntegrationId) -> Result<IntegrationSnapshot, IntegrationError>;

    async fn update_settings(&self, id: IntegrationId, patch: Value) -> Result<IntegrationSnapshot, IntegrationError>;
}
