// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Postgres Integration Repository
//!
//! Reads and patches `integration.integrations`. `update_settings` applies
//! the patch with Postgres's own `jsonb || jsonb` operator so the merge
//! happens atomically in the same statement that reads the prior value
//! back out, matching [`IntegrationSnapshot::merged_settings`]'s semantics.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};

use pipeline_domain::entities::IntegrationSnapshot;
use pipeline_domain::repositories::IntegrationRepository;
use pipeline_domain::value_objects::{IntegrationId, TenantId};
use pipeline_domain::IntegrationError;

pub struct PostgresIntegrationRepository {
    pool: PgPool,
}

impl PostgresIntegrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IntegrationRepository for PostgresIntegrationRepository {
    async fn find_by_id(&self, id: IntegrationId) -> Result<IntegrationSnapshot, IntegrationError> {
        let row = sqlx::query(
            "SELECT id, tenant_id, platform, settings FROM integration.integrations WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to load integration {id}: {e}")))?
        .ok_or_else(|| IntegrationError::not_found(format!("integration {id}")))?;

        row_to_snapshot(&row)
    }

    async fn update_settings(&self, id: IntegrationId, patch: Value) -> Result<IntegrationSnapshot, IntegrationError> {
        let row = sqlx::query(
            r#"
            UPDATE integration.integrations
            SET settings = COALESCE(settings, '{}'::jsonb) || $1::jsonb
            WHERE id = $2
            RETURNING id, tenant_id, platform, settings
            "#,
        )
        .bind(patch)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to patch integration {id}: {e}")))?
        .ok_or_else(|| IntegrationError::not_found(format!("integration {id}")))?;

        row_to_snapshot(&row)
    }
}

fn row_to_snapshot(row: &sqlx::postgres::PgRow) -> Result<IntegrationSnapshot, IntegrationError> {
    let tenant_id: uuid::Uuid = row.try_get("tenant_id").map_err(|e| IntegrationError::database(e.to_string()))?;
    let id: uuid::Uuid = row.try_get("id").map_err(|e| IntegrationError::database(e.to_string()))?;
    Ok(IntegrationSnapshot::new(
        IntegrationId::from(id),
        TenantId::from(tenant_id),
        row.try_get::<String, _>("platform").map_err(|e| IntegrationError::database(e.to_string()))?,
        row.try_get("settings").map_err(|e| IntegrationError::database(e.to_string()))?,
    ))
}
