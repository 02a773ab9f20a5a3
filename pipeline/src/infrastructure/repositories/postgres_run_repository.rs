// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Postgres Run Repository
//!
//! Persists rows in `integration.runs`. `mark_processing`/`mark_processed`/
//! `mark_error` guard their `UPDATE` on the row's current state so two
//! workers racing on the same run never both apply a transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use pipeline_domain::entities::Run;
use pipeline_domain::repositories::RunRepository;
use pipeline_domain::value_objects::{ErrorInfo, ExecutionState, RunId};
use pipeline_domain::IntegrationError;

pub struct PostgresRunRepository {
    pool: PgPool,
}

impl PostgresRunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunRepository for PostgresRunRepository {
    async fn save(&self, run: &Run) -> Result<(), IntegrationError> {
        sqlx::query(
            r#"
            INSERT INTO integration.runs
                (id, tenant_id, integration_id, state, delayed_until, error, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                state = EXCLUDED.state,
                delayed_until = EXCLUDED.delayed_until,
                error = EXCLUDED.error,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(run.id().as_uuid())
        .bind(run.tenant_id().as_uuid())
        .bind(run.integration_id().as_uuid())
        .bind(run.state().as_db_str())
        .bind(run.delayed_until())
        .bind(run.error().map(serde_json::to_value).transpose()?)
        .bind(run.created_at())
        .bind(run.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to save run {}: {e}", run.id())))?;
        Ok(())
    }

    async fn find_by_id(&self, id: RunId) -> Result<Run, IntegrationError> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, integration_id, state, delayed_until, error, created_at, updated_at
            FROM integration.runs WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to load run {id}: {e}")))?
        .ok_or_else(|| IntegrationError::not_found(format!("run {id}")))?;

        row_to_run(&row)
    }

    async fn mark_processing(&self, id: RunId) -> Result<(), IntegrationError> {
        guarded_transition(&self.pool, id, ExecutionState::Pending, ExecutionState::Processing, None).await
    }

    async fn mark_processed(&self, id: RunId) -> Result<(), IntegrationError> {
        guarded_transition(&self.pool, id, ExecutionState::Processing, ExecutionState::Processed, None).await
    }

    async fn mark_error(&self, id: RunId, error: ErrorInfo) -> Result<(), IntegrationError> {
        guarded_transition(&self.pool, id, ExecutionState::Processing, ExecutionState::Error, Some(error)).await
    }

    async fn mark_delayed(&self, id: RunId, until: DateTime<Utc>) -> Result<(), IntegrationError> {
        let result = sqlx::query(
            r#"
            UPDATE integration.runs
            SET state = $1, delayed_until = $2, updated_at = now()
            WHERE id = $3 AND state = $4
            "#,
        )
        .bind(ExecutionState::Delayed.as_db_str())
        .bind(until)
        .bind(id.as_uuid())
        .bind(ExecutionState::Processing.as_db_str())
        .execute(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to delay run {id}: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(IntegrationError::invalid_transition("PROCESSING", "DELAYED"));
        }
        Ok(())
    }

    async fn resume(&self, id: RunId) -> Result<(), IntegrationError> {
        let result = sqlx::query(
            r#"
            UPDATE integration.runs
            SET state = 'PROCESSING', delayed_until = NULL, updated_at = now()
            WHERE id = $1 AND state = 'DELAYED'
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to resume run {id}: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(IntegrationError::invalid_transition("DELAYED", "PROCESSING"));
        }
        Ok(())
    }

    async fn find_due_for_resume(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Run>, IntegrationError> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, integration_id, state, delayed_until, error, created_at, updated_at
            FROM integration.runs
            WHERE state = 'DELAYED' AND delayed_until <= $1
            ORDER BY delayed_until ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to query due runs: {e}")))?;

        rows.iter().map(row_to_run).collect()
    }
}

async fn guarded_transition(
    pool: &PgPool,
    id: RunId,
    from: ExecutionState,
    to: ExecutionState,
    error: Option<ErrorInfo>,
) -> Result<(), IntegrationError> {
    let error_json = error.map(|e| serde_json::to_value(e)).transpose()?;
    let result = sqlx::query(
        r#"
        UPDATE integration.runs
        SET state = $1, error = COALESCE($2, error), updated_at = now()
        WHERE id = $3 AND state = $4
        "#,
    )
    .bind(to.as_db_str())
    .bind(error_json)
    .bind(id.as_uuid())
    .bind(from.as_db_str())
    .execute(pool)
    .await
    .map_err(|e| IntegrationError::database(format!("failed to transition run {id}: {e}")))?;

    if result.rows_affected() == 0 {
        return Err(IntegrationError::invalid_transition(from.to_string(), to.to_string()));
    }
    Ok(())
}

fn row_to_run(row: &sqlx::postgres::PgRow) -> Result<Run, IntegrationError> {
    let state: String = row.try_get("state").map_err(|e| IntegrationError::database(e.to_string()))?;
    let state: ExecutionState = state
        .parse()
        .map_err(|_| IntegrationError::database(format!("unrecognized run state {state}")))?;
    let error: Option<serde_json::Value> =
        row.try_get("error").map_err(|e| IntegrationError::database(e.to_string()))?;
    let error = error.map(serde_json::from_value).transpose()?;

    Ok(Run::from_parts(
        row.try_get::<uuid::Uuid, _>("id").map_err(|e| IntegrationError::database(e.to_string()))?.into(),
        row.try_get::<uuid::Uuid, _>("tenant_id")
            .map_err(|e| IntegrationError::database(e.to_string()))?
            .into(),
        row.try_get::<uuid::Uuid, _>("integration_id")
            .map_err(|e| IntegrationError::database(e.to_string()))?
            .into(),
        state,
        row.try_get("delayed_until").map_err(|e| IntegrationError::database(e.to_string()))?,
        error,
        row.try_get("created_at").map_err(|e| IntegrationError::database(e.to_string()))?,
        row.try_get("updated_at").map_err(|e| IntegrationError::database(e.to_string()))?,
    ))
}
