// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Postgres Data Repository
//!
//! Persists rows in `integration.data`. Mirrors
//! [`PostgresStreamRepository`](super::postgres_stream_repository::PostgresStreamRepository)'s
//! guarded-update shape, minus the run-scoped unfinished count.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use pipeline_domain::entities::Data;
use pipeline_domain::repositories::DataRepository;
use pipeline_domain::value_objects::{DataId, ErrorInfo, ExecutionState};
use pipeline_domain::IntegrationError;

pub struct PostgresDataRepository {
    pool: PgPool,
}

impl PostgresDataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataRepository for PostgresDataRepository {
    async fn save(&self, data: &Data) -> Result<(), IntegrationError> {
        sqlx::query(
            r#"
            INSERT INTO integration.data
                (id, stream_id, state, payload, retries, delayed_until, error, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                state = EXCLUDED.state,
                retries = EXCLUDED.retries,
                delayed_until = EXCLUDED.delayed_until,
                error = EXCLUDED.error,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(data.id().as_uuid())
        .bind(data.stream_id().as_uuid())
        .bind(data.state().as_db_str())
        .bind(data.payload())
        .bind(data.retries() as i32)
        .bind(data.delayed_until())
        .bind(data.error().map(serde_json::to_value).transpose()?)
        .bind(data.created_at())
        .bind(data.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to save data {}: {e}", data.id())))?;
        Ok(())
    }

    async fn find_by_id(&self, id: DataId) -> Result<Data, IntegrationError> {
        let row = sqlx::query(
            r#"
            SELECT id, stream_id, state, payload, retries, delayed_until, error, created_at, updated_at
            FROM integration.data WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to load data {id}: {e}")))?
        .ok_or_else(|| IntegrationError::not_found(format!("data {id}")))?;

        row_to_data(&row)
    }

    async fn mark_processing(&self, id: DataId) -> Result<(), IntegrationError> {
        guarded_state_update(&self.pool, id, ExecutionState::Pending, ExecutionState::Processing).await
    }

    async fn mark_processed(&self, id: DataId) -> Result<(), IntegrationError> {
        guarded_state_update(&self.pool, id, ExecutionState::Processing, ExecutionState::Processed).await
    }

    async fn mark_error(&self, id: DataId, error: ErrorInfo) -> Result<(), IntegrationError> {
        let result = sqlx::query(
            "UPDATE integration.data SET state = $1, error = $2, updated_at = now() WHERE id = $3 AND state = $4",
        )
        .bind(ExecutionState::Error.as_db_str())
        .bind(serde_json::to_value(error)?)
        .bind(id.as_uuid())
        .bind(ExecutionState::Processing.as_db_str())
        .execute(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to error data {id}: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(IntegrationError::invalid_transition("PROCESSING", "ERROR"));
        }
        Ok(())
    }

    async fn mark_delayed(&self, id: DataId, until: DateTime<Utc>) -> Result<(), IntegrationError> {
        let result = sqlx::query(
            r#"
            UPDATE integration.data
            SET state = $1, delayed_until = $2, retries = retries + 1, updated_at = now()
            WHERE id = $3 AND state = $4
            "#,
        )
        .bind(ExecutionState::Delayed.as_db_str())
        .bind(until)
        .bind(id.as_uuid())
        .bind(ExecutionState::Processing.as_db_str())
        .execute(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to delay data {id}: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(IntegrationError::invalid_transition("PROCESSING", "DELAYED"));
        }
        Ok(())
    }

    async fn find_due_for_resume(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Data>, IntegrationError> {
        let rows = sqlx::query(
            r#"
            SELECT id, stream_id, state, payload, retries, delayed_until, error, created_at, updated_at
            FROM integration.data
            WHERE state = 'DELAYED' AND delayed_until <= $1
            ORDER BY delayed_until ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to query due data: {e}")))?;

        rows.iter().map(row_to_data).collect()
    }

    async fn resume(&self, id: DataId) -> Result<(), IntegrationError> {
        let result = sqlx::query(
            "UPDATE integration.data SET state = 'PENDING', delayed_until = NULL, updated_at = now() WHERE id = $1 AND state = 'DELAYED'",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to resume data {id}: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(IntegrationError::invalid_transition("DELAYED", "PENDING"));
        }
        Ok(())
    }

    async fn reset_for_rate_limit(&self, id: DataId) -> Result<(), IntegrationError> {
        guarded_state_update(&self.pool, id, ExecutionState::Processing, ExecutionState::Pending).await
    }
}

async fn guarded_state_update(
    pool: &PgPool,
    id: DataId,
    from: ExecutionState,
    to: ExecutionState,
) -> Result<(), IntegrationError> {
    let result = sqlx::query("UPDATE integration.data SET state = $1, updated_at = now() WHERE id = $2 AND state = $3")
        .bind(to.as_db_str())
        .bind(id.as_uuid())
        .bind(from.as_db_str())
        .execute(pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to transition data {id}: {e}")))?;

    if result.rows_affected() == 0 {
        return Err(IntegrationError::invalid_transition(from.to_string(), to.to_string()));
    }
    Ok(())
}

fn row_to_data(row: &sqlx::postgres::PgRow) -> Result<Data, IntegrationError> {
    let state: String = row.try_get("state").map_err(|e| IntegrationError::database(e.to_string()))?;
    let state: ExecutionState = state
        .parse()
        .map_err(|_| IntegrationError::database(format!("unrecognized data state {state}")))?;
    let error: Option<serde_json::Value> =
        row.try_get("error").map_err(|e| IntegrationError::database(e.to_string()))?;
    let error: Option<ErrorInfo> = error.map(serde_json::from_value).transpose()?;
    let retries: i32 = row.try_get("retries").map_err(|e| IntegrationError::database(e.to_string()))?;

    Ok(Data::from_parts(
        row.try_get::<uuid::Uuid, _>("id").map_err(|e| IntegrationError::database(e.to_string()))?.into(),
        row.try_get::<uuid::Uuid, _>("stream_id")
            .map_err(|e| IntegrationError::database(e.to_string()))?
            .into(),
        state,
        row.try_get("payload").map_err(|e| IntegrationError::database(e.to_string()))?,
        retries as u32,
        row.try_get("delayed_until").map_err(|e| IntegrationError::database(e.to_string()))?,
        error,
        row.try_get("created_at").map_err(|e| IntegrationError::database(e.to_string()))?,
        row.try_get("updated_at").map_err(|e| IntegrationError::database(e.to_string()))?,
    ))
}
