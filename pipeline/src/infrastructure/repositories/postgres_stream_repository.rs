// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Postgres Stream Repository
//!
//! Persists rows in `integration.streams`. `mark_delayed` bumps `retries`
//! in the same guarded `UPDATE` that records the state transition, so a
//! lost race never double-counts a retry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use pipeline_domain::entities::Stream;
use pipeline_domain::repositories::StreamRepository;
use pipeline_domain::value_objects::{ErrorInfo, ExecutionState, RunId, StreamId};
use pipeline_domain::IntegrationError;

pub struct PostgresStreamRepository {
    pool: PgPool,
}

impl PostgresStreamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StreamRepository for PostgresStreamRepository {
    async fn save(&self, stream: &Stream) -> Result<(), IntegrationError> {
        sqlx::query(
            r#"
            INSERT INTO integration.streams
                (id, run_id, state, payload, retries, delayed_until, error, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                state = EXCLUDED.state,
                retries = EXCLUDED.retries,
                delayed_until = EXCLUDED.delayed_until,
                error = EXCLUDED.error,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(stream.id().as_uuid())
        .bind(stream.run_id().as_uuid())
        .bind(stream.state().as_db_str())
        .bind(stream.payload())
        .bind(stream.retries() as i32)
        .bind(stream.delayed_until())
        .bind(stream.error().map(serde_json::to_value).transpose()?)
        .bind(stream.created_at())
        .bind(stream.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to save stream {}: {e}", stream.id())))?;
        Ok(())
    }

    async fn find_by_id(&self, id: StreamId) -> Result<Stream, IntegrationError> {
        let row = sqlx::query(
            r#"
            SELECT id, run_id, state, payload, retries, delayed_until, error, created_at, updated_at
            FROM integration.streams WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to load stream {id}: {e}")))?
        .ok_or_else(|| IntegrationError::not_found(format!("stream {id}")))?;

        row_to_stream(&row)
    }

    async fn mark_processing(&self, id: StreamId) -> Result<(), IntegrationError> {
        guarded_state_update(&self.pool, id, ExecutionState::Pending, ExecutionState::Processing).await
    }

    async fn mark_processed(&self, id: StreamId) -> Result<(), IntegrationError> {
        guarded_state_update(&self.pool, id, ExecutionState::Processing, ExecutionState::Processed).await
    }

    async fn mark_error(&self, id: StreamId, error: ErrorInfo) -> Result<(), IntegrationError> {
        let result = sqlx::query(
            r#"
            UPDATE integration.streams SET state = $1, error = $2, updated_at = now()
            WHERE id = $3 AND state = $4
            "#,
        )
        .bind(ExecutionState::Error.as_db_str())
        .bind(serde_json::to_value(error)?)
        .bind(id.as_uuid())
        .bind(ExecutionState::Processing.as_db_str())
        .execute(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to error stream {id}: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(IntegrationError::invalid_transition("PROCESSING", "ERROR"));
        }
        Ok(())
    }

    async fn mark_delayed(&self, id: StreamId, until: DateTime<Utc>) -> Result<(), IntegrationError> {
        let result = sqlx::query(
            r#"
            UPDATE integration.streams
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
        .map_err(|e| IntegrationError::database(format!("failed to delay stream {id}: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(IntegrationError::invalid_transition("PROCESSING", "DELAYED"));
        }
        Ok(())
    }

    async fn count_unfinished(&self, run_id: RunId) -> Result<u64, IntegrationError> {
        let row = sqlx::query(
            r#"
            SELECT count(*) AS unfinished FROM integration.streams
            WHERE run_id = $1 AND state NOT IN ('PROCESSED', 'ERROR')
            "#,
        )
        .bind(run_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to count unfinished streams for {run_id}: {e}")))?;

        let count: i64 = row.try_get("unfinished").map_err(|e| IntegrationError::database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn find_due_for_resume(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Stream>, IntegrationError> {
        let rows = sqlx::query(
            r#"
            SELECT id, run_id, state, payload, retries, delayed_until, error, created_at, updated_at
            FROM integration.streams
            WHERE state = 'DELAYED' AND delayed_until <= $1
            ORDER BY delayed_until ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to query due streams: {e}")))?;

        rows.iter().map(row_to_stream).collect()
    }

    async fn resume(&self, id: StreamId) -> Result<(), IntegrationError> {
        let result = sqlx::query(
            r#"
            UPDATE integration.streams
            SET state = 'PENDING', delayed_until = NULL, updated_at = now()
            WHERE id = $1 AND state = 'DELAYED'
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to resume stream {id}: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(IntegrationError::invalid_transition("DELAYED", "PENDING"));
        }
        Ok(())
    }

    async fn reset_for_rate_limit(&self, id: StreamId) -> Result<(), IntegrationError> {
        guarded_state_update(&self.pool, id, ExecutionState::Processing, ExecutionState::Pending).await
    }

    async fn count_by_run(&self, run_id: RunId) -> Result<u64, IntegrationError> {
        let row = sqlx::query("SELECT count(*) AS total FROM integration.streams WHERE run_id = $1")
            .bind(run_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IntegrationError::database(format!("failed to count streams for {run_id}: {e}")))?;

        let count: i64 = row.try_get("total").map_err(|e| IntegrationError::database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn find_pending_by_run(&self, run_id: RunId) -> Result<Vec<Stream>, IntegrationError> {
        let rows = sqlx::query(
            r#"
            SELECT id, run_id, state, payload, retries, delayed_until, error, created_at, updated_at
            FROM integration.streams
            WHERE run_id = $1 AND state = 'PENDING'
            "#,
        )
        .bind(run_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to query pending streams for {run_id}: {e}")))?;

        rows.iter().map(row_to_stream).collect()
    }
}

async fn guarded_state_update(
    pool: &PgPool,
    id: StreamId,
    from: ExecutionState,
    to: ExecutionState,
) -> Result<(), IntegrationError> {
    let result = sqlx::query("UPDATE integration.streams SET state = $1, updated_at = now() WHERE id = $2 AND state = $3")
        .bind(to.as_db_str())
        .bind(id.as_uuid())
        .bind(from.as_db_str())
        .execute(pool)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to transition stream {id}: {e}")))?;

    if result.rows_affected() == 0 {
        return Err(IntegrationError::invalid_transition(from.to_string(), to.to_string()));
    }
    Ok(())
}

fn row_to_stream(row: &sqlx::postgres::PgRow) -> Result<Stream, IntegrationError> {
    let state: String = row.try_get("state").map_err(|e| IntegrationError::database(e.to_string()))?;
    let state: ExecutionState = state
        .parse()
        .map_err(|_| IntegrationError::database(format!("unrecognized stream state {state}")))?;
    let error: Option<serde_json::Value> =
        row.try_get("error").map_err(|e| IntegrationError::database(e.to_string()))?;
    let error: Option<ErrorInfo> = error.map(serde_json::from_value).transpose()?;
    let retries: i32 = row.try_get("retries").map_err(|e| IntegrationError::database(e.to_string()))?;

    Ok(Stream::from_parts(
        row.try_get::<uuid::Uuid, _>("id").map_err(|e| IntegrationError::database(e.to_string()))?.into(),
        row.try_get::<uuid::Uuid, _>("run_id").map_err(|e| IntegrationError::database(e.to_string()))?.into(),
        state,
        row.try_get("payload").map_err(|e| IntegrationError::database(e.to_string()))?,
        retries as u32,
        row.try_get("delayed_until").map_err(|e| IntegrationError::database(e.to_string()))?,
        error,
        row.try_get("created_at").map_err(|e| IntegrationError::database(e.to_string()))?,
        row.try_get("updated_at").map_err(|e| IntegrationError::database(e.to_string()))?,
    ))
}
