// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::Stream;
use crate::error::IntegrationError;
use crate::value_objects::{ErrorInfo, RunId, StreamId};

#[async_trait]
pub trait StreamRepository: Send + Sync {
    async fn save(&self, stream: &Stream) -> Result<(), IntegrationError>;

    async fn find_by_id(&self, id: StreamId) -> Result<Stream, IntegrationError>;

    async fn mark_processing(&self, id: StreamId) -> Result<(), IntegrationError>;

    async fn mark_processed(&self, id: StreamId) -> Result<(), IntegrationError>;

    async fn mark_error(&self, id: StreamId, error: ErrorInfo) -> Result<(), IntegrationError>;

    /// Delays the stream and bumps its retry counter in one guarded update.
    async fn mark_delayed(&self, id: StreamId, until: DateTime<Utc>) -> Result<(), IntegrationError>;

    /// All streams belonging to `run_id` still in a non-terminal state;
    /// used to decide whether a run can be marked processed.
    async fn count_unfinished(&self, run_id: RunId) -> Result<u64, IntegrationError>;

    /// Streams whose `delayed_until` has passed, for the sweeper to resume.
    async fn find_due_for_resume(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Stream>, IntegrationError>;

    async fn resume(&self, id: StreamId) -> Result<(), IntegrationError>;

    /// Rate-limit reset: a guarded `PROCESSING -> PENDING` update that
    /// leaves `retries` untouched. The owning run is paused instead.
    async fn reset_for_rate_limit(&self, id: StreamId) -> Result<(), IntegrationError>;

    /// All streams belonging to `run_id`, regardless of state; used to
    /// decide whether a run is resuming existing work rather than
    /// generating streams for the first time.
    async fn count_by_run(&self, run_id: RunId) -> Result<u64, IntegrationError>;

    /// Streams belonging to `run_id` still PENDING; re-enqueued when a
    /// run resumes from DELAYED or is redriven without regenerating streams.
    async fn find_pending_by_run(&self, run_id: RunId) -> Result<Vec<Stream>, IntegrationError>;
}
