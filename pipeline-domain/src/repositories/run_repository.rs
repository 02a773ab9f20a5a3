// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::Run;
use crate::error::IntegrationError;
use crate::value_objects::{ErrorInfo, RunId};

/// Persistence port for runs.
///
/// `mark_processing`/`mark_processed`/`mark_error` are guarded updates: the
/// implementation must only apply the row update when the row's current
/// state permits the transition (see [`crate::value_objects::ExecutionState`]),
/// returning [`IntegrationError::InvalidStateTransition`] otherwise so two
/// workers racing on the same run never both "win".
#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn save(&self, run: &Run) -> Result<(), IntegrationError>;

    async fn find_by_id(&self, id: RunId) -> Result<Run, IntegrationError>;

    async fn mark_processing(&self, id: RunId) -> Result<(), IntegrationError>;

    async fn mark_processed(&self, id: RunId) -> Result<(), IntegrationError>;

    async fn mark_error(&self, id: RunId, error: ErrorInfo) -> Result<(), IntegrationError>;

    /// Pauses the run until `until`, e.g. when a stream reports a platform
    /// rate limit. A guarded `PROCESSING -> DELAYED` update.
    async fn mark_delayed(&self, id: RunId, until: DateTime<Utc>) -> Result<(), IntegrationError>;

    /// The sweeper's resume edge for runs: a guarded `DELAYED -> PROCESSING`
    /// update, distinct from streams'/data's `DELAYED -> PENDING`.
    async fn resume(&self, id: RunId) -> Result<(), IntegrationError>;

    /// Runs whose `delayed_until` has passed, for the sweeper to resume.
    async fn find_due_for_resume(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Run>, IntegrationError>;
}
