// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Data Service
//!
//! Handles `ProcessData` messages. Mirrors the stream worker: checks the
//! owning run is still PROCESSING before dispatching, then reuses the
//! stream's retry/delay policy (transient failures delay up to
//! `max_data_retries`; a rate limit resets the data item to PENDING and
//! pauses the whole run). Once the retry budget is exhausted the data item
//! is marked `ERROR`, the owning run is stopped directly, and a
//! `StreamError` message is published so the owning stream is told its
//! delivery failed, even though the stream itself may already have
//! finished.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use pipeline_domain::repositories::{DataRepository, IntegrationRepository, RunRepository, StreamRepository};
use pipeline_domain::services::{DataContext, Queue, QueueMessage, RunCache};
use pipeline_domain::value_objects::{DataId, ErrorInfo, ExecutionState, RunId, StreamId};
use pipeline_domain::IntegrationError;

use crate::application::registry::PlatformRegistry;

pub struct DataService {
    runs: Arc<dyn RunRepository>,
    streams: Arc<dyn StreamRepository>,
    data: Arc<dyn DataRepository>,
    integrations: Arc<dyn IntegrationRepository>,
    queue: Arc<dyn Queue>,
    cache: Arc<dyn RunCache>,
    registry: Arc<PlatformRegistry>,
    max_retries: u32,
}

impl DataService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        runs: Arc<dyn RunRepository>,
        streams: Arc<dyn StreamRepository>,
        data: Arc<dyn DataRepository>,
        integrations: Arc<dyn IntegrationRepository>,
        queue: Arc<dyn Queue>,
        cache: Arc<dyn RunCache>,
        registry: Arc<PlatformRegistry>,
        max_retries: u32,
    ) -> Self {
        Self { runs, streams, data, integrations, queue, cache, registry, max_retries }
    }

    pub async fn process(&self, data_id: DataId) -> Result<(), IntegrationError> {
        let data = self.data.find_by_id(data_id).await?;
        let stream = self.streams.find_by_id(data.stream_id()).await?;
        let run = self.runs.find_by_id(stream.run_id()).await?;

        if run.state() != ExecutionState::Processing {
            let e = IntegrationError::run_aborted(format!("run {} is not processing", run.id()));
            warn!(%data_id, run_id = %run.id(), state = %run.state(), "run not processing, short-circuiting data item");
            self.data
                .mark_error(data_id, ErrorInfo::new("check-stream-run-state", e.to_string()))
                .await?;
            return Err(e);
        }

        self.data.mark_processing(data_id).await?;

        let integration = self.integrations.find_by_id(run.integration_id()).await?;
        let handler = match self.registry.get(integration.platform()) {
            Ok(handler) => handler,
            Err(e) => {
                warn!(%data_id, error = %e, "no handler registered for data item's platform");
                self.data
                    .mark_error(data_id, ErrorInfo::new("handle_data", e.to_string()))
                    .await?;
                return Err(e);
            }
        };

        let ctx = DataContext::new(
            stream.run_id(),
            run.integration_id(),
            data.stream_id(),
            data_id,
            self.queue.clone(),
            self.cache.clone(),
            self.integrations.clone(),
        );

        match handler.handle_data(&ctx).await {
            Ok(()) => {
                self.data.mark_processed(data_id).await?;
                Ok(())
            }
            Err(e) => self.handle_failure(data_id, data.retries(), stream.run_id(), data.stream_id(), e).await,
        }
    }

    async fn handle_failure(
        &self,
        data_id: DataId,
        retries_so_far: u32,
        run_id: RunId,
        stream_id: StreamId,
        error: IntegrationError,
    ) -> Result<(), IntegrationError> {
        match &error {
            IntegrationError::RateLimited { reset_after } => {
                let until = chrono::Utc::now() + chrono::Duration::from_std(*reset_after).unwrap_or_default();
                self.data.reset_for_rate_limit(data_id).await?;
                self.runs.mark_delayed(run_id, until).await?;
                info!(%data_id, %run_id, "data rate limited, run paused for resume");
                Ok(())
            }
            IntegrationError::Transient(_) if retries_so_far < self.max_retries => {
                let backoff = Duration::from_secs(900 * (retries_so_far as u64 + 1));
                self.data
                    .mark_delayed(data_id, chrono::Utc::now() + chrono::Duration::from_std(backoff).unwrap_or_default())
                    .await?;
                info!(%data_id, retries = retries_so_far + 1, "data delayed for retry");
                Ok(())
            }
            IntegrationError::RunAborted(_) | IntegrationError::Transient(_) | IntegrationError::Fatal(_) => {
                self.fail_and_stop_run(data_id, run_id, stream_id, error).await
            }
            _ => self.fail_and_notify_stream(data_id, stream_id, error).await,
        }
    }

    /// Retry budget exhausted, a fatal handler error, or a run-aborting
    /// error: ends the data item, stops the owning run directly rather than
    /// leaving it to the stream's own settle path, and notifies the
    /// owning stream.
    async fn fail_and_stop_run(
        &self,
        data_id: DataId,
        run_id: RunId,
        stream_id: StreamId,
        error: IntegrationError,
    ) -> Result<(), IntegrationError> {
        warn!(%data_id, %run_id, error = %error, "data failed permanently, stopping run");
        self.data
            .mark_error(data_id, ErrorInfo::new("handle_data", error.to_string()))
            .await?;
        match self.runs.mark_error(run_id, ErrorInfo::new("stream-run-stop", error.to_string())).await {
            Ok(()) | Err(IntegrationError::InvalidStateTransition { .. }) => {}
            Err(e) => return Err(e),
        }
        self.notify_stream(stream_id, data_id, &error).await?;
        Err(error)
    }

    /// A `HandlerAbort`/`MissingDependency`-class failure: terminal for
    /// this data item only, the run continues.
    async fn fail_and_notify_stream(
        &self,
        data_id: DataId,
        stream_id: StreamId,
        error: IntegrationError,
    ) -> Result<(), IntegrationError> {
        warn!(%data_id, error = %error, "data failed, notifying owning stream");
        self.data
            .mark_error(data_id, ErrorInfo::new("handle_data", error.to_string()))
            .await?;
        self.notify_stream(stream_id, data_id, &error).await?;
        Err(error)
    }

    async fn notify_stream(&self, stream_id: StreamId, data_id: DataId, error: &IntegrationError) -> Result<(), IntegrationError> {
        self.queue
            .send(QueueMessage::StreamError {
                stream_id,
                location: "handle_data".to_string(),
                message: error.to_string(),
                metadata: serde_json::json!({ "data_id": data_id.to_string() }),
            })
            .await
    }
}
