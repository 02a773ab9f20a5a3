// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stream Service
//!
//! Handles `ProcessStream` and `StreamError` messages. A transient failure
//! delays the stream for the sweeper to resume, up to `max_stream_retries`.
//! A rate limit pauses the whole run instead of the single stream: the
//! stream resets to PENDING immediately (retries untouched) and the run
//! moves to DELAYED. Any other failure ends the stream in `ERROR`; a
//! `RunAborted` error or a stream exhausting its retry budget additionally
//! ends the owning run. Once a stream reaches a terminal state, the run it
//! belongs to is marked processed if no sibling stream remains unfinished.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use pipeline_domain::repositories::{DataRepository, IntegrationRepository, RunRepository, StreamRepository};
use pipeline_domain::services::{Queue, RunCache, StreamContext};
use pipeline_domain::value_objects::{ErrorInfo, StreamId};
use pipeline_domain::IntegrationError;

use crate::application::registry::PlatformRegistry;

pub struct StreamService {
    runs: Arc<dyn RunRepository>,
    streams: Arc<dyn StreamRepository>,
    data: Arc<dyn DataRepository>,
    integrations: Arc<dyn IntegrationRepository>,
    queue: Arc<dyn Queue>,
    cache: Arc<dyn RunCache>,
    registry: Arc<PlatformRegistry>,
    max_retries: u32,
}

impl StreamService {
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

    pub async fn process(&self, stream_id: StreamId) -> Result<(), IntegrationError> {
        let stream = self.streams.find_by_id(stream_id).await?;
        let run = self.runs.find_by_id(stream.run_id()).await?;

        if run.state() != pipeline_domain::value_objects::ExecutionState::Processing {
            let e = IntegrationError::run_aborted(format!("run {} is not processing", run.id()));
            warn!(%stream_id, run_id = %run.id(), state = %run.state(), "run not processing, short-circuiting stream");
            self.streams
                .mark_error(stream_id, ErrorInfo::new("check-stream-run-state", e.to_string()))
                .await?;
            return Err(e);
        }

        self.streams.mark_processing(stream_id).await?;

        let integration = self.integrations.find_by_id(run.integration_id()).await?;
        let handler = match self.registry.get(integration.platform()) {
            Ok(handler) => handler,
            Err(e) => {
                warn!(%stream_id, error = %e, "no handler registered for stream's platform");
                self.streams
                    .mark_error(stream_id, ErrorInfo::new("handle_stream", e.to_string()))
                    .await?;
                self.settle_run_if_drained(stream.run_id()).await?;
                return Err(e);
            }
        };

        let ctx = StreamContext::new(
            stream.run_id(),
            run.integration_id(),
            stream_id,
            self.queue.clone(),
            self.cache.clone(),
            self.integrations.clone(),
            self.streams.clone(),
            self.data.clone(),
        );

        match handler.handle_stream(&ctx).await {
            Ok(()) => {
                self.streams.mark_processed(stream_id).await?;
                self.settle_run_if_drained(stream.run_id()).await?;
                Ok(())
            }
            Err(e) => self.handle_failure(&stream, e).await,
        }
    }

    /// Handles a failure reported out-of-band for `stream_id` (e.g. a data
    /// worker that exhausted its own retries and gave up on the stream).
    pub async fn mark_failed(&self, stream_id: StreamId, location: &str, message: &str) -> Result<(), IntegrationError> {
        match self.streams.mark_error(stream_id, ErrorInfo::new(location, message)).await {
            Ok(()) => {
                if let Ok(stream) = self.streams.find_by_id(stream_id).await {
                    self.settle_run_if_drained(stream.run_id()).await?;
                }
                Ok(())
            }
            // The stream already reached a terminal state; nothing to do.
            Err(IntegrationError::InvalidStateTransition { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn handle_failure(&self, stream: &pipeline_domain::entities::Stream, error: IntegrationError) -> Result<(), IntegrationError> {
        let stream_id = stream.id();
        match &error {
            IntegrationError::Transient(_) if stream.retries() < self.max_retries => {
                self.delay_for_retry(stream_id).await
            }
            IntegrationError::RateLimited { reset_after } => {
                let until = chrono::Utc::now() + chrono::Duration::from_std(*reset_after).unwrap_or_default();
                self.streams.reset_for_rate_limit(stream_id).await?;
                self.runs.mark_delayed(stream.run_id(), until).await?;
                info!(%stream_id, run_id = %stream.run_id(), "stream rate limited, run paused for resume");
                Ok(())
            }
            IntegrationError::RunAborted(_) => {
                warn!(%stream_id, error = %error, "stream aborted the run");
                self.streams
                    .mark_error(stream_id, ErrorInfo::new("handle_stream", error.to_string()))
                    .await?;
                self.runs
                    .mark_error(stream.run_id(), ErrorInfo::new("handle_stream", error.to_string()))
                    .await?;
                Err(error)
            }
            IntegrationError::Transient(_) | IntegrationError::Fatal(_) => {
                warn!(%stream_id, error = %error, "stream retry budget exhausted, stopping run");
                self.stop_run_for_stream(stream_id, stream.run_id(), error.to_string()).await?;
                Err(error)
            }
            _ => {
                warn!(%stream_id, error = %error, "stream failed permanently");
                self.streams
                    .mark_error(stream_id, ErrorInfo::new("handle_stream", error.to_string()))
                    .await?;
                self.settle_run_if_drained(stream.run_id()).await?;
                Err(error)
            }
        }
    }

    /// A stream's retry budget is exhausted (or a handler reported a fatal
    /// error directly): the stream ends in ERROR and the owning run is
    /// stopped immediately rather than left to `settle_run_if_drained`,
    /// which could otherwise mark a run PROCESSED while a sibling is still
    /// mid-flight.
    async fn stop_run_for_stream(
        &self,
        stream_id: StreamId,
        run_id: pipeline_domain::value_objects::RunId,
        message: String,
    ) -> Result<(), IntegrationError> {
        self.streams.mark_error(stream_id, ErrorInfo::new("handle_stream", message.clone())).await?;
        match self.runs.mark_error(run_id, ErrorInfo::new("stream-run-stop", message)).await {
            Ok(()) | Err(IntegrationError::InvalidStateTransition { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn delay_for_retry(&self, stream_id: StreamId) -> Result<(), IntegrationError> {
        // Linear backoff: (retries + 1) * 15 minutes.
        let stream = self.streams.find_by_id(stream_id).await?;
        let backoff = Duration::from_secs(900 * (stream.retries() as u64 + 1));
        self.streams
            .mark_delayed(stream_id, chrono::Utc::now() + chrono::Duration::from_std(backoff).unwrap_or_default())
            .await?;
        info!(%stream_id, retries = stream.retries() + 1, "stream delayed for retry");
        Ok(())
    }

    async fn settle_run_if_drained(&self, run_id: pipeline_domain::value_objects::RunId) -> Result<(), IntegrationError> {
        if self.streams.count_unfinished(run_id).await? == 0 {
            match self.runs.mark_processed(run_id).await {
                Ok(()) | Err(IntegrationError::InvalidStateTransition { .. }) => Ok(()),
                Err(e) => Err(e),
            }?;
        }
        Ok(())
    }
}
