// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Run Service
//!
//! Handles `ProcessRun` messages: checks the owning integration still
//! exists, dispatches to the platform handler's `generateStreams`
//! (`handle_run`), and settles the run. A resumed run (one whose streams
//! already exist, e.g. after a rate-limit pause) re-drives its PENDING
//! streams instead of invoking the handler again. A run has no retry or
//! delay of its own for handler failures (only streams and data do); a
//! handler error always ends the run.

use std::sync::Arc;
use tracing::{info, warn};

use pipeline_domain::repositories::{IntegrationRepository, RunRepository, StreamRepository};
use pipeline_domain::services::{Queue, QueueMessage, RunCache, RunContext};
use pipeline_domain::value_objects::{ErrorInfo, RunId};
use pipeline_domain::IntegrationError;

use crate::application::registry::PlatformRegistry;

pub struct RunService {
    runs: Arc<dyn RunRepository>,
    streams: Arc<dyn StreamRepository>,
    integrations: Arc<dyn IntegrationRepository>,
    queue: Arc<dyn Queue>,
    cache: Arc<dyn RunCache>,
    registry: Arc<PlatformRegistry>,
}

impl RunService {
    pub fn new(
        runs: Arc<dyn RunRepository>,
        streams: Arc<dyn StreamRepository>,
        integrations: Arc<dyn IntegrationRepository>,
        queue: Arc<dyn Queue>,
        cache: Arc<dyn RunCache>,
        registry: Arc<PlatformRegistry>,
    ) -> Self {
        Self { runs, streams, integrations, queue, cache, registry }
    }

    pub async fn process(&self, run_id: RunId) -> Result<(), IntegrationError> {
        let run = self.runs.find_by_id(run_id).await?;

        let integration = match self.integrations.find_by_id(run.integration_id()).await {
            Ok(integration) => integration,
            Err(e) => {
                warn!(%run_id, error = %e, "owning integration missing, stopping run");
                self.runs
                    .mark_error(run_id, ErrorInfo::new("run-check-integration", e.to_string()))
                    .await?;
                return Err(e);
            }
        };

        let handler = match self.registry.get(integration.platform()) {
            Ok(handler) => handler,
            Err(e) => {
                warn!(%run_id, error = %e, "no handler registered for run's platform");
                self.runs
                    .mark_error(run_id, ErrorInfo::new("run-generate-streams", e.to_string()))
                    .await?;
                return Err(e);
            }
        };

        let existing_streams = self.streams.count_by_run(run_id).await?;
        if existing_streams > 0 {
            info!(%run_id, existing_streams, "run resuming, re-driving pending streams");
            for stream in self.streams.find_pending_by_run(run_id).await? {
                self.queue.send(QueueMessage::ProcessStream { stream_id: stream.id() }).await?;
            }
            return Ok(());
        }

        self.runs.mark_processing(run_id).await?;

        let ctx = RunContext::new(
            run_id,
            run.integration_id(),
            self.queue.clone(),
            self.cache.clone(),
            self.integrations.clone(),
            self.streams.clone(),
        );

        match handler.handle_run(&ctx).await {
            Ok(()) => {
                let unfinished = self.streams.count_unfinished(run_id).await?;
                if unfinished == 0 {
                    self.runs.mark_processed(run_id).await?;
                    info!(%run_id, "run completed with no fanned-out streams");
                } else {
                    info!(%run_id, unfinished, "run dispatched streams, awaiting their completion");
                }
                Ok(())
            }
            Err(e) => {
                warn!(%run_id, error = %e, "run handler failed");
                self.runs
                    .mark_error(run_id, ErrorInfo::new("run-generate-streams", e.to_string()))
                    .await?;
                Err(e)
            }
        }
    }
}
