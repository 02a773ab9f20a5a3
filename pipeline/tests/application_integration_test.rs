// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end exercises of the three application services against
//! in-memory fakes: a run dispatching a stream through to completion,
//! retry exhaustion, run-aborting handler errors, and failure reported
//! out of band by a data item back to its owning stream.

mod support;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use pipeline::application::{DataService, PlatformRegistry, RunService, StreamService};
use pipeline_domain::entities::{IntegrationSnapshot, Run, Stream};
use pipeline_domain::repositories::{RunRepository, StreamRepository};
use pipeline_domain::services::{DataContext, IntegrationHandler, QueueMessage, RunContext, StreamContext};
use pipeline_domain::value_objects::{ExecutionState, IntegrationId, TenantId};
use pipeline_domain::IntegrationError;

use support::{InMemoryCache, InMemoryDataRepo, InMemoryIntegrationRepo, InMemoryRunRepo, InMemoryStreamRepo};

/// A handler whose `handle_run` fans out exactly one stream, whose
/// `handle_stream` either succeeds or fails as directed, and whose
/// `handle_data` always succeeds.
struct ScriptedHandler {
    stream_result: fn() -> Result<(), IntegrationError>,
    data_result: fn() -> Result<(), IntegrationError>,
}

impl ScriptedHandler {
    fn new(stream_result: fn() -> Result<(), IntegrationError>) -> Self {
        Self { stream_result, data_result: || Ok(()) }
    }
}

#[async_trait]
impl IntegrationHandler for ScriptedHandler {
    fn platform(&self) -> &'static str {
        "scripted"
    }

    async fn handle_run(&self, ctx: &RunContext) -> Result<(), IntegrationError> {
        ctx.publish_stream(json!({"page": 1})).await?;
        Ok(())
    }

    async fn handle_stream(&self, _ctx: &StreamContext) -> Result<(), IntegrationError> {
        (self.stream_result)()
    }

    async fn handle_data(&self, _ctx: &DataContext) -> Result<(), IntegrationError> {
        (self.data_result)()
    }
}

fn registry_with(handler: Arc<dyn IntegrationHandler>) -> Arc<PlatformRegistry> {
    let mut registry = PlatformRegistry::new();
    registry.register(handler);
    Arc::new(registry)
}

struct Fixture {
    runs: Arc<InMemoryRunRepo>,
    streams: Arc<InMemoryStreamRepo>,
    data: Arc<InMemoryDataRepo>,
    integrations: Arc<InMemoryIntegrationRepo>,
    queue: Arc<pipeline::infrastructure::queue::InMemoryQueue>,
    cache: Arc<InMemoryCache>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            runs: Arc::new(InMemoryRunRepo::new()),
            streams: Arc::new(InMemoryStreamRepo::new()),
            data: Arc::new(InMemoryDataRepo::new()),
            integrations: Arc::new(InMemoryIntegrationRepo::new()),
            queue: support::queue_handle(),
            cache: Arc::new(InMemoryCache::new()),
        }
    }

    fn seed_integration(&self) -> IntegrationId {
        let integration = IntegrationSnapshot::new(IntegrationId::new(), TenantId::new(), "scripted", json!({}));
        let id = integration.id();
        self.integrations.seed(integration);
        id
    }

    fn run_service(&self, registry: Arc<PlatformRegistry>) -> RunService {
        RunService::new(
            self.runs.clone(),
            self.streams.clone(),
            self.integrations.clone(),
            self.queue.clone(),
            self.cache.clone(),
            registry,
        )
    }

    fn stream_service(&self, registry: Arc<PlatformRegistry>, max_retries: u32) -> StreamService {
        StreamService::new(
            self.runs.clone(),
            self.streams.clone(),
            self.data.clone(),
            self.integrations.clone(),
            self.queue.clone(),
            self.cache.clone(),
            registry,
            max_retries,
        )
    }

    fn data_service(&self, registry: Arc<PlatformRegistry>, max_retries: u32) -> DataService {
        DataService::new(
            self.runs.clone(),
            self.streams.clone(),
            self.data.clone(),
            self.integrations.clone(),
            self.queue.clone(),
            self.cache.clone(),
            registry,
            max_retries,
        )
    }
}

#[tokio::test]
async fn run_with_single_stream_completes_to_processed() {
    let fx = Fixture::new();
    let integration_id = fx.seed_integration();
    let run = Run::new(TenantId::new(), integration_id);
    let run_id = run.id();
    fx.runs.seed(run);

    let registry = registry_with(Arc::new(ScriptedHandler::new(|| Ok(()))));
    fx.run_service(registry.clone()).process(run_id).await.unwrap();

    assert_eq!(fx.runs.state_of(run_id), ExecutionState::Processing);

    let published = support::drain(&fx.queue).await;
    let stream_id = match published.as_slice() {
        [QueueMessage::ProcessStream { stream_id }] => *stream_id,
        other => panic!("expected exactly one ProcessStream message, got {other:?}"),
    };

    fx.stream_service(registry, 3).process(stream_id).await.unwrap();

    assert_eq!(fx.streams.state_of(stream_id), ExecutionState::Processed);
    assert_eq!(fx.runs.state_of(run_id), ExecutionState::Processed);
}

#[tokio::test]
async fn stream_retry_exhaustion_marks_run_errored() {
    let fx = Fixture::new();
    let integration_id = fx.seed_integration();
    let run = Run::new(TenantId::new(), integration_id);
    let run_id = run.id();
    fx.runs.seed(run);

    let registry = registry_with(Arc::new(ScriptedHandler::new(|| {
        Err(IntegrationError::transient("upstream hiccup"))
    })));
    let stream_service = fx.stream_service(registry.clone(), 1);

    let stream = Stream::new(run_id, json!({"page": 1}));
    let stream_id = stream.id();
    fx.streams.seed(stream);
    fx.runs.mark_processing(run_id).await.unwrap();

    // First failure: still under max_retries (1), stream is delayed.
    stream_service.process(stream_id).await.unwrap();
    assert_eq!(fx.streams.state_of(stream_id), ExecutionState::Delayed);
    assert_eq!(fx.streams.retries_of(stream_id), 1);

    // Resume and fail again: retries (1) is no longer under max_retries (1).
    fx.streams.resume(stream_id).await.unwrap();
    let err = stream_service.process(stream_id).await.unwrap_err();
    assert!(matches!(err, IntegrationError::Transient(_)));
    assert_eq!(fx.streams.state_of(stream_id), ExecutionState::Error);
    assert_eq!(fx.runs.state_of(run_id), ExecutionState::Error);
    assert_eq!(fx.runs.error_location_of(run_id).as_deref(), Some("stream-run-stop"));
}

#[tokio::test]
async fn stream_rate_limit_pauses_the_run_and_sweeper_resumes_it() {
    let fx = Fixture::new();
    let integration_id = fx.seed_integration();
    let run = Run::new(TenantId::new(), integration_id);
    let run_id = run.id();
    fx.runs.seed(run);
    fx.runs.mark_processing(run_id).await.unwrap();

    let registry = registry_with(Arc::new(ScriptedHandler::new(|| {
        Err(IntegrationError::rate_limited(std::time::Duration::from_secs(60)))
    })));
    let stream_service = fx.stream_service(registry, 3);

    let stream = Stream::new(run_id, json!({"page": 1}));
    let stream_id = stream.id();
    fx.streams.seed(stream);

    stream_service.process(stream_id).await.unwrap();

    assert_eq!(fx.streams.state_of(stream_id), ExecutionState::Pending);
    assert_eq!(fx.streams.retries_of(stream_id), 0);
    assert_eq!(fx.runs.state_of(run_id), ExecutionState::Delayed);
    let delayed_until = fx.runs.delayed_until_of(run_id).expect("run should record a delayed_until");
    assert!(delayed_until > chrono::Utc::now());

    // A sibling stream dispatched while the run is paused must not invoke
    // the handler, and ends in ERROR rather than stalling forever.
    let sibling = Stream::new(run_id, json!({"page": 2}));
    let sibling_id = sibling.id();
    fx.streams.seed(sibling);
    let err = fx.stream_service(registry_with(Arc::new(ScriptedHandler::new(|| Ok(())))), 3)
        .process(sibling_id)
        .await
        .unwrap_err();
    assert!(matches!(err, IntegrationError::RunAborted(_)));
    assert_eq!(fx.streams.state_of(sibling_id), ExecutionState::Error);

    // Once the delay elapses, the sweeper resumes the run to PROCESSING
    // and re-enqueues its PENDING stream rather than re-invoking the handler.
    fx.runs.resume(run_id).await.unwrap();
    assert_eq!(fx.runs.state_of(run_id), ExecutionState::Processing);

    let pending = fx.streams.find_pending_by_run(run_id).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id(), stream_id);
}

#[tokio::test]
async fn run_aborted_error_ends_the_run_immediately() {
    let fx = Fixture::new();
    let integration_id = fx.seed_integration();
    let run = Run::new(TenantId::new(), integration_id);
    let run_id = run.id();
    fx.runs.seed(run);

    let registry = registry_with(Arc::new(ScriptedHandler::new(|| {
        Err(IntegrationError::run_aborted("credentials revoked"))
    })));
    let stream_service = fx.stream_service(registry, 3);

    let stream = Stream::new(run_id, json!({"page": 1}));
    let stream_id = stream.id();
    fx.streams.seed(stream);
    fx.runs.mark_processing(run_id).await.unwrap();

    let err = stream_service.process(stream_id).await.unwrap_err();
    assert!(matches!(err, IntegrationError::RunAborted(_)));
    assert_eq!(fx.streams.state_of(stream_id), ExecutionState::Error);
    assert_eq!(fx.runs.state_of(run_id), ExecutionState::Error);
}

#[tokio::test]
async fn data_failure_notifies_an_already_completed_stream_without_erroring() {
    let fx = Fixture::new();
    let integration_id = fx.seed_integration();
    let run = Run::new(TenantId::new(), integration_id);
    let run_id = run.id();
    fx.runs.seed(run);

    let stream = Stream::new(run_id, json!({"page": 1}));
    let stream_id = stream.id();
    fx.streams.seed(stream);
    fx.streams.mark_processing(stream_id).await.unwrap();
    fx.streams.mark_processed(stream_id).await.unwrap();

    let data = pipeline_domain::entities::Data::new(stream_id, json!({"kind": "member"}));
    let data_id = data.id();
    fx.data.seed(data);

    let mut handler = ScriptedHandler::new(|| Ok(()));
    handler.data_result = || Err(IntegrationError::handler_aborted("sink offline"));
    let registry = registry_with(Arc::new(handler));
    let data_service = fx.data_service(registry, 0);

    // The owning run must be PROCESSING for the data item's dispatch
    // precondition to pass, independent of the owning stream's own state.
    fx.runs.mark_processing(run_id).await.unwrap();

    // max_retries is 0 and the failure isn't transient/rate-limited, so the
    // data item fails permanently on the first attempt.
    let result = data_service.process(data_id).await;
    assert!(result.is_err());
    assert_eq!(fx.data.state_of(data_id), ExecutionState::Error);

    let published = support::drain(&fx.queue).await;
    let (location, message) = match published.as_slice() {
        [QueueMessage::StreamError { stream_id: sid, location, message, .. }] => {
            assert_eq!(*sid, stream_id);
            (location.clone(), message.clone())
        }
        other => panic!("expected exactly one StreamError message, got {other:?}"),
    };

    // The owning stream was already PROCESSED; relaying the failure through
    // mark_failed must not error even though the stream cannot transition
    // again.
    fx.stream_service(registry_with(Arc::new(ScriptedHandler::new(|| Ok(())))), 0)
        .mark_failed(stream_id, &location, &message)
        .await
        .unwrap();
    assert_eq!(fx.streams.state_of(stream_id), ExecutionState::Processed);
}

#[tokio::test]
async fn unknown_platform_fails_run_dispatch_with_missing_dependency() {
    let fx = Fixture::new();
    let integration = IntegrationSnapshot::new(IntegrationId::new(), TenantId::new(), "unregistered", json!({}));
    let integration_id = integration.id();
    fx.integrations.seed(integration);

    let run = Run::new(TenantId::new(), integration_id);
    let run_id = run.id();
    fx.runs.seed(run);

    let registry = Arc::new(PlatformRegistry::new());
    let err = fx.run_service(registry).process(run_id).await.unwrap_err();

    assert!(matches!(err, IntegrationError::MissingDependency(_)));
    assert_eq!(fx.runs.state_of(run_id), ExecutionState::Error);
}
