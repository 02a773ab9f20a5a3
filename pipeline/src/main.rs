// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Integration Pipeline Entry Point
//!
//! Wires the composition root: configuration, logging, metrics, the
//! Postgres repositories, the queue, the per-run cache, and the platform
//! registry, then dispatches on the validated CLI command.
//!
//! - `serve` runs the queue receiver loop, the delay sweeper, and the
//!   metrics endpoint as supervised tasks until a shutdown signal arrives.
//! - `sweep` runs one sweeper pass and exits.
//! - `migrate` applies embedded database migrations and exits.
//! - `enqueue-run` publishes a single `ProcessRun` message and exits.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bootstrap::cli::{parse_and_validate, ValidatedCommand};
use bootstrap::shutdown::ShutdownCoordinator;
use bootstrap::signals::{create_signal_handler, ShutdownCallback};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

use pipeline_domain::repositories::{DataRepository, IntegrationRepository, RunRepository, StreamRepository};
use pipeline_domain::services::{Queue, QueueMessage, ReceivedMessage, RunCache};
use pipeline_domain::value_objects::RunId;
use pipeline_domain::IntegrationError;

use pipeline::application::{DataService, PlatformRegistry, RunService, StreamService};
use pipeline::infrastructure::cache::MokaRunCache;
use pipeline::infrastructure::config::{ConfigService, PipelineConfig};
use pipeline::infrastructure::logging::init_logging;
use pipeline::infrastructure::metrics::{serve_metrics, MetricsService};
use pipeline::infrastructure::queue::{InMemoryQueue, SqsQueue};
use pipeline::infrastructure::repositories::{
    PostgresDataRepository, PostgresIntegrationRepository, PostgresRunRepository, PostgresStreamRepository,
};
use pipeline::infrastructure::runtime::{join_supervised, spawn_supervised, Sweeper};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "pipeline exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), IntegrationError> {
    let cli = parse_and_validate().map_err(|e| IntegrationError::invalid_config(e.to_string()))?;

    let config = match &cli.config {
        Some(path) => ConfigService::load_from_path(path)?,
        None => ConfigService::load_default()?,
    };

    init_logging(&config.logging)?;
    info!(command = ?cli.command, "starting integration pipeline");

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.connection_string)
        .await
        .map_err(|e| IntegrationError::database(format!("failed to connect to database: {e}")))?;

    let runs: Arc<dyn RunRepository> = Arc::new(PostgresRunRepository::new(pool.clone()));
    let streams: Arc<dyn StreamRepository> = Arc::new(PostgresStreamRepository::new(pool.clone()));
    let data: Arc<dyn DataRepository> = Arc::new(PostgresDataRepository::new(pool.clone()));
    let integrations: Arc<dyn IntegrationRepository> = Arc::new(PostgresIntegrationRepository::new(pool.clone()));

    match cli.command {
        ValidatedCommand::Migrate => {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| IntegrationError::database(format!("migration failed: {e}")))?;
            info!("migrations applied");
            return Ok(());
        }
        ValidatedCommand::EnqueueRun { run_id } => {
            let run_id = RunId::from_str(&run_id)
                .map_err(|e| IntegrationError::invalid_config(format!("invalid run id: {e}")))?;
            let queue = build_queue(&config).await?;
            queue.init().await?;
            queue.send(QueueMessage::ProcessRun { run_id }).await?;
            info!(%run_id, "enqueued run");
            return Ok(());
        }
        ValidatedCommand::Sweep => {
            let queue = build_queue(&config).await?;
            queue.init().await?;
            let sweeper =
                Sweeper::new(runs.clone(), streams.clone(), data.clone(), queue.clone(), config.worker.sweep_batch_size);
            let resumed = sweeper.sweep_once().await?;
            info!(resumed, "sweep complete");
            return Ok(());
        }
        ValidatedCommand::Serve => {}
    }

    let queue = build_queue(&config).await?;
    queue.init().await?;

    let cache: Arc<dyn RunCache> = Arc::new(MokaRunCache::new(100_000, Duration::from_secs(6 * 3600)));

    let mut registry = PlatformRegistry::new();
    register_handlers(&mut registry);
    let registry = Arc::new(registry);

    let metrics = MetricsService::new()?;

    let run_service = Arc::new(RunService::new(
        runs.clone(),
        streams.clone(),
        integrations.clone(),
        queue.clone(),
        cache.clone(),
        registry.clone(),
    ));
    let stream_service = Arc::new(StreamService::new(
        runs.clone(),
        streams.clone(),
        data.clone(),
        integrations.clone(),
        queue.clone(),
        cache.clone(),
        registry.clone(),
        config.worker.max_stream_retries,
    ));
    let data_service = Arc::new(DataService::new(
        runs.clone(),
        streams.clone(),
        data.clone(),
        integrations.clone(),
        queue.clone(),
        cache.clone(),
        registry.clone(),
        config.worker.max_data_retries,
    ));

    let shutdown = ShutdownCoordinator::default();
    let signal_token = shutdown.token();
    let signal_handler = create_signal_handler();
    tokio::spawn(async move {
        let callback: ShutdownCallback = Box::new(move || signal_token.cancel());
        signal_handler.wait_for_signal(callback).await;
    });

    let metrics_addr = format!("0.0.0.0:{}", config.metrics.port)
        .parse()
        .map_err(|e| IntegrationError::invalid_config(format!("invalid metrics port: {e}")))?;
    let metrics_token = shutdown.token();
    let metrics_for_endpoint = metrics.clone();
    let metrics_handle = spawn_supervised("metrics-endpoint", async move {
        serve_metrics(metrics_addr, metrics_for_endpoint, async move { metrics_token.cancelled().await }).await
    });

    let sweeper = Sweeper::new(runs.clone(), streams.clone(), data.clone(), queue.clone(), config.worker.sweep_batch_size);
    let sweep_token = shutdown.token();
    let sweep_interval = Duration::from_secs(config.worker.sweep_interval_secs);
    let sweeper_handle = spawn_supervised("delay-sweeper", async move {
        sweeper.run(sweep_interval, async move { sweep_token.cancelled().await }).await;
        Ok(())
    });

    let receiver_token = shutdown.token();
    let receiver_handle = spawn_supervised("queue-receiver", {
        let queue = queue.clone();
        let metrics = metrics.clone();
        let concurrency = cli.max_concurrent.unwrap_or(config.worker.max_concurrent_message_processing);
        async move {
            receive_loop(
                queue,
                run_service,
                stream_service,
                data_service,
                metrics,
                concurrency,
                receiver_token,
            )
            .await
        }
    });

    join_supervised(receiver_handle).await?;
    shutdown.initiate_shutdown();
    join_supervised(sweeper_handle).await?;
    join_supervised(metrics_handle).await?;

    info!("pipeline shut down cleanly");
    Ok(())
}

async fn build_queue(config: &PipelineConfig) -> Result<Arc<dyn Queue>, IntegrationError> {
    if config.queue.queue_url.is_empty() {
        warn!("no queue_url configured, using an in-process queue (not suitable for production)");
        return Ok(Arc::new(InMemoryQueue::new()));
    }
    let client = SqsQueue::from_env(config.queue.region.clone(), config.queue.queue_url.clone()).await;
    Ok(Arc::new(client))
}

/// Registers the platform handlers this binary ships with. The handler
/// contract is the pluggable seam; no concrete handler lives in this
/// repository, so this registers none by default.
fn register_handlers(_registry: &mut PlatformRegistry) {}

#[allow(clippy::too_many_arguments)]
async fn receive_loop(
    queue: Arc<dyn Queue>,
    run_service: Arc<RunService>,
    stream_service: Arc<StreamService>,
    data_service: Arc<DataService>,
    metrics: MetricsService,
    concurrency: usize,
    shutdown: bootstrap::shutdown::CancellationToken,
) -> Result<(), IntegrationError> {
    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));

    loop {
        if shutdown.is_cancelled() {
            return Ok(());
        }

        let received = tokio::select! {
            received = queue.receive(10, 20) => received?,
            _ = shutdown.cancelled() => return Ok(()),
        };

        for message in received {
            let permit = semaphore.clone().acquire_owned().await.map_err(|e| IntegrationError::internal(e.to_string()))?;
            let queue = queue.clone();
            let run_service = run_service.clone();
            let stream_service = stream_service.clone();
            let data_service = data_service.clone();
            let metrics = metrics.clone();

            tokio::spawn(async move {
                let _permit = permit;
                dispatch_one(queue, run_service, stream_service, data_service, metrics, message).await;
            });
        }
    }
}

async fn dispatch_one(
    queue: Arc<dyn Queue>,
    run_service: Arc<RunService>,
    stream_service: Arc<StreamService>,
    data_service: Arc<DataService>,
    metrics: MetricsService,
    received: ReceivedMessage,
) {
    let stage = stage_label(&received.body);
    metrics.increment_in_flight();
    let started = Instant::now();

    let result = match received.body {
        QueueMessage::ProcessRun { run_id } => run_service.process(run_id).await,
        QueueMessage::ProcessStream { stream_id } => stream_service.process(stream_id).await,
        QueueMessage::ProcessData { data_id } => data_service.process(data_id).await,
        QueueMessage::StreamError { stream_id, location, message, .. } => {
            stream_service.mark_failed(stream_id, &location, &message).await
        }
    };

    metrics.record_processing_duration(started.elapsed());
    metrics.decrement_in_flight();

    match result {
        Ok(()) => {
            metrics.record_processed(stage);
            if let Err(e) = queue.delete_message(&received.receipt_handle).await {
                warn!(error = %e, "failed to delete acknowledged message");
            }
        }
        Err(IntegrationError::Transient(_)) | Err(IntegrationError::RateLimited { .. }) => {
            metrics.record_delayed(stage);
            if let Err(e) = queue.delete_message(&received.receipt_handle).await {
                warn!(error = %e, "failed to delete delayed message");
            }
        }
        Err(e) => {
            metrics.record_failed(stage);
            error!(error = %e, stage, "message processing failed permanently");
            if let Err(e) = queue.delete_message(&received.receipt_handle).await {
                warn!(error = %e, "failed to delete failed message");
            }
        }
    }
}

fn stage_label(message: &QueueMessage) -> &'static str {
    match message {
        QueueMessage::ProcessRun { .. } => "run",
        QueueMessage::ProcessStream { .. } => "stream",
        QueueMessage::ProcessData { .. } => "data",
        QueueMessage::StreamError { .. } => "stream",
    }
}
