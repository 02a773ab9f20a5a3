// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration Service
//!
//! Loads the pipeline's runtime configuration: logging, metrics, the queue
//! and database connections, and the worker pool's concurrency and retry
//! settings. Configuration is layered: a TOML file provides the base values,
//! and `INTPIPE_*` environment variables override individual keys.
//!
//! ## Configuration Sources
//!
//! - **File**: `pipeline.toml` in the current directory or a parent,
//!   or an explicit path passed on the CLI.
//! - **Environment**: `INTPIPE_<SECTION>__<KEY>` overrides, e.g.
//!   `INTPIPE_WORKER__MAX_CONCURRENT_MESSAGE_PROCESSING=32`.
//! - **Defaults**: every section has a conservative default so the
//!   pipeline starts even with no config file present.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use pipeline_domain::IntegrationError;

/// Top level runtime configuration for the pipeline binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub observability: ObservabilitySettings,
    pub logging: LoggingSettings,
    pub metrics: MetricsSettings,
    pub health_checks: HealthCheckSettings,
    pub tracing: TracingSettings,
    pub alerts: AlertSettings,
    pub queue: QueueSettings,
    pub database: DatabaseSettings,
    pub worker: WorkerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    pub enable_structured_logging: bool,
    pub enable_performance_tracing: bool,
    pub enable_health_checks: bool,
    pub metrics_export_interval_secs: u64,
    pub trace_sample_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    /// `"pretty"` or `"json"`.
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    pub port: u16,
    pub enable_custom_metrics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckSettings {
    pub interval_secs: u64,
    pub error_rate_threshold_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingSettings {
    pub enable_distributed_tracing: bool,
    pub jaeger_endpoint: String,
    pub service_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSettings {
    pub enable_alerts: bool,
    pub webhook_url: String,
    pub error_rate_alert_threshold: f64,
}

/// SQS-compatible queue connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    pub queue_url: String,
    pub region: String,
    /// Long-poll wait time for `receive_message`, in seconds.
    pub wait_time_seconds: u32,
    /// Visibility timeout applied to messages while a worker holds them.
    pub visibility_timeout_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub connection_string: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Sizes the semaphore gating the queue receiver loop.
    pub max_concurrent_message_processing: usize,
    pub max_stream_retries: u32,
    pub max_data_retries: u32,
    /// How often the sweeper scans for elapsed `DELAYED` rows.
    pub sweep_interval_secs: u64,
    /// Batch size passed to `find_due_for_resume`.
    pub sweep_batch_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            observability: ObservabilitySettings {
                enable_structured_logging: true,
                enable_performance_tracing: true,
                enable_health_checks: true,
                metrics_export_interval_secs: 30,
                trace_sample_rate: 1.0,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
            metrics: MetricsSettings {
                port: 9090,
                enable_custom_metrics: true,
            },
            health_checks: HealthCheckSettings {
                interval_secs: 30,
                error_rate_threshold_percent: 5.0,
            },
            tracing: TracingSettings {
                enable_distributed_tracing: false,
                jaeger_endpoint: "http://localhost:14268/api/traces".to_string(),
                service_name: "integration-pipeline".to_string(),
            },
            alerts: AlertSettings {
                enable_alerts: false,
                webhook_url: String::new(),
                error_rate_alert_threshold: 10.0,
            },
            queue: QueueSettings {
                queue_url: String::new(),
                region: "us-east-1".to_string(),
                wait_time_seconds: 20,
                visibility_timeout_seconds: 60,
            },
            database: DatabaseSettings {
                connection_string: "postgres://localhost/integration_pipeline".to_string(),
                max_connections: 10,
            },
            worker: WorkerSettings {
                max_concurrent_message_processing: 16,
                max_stream_retries: 5,
                max_data_retries: 5,
                sweep_interval_secs: 60,
                sweep_batch_size: 100,
            },
        }
    }
}

/// Loads [`PipelineConfig`] from a TOML file layered with `INTPIPE_*`
/// environment overrides.
pub struct ConfigService;

impl ConfigService {
    /// Load configuration from an explicit path, falling back to defaults
    /// (still subject to environment overrides) if the file is absent.
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<PipelineConfig, IntegrationError> {
        let config_path = config_path.as_ref();

        let mut builder = Config::builder().add_source(Config::try_from(&PipelineConfig::default()).map_err(
            |e| IntegrationError::invalid_config(format!("failed to seed config defaults: {e}")),
        )?);

        if config_path.exists() {
            builder = builder.add_source(File::from(config_path));
        } else {
            warn!(path = %config_path.display(), "config file not found, using defaults");
        }

        let config = builder
            .add_source(Environment::with_prefix("INTPIPE").separator("__"))
            .build()
            .map_err(|e| IntegrationError::invalid_config(format!("failed to build config: {e}")))?;

        let config: PipelineConfig = config
            .try_deserialize()
            .map_err(|e| IntegrationError::invalid_config(format!("failed to deserialize config: {e}")))?;

        debug!(
            metrics_port = config.metrics.port,
            queue_url = %config.queue.queue_url,
            "loaded pipeline configuration"
        );

        Ok(config)
    }

    /// Search the current directory and up to three parents for
    /// `pipeline.toml`, loading defaults if none is found.
    pub fn load_default() -> Result<PipelineConfig, IntegrationError> {
        let mut current_dir = std::env::current_dir()
            .map_err(|e| IntegrationError::invalid_config(format!("failed to get current directory: {e}")))?;

        for _ in 0..4 {
            let candidate = current_dir.join("pipeline.toml");
            if candidate.exists() {
                return Self::load_from_path(candidate);
            }
            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        warn!("no pipeline.toml found in current or parent directories, using defaults");
        Self::load_from_path("pipeline.toml")
    }
}
