// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Configuration loading for the pipeline binary.

pub mod config_service;

pub use config_service::{
    AlertSettings, ConfigService, DatabaseSettings, HealthCheckSettings, LoggingSettings, MetricsSettings,
    ObservabilitySettings, PipelineConfig, QueueSettings, TracingSettings, WorkerSettings,
};
