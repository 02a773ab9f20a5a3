// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics Service
//!
//! Prometheus metrics for the queue receiver loop and the three execution
//! stages (run, stream, data). Counters track messages processed, retried,
//! and delayed per stage; a gauge tracks in-flight message processing.

use prometheus::{Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use tracing::debug;

use pipeline_domain::IntegrationError;

/// Prometheus metrics for pipeline message processing.
#[derive(Clone)]
pub struct MetricsService {
    registry: Arc<Registry>,

    messages_processed_total: IntCounterVec,
    messages_failed_total: IntCounterVec,
    messages_delayed_total: IntCounterVec,
    message_processing_duration: Histogram,
    in_flight_messages: IntGauge,
}

impl MetricsService {
    /// Creates a new `MetricsService` with a fresh Prometheus registry.
    pub fn new() -> Result<Self, IntegrationError> {
        let registry = Registry::new();

        let messages_processed_total = IntCounterVec::new(
            Opts::new("messages_processed_total", "Messages successfully processed, by stage")
                .namespace("integration_pipeline"),
            &["stage"],
        )
        .map_err(|e| IntegrationError::internal(format!("failed to create messages_processed_total: {e}")))?;

        let messages_failed_total = IntCounterVec::new(
            Opts::new("messages_failed_total", "Messages that ended in a fatal error, by stage")
                .namespace("integration_pipeline"),
            &["stage"],
        )
        .map_err(|e| IntegrationError::internal(format!("failed to create messages_failed_total: {e}")))?;

        let messages_delayed_total = IntCounterVec::new(
            Opts::new("messages_delayed_total", "Messages delayed for retry, by stage")
                .namespace("integration_pipeline"),
            &["stage"],
        )
        .map_err(|e| IntegrationError::internal(format!("failed to create messages_delayed_total: {e}")))?;

        let message_processing_duration = Histogram::with_opts(
            HistogramOpts::new("message_processing_duration_seconds", "Time spent handling one message")
                .namespace("integration_pipeline")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]),
        )
        .map_err(|e| IntegrationError::internal(format!("failed to create message_processing_duration: {e}")))?;

        let in_flight_messages = IntGauge::with_opts(
            Opts::new("in_flight_messages", "Messages currently being processed").namespace("integration_pipeline"),
        )
        .map_err(|e| IntegrationError::internal(format!("failed to create in_flight_messages: {e}")))?;

        registry
            .register(Box::new(messages_processed_total.clone()))
            .map_err(|e| IntegrationError::internal(format!("failed to register messages_processed_total: {e}")))?;
        registry
            .register(Box::new(messages_failed_total.clone()))
            .map_err(|e| IntegrationError::internal(format!("failed to register messages_failed_total: {e}")))?;
        registry
            .register(Box::new(messages_delayed_total.clone()))
            .map_err(|e| IntegrationError::internal(format!("failed to register messages_delayed_total: {e}")))?;
        registry
            .register(Box::new(message_processing_duration.clone()))
            .map_err(|e| IntegrationError::internal(format!("failed to register message_processing_duration: {e}")))?;
        registry
            .register(Box::new(in_flight_messages.clone()))
            .map_err(|e| IntegrationError::internal(format!("failed to register in_flight_messages: {e}")))?;

        debug!("metrics service initialized");

        Ok(Self {
            registry: Arc::new(registry),
            messages_processed_total,
            messages_failed_total,
            messages_delayed_total,
            message_processing_duration,
            in_flight_messages,
        })
    }

    pub fn record_processed(&self, stage: &str) {
        self.messages_processed_total.with_label_values(&[stage]).inc();
    }

    pub fn record_failed(&self, stage: &str) {
        self.messages_failed_total.with_label_values(&[stage]).inc();
    }

    pub fn record_delayed(&self, stage: &str) {
        self.messages_delayed_total.with_label_values(&[stage]).inc();
    }

    pub fn record_processing_duration(&self, duration: std::time::Duration) {
        self.message_processing_duration.observe(duration.as_secs_f64());
    }

    pub fn increment_in_flight(&self) {
        self.in_flight_messages.inc();
    }

    pub fn decrement_in_flight(&self) {
        self.in_flight_messages.dec();
    }

    /// Renders the registry in Prometheus text exposition format.
    pub fn render(&self) -> Result<String, IntegrationError> {
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .map_err(|e| IntegrationError::internal(format!("failed to encode metrics: {e}")))
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }
}

impl Default for MetricsService {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self::new().expect("failed to create default MetricsService")
    }
}
