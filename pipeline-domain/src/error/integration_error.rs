// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use std::time::Duration;

use thiserror::Error;

/// Domain-specific errors for the integration execution pipeline.
///
/// The variants mirror the error taxonomy handlers are expected to produce:
/// transient failures are retried, rate limits delay the whole stream,
/// handler/run aborts stop one unit of work without touching its siblings,
/// and `Fatal` marks a bug that should page someone rather than retry.
#[derive(Error, Debug, Clone)]
pub enum IntegrationError {
    /// A handler-reported failure expected to clear up on retry (network
    /// blip, upstream 5xx).
    #[error("transient failure: {0}")]
    Transient(String),

    /// The upstream platform asked us to back off; delay the owning stream
    /// rather than retrying immediately.
    #[error("rate limited, retry after {reset_after:?}")]
    RateLimited { reset_after: Duration },

    /// The handler gave up on this one stream; the run continues.
    #[error("handler aborted: {0}")]
    HandlerAborted(String),

    /// The handler determined the whole run cannot continue.
    #[error("run aborted: {0}")]
    RunAborted(String),

    /// A dependency the handler needed (credentials, prior stream output)
    /// is missing.
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    /// A bug or invariant violation; not retryable.
    #[error("fatal error: {0}")]
    Fatal(String),

    /// The requested run/stream/data/integration row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A repository update was rejected because the row's current state
    /// does not permit the requested transition.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntegrationError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn rate_limited(reset_after: Duration) -> Self {
        Self::RateLimited { reset_after }
    }

    pub fn handler_aborted(msg: impl Into<String>) -> Self {
        Self::HandlerAborted(msg.into())
    }

    pub fn run_aborted(msg: impl Into<String>) -> Self {
        Self::RunAborted(msg.into())
    }

    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Self::MissingDependency(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidStateTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn queue(msg: impl Into<String>) -> Self {
        Self::Queue(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the queue receiver loop should retry the message rather than
    /// parking it as an error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::RateLimited { .. })
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::RateLimited { .. } => "rate_limit",
            Self::HandlerAborted(_) => "handler_abort",
            Self::RunAborted(_) => "run_abort",
            Self::MissingDependency(_) => "missing_dependency",
            Self::Fatal(_) => "fatal",
            Self::NotFound(_) => "not_found",
            Self::InvalidStateTransition { .. } => "state_transition",
            Self::Database(_) => "database",
            Self::Serialization(_) => "serialization",
            Self::Queue(_) => "queue",
            Self::Configuration(_) => "configuration",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for IntegrationError {
    fn from(err: serde_json::Error) -> Self {
        IntegrationError::Serialization(err.to_string())
    }
}
