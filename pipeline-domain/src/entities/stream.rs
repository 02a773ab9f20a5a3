// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! One unit of fan-out work dispatched by a run's handler.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::IntegrationError;
use crate::value_objects::{ErrorInfo, ExecutionState, RunId, StreamId};

/// A stream: one piece of work a run's handler asked to be processed,
/// such as "fetch page 3 of channel messages". Carries its own retry
/// count because streams, not runs, are the unit of retry and delay.
#[derive(Debug, Clone)]
pub struct Stream {
    id: StreamId,
    run_id: RunId,
    state: ExecutionState,
    payload: Value,
    retries: u32,
    delayed_until: Option<DateTime<Utc>>,
    error: Option<ErrorInfo>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Stream {
    pub fn new(run_id: RunId, payload: Value) -> Self {
        let now = Utc::now();
        Self {
            id: StreamId::new(),
            run_id,
            state: ExecutionState::Pending,
            payload,
            retries: 0,
            delayed_until: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: StreamId,
        run_id: RunId,
        state: ExecutionState,
        payload: Value,
        retries: u32,
        delayed_until: Option<DateTime<Utc>>,
        error: Option<ErrorInfo>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            run_id,
            state,
            payload,
            retries,
            delayed_until,
            error,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn delayed_until(&self) -> Option<DateTime<Utc>> {
        self.delayed_until
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn transition(&mut self, next: ExecutionState) -> Result<(), IntegrationError> {
        if !self.state.can_transition_to(next) {
            return Err(IntegrationError::invalid_transition(
                self.state.to_string(),
                next.to_string(),
            ));
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_processing(&mut self) -> Result<(), IntegrationError> {
        self.transition(ExecutionState::Processing)
    }

    pub fn mark_processed(&mut self) -> Result<(), IntegrationError> {
        self.transition(ExecutionState::Processed)
    }

    pub fn mark_error(&mut self, error: ErrorInfo) -> Result<(), IntegrationError> {
        self.transition(ExecutionState::Error)?;
        self.error = Some(error);
        Ok(())
    }

    /// Delays the stream until `until`, bumping its retry counter. Callers
    /// decide the backoff (linear, per the data-worker-reuses-stream-policy
    /// design note); this entity only enforces the state edge.
    pub fn mark_delayed(&mut self, until: DateTime<Utc>) -> Result<(), IntegrationError> {
        self.transition(ExecutionState::Delayed)?;
        self.delayed_until = Some(until);
        self.retries += 1;
        Ok(())
    }

    /// The sweeper's resume edge: `DELAYED -> PENDING` once `delayed_until`
    /// has passed.
    pub fn resume(&mut self) -> Result<(), IntegrationError> {
        self.transition(ExecutionState::Pending)?;
        self.delayed_until = None;
        Ok(())
    }

    /// Rate-limit reset: returns the stream to PENDING immediately, without
    /// bumping `retries` or going through DELAYED. The owning run is paused
    /// instead, so this stream is re-dispatched once the run resumes rather
    /// than on its own backoff timer.
    pub fn reset_for_rate_limit(&mut self) -> Result<(), IntegrationError> {
        self.transition(ExecutionState::Pending)
    }

    pub fn is_due_for_resume(&self, now: DateTime<Utc>) -> bool {
        self.state == ExecutionState::Delayed
            && self.delayed_until.map(|until| until <= now).unwrap_or(false)
    }
}
