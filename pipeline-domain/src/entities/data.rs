// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! One sink-bound item produced by a stream (an activity, a member, a
//! conversation payload) awaiting delivery through `IntegrationSink`.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::IntegrationError;
use crate::value_objects::{DataId, ErrorInfo, ExecutionState, StreamId};

#[derive(Debug, Clone)]
pub struct Data {
    id: DataId,
    stream_id: StreamId,
    state: ExecutionState,
    payload: Value,
    retries: u32,
    delayed_until: Option<DateTime<Utc>>,
    error: Option<ErrorInfo>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Data {
    pub fn new(stream_id: StreamId, payload: Value) -> Self {
        let now = Utc::now();
        Self {
            id: DataId::new(),
            stream_id,
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
        id: DataId,
        stream_id: StreamId,
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
            stream_id,
            state,
            payload,
            retries,
            delayed_until,
            error,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> DataId {
        self.id
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
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

    pub fn mark_delayed(&mut self, until: DateTime<Utc>) -> Result<(), IntegrationError> {
        self.transition(ExecutionState::Delayed)?;
        self.delayed_until = Some(until);
        self.retries += 1;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), IntegrationError> {
        self.transition(ExecutionState::Pending)?;
        self.delayed_until = None;
        Ok(())
    }

    /// Rate-limit reset: returns the data item to PENDING immediately,
    /// without bumping `retries`. The owning run is paused instead.
    pub fn reset_for_rate_limit(&mut self) -> Result<(), IntegrationError> {
        self.transition(ExecutionState::Pending)
    }

    pub fn is_due_for_resume(&self, now: DateTime<Utc>) -> bool {
        self.state == ExecutionState::Delayed
            && self.delayed_until.map(|until| until <= now).unwrap_or(false)
    }
}
