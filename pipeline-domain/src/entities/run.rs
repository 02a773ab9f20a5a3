// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The top-level unit of work: one execution of one integration for one
//! tenant, fanning out into streams.

use chrono::{DateTime, Utc};

use crate::error::IntegrationError;
use crate::value_objects::{ErrorInfo, ExecutionState, IntegrationId, RunId, TenantId};

/// A single run of an integration.
///
/// Identity is `id`; state moves through the shared execution lattice in
/// [`ExecutionState`]. A run is aborted by a handler calling
/// `abort_run_with_error`, which marks it `ERROR` regardless of its
/// streams' individual outcomes.
#[derive(Debug, Clone)]
pub struct Run {
    id: RunId,
    tenant_id: TenantId,
    integration_id: IntegrationId,
    state: ExecutionState,
    delayed_until: Option<DateTime<Utc>>,
    error: Option<ErrorInfo>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Run {
    pub fn new(tenant_id: TenantId, integration_id: IntegrationId) -> Self {
        let now = Utc::now();
        Self {
            id: RunId::new(),
            tenant_id,
            integration_id,
            state: ExecutionState::Pending,
            delayed_until: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstructs a run from persisted fields; used by repository
    /// adapters decoding rows, not by code creating new runs.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: RunId,
        tenant_id: TenantId,
        integration_id: IntegrationId,
        state: ExecutionState,
        delayed_until: Option<DateTime<Utc>>,
        error: Option<ErrorInfo>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            integration_id,
            state,
            delayed_until,
            error,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn integration_id(&self) -> IntegrationId {
        self.integration_id
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn delayed_until(&self) -> Option<DateTime<Utc>> {
        self.delayed_until
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

    /// Pauses the run until `until`, e.g. when one of its streams hit a
    /// platform rate limit. All sibling streams short-circuit at the
    /// run-state check until this run resumes.
    pub fn mark_delayed(&mut self, until: DateTime<Utc>) -> Result<(), IntegrationError> {
        self.transition(ExecutionState::Delayed)?;
        self.delayed_until = Some(until);
        Ok(())
    }

    /// The sweeper's resume edge: `DELAYED -> PROCESSING`. A run has no
    /// PENDING to return to — it was already dispatched when it paused.
    pub fn resume(&mut self) -> Result<(), IntegrationError> {
        self.transition(ExecutionState::Processing)?;
        self.delayed_until = None;
        Ok(())
    }

    pub fn is_due_for_resume(&self, now: DateTime<Utc>) -> bool {
        self.state == ExecutionState::Delayed
            && self.delayed_until.map(|until| until <= now).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_run() -> Run {
        Run::new(TenantId::new(), IntegrationId::new())
    }

    #[test]
    fn starts_pending() {
        let run = new_run();
        assert_eq!(run.state(), ExecutionState::Pending);
        assert!(run.error().is_none());
    }

    #[test]
    fn happy_path_reaches_processed() {
        let mut run = new_run();
        run.mark_processing().unwrap();
        run.mark_processed().unwrap();
        assert_eq!(run.state(), ExecutionState::Processed);
    }

    #[test]
    fn cannot_skip_processing() {
        let mut run = new_run();
        assert!(run.mark_processed().is_err());
    }

    #[test]
    fn abort_records_error_info() {
        let mut run = new_run();
        run.mark_processing().unwrap();
        run.mark_error(ErrorInfo::new("handler", "boom")).unwrap();
        assert_eq!(run.state(), ExecutionState::Error);
        assert_eq!(run.error().unwrap().message, "boom");
    }

    #[test]
    fn rate_limit_pause_resumes_to_processing_not_pending() {
        use chrono::Duration;

        let mut run = new_run();
        run.mark_processing().unwrap();
        run.mark_delayed(Utc::now() + Duration::seconds(60)).unwrap();
        assert_eq!(run.state(), ExecutionState::Delayed);
        assert!(run.delayed_until().is_some());

        run.resume().unwrap();
        assert_eq!(run.state(), ExecutionState::Processing);
        assert!(run.delayed_until().is_none());
    }

    #[test]
    fn due_for_resume_only_after_delay_elapses() {
        use chrono::Duration;

        let mut run = new_run();
        run.mark_processing().unwrap();
        run.mark_delayed(Utc::now() + Duration::seconds(60)).unwrap();

        assert!(!run.is_due_for_resume(Utc::now()));
        assert!(run.is_due_for_resume(Utc::now() + Duration::seconds(61)));
    }
}
