// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! In-memory repository/cache fakes for exercising the application
//! services without a database. Each fake stores rows behind a
//! `std::sync::Mutex<HashMap<_, _>>` and applies the same guarded state
//! transitions the Postgres adapters enforce, by delegating to the
//! entity's own `mark_*` methods rather than re-implementing the lattice.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use pipeline::infrastructure::queue::InMemoryQueue;
use pipeline_domain::entities::{Data, IntegrationSnapshot, Run, Stream};
use pipeline_domain::repositories::{DataRepository, IntegrationRepository, RunRepository, StreamRepository};
use pipeline_domain::services::{QueueMessage, RunCache};
use pipeline_domain::value_objects::{DataId, ErrorInfo, ExecutionState, IntegrationId, RunId, StreamId};
use pipeline_domain::IntegrationError;

#[derive(Default)]
pub struct InMemoryRunRepo {
    rows: Mutex<HashMap<RunId, Run>>,
}

impl InMemoryRunRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, run: Run) {
        self.rows.lock().unwrap().insert(run.id(), run);
    }

    pub fn state_of(&self, id: RunId) -> ExecutionState {
        self.rows.lock().unwrap().get(&id).unwrap().state()
    }

    pub fn error_location_of(&self, id: RunId) -> Option<String> {
        self.rows.lock().unwrap().get(&id).unwrap().error().map(|e| e.location.clone())
    }

    pub fn delayed_until_of(&self, id: RunId) -> Option<DateTime<Utc>> {
        self.rows.lock().unwrap().get(&id).unwrap().delayed_until()
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepo {
    async fn save(&self, run: &Run) -> Result<(), IntegrationError> {
        self.rows.lock().unwrap().insert(run.id(), run.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: RunId) -> Result<Run, IntegrationError> {
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| IntegrationError::not_found(format!("run {id}")))
    }

    async fn mark_processing(&self, id: RunId) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let run = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("run {id}")))?;
        run.mark_processing()
    }

    async fn mark_processed(&self, id: RunId) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let run = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("run {id}")))?;
        run.mark_processed()
    }

    async fn mark_error(&self, id: RunId, error: ErrorInfo) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let run = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("run {id}")))?;
        run.mark_error(error)
    }

    async fn mark_delayed(&self, id: RunId, until: DateTime<Utc>) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let run = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("run {id}")))?;
        run.mark_delayed(until)
    }

    async fn resume(&self, id: RunId) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let run = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("run {id}")))?;
        run.resume()
    }

    async fn find_due_for_resume(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Run>, IntegrationError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.values().filter(|r| r.is_due_for_resume(now)).take(limit as usize).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryStreamRepo {
    rows: Mutex<HashMap<StreamId, Stream>>,
}

impl InMemoryStreamRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, stream: Stream) {
        self.rows.lock().unwrap().insert(stream.id(), stream);
    }

    pub fn state_of(&self, id: StreamId) -> ExecutionState {
        self.rows.lock().unwrap().get(&id).unwrap().state()
    }

    pub fn retries_of(&self, id: StreamId) -> u32 {
        self.rows.lock().unwrap().get(&id).unwrap().retries()
    }
}

#[async_trait]
impl StreamRepository for InMemoryStreamRepo {
    async fn save(&self, stream: &Stream) -> Result<(), IntegrationError> {
        self.rows.lock().unwrap().insert(stream.id(), stream.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: StreamId) -> Result<Stream, IntegrationError> {
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| IntegrationError::not_found(format!("stream {id}")))
    }

    async fn mark_processing(&self, id: StreamId) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let stream = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("stream {id}")))?;
        stream.mark_processing()
    }

    async fn mark_processed(&self, id: StreamId) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let stream = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("stream {id}")))?;
        stream.mark_processed()
    }

    async fn mark_error(&self, id: StreamId, error: ErrorInfo) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let stream = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("stream {id}")))?;
        stream.mark_error(error)
    }

    async fn mark_delayed(&self, id: StreamId, until: DateTime<Utc>) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let stream = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("stream {id}")))?;
        stream.mark_delayed(until)
    }

    async fn count_unfinished(&self, run_id: RunId) -> Result<u64, IntegrationError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.values().filter(|s| s.run_id() == run_id && !s.state().is_terminal()).count() as u64)
    }

    async fn find_due_for_resume(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Stream>, IntegrationError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|s| s.is_due_for_resume(now))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn resume(&self, id: StreamId) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let stream = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("stream {id}")))?;
        stream.resume()
    }

    async fn reset_for_rate_limit(&self, id: StreamId) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let stream = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("stream {id}")))?;
        stream.reset_for_rate_limit()
    }

    async fn count_by_run(&self, run_id: RunId) -> Result<u64, IntegrationError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.values().filter(|s| s.run_id() == run_id).count() as u64)
    }

    async fn find_pending_by_run(&self, run_id: RunId) -> Result<Vec<Stream>, IntegrationError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|s| s.run_id() == run_id && s.state() == ExecutionState::Pending)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryDataRepo {
    rows: Mutex<HashMap<DataId, Data>>,
}

impl InMemoryDataRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, data: Data) {
        self.rows.lock().unwrap().insert(data.id(), data);
    }

    pub fn state_of(&self, id: DataId) -> ExecutionState {
        self.rows.lock().unwrap().get(&id).unwrap().state()
    }
}

#[async_trait]
impl DataRepository for InMemoryDataRepo {
    async fn save(&self, data: &Data) -> Result<(), IntegrationError> {
        self.rows.lock().unwrap().insert(data.id(), data.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: DataId) -> Result<Data, IntegrationError> {
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| IntegrationError::not_found(format!("data {id}")))
    }

    async fn mark_processing(&self, id: DataId) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let data = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("data {id}")))?;
        data.mark_processing()
    }

    async fn mark_processed(&self, id: DataId) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let data = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("data {id}")))?;
        data.mark_processed()
    }

    async fn mark_error(&self, id: DataId, error: ErrorInfo) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let data = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("data {id}")))?;
        data.mark_error(error)
    }

    async fn mark_delayed(&self, id: DataId, until: DateTime<Utc>) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let data = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("data {id}")))?;
        data.mark_delayed(until)
    }

    async fn find_due_for_resume(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Data>, IntegrationError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|d| d.is_due_for_resume(now))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn resume(&self, id: DataId) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let data = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("data {id}")))?;
        data.resume()
    }

    async fn reset_for_rate_limit(&self, id: DataId) -> Result<(), IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let data = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found(format!("data {id}")))?;
        data.reset_for_rate_limit()
    }
}

#[derive(Default)]
pub struct InMemoryIntegrationRepo {
    rows: Mutex<HashMap<IntegrationId, IntegrationSnapshot>>,
}

impl InMemoryIntegrationRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, snapshot: IntegrationSnapshot) {
        self.rows.lock().unwrap().insert(snapshot.id(), snapshot);
    }
}

#[async_trait]
impl IntegrationRepository for InMemoryIntegrationRepo {
    async fn find_by_id(&self, id: IntegrationId) -> Result<IntegrationSnapshot, IntegrationError> {
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| IntegrationError::not_found(format!("integration {id}")))
    }

    async fn update_settings(&self, id: IntegrationId, patch: Value) -> Result<IntegrationSnapshot, IntegrationError> {
        let mut rows = self.rows.lock().unwrap();
        let snapshot = rows.get(&id).ok_or_else(|| IntegrationError::not_found(format!("integration {id}")))?;
        let merged = snapshot.merged_settings(&patch);
        let updated = IntegrationSnapshot::new(id, snapshot.tenant_id(), snapshot.platform().to_string(), merged);
        rows.insert(id, updated.clone());
        Ok(updated)
    }
}

#[derive(Default)]
pub struct InMemoryCache {
    values: Mutex<HashMap<(RunId, String), Value>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunCache for InMemoryCache {
    async fn get(&self, run_id: RunId, key: &str) -> Result<Option<Value>, IntegrationError> {
        Ok(self.values.lock().unwrap().get(&(run_id, key.to_string())).cloned())
    }

    async fn set(&self, run_id: RunId, key: &str, value: Value) -> Result<(), IntegrationError> {
        self.values.lock().unwrap().insert((run_id, key.to_string()), value);
        Ok(())
    }
}

/// Wraps an `InMemoryQueue` with the `.drain_pending()` inspection hook
/// tests use to assert on published messages without going through
/// `receive`'s in-flight bookkeeping.
pub fn queue_handle() -> std::sync::Arc<InMemoryQueue> {
    std::sync::Arc::new(InMemoryQueue::new())
}

pub async fn drain(queue: &InMemoryQueue) -> Vec<QueueMessage> {
    queue.drain_pending().await
}
