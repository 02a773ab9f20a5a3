// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Delay Sweeper
//!
//! Periodically scans for `DELAYED` streams, data items, and runs whose
//! delay has elapsed and resumes each one, re-publishing queue messages so
//! the receiver loop picks the work back up. Streams and data resume
//! `DELAYED -> PENDING`; a run resumes `DELAYED -> PROCESSING` and has its
//! PENDING streams re-enqueued directly, since a run has no handler to
//! re-invoke on resume (see `RunService::process`'s resume branch).

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use pipeline_domain::repositories::{DataRepository, RunRepository, StreamRepository};
use pipeline_domain::services::{Queue, QueueMessage};
use pipeline_domain::IntegrationError;

pub struct Sweeper {
    runs: Arc<dyn RunRepository>,
    streams: Arc<dyn StreamRepository>,
    data: Arc<dyn DataRepository>,
    queue: Arc<dyn Queue>,
    batch_size: u32,
}

impl Sweeper {
    pub fn new(
        runs: Arc<dyn RunRepository>,
        streams: Arc<dyn StreamRepository>,
        data: Arc<dyn DataRepository>,
        queue: Arc<dyn Queue>,
        batch_size: u32,
    ) -> Self {
        Self { runs, streams, data, queue, batch_size }
    }

    /// Runs one sweep pass: resumes every due run, stream, and data row,
    /// re-publishing a message for each. Returns the number resumed.
    pub async fn sweep_once(&self) -> Result<u32, IntegrationError> {
        let now = chrono::Utc::now();
        let mut resumed = 0;

        for run in self.runs.find_due_for_resume(now, self.batch_size).await? {
            let run_id = run.id();
            if let Err(e) = self.runs.resume(run_id).await {
                error!(error = %e, %run_id, "failed to resume run, skipping");
                continue;
            }
            let pending = match self.streams.find_pending_by_run(run_id).await {
                Ok(pending) => pending,
                Err(e) => {
                    error!(error = %e, %run_id, "resumed run but failed to load its pending streams");
                    continue;
                }
            };
            for stream in pending {
                let stream_id = stream.id();
                if let Err(e) = self.queue.send(QueueMessage::ProcessStream { stream_id }).await {
                    error!(error = %e, %stream_id, "resumed run but failed to re-enqueue one of its streams");
                }
            }
            debug!(%run_id, "resumed delayed run");
            resumed += 1;
        }

        for stream in self.streams.find_due_for_resume(now, self.batch_size).await? {
            let stream_id = stream.id();
            if let Err(e) = self.streams.resume(stream_id).await {
                error!(error = %e, %stream_id, "failed to resume stream, skipping");
                continue;
            }
            if let Err(e) = self.queue.send(QueueMessage::ProcessStream { stream_id }).await {
                error!(error = %e, %stream_id, "resumed stream but failed to re-enqueue");
                continue;
            }
            debug!(%stream_id, "resumed delayed stream");
            resumed += 1;
        }

        for data in self.data.find_due_for_resume(now, self.batch_size).await? {
            let data_id = data.id();
            if let Err(e) = self.data.resume(data_id).await {
                error!(error = %e, %data_id, "failed to resume data, skipping");
                continue;
            }
            if let Err(e) = self.queue.send(QueueMessage::ProcessData { data_id }).await {
                error!(error = %e, %data_id, "resumed data but failed to re-enqueue");
                continue;
            }
            debug!(%data_id, "resumed delayed data");
            resumed += 1;
        }

        Ok(resumed)
    }

    /// Runs [`sweep_once`](Self::sweep_once) on `interval` until `shutdown`
    /// resolves.
    pub async fn run(&self, interval: Duration, shutdown: impl std::future::Future<Output = ()>) {
        let mut ticker = tokio::time::interval(interval);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sweep_once().await {
                        Ok(resumed) if resumed > 0 => info!(resumed, "sweep resumed delayed work"),
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "sweep pass failed"),
                    }
                }
                _ = &mut shutdown => {
                    debug!("sweeper shutting down");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::queue::InMemoryQueue;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use pipeline_domain::entities::{Data, Run, Stream};
    use pipeline_domain::value_objects::{DataId, ErrorInfo, IntegrationId, RunId, StreamId, TenantId};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeRunRepository {
        rows: StdMutex<std::collections::HashMap<RunId, Run>>,
    }

    #[async_trait]
    impl RunRepository for FakeRunRepository {
        async fn save(&self, run: &Run) -> Result<(), IntegrationError> {
            self.rows.lock().unwrap().insert(run.id(), run.clone());
            Ok(())
        }
        async fn find_by_id(&self, id: RunId) -> Result<Run, IntegrationError> {
            self.rows.lock().unwrap().get(&id).cloned().ok_or_else(|| IntegrationError::not_found("run"))
        }
        async fn mark_processing(&self, _id: RunId) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn mark_processed(&self, _id: RunId) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn mark_error(&self, _id: RunId, _error: ErrorInfo) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn mark_delayed(&self, _id: RunId, _until: DateTime<Utc>) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn resume(&self, id: RunId) -> Result<(), IntegrationError> {
            let mut rows = self.rows.lock().unwrap();
            let run = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found("run"))?;
            run.resume()
        }
        async fn find_due_for_resume(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Run>, IntegrationError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.is_due_for_resume(now))
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeStreamRepository {
        rows: StdMutex<std::collections::HashMap<StreamId, Stream>>,
    }

    #[async_trait]
    impl StreamRepository for FakeStreamRepository {
        async fn save(&self, stream: &Stream) -> Result<(), IntegrationError> {
            self.rows.lock().unwrap().insert(stream.id(), stream.clone());
            Ok(())
        }
        async fn find_by_id(&self, id: StreamId) -> Result<Stream, IntegrationError> {
            self.rows.lock().unwrap().get(&id).cloned().ok_or_else(|| IntegrationError::not_found("stream"))
        }
        async fn mark_processing(&self, _id: StreamId) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn mark_processed(&self, _id: StreamId) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn mark_error(&self, _id: StreamId, _error: ErrorInfo) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn mark_delayed(&self, _id: StreamId, _until: DateTime<Utc>) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn count_unfinished(&self, _run_id: RunId) -> Result<u64, IntegrationError> {
            Ok(0)
        }
        async fn find_due_for_resume(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Stream>, IntegrationError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.is_due_for_resume(now))
                .take(limit as usize)
                .cloned()
                .collect())
        }
        async fn resume(&self, id: StreamId) -> Result<(), IntegrationError> {
            let mut rows = self.rows.lock().unwrap();
            let stream = rows.get_mut(&id).ok_or_else(|| IntegrationError::not_found("stream"))?;
            stream.resume()
        }
        async fn reset_for_rate_limit(&self, _id: StreamId) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn count_by_run(&self, run_id: RunId) -> Result<u64, IntegrationError> {
            Ok(self.rows.lock().unwrap().values().filter(|s| s.run_id() == run_id).count() as u64)
        }
        async fn find_pending_by_run(&self, run_id: RunId) -> Result<Vec<Stream>, IntegrationError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.run_id() == run_id && s.state() == pipeline_domain::ExecutionState::Pending)
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct EmptyDataRepository;

    #[async_trait]
    impl DataRepository for EmptyDataRepository {
        async fn save(&self, _data: &Data) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn find_by_id(&self, _id: DataId) -> Result<Data, IntegrationError> {
            Err(IntegrationError::not_found("data"))
        }
        async fn mark_processing(&self, _id: DataId) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn mark_processed(&self, _id: DataId) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn mark_error(&self, _id: DataId, _error: ErrorInfo) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn mark_delayed(&self, _id: DataId, _until: DateTime<Utc>) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn find_due_for_resume(&self, _now: DateTime<Utc>, _limit: u32) -> Result<Vec<Data>, IntegrationError> {
            Ok(vec![])
        }
        async fn resume(&self, _id: DataId) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn reset_for_rate_limit(&self, _id: DataId) -> Result<(), IntegrationError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn sweep_resumes_due_streams_and_republishes() {
        let mut stream = Stream::new(RunId::new(), serde_json::json!({}));
        stream.mark_processing().unwrap();
        stream.mark_delayed(Utc::now() - chrono::Duration::minutes(1)).unwrap();
        let stream_id = stream.id();

        let streams = Arc::new(FakeStreamRepository::default());
        streams.save(&stream).await.unwrap();

        let sweeper = Sweeper::new(
            Arc::new(FakeRunRepository::default()),
            streams,
            Arc::new(EmptyDataRepository),
            Arc::new(InMemoryQueue::new()),
            10,
        );
        let resumed = sweeper.sweep_once().await.unwrap();
        assert_eq!(resumed, 1);

        let stream = sweeper.streams.find_by_id(stream_id).await.unwrap();
        assert_eq!(stream.state(), pipeline_domain::ExecutionState::Pending);
    }

    #[tokio::test]
    async fn sweep_resumes_due_runs_and_redrives_pending_streams() {
        let mut run = Run::new(TenantId::new(), IntegrationId::new());
        run.mark_processing().unwrap();
        run.mark_delayed(Utc::now() - chrono::Duration::minutes(1)).unwrap();
        let run_id = run.id();

        let mut pending_stream = Stream::new(run_id, serde_json::json!({}));
        let pending_stream_id = pending_stream.id();
        pending_stream.mark_processing().unwrap();
        pending_stream.reset_for_rate_limit().unwrap();

        let runs = Arc::new(FakeRunRepository::default());
        runs.save(&run).await.unwrap();
        let streams = Arc::new(FakeStreamRepository::default());
        streams.save(&pending_stream).await.unwrap();
        let queue = Arc::new(InMemoryQueue::new());

        let sweeper = Sweeper::new(runs, streams, Arc::new(EmptyDataRepository), queue.clone(), 10);
        let resumed = sweeper.sweep_once().await.unwrap();
        assert_eq!(resumed, 1);

        let run = sweeper.runs.find_by_id(run_id).await.unwrap();
        assert_eq!(run.state(), pipeline_domain::ExecutionState::Processing);

        let messages = queue.drain_pending().await;
        assert!(messages
            .iter()
            .any(|m| matches!(m, QueueMessage::ProcessStream { stream_id } if *stream_id == pending_stream_id)));
    }

    #[tokio::test]
    async fn sweep_is_a_no_op_with_nothing_due() {
        let sweeper = Sweeper::new(
            Arc::new(FakeRunRepository::default()),
            Arc::new(FakeStreamRepository::default()),
            Arc::new(EmptyDataRepository),
            Arc::new(InMemoryQueue::new()),
            10,
        );
        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    }
}
