// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The handler contract (spec §4.5): the narrow set of operations a
//! per-platform plugin is given to fan out work, write settings, and
//! report failure, plus the [`IntegrationHandler`] trait the three workers
//! dispatch to by platform string.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::entities::{Data, Stream};
use crate::error::IntegrationError;
use crate::repositories::{DataRepository, IntegrationRepository, StreamRepository};
use crate::services::{Queue, QueueMessage, RunCache};
use crate::value_objects::{DataId, IntegrationId, RunId, StreamId};

/// Collaborators every context level needs: somewhere to publish new work,
/// somewhere to stash run-scoped scratch values, and the integration
/// settings port.
struct ContextCore {
    queue: Arc<dyn Queue>,
    cache: Arc<dyn RunCache>,
    integrations: Arc<dyn IntegrationRepository>,
    run_id: RunId,
    integration_id: IntegrationId,
}

impl ContextCore {
    async fn cache_get(&self, key: &str) -> Result<Option<Value>, IntegrationError> {
        self.cache.get(self.run_id, key).await
    }

    async fn cache_set(&self, key: &str, value: Value) -> Result<(), IntegrationError> {
        self.cache.set(self.run_id, key, value).await
    }

    async fn update_integration_settings(&self, patch: Value) -> Result<(), IntegrationError> {
        self.integrations.update_settings(self.integration_id, patch).await?;
        Ok(())
    }
}

/// Given to `IntegrationHandler::handle_run`.
pub struct RunContext {
    core: ContextCore,
    streams: Arc<dyn StreamRepository>,
}

impl RunContext {
    pub fn new(
        run_id: RunId,
        integration_id: IntegrationId,
        queue: Arc<dyn Queue>,
        cache: Arc<dyn RunCache>,
        integrations: Arc<dyn IntegrationRepository>,
        streams: Arc<dyn StreamRepository>,
    ) -> Self {
        Self {
            core: ContextCore {
                queue,
                cache,
                integrations,
                run_id,
                integration_id,
            },
            streams,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.core.run_id
    }

    pub fn integration_id(&self) -> IntegrationId {
        self.core.integration_id
    }

    pub async fn cache_get(&self, key: &str) -> Result<Option<Value>, IntegrationError> {
        self.core.cache_get(key).await
    }

    pub async fn cache_set(&self, key: &str, value: Value) -> Result<(), IntegrationError> {
        self.core.cache_set(key, value).await
    }

    pub async fn update_integration_settings(&self, patch: Value) -> Result<(), IntegrationError> {
        self.core.update_integration_settings(patch).await
    }

    /// Creates a new stream row and enqueues its `ProcessStream` message.
    pub async fn publish_stream(&self, payload: Value) -> Result<StreamId, IntegrationError> {
        let stream = Stream::new(self.core.run_id, payload);
        let id = stream.id();
        self.streams.save(&stream).await?;
        self.core
            .queue
            .send(QueueMessage::ProcessStream { stream_id: id })
            .await?;
        Ok(id)
    }
}

/// Given to `IntegrationHandler::handle_stream`.
pub struct StreamContext {
    core: ContextCore,
    stream_id: StreamId,
    streams: Arc<dyn StreamRepository>,
    data: Arc<dyn DataRepository>,
}

impl StreamContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: RunId,
        integration_id: IntegrationId,
        stream_id: StreamId,
        queue: Arc<dyn Queue>,
        cache: Arc<dyn RunCache>,
        integrations: Arc<dyn IntegrationRepository>,
        streams: Arc<dyn StreamRepository>,
        data: Arc<dyn DataRepository>,
    ) -> Self {
        Self {
            core: ContextCore {
                queue,
                cache,
                integrations,
                run_id,
                integration_id,
            },
            stream_id,
            streams,
            data,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.core.run_id
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn integration_id(&self) -> IntegrationId {
        self.core.integration_id
    }

    pub async fn cache_get(&self, key: &str) -> Result<Option<Value>, IntegrationError> {
        self.core.cache_get(key).await
    }

    pub async fn cache_set(&self, key: &str, value: Value) -> Result<(), IntegrationError> {
        self.core.cache_set(key, value).await
    }

    pub async fn update_integration_settings(&self, patch: Value) -> Result<(), IntegrationError> {
        self.core.update_integration_settings(patch).await
    }

    /// Fans out another stream within the same run (e.g. the next page).
    pub async fn publish_stream(&self, payload: Value) -> Result<StreamId, IntegrationError> {
        let stream = Stream::new(self.core.run_id, payload);
        let id = stream.id();
        self.streams.save(&stream).await?;
        self.core
            .queue
            .send(QueueMessage::ProcessStream { stream_id: id })
            .await?;
        Ok(id)
    }

    /// Creates a data row bound for the sink and enqueues its
    /// `ProcessData` message.
    pub async fn publish_data(&self, payload: Value) -> Result<DataId, IntegrationError> {
        let data = Data::new(self.stream_id, payload);
        let id = data.id();
        self.data.save(&data).await?;
        self.core.queue.send(QueueMessage::ProcessData { data_id: id }).await?;
        Ok(id)
    }
}

/// Given to `IntegrationHandler::handle_data`.
pub struct DataContext {
    core: ContextCore,
    stream_id: StreamId,
    data_id: DataId,
}

impl DataContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: RunId,
        integration_id: IntegrationId,
        stream_id: StreamId,
        data_id: DataId,
        queue: Arc<dyn Queue>,
        cache: Arc<dyn RunCache>,
        integrations: Arc<dyn IntegrationRepository>,
    ) -> Self {
        Self {
            core: ContextCore {
                queue,
                cache,
                integrations,
                run_id,
                integration_id,
            },
            stream_id,
            data_id,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.core.run_id
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn data_id(&self) -> DataId {
        self.data_id
    }

    pub fn integration_id(&self) -> IntegrationId {
        self.core.integration_id
    }

    pub async fn cache_get(&self, key: &str) -> Result<Option<Value>, IntegrationError> {
        self.core.cache_get(key).await
    }

    pub async fn cache_set(&self, key: &str, value: Value) -> Result<(), IntegrationError> {
        self.core.cache_set(key, value).await
    }

    pub async fn update_integration_settings(&self, patch: Value) -> Result<(), IntegrationError> {
        self.core.update_integration_settings(patch).await
    }
}

/// A per-platform plugin. One implementation per supported platform
/// string, looked up through the registry built at bootstrap time.
#[async_trait]
pub trait IntegrationHandler: Send + Sync {
    fn platform(&self) -> &'static str;

    async fn handle_run(&self, ctx: &RunContext) -> Result<(), IntegrationError>;

    async fn handle_stream(&self, ctx: &StreamContext) -> Result<(), IntegrationError>;

    async fn handle_data(&self, ctx: &DataContext) -> Result<(), IntegrationError>;
}
