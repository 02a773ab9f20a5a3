// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SQS-style work queue abstraction: a handle this pipeline uses to hand
//! off the next unit of work and to long-poll for incoming ones.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IntegrationError;
use crate::value_objects::{DataId, RunId, StreamId};

/// The envelope carried on the wire. `receipt_handle` is the queue's own
/// opaque token for acknowledging (deleting) a received message; it is not
/// part of the JSON body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueMessage {
    ProcessRun { run_id: RunId },
    ProcessStream { stream_id: StreamId },
    ProcessData { data_id: DataId },
    StreamError {
        stream_id: StreamId,
        location: String,
        message: String,
        #[serde(default)]
        metadata: Value,
    },
}

/// A message received from the queue, paired with the handle needed to
/// delete it once processing completes successfully.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub body: QueueMessage,
    pub receipt_handle: String,
}

#[async_trait]
pub trait Queue: Send + Sync {
    /// Idempotently ensures the underlying queue exists. Production
    /// implementations call this once at startup; tests usually no-op.
    async fn init(&self) -> Result<(), IntegrationError>;

    async fn send(&self, message: QueueMessage) -> Result<(), IntegrationError>;

    /// Long-polls for up to `max_messages` messages, waiting up to
    /// `wait_seconds` for at least one to arrive.
    async fn receive(&self, max_messages: u32, wait_seconds: u32) -> Result<Vec<ReceivedMessage>, IntegrationError>;

    async fn delete_message(&self, receipt_handle: &str) -> Result<(), IntegrationError>;
}
