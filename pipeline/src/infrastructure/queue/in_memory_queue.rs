// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Memory Queue
//!
//! A [`Queue`] backed by a `tokio::sync::Mutex<VecDeque<_>>`, used by tests
//! and the sweeper's unit tests in place of SQS. `receipt_handle` is a
//! stringified index assigned at receive time; `delete_message` removes the
//! matching in-flight entry.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use uuid::Uuid;

use pipeline_domain::services::{Queue, QueueMessage, ReceivedMessage};
use pipeline_domain::IntegrationError;

#[derive(Default)]
pub struct InMemoryQueue {
    pending: Mutex<VecDeque<QueueMessage>>,
    in_flight: Mutex<std::collections::HashMap<String, QueueMessage>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains every message still sitting in the queue without marking it
    /// in-flight. Test-only inspection hook.
    pub async fn drain_pending(&self) -> Vec<QueueMessage> {
        self.pending.lock().await.drain(..).collect()
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    async fn init(&self) -> Result<(), IntegrationError> {
        Ok(())
    }

    async fn send(&self, message: QueueMessage) -> Result<(), IntegrationError> {
        self.pending.lock().await.push_back(message);
        Ok(())
    }

    async fn receive(&self, max_messages: u32, _wait_seconds: u32) -> Result<Vec<ReceivedMessage>, IntegrationError> {
        let mut pending = self.pending.lock().await;
        let mut in_flight = self.in_flight.lock().await;

        let mut received = Vec::new();
        for _ in 0..max_messages {
            let Some(message) = pending.pop_front() else {
                break;
            };
            let receipt_handle = Uuid::new_v4().to_string();
            in_flight.insert(receipt_handle.clone(), message.clone());
            received.push(ReceivedMessage { body: message, receipt_handle });
        }
        Ok(received)
    }

    async fn delete_message(&self, receipt_handle: &str) -> Result<(), IntegrationError> {
        self.in_flight.lock().await.remove(receipt_handle);
        Ok(())
    }
}
