// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQS Queue Adapter
//!
//! Production [`Queue`] implementation backed by Amazon SQS. Messages are
//! serialized as JSON and sent with no additional SQS attributes; the
//! `receipt_handle` SQS hands back on receive is threaded through
//! [`ReceivedMessage`] so `delete_message` can acknowledge.

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use tracing::{debug, warn};

use pipeline_domain::services::{Queue, QueueMessage, ReceivedMessage};
use pipeline_domain::IntegrationError;

pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(client: Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }

    /// Builds an `SqsQueue` from the ambient AWS config (region, credentials
    /// provider chain) and a queue URL.
    pub async fn from_env(region: String, queue_url: String) -> Self {
        let region_provider = aws_config::Region::new(region);
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;
        Self::new(Client::new(&config), queue_url)
    }
}

#[async_trait]
impl Queue for SqsQueue {
    async fn init(&self) -> Result<(), IntegrationError> {
        self.client
            .get_queue_attributes()
            .queue_url(&self.queue_url)
            .send()
            .await
            .map_err(|e| IntegrationError::queue(format!("failed to verify queue {}: {e}", self.queue_url)))?;
        Ok(())
    }

    async fn send(&self, message: QueueMessage) -> Result<(), IntegrationError> {
        let body = serde_json::to_string(&message)?;
        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| IntegrationError::queue(format!("failed to send message: {e}")))?;
        Ok(())
    }

    async fn receive(&self, max_messages: u32, wait_seconds: u32) -> Result<Vec<ReceivedMessage>, IntegrationError> {
        let response = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages.min(10) as i32)
            .wait_time_seconds(wait_seconds.min(20) as i32)
            .send()
            .await
            .map_err(|e| IntegrationError::queue(format!("failed to receive messages: {e}")))?;

        let mut received = Vec::new();
        for sqs_message in response.messages() {
            let (Some(body), Some(receipt_handle)) = (sqs_message.body(), sqs_message.receipt_handle()) else {
                warn!("sqs message missing body or receipt handle, skipping");
                continue;
            };
            let body: QueueMessage = match serde_json::from_str(body) {
                Ok(body) => body,
                Err(e) => {
                    warn!(error = %e, "failed to deserialize queue message, skipping");
                    continue;
                }
            };
            received.push(ReceivedMessage {
                body,
                receipt_handle: receipt_handle.to_string(),
            });
        }

        debug!(count = received.len(), "received messages from queue");
        Ok(received)
    }

    async fn delete_message(&self, receipt_handle: &str) -> Result<(), IntegrationError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| IntegrationError::queue(format!("failed to delete message: {e}")))?;
        Ok(())
    }
}
