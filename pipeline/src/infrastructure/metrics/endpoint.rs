// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics HTTP Endpoint
//!
//! A minimal `GET /metrics` responder for Prometheus scraping. No web
//! framework dependency is warranted for a single read-only route, so this
//! speaks just enough HTTP/1.1 over a raw `TcpListener`.

use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, warn};

use super::metrics_service::MetricsService;
use pipeline_domain::IntegrationError;

/// Serves `GET /metrics` on `addr` until `shutdown` resolves.
pub async fn serve_metrics(
    addr: SocketAddr,
    metrics: MetricsService,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<(), IntegrationError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| IntegrationError::internal(format!("failed to bind metrics endpoint on {addr}: {e}")))?;

    debug!(%addr, "metrics endpoint listening");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (mut stream, _) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "failed to accept metrics connection");
                        continue;
                    }
                };
                let metrics = metrics.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    // We only need enough of the request line to confirm the
                    // method and path; the rest of the request is ignored.
                    let _ = stream.read(&mut buf).await;

                    let body = metrics.render().unwrap_or_default();
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
            _ = &mut shutdown => {
                debug!("metrics endpoint shutting down");
                return Ok(());
            }
        }
    }
}
