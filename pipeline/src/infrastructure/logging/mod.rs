// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging Initialization
//!
//! Sets up the global `tracing` subscriber once at process start, honoring
//! [`LoggingSettings`](crate::infrastructure::config::LoggingSettings) for
//! the minimum level and output format, and `RUST_LOG` for fine-grained
//! per-module overrides via `EnvFilter`.

use tracing_subscriber::{fmt, EnvFilter};

use crate::infrastructure::config::LoggingSettings;
use pipeline_domain::IntegrationError;

/// Initializes the global tracing subscriber.
///
/// Must be called exactly once, as early as possible in `main`. Returns an
/// error if a subscriber is already installed.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), IntegrationError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let result = if settings.format == "json" {
        fmt().with_env_filter(filter).json().try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|e| IntegrationError::invalid_config(format!("failed to install tracing subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_pretty_and_json_formats() {
        for format in ["pretty", "json"] {
            let settings = LoggingSettings {
                level: "info".to_string(),
                format: format.to_string(),
            };
            // Only the first call in the test binary actually installs a
            // subscriber; later calls return Err, which is fine here since
            // we're only checking the function doesn't panic.
            let _ = init_logging(&settings);
        }
    }
}
