// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Registry
//!
//! Maps an integration's `platform` string (`"slack"`, `"github"`, ...) to
//! the [`IntegrationHandler`] that knows how to run it. Built once at
//! startup from whatever handlers the binary was compiled with; looked up
//! by every message the three worker services process.

use std::collections::HashMap;
use std::sync::Arc;

use pipeline_domain::services::IntegrationHandler;
use pipeline_domain::IntegrationError;

#[derive(Default)]
pub struct PlatformRegistry {
    handlers: HashMap<&'static str, Arc<dyn IntegrationHandler>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn IntegrationHandler>) {
        self.handlers.insert(handler.platform(), handler);
    }

    pub fn get(&self, platform: &str) -> Result<Arc<dyn IntegrationHandler>, IntegrationError> {
        self.handlers
            .get(platform)
            .cloned()
            .ok_or_else(|| IntegrationError::missing_dependency(format!("no handler registered for platform {platform}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pipeline_domain::services::{DataContext, RunContext, StreamContext};

    struct StubHandler;

    #[async_trait]
    impl IntegrationHandler for StubHandler {
        fn platform(&self) -> &'static str {
            "stub"
        }
        async fn handle_run(&self, _ctx: &RunContext) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn handle_stream(&self, _ctx: &StreamContext) -> Result<(), IntegrationError> {
            Ok(())
        }
        async fn handle_data(&self, _ctx: &DataContext) -> Result<(), IntegrationError> {
            Ok(())
        }
    }

    #[test]
    fn looks_up_registered_handler_by_platform() {
        let mut registry = PlatformRegistry::new();
        registry.register(Arc::new(StubHandler));

        assert!(registry.get("stub").is_ok());
    }

    #[test]
    fn unknown_platform_is_a_missing_dependency() {
        let registry = PlatformRegistry::new();
        assert!(registry.get("unknown").is_err());
    }
}
