// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A read-mostly snapshot of the integration a run belongs to. This
//! pipeline does not own integration creation or deletion; it only reads
//! the current snapshot and applies settings patches a handler requests.

use serde_json::{Map, Value};

use crate::value_objects::{IntegrationId, TenantId};

/// The slice of an integration this pipeline needs: which platform it
/// talks to and its mutable settings bag.
#[derive(Debug, Clone)]
pub struct IntegrationSnapshot {
    id: IntegrationId,
    tenant_id: TenantId,
    platform: String,
    settings: Value,
}

impl IntegrationSnapshot {
    pub fn new(id: IntegrationId, tenant_id: TenantId, platform: impl Into<String>, settings: Value) -> Self {
        Self {
            id,
            tenant_id,
            platform: platform.into(),
            settings,
        }
    }

    pub fn id(&self) -> IntegrationId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn settings(&self) -> &Value {
        &self.settings
    }

    /// Shallow top-level merge: keys present in `patch` overwrite the
    /// matching key in `settings`; everything else is left untouched. Not
    /// a deep merge, matching the jsonb `||` operator's own semantics.
    pub fn merged_settings(&self, patch: &Value) -> Value {
        let mut merged = match self.settings.as_object() {
            Some(obj) => obj.clone(),
            None => Map::new(),
        };
        if let Some(patch_obj) = patch.as_object() {
            for (key, value) in patch_obj {
                merged.insert(key.clone(), value.clone());
            }
        }
        Value::Object(merged)
    }
}
