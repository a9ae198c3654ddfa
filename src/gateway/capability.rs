// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Capability contract and the startup registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

/// Parameters and results are JSON objects.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Failure raised by a capability provider.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("provider failed: {0}")]
    Provider(String),
}

/// A priced, named operation callers can invoke through the gateway.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;

    /// Price per call in lamports.
    fn price(&self) -> u64;

    /// Reject malformed parameters before any funds are authorized.
    fn validate(&self, _params: &Params) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn call(&self, params: &Params) -> Result<Params, CapabilityError>;
}

/// Public view of a registered capability.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct CapabilityInfo {
    pub name: String,
    pub price: u64,
}

/// Capabilities registered at startup, looked up by name.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    entries: BTreeMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under its own name, replacing any previous one.
    pub fn register(mut self, capability: Arc<dyn Capability>) -> Self {
        self.entries.insert(capability.name().to_string(), capability);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All capabilities sorted by name.
    pub fn list(&self) -> Vec<CapabilityInfo> {
        self.entries
            .values()
            .map(|c| CapabilityInfo {
                name: c.name().to_string(),
                price: c.price(),
            })
            .collect()
    }
}

/// Require a non-empty string parameter.
pub fn required_str<'a>(params: &'a Params, field: &str) -> Result<&'a str, CapabilityError> {
    match params.get(field).and_then(|v| v.as_str()) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(CapabilityError::InvalidParams(format!("'{field}' must not be empty"))),
        None => Err(CapabilityError::InvalidParams(format!("'{field}' is required"))),
    }
}

/// Optional string parameter; empty strings count as absent.
pub fn optional_str<'a>(params: &'a Params, field: &str) -> Option<&'a str> {
    params
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|v| !v.trim().is_empty())
}
