// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation and strategy registry.
//!
//! Operations and strategies are pre-compiled trait objects; a cluster's
//! runtimes are all built with the same registry, so names published in
//! contexts resolve identically everywhere. The registry is immutable
//! after startup.

use crate::operation::Operation;
use crate::strategy::Strategy;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown operation {0}")]
    UnknownOperation(String),

    #[error("unknown strategy {0}")]
    UnknownStrategy(String),
}

/// Name → implementation tables for operations and strategies.
#[derive(Default)]
pub struct Registry {
    operations: HashMap<String, Arc<dyn Operation>>,
    strategies: HashMap<String, Arc<dyn Strategy>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: Arc<dyn Operation>) -> Self {
        self.register_operation(operation);
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.register_strategy(strategy);
        self
    }

    pub fn register_operation(&mut self, operation: Arc<dyn Operation>) {
        self.operations.insert(operation.name().to_string(), operation);
    }

    pub fn register_strategy(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.insert(strategy.name().to_string(), strategy);
    }

    pub fn operation(&self, name: &str) -> Result<Arc<dyn Operation>, RegistryError> {
        self.operations
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownOperation(name.to_string()))
    }

    pub fn strategy(&self, name: &str) -> Result<Arc<dyn Strategy>, RegistryError> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownStrategy(name.to_string()))
    }

    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    pub fn strategy_names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .field("strategies", &self.strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}
