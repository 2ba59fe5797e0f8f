// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in strategies.
//!
//! Pre-supplied implementations of the strategy contract. Each one is an
//! ordinary registry entry; operations pick one as their default or
//! workflow nodes name one explicitly.

mod active_source;
mod immutable_local;
mod keyed_state;
mod passive_source;
mod stream_source;

pub use active_source::ActiveSource;
pub use immutable_local::ImmutableLocal;
pub use keyed_state::KeyedState;
pub use passive_source::PassiveSource;
pub use stream_source::StreamSource;

use rill_core::{Registry, StrategyError, WorkerRef};
use serde_json::Value;
use std::sync::Arc;

/// Register every built-in strategy.
pub fn register_builtin(registry: &mut Registry) {
    registry.register_strategy(Arc::new(ImmutableLocal));
    registry.register_strategy(Arc::new(KeyedState));
    registry.register_strategy(Arc::new(PassiveSource));
    registry.register_strategy(Arc::new(StreamSource));
    registry.register_strategy(Arc::new(ActiveSource));
}

/// Decode a deployment holding a single worker ref.
pub(crate) fn worker_from(
    strategy: &str,
    deployment: &Value,
) -> Result<WorkerRef, StrategyError> {
    serde_json::from_value(deployment.clone()).map_err(|e| StrategyError::Malformed {
        strategy: strategy.to_string(),
        reason: format!("deployment is not a worker ref: {e}"),
    })
}

/// Decode a deployment holding a list of worker refs.
pub(crate) fn workers_from(
    strategy: &str,
    deployment: &Value,
) -> Result<Vec<WorkerRef>, StrategyError> {
    serde_json::from_value(deployment.clone()).map_err(|e| StrategyError::Malformed {
        strategy: strategy.to_string(),
        reason: format!("deployment is not a worker list: {e}"),
    })
}

/// Encode a deployment value.
pub(crate) fn deployment_value<T: serde::Serialize>(
    strategy: &str,
    value: &T,
) -> Result<Value, StrategyError> {
    serde_json::to_value(value).map_err(|e| StrategyError::Malformed {
        strategy: strategy.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[path = "strategies_tests.rs"]
mod tests;
