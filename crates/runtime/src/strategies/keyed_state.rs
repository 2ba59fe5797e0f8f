// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State partitioned by key across a fixed worker set.

use super::{deployment_value, workers_from};
use async_trait::async_trait;
use rill_core::{
    checked_call, Context, Placement, PortIndex, ProcessResult, Strategy, StrategyError,
    StrategyServices, Tag,
};
use serde_json::{json, Map, Value};
use std::hash::{Hash, Hasher};

/// Keyed-state strategy: deploy spawns one worker per runtime; `deliver`
/// extracts a key with the operation's `key` callback and routes the value
/// to the worker owning that key's partition. Each worker keeps a map of
/// per-key states, initialised lazily from the operation's initial state.
pub struct KeyedState;

pub(crate) const NAME: &str = "keyed_state";

#[async_trait]
impl Strategy for KeyedState {
    fn name(&self) -> &str {
        NAME
    }

    async fn deploy(&self, ctx: &Context) -> Result<Value, StrategyError> {
        let services = ctx.services();
        let empty = rill_core::StateInit::Value(json!({}));

        // Deterministic partition order: deploying runtime first, then the
        // worker nodes sorted by name.
        let mut workers =
            vec![services.create_local(ctx, empty.clone(), Tag::new("partition"))?];
        for node in sorted_workers(ctx) {
            let worker = services
                .create_remote(ctx, empty.clone(), Tag::new("partition"), Placement::On(node))
                .await?;
            workers.push(worker);
        }
        deployment_value(NAME, &workers)
    }

    fn deliver(&self, ctx: &Context, value: Value, port: PortIndex) -> Result<(), StrategyError> {
        let workers = workers_from(NAME, ctx.deployment()?)?;
        if workers.is_empty() {
            return Err(malformed("deployment has no partitions"));
        }
        let key = checked_call(&ctx.operation, "key", Value::Null, &ctx.args, &[value.clone()])?
            .result;
        let index = partition(&key, workers.len())?;
        let message = json!({ "port": port, "data": value, "key": key });
        ctx.services().send(&workers[index], message, ctx.invocation.clone());
        Ok(())
    }

    fn process(
        &self,
        ctx: &Context,
        message: Value,
        state: Value,
        _tag: &Tag,
    ) -> Result<ProcessResult, StrategyError> {
        let port = message
            .get("port")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("message has no port"))? as usize;
        let data = message.get("data").cloned().ok_or_else(|| malformed("message has no data"))?;
        let key = message.get("key").cloned().ok_or_else(|| malformed("message has no key"))?;
        let callback = ctx
            .operation
            .in_ports()
            .get(port)
            .ok_or_else(|| malformed("port out of range"))?
            .as_str()
            .to_string();

        let mut partitions: Map<String, Value> = match state {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(malformed("worker state is not a partition map")),
        };
        let key_repr = canonical(&key)?;
        let entry = partitions
            .get(&key_repr)
            .cloned()
            .unwrap_or_else(|| ctx.operation.initial_state().resolve());

        let result =
            checked_call(&ctx.operation, &callback, entry, &ctx.args, &[data, key])?;
        if let Some(next) = result.state {
            partitions.insert(key_repr, next);
        }
        Ok(ProcessResult {
            state: Some(Value::Object(partitions)),
            emit: Some(result.emit),
            emit_invocation: None,
        })
    }
}

fn sorted_workers(ctx: &Context) -> Vec<rill_core::NodeName> {
    let mut nodes = ctx.services().cluster_workers();
    nodes.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
    nodes
}

/// Stable partition index for a key: deterministic across runtimes, so
/// every `deliver` site agrees on the owner.
pub(crate) fn partition(key: &Value, partitions: usize) -> Result<usize, StrategyError> {
    let repr = canonical(key)?;
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    repr.hash(&mut hasher);
    Ok((hasher.finish() % partitions as u64) as usize)
}

fn canonical(key: &Value) -> Result<String, StrategyError> {
    serde_json::to_string(key).map_err(|e| malformed(&format!("unhashable key: {e}")))
}

fn malformed(reason: &str) -> StrategyError {
    StrategyError::Malformed { strategy: NAME.to_string(), reason: reason.to_string() }
}
