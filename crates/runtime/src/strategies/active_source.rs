// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source with one polling worker on every runtime.

use super::{deployment_value, workers_from};
use async_trait::async_trait;
use rill_core::{
    checked_call, Context, Placement, PortIndex, ProcessResult, Strategy, StrategyError,
    StrategyServices, Tag,
};
use serde_json::{json, Value};

/// Active source: deploy spawns one worker per cluster runtime (deploying
/// runtime included) and kicks each once; the kick runs the operation's
/// `poll` callback after the barrier. Further polls come from re-kicks via
/// `deliver`.
pub struct ActiveSource;

pub(crate) const NAME: &str = "active_source";

#[async_trait]
impl Strategy for ActiveSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn deploy(&self, ctx: &Context) -> Result<Value, StrategyError> {
        let services = ctx.services();
        let mut workers = vec![services.create_local(
            ctx,
            ctx.operation.initial_state(),
            Tag::new("poller"),
        )?];

        let mut nodes = services.cluster_workers();
        nodes.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
        for node in nodes {
            let worker = services
                .create_remote(
                    ctx,
                    ctx.operation.initial_state(),
                    Tag::new("poller"),
                    Placement::On(node),
                )
                .await?;
            workers.push(worker);
        }

        for worker in &workers {
            services.send(worker, json!("poll"), None);
        }
        deployment_value(NAME, &workers)
    }

    fn deliver(&self, ctx: &Context, _value: Value, _port: PortIndex) -> Result<(), StrategyError> {
        // Re-kick every poller.
        for worker in workers_from(NAME, ctx.deployment()?)? {
            ctx.services().send(&worker, json!("poll"), ctx.invocation.clone());
        }
        Ok(())
    }

    fn process(
        &self,
        ctx: &Context,
        _message: Value,
        state: Value,
        _tag: &Tag,
    ) -> Result<ProcessResult, StrategyError> {
        let result = checked_call(&ctx.operation, "poll", state, &ctx.args, &[])?;
        Ok(ProcessResult { state: result.state, emit: Some(result.emit), emit_invocation: None })
    }
}
