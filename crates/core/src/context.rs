// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The context bundle threaded through every strategy hook.
//!
//! A context is immutable per link/worker; the `invocation` field is the
//! only part rebound per message, via [`Context::with_invocation`]. The
//! serializable [`ContextSpec`] form names its operation and strategy by
//! registry name so contexts can be published across the cluster and
//! rehydrated against each runtime's registry.

use crate::id::WorkflowRef;
use crate::operation::Operation;
use crate::registry::{Registry, RegistryError};
use crate::strategy::{Strategy, StrategyServices};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Where a context is executing: inside the deploy hook, or attached to a
/// live node of a deployed workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Scope {
    Deploy { workflow: WorkflowRef, node: usize },
    Node { workflow: WorkflowRef, node: usize },
}

impl Scope {
    pub fn workflow(&self) -> WorkflowRef {
        match self {
            Self::Deploy { workflow, .. } | Self::Node { workflow, .. } => *workflow,
        }
    }

    pub fn node_index(&self) -> usize {
        match self {
            Self::Deploy { node, .. } | Self::Node { node, .. } => *node,
        }
    }

    pub fn is_deploy(&self) -> bool {
        matches!(self, Self::Deploy { .. })
    }

    /// The node scope with the same coordinates.
    pub fn to_node(self) -> Self {
        match self {
            Self::Deploy { workflow, node } | Self::Node { workflow, node } => {
                Self::Node { workflow, node }
            }
        }
    }
}

/// Immutable bundle passed as the first argument of every strategy hook.
#[derive(Clone)]
pub struct Context {
    pub operation: Arc<dyn Operation>,
    pub strategy: Arc<dyn Strategy>,
    /// Deploy-time arguments for this node.
    pub args: Value,
    /// Value returned by `deploy` for this node; `None` during the deploy
    /// hook itself and inside workers still initialising.
    pub deployment: Option<Value>,
    /// Metadata attached to the value currently being processed.
    pub invocation: Option<Value>,
    pub scope: Scope,
    services: Arc<dyn StrategyServices>,
}

impl Context {
    pub fn new(
        operation: Arc<dyn Operation>,
        strategy: Arc<dyn Strategy>,
        args: Value,
        scope: Scope,
        services: Arc<dyn StrategyServices>,
    ) -> Self {
        Self { operation, strategy, args, deployment: None, invocation: None, scope, services }
    }

    pub fn services(&self) -> &Arc<dyn StrategyServices> {
        &self.services
    }

    /// Copy with the invocation rebound for the current message.
    pub fn with_invocation(&self, invocation: Option<Value>) -> Self {
        let mut ctx = self.clone();
        ctx.invocation = invocation;
        ctx
    }

    pub fn with_deployment(mut self, deployment: Value) -> Self {
        self.deployment = Some(deployment);
        self
    }

    /// Copy re-scoped from deploy to node coordinates.
    pub fn to_node_scope(&self) -> Self {
        let mut ctx = self.clone();
        ctx.scope = ctx.scope.to_node();
        ctx
    }

    /// The deployment value, or the contract error when it has not been
    /// resolved yet.
    pub fn deployment(&self) -> Result<&Value, crate::strategy::StrategyError> {
        self.deployment.as_ref().ok_or(crate::strategy::StrategyError::MissingDeployment {
            node: self.scope.node_index(),
        })
    }

    /// Serializable form for publication across the cluster.
    pub fn spec(&self) -> ContextSpec {
        ContextSpec {
            operation: self.operation.name().to_string(),
            strategy: self.strategy.name().to_string(),
            args: self.args.clone(),
            deployment: self.deployment.clone(),
            scope: self.scope,
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("operation", &self.operation.name())
            .field("strategy", &self.strategy.name())
            .field("scope", &self.scope)
            .field("deployment", &self.deployment)
            .field("invocation", &self.invocation)
            .finish()
    }
}

/// Wire form of a [`Context`]: operation and strategy by registry name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSpec {
    pub operation: String,
    pub strategy: String,
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<Value>,
    #[serde(flatten)]
    pub scope: Scope,
}

impl ContextSpec {
    /// Resolve names against a registry and re-attach runtime services.
    pub fn rehydrate(
        &self,
        registry: &Registry,
        services: Arc<dyn StrategyServices>,
    ) -> Result<Context, RegistryError> {
        let operation = registry.operation(&self.operation)?;
        let strategy = registry.strategy(&self.strategy)?;
        Ok(Context {
            operation,
            strategy,
            args: self.args.clone(),
            deployment: self.deployment.clone(),
            invocation: None,
            scope: self.scope,
            services,
        })
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
