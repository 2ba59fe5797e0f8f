// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow graphs and flattening.
//!
//! Users author a [`Workflow`]: named nodes, optional nested sub-workflows,
//! and links from out-ports to `node.port` targets. [`Workflow::flatten`]
//! inlines every sub-workflow into a dense node list whose traversal order
//! defines the node indices, and rewrites link targets to
//! `(index, in_port)` pairs. Flattening is deterministic: the same graph
//! always produces the same indices.

use crate::port::PortName;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Separator joining nested node names into full paths.
const NAME_SEP: char = '/';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("duplicate node name {0}")]
    DuplicateNode(String),

    #[error("node {node} links to unknown target {target}")]
    UnknownLinkTarget { node: String, target: String },

    #[error("malformed link target {target} (expected node.port)")]
    MalformedLinkTarget { target: String },

    #[error("workflow has no nodes")]
    Empty,

    #[error("cycle through node {0}")]
    Cycle(String),
}

/// A link from one of a node's out-ports to a `node.port` destination.
///
/// Targets are resolved relative to the link's own nesting level, so a
/// node inside a sub-workflow links to its siblings by bare name and outer
/// nodes reach into sub-workflows with `sub/inner.port` paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub out_port: PortName,
    pub target: String,
}

impl Link {
    /// Split the target into node path and in-port name.
    fn split(&self) -> Result<(&str, &str), WorkflowError> {
        self.target
            .rsplit_once('.')
            .filter(|(node, port)| !node.is_empty() && !port.is_empty())
            .ok_or_else(|| WorkflowError::MalformedLinkTarget { target: self.target.clone() })
    }
}

/// One operation node in an authored workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Registry name of the operation.
    pub operation: String,
    /// Registry name of the strategy; falls back to the operation's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// Deploy-time arguments.
    #[serde(default)]
    pub args: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl WorkflowNode {
    pub fn new(operation: impl Into<String>) -> Self {
        Self { operation: operation.into(), strategy: None, args: Value::Null, links: Vec::new() }
    }

    pub fn strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }

    /// Link `out_port` to a `node.port` target.
    pub fn link(mut self, out_port: impl Into<PortName>, target: impl Into<String>) -> Self {
        self.links.push(Link { out_port: out_port.into(), target: target.into() });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Element {
    Node(WorkflowNode),
    Workflow(Workflow),
}

/// An authored workflow: a DAG of named operation nodes, possibly nested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    elements: Vec<(String, Element)>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), elements: Vec::new() }
    }

    pub fn node(mut self, name: impl Into<String>, node: WorkflowNode) -> Self {
        self.elements.push((name.into(), Element::Node(node)));
        self
    }

    /// Embed a sub-workflow; its nodes flatten under `name/`.
    pub fn nested(mut self, name: impl Into<String>, workflow: Workflow) -> Self {
        self.elements.push((name.into(), Element::Workflow(workflow)));
        self
    }

    /// Inline all sub-workflows into a dense, index-addressed node list.
    pub fn flatten(&self) -> Result<FlatWorkflow, WorkflowError> {
        let mut nodes: Vec<PendingNode> = Vec::new();
        collect(&self.elements, "", &mut nodes)?;
        if nodes.is_empty() {
            return Err(WorkflowError::Empty);
        }

        let mut index: IndexMap<String, usize> = IndexMap::new();
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.name.clone(), i).is_some() {
                return Err(WorkflowError::DuplicateNode(node.name.clone()));
            }
        }

        let mut flat = Vec::with_capacity(nodes.len());
        for pending in &nodes {
            let mut links: IndexMap<PortName, Vec<(usize, PortName)>> = IndexMap::new();
            for link in &pending.node.links {
                let (path, port) = link.split()?;
                let full = join_name(&pending.prefix, path);
                let target = *index.get(&full).ok_or_else(|| WorkflowError::UnknownLinkTarget {
                    node: pending.name.clone(),
                    target: link.target.clone(),
                })?;
                links
                    .entry(link.out_port.clone())
                    .or_default()
                    .push((target, PortName::new(port)));
            }
            flat.push(FlatNode {
                name: pending.name.clone(),
                operation: pending.node.operation.clone(),
                strategy: pending.node.strategy.clone(),
                args: pending.node.args.clone(),
                links,
            });
        }

        let result = FlatWorkflow { name: self.name.clone(), nodes: flat };
        result.check_acyclic()?;
        Ok(result)
    }
}

struct PendingNode {
    name: String,
    prefix: String,
    node: WorkflowNode,
}

fn join_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{NAME_SEP}{name}")
    }
}

fn collect(
    elements: &[(String, Element)],
    prefix: &str,
    out: &mut Vec<PendingNode>,
) -> Result<(), WorkflowError> {
    let mut seen: IndexMap<&str, ()> = IndexMap::new();
    for (name, element) in elements {
        if seen.insert(name.as_str(), ()).is_some() {
            return Err(WorkflowError::DuplicateNode(join_name(prefix, name)));
        }
        let full = join_name(prefix, name);
        match element {
            Element::Node(node) => {
                out.push(PendingNode { name: full, prefix: prefix.to_string(), node: node.clone() })
            }
            Element::Workflow(workflow) => collect(&workflow.elements, &full, out)?,
        }
    }
    Ok(())
}

/// One node of a flattened workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatNode {
    /// Full path name, e.g. `sub/inner`.
    pub name: String,
    pub operation: String,
    pub strategy: Option<String>,
    pub args: Value,
    /// Out-port → `(downstream index, in-port name)` destinations.
    pub links: IndexMap<PortName, Vec<(usize, PortName)>>,
}

/// A flattened workflow: a pure DAG of operation nodes with dense indices
/// `[0, N)`, fixed for the lifetime of the deployed workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatWorkflow {
    pub name: String,
    pub nodes: Vec<FlatNode>,
}

impl FlatWorkflow {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Deterministic index of a node by full path name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    fn check_acyclic(&self) -> Result<(), WorkflowError> {
        // Colors: 0 = unvisited, 1 = on stack, 2 = done.
        let mut color = vec![0u8; self.nodes.len()];
        for start in 0..self.nodes.len() {
            if color[start] == 0 {
                self.visit(start, &mut color)?;
            }
        }
        Ok(())
    }

    fn visit(&self, i: usize, color: &mut [u8]) -> Result<(), WorkflowError> {
        color[i] = 1;
        for dsts in self.nodes[i].links.values() {
            for (j, _) in dsts {
                match color[*j] {
                    1 => return Err(WorkflowError::Cycle(self.nodes[*j].name.clone())),
                    0 => self.visit(*j, color)?,
                    _ => {}
                }
            }
        }
        color[i] = 2;
        Ok(())
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
