// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-runtime constant store.
//!
//! Immutable per-workflow values keyed by `(tag, workflow_ref)`: deploy
//! results, node contexts, link tables, and local supervisor handles.
//! Reads are wait-free (`ArcSwap` snapshot loads); writers clone the map,
//! insert, and swap under a writer lock. Entries are written at deploy
//! time and on late-join replay, never mutated in place.

use crate::supervisor::WorkerSup;
use arc_swap::ArcSwap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rill_core::{Context, PortIndex, PortName, WorkflowRef};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One node's pre-built link table: out-port → downstream
/// `(context, in-port index)` destinations, in link order.
#[derive(Clone, Default)]
pub struct LinkTable(IndexMap<PortName, Vec<(Context, PortIndex)>>);

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, port: PortName, dsts: Vec<(Context, PortIndex)>) {
        self.0.insert(port, dsts);
    }

    pub fn get(&self, port: &PortName) -> Option<&[(Context, PortIndex)]> {
        self.0.get(port).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PortName, &Vec<(Context, PortIndex)>)> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum StoreTag {
    Deployments,
    Contexts,
    Links,
    Supervisors,
}

#[derive(Clone)]
enum StoreEntry {
    Deployments(Arc<Vec<Value>>),
    Contexts(Arc<Vec<Context>>),
    Links(Arc<Vec<LinkTable>>),
    Supervisors(Arc<Vec<WorkerSup>>),
}

type StoreMap = HashMap<(StoreTag, WorkflowRef), StoreEntry>;

/// Copy-on-publish key→value store with wait-free reads.
pub struct ConstantStore {
    map: ArcSwap<StoreMap>,
    write: Mutex<()>,
}

impl Default for ConstantStore {
    fn default() -> Self {
        Self { map: ArcSwap::from_pointee(StoreMap::new()), write: Mutex::new(()) }
    }
}

impl ConstantStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn publish(&self, tag: StoreTag, workflow: WorkflowRef, entry: StoreEntry) {
        let _guard = self.write.lock();
        let mut next: StoreMap = (**self.map.load()).clone();
        next.insert((tag, workflow), entry);
        self.map.store(Arc::new(next));
    }

    fn entry(&self, tag: StoreTag, workflow: WorkflowRef) -> Option<StoreEntry> {
        self.map.load().get(&(tag, workflow)).cloned()
    }

    pub fn put_deployments(&self, workflow: WorkflowRef, deployments: Vec<Value>) {
        self.publish(StoreTag::Deployments, workflow, StoreEntry::Deployments(Arc::new(deployments)));
    }

    pub fn put_contexts(&self, workflow: WorkflowRef, contexts: Vec<Context>) {
        self.publish(StoreTag::Contexts, workflow, StoreEntry::Contexts(Arc::new(contexts)));
    }

    pub fn put_links(&self, workflow: WorkflowRef, links: Vec<LinkTable>) {
        self.publish(StoreTag::Links, workflow, StoreEntry::Links(Arc::new(links)));
    }

    pub fn put_supervisors(&self, workflow: WorkflowRef, sups: Vec<WorkerSup>) {
        self.publish(StoreTag::Supervisors, workflow, StoreEntry::Supervisors(Arc::new(sups)));
    }

    pub fn deployments(&self, workflow: WorkflowRef) -> Option<Arc<Vec<Value>>> {
        match self.entry(StoreTag::Deployments, workflow)? {
            StoreEntry::Deployments(d) => Some(d),
            _ => None,
        }
    }

    pub fn deployment(&self, workflow: WorkflowRef, node: usize) -> Option<Value> {
        self.deployments(workflow)?.get(node).cloned()
    }

    pub fn contexts(&self, workflow: WorkflowRef) -> Option<Arc<Vec<Context>>> {
        match self.entry(StoreTag::Contexts, workflow)? {
            StoreEntry::Contexts(c) => Some(c),
            _ => None,
        }
    }

    pub fn context(&self, workflow: WorkflowRef, node: usize) -> Option<Context> {
        self.contexts(workflow)?.get(node).cloned()
    }

    /// Hot-path accessor for the emit router.
    pub fn links(&self, workflow: WorkflowRef) -> Option<Arc<Vec<LinkTable>>> {
        match self.entry(StoreTag::Links, workflow)? {
            StoreEntry::Links(l) => Some(l),
            _ => None,
        }
    }

    pub fn supervisors(&self, workflow: WorkflowRef) -> Option<Arc<Vec<WorkerSup>>> {
        match self.entry(StoreTag::Supervisors, workflow)? {
            StoreEntry::Supervisors(s) => Some(s),
            _ => None,
        }
    }

    pub fn supervisor(&self, workflow: WorkflowRef, node: usize) -> Option<WorkerSup> {
        self.supervisors(workflow)?.get(node).cloned()
    }

    /// Drop every entry for a workflow. Idempotent.
    pub fn remove(&self, workflow: WorkflowRef) {
        let _guard = self.write.lock();
        let mut next: StoreMap = (**self.map.load()).clone();
        next.retain(|(_, wf), _| *wf != workflow);
        self.map.store(Arc::new(next));
    }

    /// Drop only the supervisor handles for a workflow (node collapse).
    pub fn remove_supervisors(&self, workflow: WorkflowRef) {
        let _guard = self.write.lock();
        let mut next: StoreMap = (**self.map.load()).clone();
        next.remove(&(StoreTag::Supervisors, workflow));
        self.map.store(Arc::new(next));
    }

    /// Workflows with published deployments on this runtime.
    pub fn workflows(&self) -> Vec<WorkflowRef> {
        self.map
            .load()
            .keys()
            .filter(|(tag, _)| *tag == StoreTag::Deployments)
            .map(|(_, wf)| *wf)
            .collect()
    }

    pub fn has(&self, workflow: WorkflowRef) -> bool {
        self.deployments(workflow).is_some()
    }

    /// Total entry count across all tags and workflows.
    pub fn len(&self) -> usize {
        self.map.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
