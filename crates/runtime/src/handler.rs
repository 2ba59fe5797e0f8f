// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server side of the inter-node protocol.
//!
//! Every request a peer can make lands here; membership requests delegate
//! to the cluster, everything else touches the engine. Handlers never
//! panic: failures come back as `Response::Error`.

use crate::services::RuntimeCore;
use crate::worker::WorkerMsg;
use async_trait::async_trait;
use rill_cluster::RequestHandler;
use rill_core::StateInit;
use rill_wire::{Request, Response};
use tracing::{debug, warn};

#[async_trait]
impl RequestHandler for RuntimeCore {
    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::Beacon => self.cluster().beacon().to_response(),

            Request::Hello { node, mode, version, tags } => {
                match self.cluster().handle_hello(&node, mode, &version, tags) {
                    Ok(()) => Response::Ok,
                    Err(e) => Response::error(e.to_string()),
                }
            }

            Request::Goodbye { node } => {
                self.cluster().remove(&node);
                Response::Ok
            }

            Request::StorePut { workflow, payload } => {
                match self.apply_store_put(workflow, payload) {
                    Ok(()) => Response::Ok,
                    Err(reason) => Response::error(reason),
                }
            }

            Request::SpawnNodeSup { workflow, nodes } => {
                match self.spawn_node_sup(workflow, nodes) {
                    Ok(()) => Response::Ok,
                    Err(reason) => Response::error(reason),
                }
            }

            Request::CreateWorker { workflow, node_index, context, state, tag } => {
                let Some(services) = self.services() else {
                    return Response::error("runtime shutting down");
                };
                let ctx = match context.rehydrate(self.registry(), services) {
                    Ok(ctx) => ctx,
                    Err(e) => return Response::error(e.to_string()),
                };
                debug!(%workflow, node_index, "remote worker spawn");
                match rill_core::StrategyServices::create_local(
                    self,
                    &ctx,
                    StateInit::Value(state),
                    tag,
                ) {
                    Ok(worker) => Response::Worker { worker: worker.worker },
                    Err(e) => Response::error(e.to_string()),
                }
            }

            Request::DeployComplete { workflow } => {
                self.deploy_complete_local(workflow);
                Response::Ok
            }

            Request::StopWorkflow { workflow } => {
                self.stop_workflow(workflow);
                Response::Ok
            }

            Request::WorkerSend { worker, value, invocation } => {
                match self.worker_mailbox(&worker) {
                    Some(mailbox) => {
                        let _ = mailbox.send(WorkerMsg::Value { value, invocation });
                    }
                    // Fire-and-forget: a dead worker drops its mail.
                    None => warn!(%worker, "worker send dropped, no such worker"),
                }
                Response::Ok
            }

            Request::WorkerStop { worker } => {
                if let Some(mailbox) = self.worker_mailbox(&worker) {
                    let _ = mailbox.send(WorkerMsg::Stop);
                }
                Response::Ok
            }

            Request::Status => Response::Status { status: self.status() },
        }
    }
}
