// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level end-to-end scenarios: pipelines deployed on in-process
//! clusters over the loopback transport.

mod specs {
    mod barrier;
    mod crash_recovery;
    mod deploy_failure;
    mod identity_pipeline;
    mod keyed_state;
    mod late_join;
    mod placement;
    mod undeploy;
}
