// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Host activation probe.
//!
//! Decides whether a containerized AAP stack is running by scanning the
//! process table for known command-line signatures. Read-only; safe to call
//! before anything else.

use log::debug;

use crate::exec::{CommandLine, CommandRunner};

/// Command lines that identify AAP containerized services on the host.
pub const AAP_PROCESS_SIGNATURES: [&str; 6] = [
    "dumb-init -- /usr/bin/envoy",
    "dumb-init -- /usr/bin/supervisord",
    "dumb-init -- /usr/bin/launch_awx_web.sh",
    "dumb-init -- /usr/bin/launch_awx_task.sh",
    "pulpcore-content --name pulp-content --bind",
    "dumb-init -- aap-eda-manage",
];

/// How signatures combine: `AnyOf` activates on the first hit, `AllOf`
/// requires every listed signature to be present at once.
#[derive(Debug, Clone, Copy)]
pub enum SignaturePolicy {
    AnyOf(&'static [&'static str]),
    AllOf(&'static [&'static str]),
}

impl SignaturePolicy {
    pub fn matches(&self, process_table: &str) -> bool {
        match self {
            Self::AnyOf(signatures) => signatures
                .iter()
                .any(|signature| process_table.contains(signature)),
            Self::AllOf(signatures) => {
                !signatures.is_empty()
                    && signatures
                        .iter()
                        .all(|signature| process_table.contains(signature))
            }
        }
    }
}

/// The shipped activation policy.
pub const ACTIVATION_POLICY: SignaturePolicy = SignaturePolicy::AnyOf(&AAP_PROCESS_SIGNATURES);

/// One read-only process-table query; false on any failure.
pub fn aap_stack_running(runner: &dyn CommandRunner) -> bool {
    let listing = CommandLine::new("ps", ["--noheaders", "-eo", "args"]);
    match runner.run(&listing) {
        Ok(output) if output.success() => ACTIVATION_POLICY.matches(&output.stdout),
        Ok(output) => {
            debug!("process listing exited with status {:?}", output.status);
            false
        }
        Err(error) => {
            debug!("process listing failed: {error}");
            false
        }
    }
}
