// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Support-report collector for containerized Ansible Automation Platform
//! installations.
//!
//! A run has two phases. Plugins first emit collection requests (recursive
//! tree inclusion, forbidden-path patterns, command captures, diagnostics)
//! into a [`collect::Manifest`]; the archive writer then services the
//! complete manifest into a single zip report. Keeping the phases separate
//! guarantees that forbidden patterns registered by a plugin are in effect
//! before any of its trees are walked, and that one failed artifact never
//! stops the rest of the collection.

// Correctness
#![deny(clippy::indexing_slicing)]
#![deny(clippy::string_slice)]
#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::undocumented_unsafe_blocks)]
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

pub mod aap;
pub mod archive;
pub mod collect;
pub mod errors;
pub mod exec;
pub mod probe;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;

pub use aap::{AapContainerized, AapOptions};
pub use archive::{write_report, ArchiveLimits, ReportSummary};
pub use collect::{Collector, CommandCapture, Manifest, ReportPlugin};
pub use errors::ReportError;
pub use exec::{CommandLine, CommandOutput, CommandRunner, HostRunner};
