// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Collection requests and the manifest that accumulates them.
//!
//! Plugins never touch the filesystem or the archive directly. They emit
//! requests into a [`Collector`] sink; the archive writer later services the
//! fully-populated [`Manifest`], which guarantees every forbidden pattern is
//! in effect before any tree is walked.

use std::path::{Path, PathBuf};

use log::warn;

use crate::exec::{CommandLine, CommandRunner};

/// Sink for collection requests. Implemented by [`Manifest`] for real runs
/// and by recording doubles in tests.
pub trait Collector {
    /// Exclude every path matching one of `patterns` from all collection.
    fn forbid_paths(&mut self, patterns: Vec<String>);

    /// Schedule recursive inclusion of `root`, subject to the forbidden
    /// patterns in effect at archive-assembly time.
    fn collect_tree(&mut self, root: &Path);

    /// Schedule a command for execution and capture during archive assembly.
    fn collect_command(&mut self, capture: CommandCapture);

    /// Record a non-fatal condition. Diagnostics end up in the archive next
    /// to the data they explain.
    fn diagnostic(&mut self, message: String);
}

/// A scheduled command-output capture: the command to run, the filename the
/// output is stored under, and an optional sub-collection area grouping
/// related captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCapture {
    pub command: CommandLine,
    pub filename: String,
    pub subdir: Option<String>,
}

/// Everything one run decided to collect.
#[derive(Debug, Default)]
pub struct Manifest {
    forbidden: Vec<String>,
    trees: Vec<PathBuf>,
    commands: Vec<CommandCapture>,
    diagnostics: Vec<String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forbidden(&self) -> &[String] {
        &self.forbidden
    }

    pub fn trees(&self) -> &[PathBuf] {
        &self.trees
    }

    pub fn commands(&self) -> &[CommandCapture] {
        &self.commands
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// True when the run scheduled nothing worth archiving.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty() && self.commands.is_empty()
    }
}

impl Collector for Manifest {
    fn forbid_paths(&mut self, patterns: Vec<String>) {
        self.forbidden.extend(patterns);
    }

    fn collect_tree(&mut self, root: &Path) {
        self.trees.push(root.to_path_buf());
    }

    fn collect_command(&mut self, capture: CommandCapture) {
        self.commands.push(capture);
    }

    fn diagnostic(&mut self, message: String) {
        warn!("{message}");
        self.diagnostics.push(message);
    }
}

/// A collection plugin: a named unit that decides whether it applies to this
/// host and, when run, emits its requests into the sink.
pub trait ReportPlugin {
    fn name(&self) -> &'static str;

    /// Eligibility gate; must be side-effect-free beyond read-only queries.
    fn enabled(&self, runner: &dyn CommandRunner) -> bool;

    /// The run step. Never fails: every degradation is a diagnostic.
    fn collect(&self, runner: &dyn CommandRunner, sink: &mut dyn Collector);
}
