// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

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

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use aap_report::archive::{self, ArchiveLimits};
use aap_report::collect::{Manifest, ReportPlugin};
use aap_report::exec::HostRunner;
use aap_report::users;
use aap_report::{AapContainerized, AapOptions};

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = cli::parse_log_level(&cli.log_level);
    simple_logger::init_with_level(log_level)?;
    info!("Log level set to: {log_level:?}");

    if !users::running_as_root() {
        warn!("not running as root; file collection and privilege switching will likely fail");
    }

    let timeout = (cli.command_timeout > 0).then(|| Duration::from_secs(cli.command_timeout));
    let runner = HostRunner::new(timeout);
    let plugin = AapContainerized::new(AapOptions {
        username: cli.username.clone(),
        directory: cli.directory.clone(),
    });
    let plugin: &dyn ReportPlugin = &plugin;

    if !cli.force && !plugin.enabled(&runner) {
        info!("no containerized AAP processes detected, nothing to collect (--force overrides)");
        return Ok(());
    }

    let mut manifest = Manifest::new();
    info!("running plugin {}", plugin.name());
    plugin.collect(&runner, &mut manifest);
    if manifest.is_empty() {
        bail!("collection produced no requests; see the log for details");
    }

    let archive_name = archive::default_archive_name().context("could not derive archive name")?;
    let output_path = cli.output.join(archive_name);
    let limits = ArchiveLimits {
        max_file_size: cli.file_size_limit * 1024 * 1024,
    };
    let summary = archive::write_report(&manifest, &runner, &output_path, limits)
        .with_context(|| format!("could not write report archive {}", output_path.display()))?;

    info!(
        "report written to {} ({} files collected, {} entries excluded, {} command captures, {} diagnostics)",
        output_path.display(),
        summary.files_collected,
        summary.entries_excluded,
        summary.commands.len(),
        summary.diagnostics
    );
    Ok(())
}
