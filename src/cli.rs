// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

use std::path::PathBuf;

use clap::Parser;
use log::Level;

/// Collect a support report from a containerized Ansible Automation
/// Platform installation.
#[derive(Parser, Debug)]
#[command(name = "aap-report")]
#[command(about = "Collect a support report from a containerized AAP install", long_about = None)]
pub struct Cli {
    /// Account that owns the AAP installation
    #[arg(short, long, env = "AAP_REPORT_USERNAME", default_value = "")]
    pub username: String,

    /// Installation directory override (defaults to <home of username>/aap)
    #[arg(short, long, env = "AAP_REPORT_DIRECTORY", default_value = "")]
    pub directory: String,

    /// Directory the report archive is written to
    #[arg(short, long, env = "AAP_REPORT_OUTPUT", default_value = "/var/tmp")]
    pub output: PathBuf,

    /// Per-command deadline in seconds (0 disables it)
    #[arg(long, default_value = "300")]
    pub command_timeout: u64,

    /// Per-file size limit in MiB; larger files are stored truncated to
    /// their tail (0 disables the limit)
    #[arg(long, default_value = "25")]
    pub file_size_limit: u64,

    /// Collect even when no AAP processes are detected on the host
    #[arg(long)]
    pub force: bool,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, env = "AAP_REPORT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

pub fn parse_log_level(value: &str) -> Level {
    match value.to_lowercase().as_str() {
        "trace" => Level::Trace,
        "debug" => Level::Debug,
        "warn" | "warning" => Level::Warn,
        "error" | "critical" | "off" => Level::Error,
        _ => Level::Info,
    }
}
