// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

use clap::Parser;
use serde_json::json;

use aap_report::aap;
use aap_report::exec::{CommandLine, CommandRunner, HostRunner, DEFAULT_COMMAND_TIMEOUT};
use aap_report::probe;
use aap_report::users;

#[derive(Parser, Debug)]
#[command(name = "aap-detect")]
#[command(about = "Report whether a containerized AAP stack is running on this host", long_about = None)]
struct Args {
    /// Account that owns the AAP installation; enables container listing
    #[arg(short, long, default_value = "")]
    username: String,
}

/// Container names for `username`, or the reason no listing happened. An
/// empty username quietly skips the listing; an invalid one is refused
/// before any command is built.
fn enumerate_containers(
    runner: &dyn CommandRunner,
    username: &str,
) -> (Vec<String>, Option<String>) {
    if username.is_empty() {
        return (Vec::new(), None);
    }
    if let Err(reason) = users::validate_username(username) {
        return (
            Vec::new(),
            Some(format!("refusing username {username:?}: {reason}")),
        );
    }
    let listing = CommandLine::as_user(username, aap::CONTAINER_LIST_COMMAND);
    match runner.run(&listing) {
        Ok(output) if output.success() => (aap::parse_container_names(&output.stdout), None),
        Ok(output) => (
            Vec::new(),
            Some(format!(
                "container listing exited with status {:?}",
                output.status
            )),
        ),
        Err(error) => (Vec::new(), Some(error.to_string())),
    }
}

#[allow(clippy::print_stdout, clippy::print_stderr)]
fn main() {
    let args = Args::parse();
    let runner = HostRunner::new(Some(DEFAULT_COMMAND_TIMEOUT));

    let detected = probe::aap_stack_running(&runner);
    let (containers, listing_error) = enumerate_containers(&runner, &args.username);

    let response = json!({
        "aap_detected": detected,
        "containers": containers,
        "listing_error": listing_error,
    });

    match serde_json::to_string_pretty(&response) {
        Ok(text) => println!("{text}"),
        Err(error) => eprintln!("could not encode detection response: {error}"),
    }
}
