// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Collection plugin for containerized Ansible Automation Platform installs.
//!
//! The run step resolves the installation root (explicit override or
//! `<home>/aap`), registers the credential deny-list before requesting the
//! recursive tree collection, schedules two fixed podman captures, then
//! enumerates the user's containers and schedules one log capture per
//! container. Every failure degrades to a diagnostic; nothing here aborts
//! the run.

use std::path::{Path, PathBuf};

use log::{debug, error};

use crate::collect::{Collector, CommandCapture, ReportPlugin};
use crate::exec::{sh_quote, CommandLine, CommandRunner};
use crate::probe;
use crate::users;

pub const PLUGIN_NAME: &str = "aap_containerized";

/// Fixed child of the user's home directory holding the installation.
const INSTALL_SUBDIR: &str = "aap";

/// Sub-collection area grouping per-container log captures.
pub const CONTAINER_LOG_AREA: &str = "aap_containers_log";

/// Container listing limited to names, one per line.
pub const CONTAINER_LIST_COMMAND: &str = "podman ps -a --format {{.Names}}";

/// Credential material below the installation root, relative to it. `*` does
/// not cross path separators; a pattern naming a directory excludes its
/// whole subtree.
pub const FORBIDDEN_TEMPLATES: [&str; 17] = [
    "containers",
    "tls",
    "controller/etc/*.cert",
    "controller/etc/*.key",
    "eda/etc/*.cert",
    "eda/etc/*.key",
    "gateway/etc/*.cert",
    "gateway/etc/*.key",
    "hub/etc/*.cert",
    "hub/etc/*.key",
    "hub/etc/keys/*.pem",
    "postgresql/*.crt",
    "postgresql/*.key",
    "receptor/etc/*.crt",
    "receptor/etc/*.key",
    "receptor/etc/*.pem",
    "redis/*.{crt,key}",
];

#[derive(Debug, Clone, Default)]
pub struct AapOptions {
    /// Account that owns the installation. Required.
    pub username: String,
    /// Explicit installation directory; empty means derive from `username`.
    pub directory: String,
}

#[derive(Debug)]
pub struct AapContainerized {
    options: AapOptions,
}

impl AapContainerized {
    pub fn new(options: AapOptions) -> Self {
        Self { options }
    }

    /// Explicit override verbatim, otherwise `<home-of-username>/aap`.
    fn installation_root(&self, sink: &mut dyn Collector) -> Option<PathBuf> {
        if !self.options.directory.is_empty() {
            return Some(PathBuf::from(&self.options.directory));
        }
        let Some(home) = users::home_of(&self.options.username) else {
            sink.diagnostic(format!(
                "Could not resolve the home directory of user {}",
                self.options.username
            ));
            return None;
        };
        Some(home.join(INSTALL_SUBDIR))
    }

    fn collect_installation_tree(&self, sink: &mut dyn Collector) {
        let Some(root) = self.installation_root(sink) else {
            return;
        };
        if !root.is_absolute() || !root.exists() {
            sink.diagnostic(format!(
                "Directory {} does not exist or invalid absolute path provided",
                root.display()
            ));
            return;
        }
        // The deny-list must be in place before the tree request is recorded.
        sink.forbid_paths(forbidden_paths(&root));
        sink.collect_tree(&root);
    }

    fn collect_runtime_state(&self, sink: &mut dyn Collector) {
        sink.collect_command(CommandCapture {
            command: self.podman("podman info --debug"),
            filename: "podman_info".to_string(),
            subdir: None,
        });
        sink.collect_command(CommandCapture {
            command: self.podman("podman ps -a --format json"),
            filename: "podman_ps_all_json".to_string(),
            subdir: None,
        });
    }

    /// Names of the user's containers, or an empty list plus a diagnostic on
    /// any listing failure.
    fn container_names(&self, runner: &dyn CommandRunner, sink: &mut dyn Collector) -> Vec<String> {
        match runner.run(&self.podman(CONTAINER_LIST_COMMAND)) {
            Ok(output) if output.success() => parse_container_names(&output.stdout),
            Ok(output) => {
                debug!(
                    "container listing exited with status {:?}: {}",
                    output.status,
                    output.stderr.trim()
                );
                sink.diagnostic("Error retrieving Podman containers".to_string());
                Vec::new()
            }
            Err(error) => {
                debug!("container listing failed: {error}");
                sink.diagnostic("Error retrieving Podman containers".to_string());
                Vec::new()
            }
        }
    }

    fn collect_container_logs(&self, runner: &dyn CommandRunner, sink: &mut dyn Collector) {
        for name in self.container_names(runner, sink) {
            sink.collect_command(CommandCapture {
                command: self.podman(&format!("podman logs {}", sh_quote(&name))),
                filename: format!("{}.log", sanitize_filename(&name)),
                subdir: Some(CONTAINER_LOG_AREA.to_string()),
            });
        }
    }

    fn podman(&self, script: &str) -> CommandLine {
        CommandLine::as_user(&self.options.username, script)
    }
}

impl ReportPlugin for AapContainerized {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn enabled(&self, runner: &dyn CommandRunner) -> bool {
        probe::aap_stack_running(runner)
    }

    fn collect(&self, runner: &dyn CommandRunner, sink: &mut dyn Collector) {
        let username = self.options.username.as_str();
        // Precondition failures may not reach the sink or run any command.
        if username.is_empty() {
            error!("Username is mandatory to collect AAP containerized setup logs");
            return;
        }
        if let Err(reason) = users::validate_username(username) {
            error!("Refusing username {username:?}: {reason}");
            return;
        }

        self.collect_installation_tree(sink);
        self.collect_runtime_state(sink);
        self.collect_container_logs(runner, sink);
    }
}

/// The deny-list instantiated under `root`.
pub fn forbidden_paths(root: &Path) -> Vec<String> {
    FORBIDDEN_TEMPLATES
        .iter()
        .map(|template| root.join(template).to_string_lossy().into_owned())
        .collect()
}

/// Container names from the listing output: one per line, trimmed, blanks
/// dropped.
pub fn parse_container_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Filename-safe rendition of a container name. The raw name still goes
/// into the (quoted) log command; only the archive entry name is sanitized.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[allow(clippy::expect_used)]
#[allow(clippy::panic)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use crate::test_support::{exit_with, ScriptedRunner};

    #[derive(Debug, PartialEq, Eq)]
    enum SinkCall {
        Forbid(Vec<String>),
        Tree(PathBuf),
        Command(CommandCapture),
        Diagnostic(String),
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<SinkCall>,
    }

    impl RecordingSink {
        fn captures(&self) -> Vec<&CommandCapture> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    SinkCall::Command(capture) => Some(capture),
                    _ => None,
                })
                .collect()
        }

        fn diagnostics(&self) -> Vec<&str> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    SinkCall::Diagnostic(message) => Some(message.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    impl Collector for RecordingSink {
        fn forbid_paths(&mut self, patterns: Vec<String>) {
            self.calls.push(SinkCall::Forbid(patterns));
        }

        fn collect_tree(&mut self, root: &Path) {
            self.calls.push(SinkCall::Tree(root.to_path_buf()));
        }

        fn collect_command(&mut self, capture: CommandCapture) {
            self.calls.push(SinkCall::Command(capture));
        }

        fn diagnostic(&mut self, message: String) {
            self.calls.push(SinkCall::Diagnostic(message));
        }
    }

    fn plugin_for(username: &str, directory: &str) -> AapContainerized {
        AapContainerized::new(AapOptions {
            username: username.to_string(),
            directory: directory.to_string(),
        })
    }

    #[test]
    fn test_forbidden_paths_registered_before_tree_request() {
        let root = TempDir::new().unwrap();
        let plugin = plugin_for("root", &root.path().to_string_lossy());
        let runner = ScriptedRunner::new().with_response(Ok(exit_with(0, "")));
        let mut sink = RecordingSink::default();

        plugin.collect(&runner, &mut sink);

        let forbid_at = sink
            .calls
            .iter()
            .position(|call| matches!(call, SinkCall::Forbid(..)))
            .expect("forbidden set was never registered");
        let tree_at = sink
            .calls
            .iter()
            .position(|call| matches!(call, SinkCall::Tree(..)))
            .expect("tree collection was never requested");
        assert!(
            forbid_at < tree_at,
            "exclusions must be registered before the tree request"
        );
    }

    #[test]
    fn test_missing_username_touches_nothing() {
        let plugin = plugin_for("", "/srv/custom");
        let runner = ScriptedRunner::new();
        let mut sink = RecordingSink::default();

        plugin.collect(&runner, &mut sink);

        assert!(sink.calls.is_empty(), "sink must stay untouched");
        assert!(runner.commands_run().is_empty(), "no command may run");
    }

    #[test]
    fn test_invalid_username_touches_nothing() {
        let plugin = plugin_for("alice; rm -rf /", "/srv/custom");
        let runner = ScriptedRunner::new();
        let mut sink = RecordingSink::default();

        plugin.collect(&runner, &mut sink);

        assert!(sink.calls.is_empty());
        assert!(runner.commands_run().is_empty());
    }

    #[test]
    fn test_root_derived_from_home_directory() {
        let plugin = plugin_for("root", "");
        let mut sink = RecordingSink::default();
        let home = crate::users::home_of("root").unwrap();
        assert_eq!(
            plugin.installation_root(&mut sink),
            Some(home.join("aap")),
            "derived root must be <home>/aap"
        );
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_explicit_directory_overrides_derivation() {
        let plugin = plugin_for("root", "/srv/custom");
        let mut sink = RecordingSink::default();
        assert_eq!(
            plugin.installation_root(&mut sink),
            Some(PathBuf::from("/srv/custom"))
        );
    }

    #[test]
    fn test_unknown_user_still_collects_runtime_state() {
        let plugin = plugin_for("no-such-user-around-here", "");
        let runner = ScriptedRunner::new().with_response(Ok(exit_with(1, "")));
        let mut sink = RecordingSink::default();

        plugin.collect(&runner, &mut sink);

        assert!(
            !sink
                .calls
                .iter()
                .any(|call| matches!(call, SinkCall::Tree(..) | SinkCall::Forbid(..))),
            "no tree collection without a resolvable root"
        );
        let captures = sink.captures();
        assert_eq!(captures.len(), 2, "podman captures must still be scheduled");
        assert_eq!(captures.first().unwrap().filename, "podman_info");
    }

    #[test]
    fn test_missing_directory_reports_diagnostic_and_skips_tree() {
        let plugin = plugin_for("root", "/does/not/exist/anywhere");
        let runner = ScriptedRunner::new().with_response(Ok(exit_with(0, "")));
        let mut sink = RecordingSink::default();

        plugin.collect(&runner, &mut sink);

        assert!(sink.diagnostics().iter().any(|message| {
            message.contains("/does/not/exist/anywhere")
                && message.contains("does not exist or invalid absolute path")
        }));
        assert!(
            !sink.calls.iter().any(|call| matches!(call, SinkCall::Tree(..))),
            "a missing root must not be collected"
        );
    }

    #[test]
    fn test_relative_directory_is_rejected() {
        let plugin = plugin_for("root", "srv/custom");
        let runner = ScriptedRunner::new().with_response(Ok(exit_with(0, "")));
        let mut sink = RecordingSink::default();

        plugin.collect(&runner, &mut sink);

        assert!(sink
            .diagnostics()
            .iter()
            .any(|message| message.contains("srv/custom")));
        assert!(!sink.calls.iter().any(|call| matches!(call, SinkCall::Tree(..))));
    }

    #[test]
    fn test_forbidden_set_is_complete() {
        let root = Path::new("/home/alice/aap");
        let paths = forbidden_paths(root);
        assert_eq!(paths.len(), 17);
        for path in &paths {
            assert!(
                path.starts_with("/home/alice/aap/"),
                "{path} must live under the root"
            );
        }
        for expected in [
            "/home/alice/aap/containers",
            "/home/alice/aap/tls",
            "/home/alice/aap/postgresql/*.crt",
            "/home/alice/aap/hub/etc/keys/*.pem",
            "/home/alice/aap/redis/*.{crt,key}",
        ] {
            assert!(paths.iter().any(|path| path == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_enumeration_failure_yields_no_log_fetches() {
        let root = TempDir::new().unwrap();
        let plugin = plugin_for("root", &root.path().to_string_lossy());
        let runner = ScriptedRunner::new().with_response(Ok(exit_with(125, "")));
        let mut sink = RecordingSink::default();

        plugin.collect(&runner, &mut sink);

        let captures = sink.captures();
        assert_eq!(captures.len(), 2, "only the fixed podman captures remain");
        assert!(captures.iter().all(|capture| capture.subdir.is_none()));
        assert_eq!(sink.diagnostics(), ["Error retrieving Podman containers"]);
    }

    #[test]
    fn test_fanout_order_names_and_area() {
        let root = TempDir::new().unwrap();
        let plugin = plugin_for("root", &root.path().to_string_lossy());
        let runner = ScriptedRunner::new().with_response(Ok(exit_with(0, "web\napi\n\nworker\n")));
        let mut sink = RecordingSink::default();

        plugin.collect(&runner, &mut sink);

        let logs: Vec<&CommandCapture> = sink
            .captures()
            .into_iter()
            .filter(|capture| capture.subdir.is_some())
            .collect();
        assert_eq!(logs.len(), 3, "blank lines must not become containers");
        let filenames: Vec<&str> = logs
            .iter()
            .map(|capture| capture.filename.as_str())
            .collect();
        assert_eq!(filenames, ["web.log", "api.log", "worker.log"]);
        for (capture, name) in logs.iter().zip(["web", "api", "worker"]) {
            assert_eq!(capture.subdir.as_deref(), Some(CONTAINER_LOG_AREA));
            assert_eq!(
                capture.command.to_string(),
                format!("su - root -c podman logs '{name}'")
            );
        }
    }

    #[test]
    fn test_hostile_container_name_cannot_escape_log_area() {
        let root = TempDir::new().unwrap();
        let plugin = plugin_for("root", &root.path().to_string_lossy());
        let runner = ScriptedRunner::new().with_response(Ok(exit_with(0, "../evil\n")));
        let mut sink = RecordingSink::default();

        plugin.collect(&runner, &mut sink);

        let logs: Vec<&CommandCapture> = sink
            .captures()
            .into_iter()
            .filter(|capture| capture.subdir.is_some())
            .collect();
        let capture = logs.first().unwrap();
        assert_eq!(capture.filename, ".._evil.log", "path separators must be replaced");
        assert!(
            capture.command.to_string().ends_with("podman logs '../evil'"),
            "the raw name is still what podman is asked about"
        );
    }

    #[test]
    fn test_enumeration_runs_as_the_target_user() {
        let root = TempDir::new().unwrap();
        let plugin = plugin_for("root", &root.path().to_string_lossy());
        let runner = ScriptedRunner::new().with_response(Ok(exit_with(0, "")));
        let mut sink = RecordingSink::default();

        plugin.collect(&runner, &mut sink);

        assert_eq!(
            runner.commands_run(),
            ["su - root -c podman ps -a --format {{.Names}}"],
            "collect() itself runs only the enumeration"
        );
    }

    #[test]
    fn test_enabled_follows_process_signatures() {
        let plugin = plugin_for("root", "");
        let runner = ScriptedRunner::new().with_response(Ok(exit_with(
            0,
            "dumb-init -- /usr/bin/launch_awx_task.sh\n",
        )));
        assert!(plugin.enabled(&runner));

        let runner = ScriptedRunner::new().with_response(Ok(exit_with(0, "bash\n")));
        assert!(!plugin.enabled(&runner));
    }

    #[test]
    fn test_parse_container_names_trims_and_drops_blanks() {
        assert_eq!(
            parse_container_names("  web  \n\napi\r\n  \nworker"),
            ["web", "api", "worker"]
        );
        assert!(parse_container_names("").is_empty());
    }
}
