// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Blocking command execution with an optional per-command deadline.
//!
//! Commands are built as argv vectors, never interpolated into an outer
//! shell line. The privilege switch used for collection commands is
//! `su - <username> -c <script>`; values embedded inside `<script>` must be
//! quoted with [`sh_quote`].

use std::fmt;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::errors::ReportError;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A command as an argv vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// A shell script run as another account through a login shell.
    pub fn as_user(username: &str, script: &str) -> Self {
        Self::new("su", ["-", username, "-c", script])
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Outcome of one command. A non-zero exit status is a normal outcome; only
/// spawn/wait faults are reported as [`ReportError`]. `status` is `None` when
/// the child was killed, including after a timeout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Seam for everything that runs external commands, so collection logic can
/// be exercised against scripted doubles.
pub trait CommandRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput, ReportError>;
}

/// Runs commands on the local host, killing any child that outlives the
/// configured deadline. `None` disables the deadline.
#[derive(Debug, Clone)]
pub struct HostRunner {
    timeout: Option<Duration>,
}

impl HostRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for HostRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput, ReportError> {
        debug!("running: {command}");
        let mut child = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ReportError::Spawn {
                command: command.to_string(),
                source,
            })?;

        // Drain both pipes off-thread so a chatty child cannot deadlock
        // against a full pipe buffer while we wait on it.
        let stdout = drain_pipe(child.stdout.take());
        let stderr = drain_pipe(child.stderr.take());

        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let mut timed_out = false;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status.code(),
                Ok(None) => {
                    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                        warn!("command deadline exceeded, killing it: {command}");
                        if let Err(error) = child.kill() {
                            warn!("could not kill timed-out command: {error}");
                        }
                        let _ = child.wait();
                        timed_out = true;
                        break None;
                    }
                    thread::sleep(WAIT_POLL_INTERVAL);
                }
                Err(source) => {
                    return Err(ReportError::Wait {
                        command: command.to_string(),
                        source,
                    });
                }
            }
        };

        Ok(CommandOutput {
            status,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
            timed_out,
        })
    }
}

fn drain_pipe<R>(pipe: Option<R>) -> thread::JoinHandle<String>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let Some(mut pipe) = pipe else {
            return String::new();
        };
        let mut raw = Vec::new();
        if pipe.read_to_end(&mut raw).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&raw).into_owned()
    })
}

/// Single-quote a value for embedding in a shell script.
pub fn sh_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}
