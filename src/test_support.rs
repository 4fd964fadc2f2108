// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Scripted command-runner double for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::errors::ReportError;
use crate::exec::{CommandLine, CommandOutput, CommandRunner};

/// Replays canned responses in order and records every command it was asked
/// to run. Commands beyond the scripted responses get a status-less default
/// output, which no caller treats as success.
pub(crate) struct ScriptedRunner {
    responses: RefCell<VecDeque<Result<CommandOutput, ReportError>>>,
    commands: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self {
            responses: RefCell::new(VecDeque::new()),
            commands: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn with_response(self, response: Result<CommandOutput, ReportError>) -> Self {
        self.responses.borrow_mut().push_back(response);
        self
    }

    pub(crate) fn commands_run(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput, ReportError> {
        self.commands.borrow_mut().push(command.to_string());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(CommandOutput::default()))
    }
}

pub(crate) fn exit_with(status: i32, stdout: &str) -> CommandOutput {
    CommandOutput {
        status: Some(status),
        stdout: stdout.to_string(),
        stderr: String::new(),
        timed_out: false,
    }
}
