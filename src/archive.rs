// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Report archive assembly.
//!
//! Services a fully-populated [`Manifest`]: walks every scheduled tree with
//! the forbidden-path overlay applied, runs every scheduled command capture,
//! and writes the results into one zip archive together with `manifest.json`
//! and `diagnostics.log`. The manifest is complete before assembly starts,
//! so no tree is ever walked without its exclusions in effect.
//!
//! Archive layout:
//!
//! ```text
//! files/<absolute source path minus the leading slash>
//! commands/[<sub-collection area>/]<filename>
//! manifest.json
//! diagnostics.log
//! ```

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use glob_match::glob_match;
use log::{debug, info, warn};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::collect::{CommandCapture, Manifest};
use crate::errors::ReportError;
use crate::exec::CommandRunner;

pub const DEFAULT_FILE_SIZE_LIMIT: u64 = 25 * 1024 * 1024;

const MAX_TREE_DEPTH: usize = 16;
const FILE_AREA: &str = "files";
const COMMAND_AREA: &str = "commands";

#[derive(Debug, Clone, Copy)]
pub struct ArchiveLimits {
    /// Per-file size cap in bytes; larger files are stored as their trailing
    /// portion. 0 disables the cap.
    pub max_file_size: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_FILE_SIZE_LIMIT,
        }
    }
}

/// Outcome of one scheduled command capture.
#[derive(Debug, Serialize)]
pub struct CommandRecord {
    pub name: String,
    pub command: String,
    pub exit_status: Option<i32>,
    pub timed_out: bool,
}

/// Run metadata, returned to the caller and stored as `manifest.json`.
#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub created: String,
    pub files_collected: u64,
    pub entries_excluded: u64,
    pub files_truncated: u64,
    pub bytes_collected: u64,
    pub commands: Vec<CommandRecord>,
    pub diagnostics: u64,
}

/// `aap-report-<UTC timestamp>.zip`
pub fn default_archive_name() -> Result<String, ReportError> {
    let format = format_description!("[year][month][day]-[hour][minute][second]");
    let stamp = OffsetDateTime::now_utc().format(format)?;
    Ok(format!("aap-report-{stamp}.zip"))
}

/// Assemble the archive at `path` from everything `manifest` scheduled.
/// Unreadable files degrade to diagnostics; only archive-level I/O fails
/// the run.
pub fn write_report(
    manifest: &Manifest,
    runner: &dyn CommandRunner,
    path: &Path,
    limits: ArchiveLimits,
) -> Result<ReportSummary, ReportError> {
    let file = File::create(path).map_err(|source| ReportError::ArchiveCreate {
        path: path.to_path_buf(),
        source,
    })?;
    let mut builder = ArchiveBuilder::new(file, limits, manifest.diagnostics().to_vec());
    for root in manifest.trees() {
        builder.add_tree(root, manifest.forbidden())?;
    }
    for capture in manifest.commands() {
        builder.add_capture(runner, capture)?;
    }
    builder.finish()
}

struct ArchiveBuilder {
    zip: ZipWriter<File>,
    limits: ArchiveLimits,
    created: String,
    diagnostics: Vec<String>,
    commands: Vec<CommandRecord>,
    files_collected: u64,
    entries_excluded: u64,
    files_truncated: u64,
    bytes_collected: u64,
}

impl ArchiveBuilder {
    fn new(file: File, limits: ArchiveLimits, diagnostics: Vec<String>) -> Self {
        Self {
            zip: ZipWriter::new(file),
            limits,
            created: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_else(|_| String::from("unknown")),
            diagnostics,
            commands: Vec::new(),
            files_collected: 0,
            entries_excluded: 0,
            files_truncated: 0,
            bytes_collected: 0,
        }
    }

    fn diagnose(&mut self, message: String) {
        warn!("{message}");
        self.diagnostics.push(message);
    }

    fn add_tree(&mut self, root: &Path, forbidden: &[String]) -> Result<(), ReportError> {
        info!("collecting {}", root.display());
        let mut walker = walker(root).into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    self.diagnose(format!(
                        "Skipping unreadable entry under {}: {error}",
                        root.display()
                    ));
                    continue;
                }
            };
            let path = entry.path();
            if is_forbidden(forbidden, path) {
                if entry.file_type().is_dir() {
                    walker.skip_current_dir();
                }
                debug!("excluding {}", path.display());
                self.entries_excluded += 1;
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            match self.add_file(path) {
                Ok(()) => {}
                Err(error @ ReportError::ArchiveEntry { .. }) => return Err(error),
                Err(error) => {
                    self.diagnose(format!("Could not archive {}: {error}", path.display()));
                }
            }
        }
        Ok(())
    }

    fn add_file(&mut self, path: &Path) -> Result<(), ReportError> {
        let name = entry_name_for(path);
        let mut file = File::open(path).map_err(|source| ReportError::EntryCopy {
            name: name.clone(),
            source,
        })?;
        let metadata = file.metadata().map_err(|source| ReportError::EntryCopy {
            name: name.clone(),
            source,
        })?;

        let mut truncated = false;
        if self.limits.max_file_size > 0 && metadata.len() > self.limits.max_file_size {
            let offset = metadata.len() - self.limits.max_file_size;
            file.seek(SeekFrom::Start(offset))
                .map_err(|source| ReportError::EntryCopy {
                    name: name.clone(),
                    source,
                })?;
            truncated = true;
        }

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(metadata.permissions().mode() & 0o777);
        self.zip
            .start_file(name.as_str(), options)
            .map_err(|source| ReportError::ArchiveEntry {
                name: name.clone(),
                source,
            })?;
        let copied =
            io::copy(&mut file, &mut self.zip).map_err(|source| ReportError::EntryCopy {
                name: name.clone(),
                source,
            })?;

        self.files_collected += 1;
        self.bytes_collected += copied;
        if truncated {
            self.files_truncated += 1;
            self.diagnose(format!(
                "{} exceeded the per-file size limit; archived the trailing {} bytes",
                path.display(),
                self.limits.max_file_size
            ));
        }
        Ok(())
    }

    fn add_capture(
        &mut self,
        runner: &dyn CommandRunner,
        capture: &CommandCapture,
    ) -> Result<(), ReportError> {
        let name = match &capture.subdir {
            Some(subdir) => format!("{COMMAND_AREA}/{subdir}/{}", capture.filename),
            None => format!("{COMMAND_AREA}/{}", capture.filename),
        };
        info!("capturing output of: {}", capture.command);
        let record = match runner.run(&capture.command) {
            Ok(output) => {
                self.write_text_entry(&name, &[output.stdout.as_str(), output.stderr.as_str()])?;
                if output.timed_out {
                    self.diagnose(format!(
                        "{} hit the command deadline; captured partial output",
                        capture.command
                    ));
                }
                CommandRecord {
                    name,
                    command: capture.command.to_string(),
                    exit_status: output.status,
                    timed_out: output.timed_out,
                }
            }
            Err(error) => {
                self.diagnose(format!("Could not run {}: {error}", capture.command));
                CommandRecord {
                    name,
                    command: capture.command.to_string(),
                    exit_status: None,
                    timed_out: false,
                }
            }
        };
        self.commands.push(record);
        Ok(())
    }

    fn write_text_entry(&mut self, name: &str, chunks: &[&str]) -> Result<(), ReportError> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);
        self.zip
            .start_file(name, options)
            .map_err(|source| ReportError::ArchiveEntry {
                name: name.to_string(),
                source,
            })?;
        for chunk in chunks {
            self.zip
                .write_all(chunk.as_bytes())
                .map_err(|source| ReportError::EntryCopy {
                    name: name.to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<ReportSummary, ReportError> {
        let diagnostics_log = if self.diagnostics.is_empty() {
            String::from("no diagnostics recorded\n")
        } else {
            let mut log = self.diagnostics.join("\n");
            log.push('\n');
            log
        };
        self.write_text_entry("diagnostics.log", &[diagnostics_log.as_str()])?;

        let summary = ReportSummary {
            created: self.created.clone(),
            files_collected: self.files_collected,
            entries_excluded: self.entries_excluded,
            files_truncated: self.files_truncated,
            bytes_collected: self.bytes_collected,
            commands: std::mem::take(&mut self.commands),
            diagnostics: self.diagnostics.len() as u64,
        };
        let encoded = serde_json::to_string_pretty(&summary)?;
        self.write_text_entry("manifest.json", &[encoded.as_str()])?;

        self.zip.finish().map_err(ReportError::ArchiveFinish)?;
        Ok(summary)
    }
}

fn walker(root: &Path) -> walkdir::WalkDir {
    walkdir::WalkDir::new(root)
        .max_depth(MAX_TREE_DEPTH)
        .follow_links(false)
        .follow_root_links(false)
}

fn is_forbidden(patterns: &[String], path: &Path) -> bool {
    let candidate = path.to_string_lossy();
    patterns
        .iter()
        .any(|pattern| glob_match(pattern, &candidate))
}

fn entry_name_for(path: &Path) -> String {
    let absolute = path.to_string_lossy();
    format!("{FILE_AREA}/{}", absolute.trim_start_matches('/'))
}
