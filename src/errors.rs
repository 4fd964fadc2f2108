// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the collection library. Command results with a
/// non-zero exit status are not errors; only spawn/wait faults and archive
/// I/O end up here.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("could not start {command}: {source}")]
    Spawn { command: String, source: io::Error },

    #[error("could not wait for {command}: {source}")]
    Wait { command: String, source: io::Error },

    #[error("could not create report archive {path:?}: {source}")]
    ArchiveCreate { path: PathBuf, source: io::Error },

    #[error("could not add archive entry {name}: {source}")]
    ArchiveEntry {
        name: String,
        source: zip::result::ZipError,
    },

    #[error("could not write archive entry {name}: {source}")]
    EntryCopy { name: String, source: io::Error },

    #[error("could not finish report archive: {0}")]
    ArchiveFinish(zip::result::ZipError),

    #[error("could not encode report manifest: {0}")]
    ManifestEncode(#[from] serde_json::Error),

    #[error("could not format report timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}
