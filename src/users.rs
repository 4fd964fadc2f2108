// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! System user lookups and username validation.

use std::path::PathBuf;

use uzers::os::unix::UserExt;

pub const MAX_USERNAME_LEN: usize = 32;

/// Reject usernames that could not come from a sane user database before
/// they reach a `su` invocation. Accepts ASCII alphanumerics plus `.`, `_`
/// and `-`, with no leading `-` or `.`.
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.is_empty() {
        return Err("username is empty");
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err("username is longer than 32 characters");
    }
    if username.starts_with('-') || username.starts_with('.') {
        return Err("username starts with a reserved character");
    }
    if !username
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'))
    {
        return Err("username contains characters outside [A-Za-z0-9._-]");
    }
    Ok(())
}

/// Home directory of `username` per the system user database, or `None` for
/// unknown accounts.
pub fn home_of(username: &str) -> Option<PathBuf> {
    uzers::get_user_by_name(username).map(|user| user.home_dir().to_path_buf())
}

pub fn running_as_root() -> bool {
    uzers::get_current_uid() == 0
}
