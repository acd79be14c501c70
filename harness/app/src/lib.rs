// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

use std::path::PathBuf;

/// Exit codes so scripts can tell failure modes apart.
#[repr(i32)]
pub enum AppExitCode {
    Ok = 0,
    UnknownError = 1,
}

/// Settings shared by every command, resolved from the global options.
#[derive(Clone, Debug)]
pub struct AppSettings {
    /// Path to the combined contract build output.
    pub artifacts_file: PathBuf,
}
