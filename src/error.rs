use std::io;
use std::path::{Path, PathBuf};

/// Errors surfaced by the patch/restore engine.
///
/// Per-file errors (`PatternNotFound`, `Parse`, `BackupMissing`) are collected
/// into run summaries; `IntegrityMismatch` without `--force` aborts a run
/// before any file is touched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid resolution {width}x{height}: dimensions must be positive")]
    InvalidResolution { width: u32, height: u32 },

    #[error(
        "'{}' was modified since the last patch -- was the game updated? \
         Re-run with '--force' to re-baseline from the current files",
        .path.display()
    )]
    IntegrityMismatch { path: PathBuf },

    #[error("backup for '{}' is missing (corrupted or interrupted prior run)", .path.display())]
    BackupMissing { path: PathBuf },

    #[error(
        "signature '{signature}' in '{}': expected {expected} matches, found {found} \
         -- this game version is not supported by this build",
        .path.display()
    )]
    PatternNotFound {
        path: PathBuf,
        signature: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{}:{line}:{column}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error(
        "'{}' does not look like a game installation directory: missing '{missing}'",
        .path.display()
    )]
    InvalidGameDir { path: PathBuf, missing: &'static str },

    #[error("failed to {op} '{}'", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn io(op: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::Io {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
