use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the migration library.
///
/// A rule catalog that is not sorted by ascending version is a defect in the
/// catalog itself, not a runtime input error, and is enforced with an
/// assertion rather than a variant here.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("invalid version string format: {0}")]
    InvalidVersionFormat(String),
    #[error("release file {path} has no version on its first line")]
    MalformedReleaseFile { path: PathBuf },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MigrateError>;
