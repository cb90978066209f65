//! Typed error definitions for batch_mover.
//! One variant per way a single move can end badly; the executor folds these
//! into a terminal status instead of returning them to the caller.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("Source vanished before it could be moved: {0}")]
    SourceVanished(PathBuf),

    #[error("Destination already occupied by a different file: {0}")]
    DestinationConflict(PathBuf),

    #[error("Destination directory not usable {path}: {context}")]
    DirectoryUnwritable { path: PathBuf, context: String },

    #[error("Rename {src} -> {dest} failed: {context}")]
    RenameFailed {
        src: PathBuf,
        dest: PathBuf,
        context: String,
    },

    #[error("Copy {src} -> {dest} failed: {context}")]
    CopyFailed {
        src: PathBuf,
        dest: PathBuf,
        context: String,
    },

    #[error("Cleanup of {path} failed: {context}")]
    CleanupFailed { path: PathBuf, context: String },

    #[error("Moved to {actual} but expected {expected}")]
    PathMismatch { expected: PathBuf, actual: PathBuf },

    #[error("Move of {0} did not finish within {1:?}")]
    TimedOut(PathBuf, std::time::Duration),

    #[error("Move of {0} cancelled by shutdown")]
    Cancelled(PathBuf),
}

impl MoveError {
    /// Stable numeric code for logs and scripting.
    pub fn code(&self) -> i32 {
        match self {
            MoveError::SourceVanished(_) => 10,
            MoveError::DestinationConflict(_) => 11,
            MoveError::DirectoryUnwritable { .. } => 12,
            MoveError::RenameFailed { .. } => 13,
            MoveError::CopyFailed { .. } => 14,
            MoveError::CleanupFailed { .. } => 15,
            MoveError::PathMismatch { .. } => 16,
            MoveError::TimedOut(..) => 17,
            MoveError::Cancelled(_) => 130,
        }
    }

    /// Short snake_case label used as the `kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            MoveError::SourceVanished(_) => "source_vanished",
            MoveError::DestinationConflict(_) => "destination_conflict",
            MoveError::DirectoryUnwritable { .. } => "directory_unwritable",
            MoveError::RenameFailed { .. } => "rename_failed",
            MoveError::CopyFailed { .. } => "copy_failed",
            MoveError::CleanupFailed { .. } => "cleanup_failed",
            MoveError::PathMismatch { .. } => "path_mismatch",
            MoveError::TimedOut(..) => "timed_out",
            MoveError::Cancelled(_) => "cancelled",
        }
    }
}
