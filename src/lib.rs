//! Core library for `batch_mover`.
//!
//! Moves a batch of files to caller-computed destinations:
//! - `fs_ops::resolve_conflicts` numbers colliding names before anything moves;
//! - `fs_ops::MoveExecutor` moves one file (rename, or copy + delete across filesystems);
//! - `scheduler::MoveScheduler` runs executors on a bounded pool with per-move timeouts;
//! - `fs_ops::DirectoryReaper` tidies up directories a move left empty.
//!
//! The move subsystem never returns errors for individual files; each descriptor
//! ends in exactly one terminal status.

pub mod cli;
pub mod config;
pub mod descriptor;
pub mod errors;
pub mod fs_ops;
pub mod output;
pub mod platform;
pub mod progress;
pub mod scheduler;

pub use config::{
    default_config_path, default_log_path, load_config, load_config_from_xml_path,
    path_has_symlink_ancestor, Config, LogLevel, MoveSettings,
};
pub use descriptor::{plan_descriptor, MoveDescriptor, MoveStatus, SharedDescriptor};
pub use errors::MoveError;
pub use fs_ops::{resolve_conflicts, DirectoryReaper, MoveExecutor, MoveOutcome};
pub use progress::{CancelToken, CompletionSink, ProgressObserver};
pub use scheduler::{DrainReport, MoveJob, MoveScheduler, SchedulerConfig, SchedulerState, ShutdownHandle};
