//! Filesystem operations: conflict resolution, the per-file executor and its helpers.

mod conflict;
mod executor;
mod helpers;
mod io_copy;
mod meta;
mod reaper;
mod space;
mod transfer;
mod util;

pub use conflict::{indexed_filename, resolve_conflicts};
pub use executor::{MoveExecutor, MoveOutcome};
pub use helpers::{describe_io, io_error_with_help};
pub use reaper::DirectoryReaper;
pub use transfer::{copy_then_delete, transfer, Strategy};

pub(crate) use util::is_writable_probe;
