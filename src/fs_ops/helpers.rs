//! I/O error helpers.
//!
//! Turns a raw io::Error into a one-line message with the operation, the path and
//! a platform-aware hint. The move code stores these strings as the `context` of
//! a `MoveError` so the log line alone says what to fix.

use std::io;
use std::path::Path;

#[cfg(unix)]
fn os_hint(code: i32) -> Option<&'static str> {
    match code {
        libc::EACCES | libc::EPERM => Some("permission denied; check ownership and write permissions"),
        libc::EXDEV => Some("cross-filesystem; atomic rename not possible"),
        libc::EBUSY => Some("resource busy; ensure no other process is writing"),
        libc::ENOENT => Some("path not found; verify it exists"),
        libc::EEXIST => Some("already exists; refusing to overwrite"),
        libc::ENOSPC => Some("insufficient space on device"),
        libc::EROFS => Some("read-only filesystem; cannot write here"),
        libc::ELOOP => Some("too many symbolic link levels; possible symlink cycle"),
        libc::ENAMETOOLONG => Some("filename or path too long"),
        libc::EMFILE | libc::ENFILE => Some("too many open files"),
        _ => None,
    }
}

#[cfg(windows)]
fn os_hint(code: i32) -> Option<&'static str> {
    match code {
        5 => Some("access denied; check permissions"),       // ERROR_ACCESS_DENIED
        17 => Some("not same device; cross-filesystem move"), // ERROR_NOT_SAME_DEVICE
        32 => Some("sharing violation; file is in use"),      // ERROR_SHARING_VIOLATION
        2 | 3 => Some("path not found; verify it exists"),
        80 | 183 => Some("already exists; refusing to overwrite"),
        112 => Some("insufficient disk space"),
        19 => Some("write protected / read-only media"),
        206 => Some("filename or path too long"),
        _ => None,
    }
}

fn kind_hint(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::PermissionDenied => Some("permission denied; check ownership and write permissions"),
        io::ErrorKind::NotFound => Some("path not found; verify it exists"),
        io::ErrorKind::AlreadyExists => Some("already exists; refusing to overwrite"),
        io::ErrorKind::Interrupted => Some("interrupted; move was cancelled"),
        _ => None,
    }
}

/// Format `"<op> '<path>': <error>; <hint> [os code: N]"`.
pub fn describe_io(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    match e.raw_os_error() {
        Some(code) => {
            if let Some(h) = os_hint(code) {
                msg.push_str("; ");
                msg.push_str(h);
            }
            msg.push_str(&format!(" [os code: {code}]"));
        }
        None => {
            if let Some(h) = kind_hint(e.kind()) {
                msg.push_str("; ");
                msg.push_str(h);
            }
        }
    }
    msg
}

/// Adapter for anyhow code: `.map_err(io_error_with_help("create dir", dir))?`.
pub fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow::anyhow!(describe_io(op, path, &e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_hint_used_without_os_code() {
        let e = io::Error::new(io::ErrorKind::AlreadyExists, "boom");
        let msg = describe_io("copy", Path::new("/x"), &e);
        assert!(msg.starts_with("copy '/x': boom"));
        assert!(msg.contains("refusing to overwrite"));
    }

    #[cfg(unix)]
    #[test]
    fn os_code_is_reported() {
        let e = io::Error::from_raw_os_error(libc::EXDEV);
        let msg = describe_io("rename", Path::new("/x"), &e);
        assert!(msg.contains("cross-filesystem"));
        assert!(msg.contains(&format!("[os code: {}]", libc::EXDEV)));
    }
}
