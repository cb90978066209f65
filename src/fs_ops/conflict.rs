//! Collision resolution across a batch of pending moves.
//!
//! Policy:
//! - Descriptors are grouped by destination directory, then by desired filename
//!   (basename + suffix, ignoring any index).
//! - A group also counts a file already on disk under that exact name. Names are
//!   compared byte-for-byte against a directory listing, so a case-insensitive
//!   filesystem never reports an alias as a collision.
//! - When the group holds more than one claimant, competitors are ordered by
//!   descending size (stable, so ties keep batch order) and numbered from
//!   `existing + 1`. Number 1 means "keep the plain name". A number whose
//!   name another descriptor asks for, or that is already on disk, is skipped.
//!
//! Notes:
//! - Only exact filename collisions are detected; contents are never compared.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

use crate::descriptor::{lock, SharedDescriptor};
use crate::platform::same_file;

// Conservative filename limits (bytes, platform-specific and approximate).
#[cfg(windows)]
const MAX_FILENAME_LEN: usize = 240; // leave headroom for legacy MAX_PATH
#[cfg(not(windows))]
const MAX_FILENAME_LEN: usize = 255; // typical POSIX/EXT limits

/// `"<basename> (n)<suffix>"`, shortening the basename if the result would not fit.
///
/// Examples:
/// - ("movie", ".mkv", 2) -> "movie (2).mkv"
/// - (".env", "", 3) -> ".env (3)"
pub fn indexed_filename(basename: &str, suffix: &str, index: u32) -> String {
    build_name_with_suffix(basename, suffix, &format!(" ({index})"))
}

/// Truncate the stem on a char boundary so `stem + marker + suffix` fits.
fn build_name_with_suffix(stem: &str, suffix: &str, marker: &str) -> String {
    let overhead = marker.len() + suffix.len();
    let budget = MAX_FILENAME_LEN.saturating_sub(overhead);
    let mut cut = stem.len().min(budget);
    while cut > 0 && !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    let stem = if cut == 0 { "f" } else { &stem[..cut] };
    format!("{stem}{marker}{suffix}")
}

/// One claimant inside a conflict group.
struct Competitor {
    descriptor: SharedDescriptor,
    size: u64,
    /// The pre-existing file at the target name *is* this descriptor's source.
    in_place: bool,
}

/// All descriptors that want the same name in the same directory.
struct ConflictGroup {
    directory: PathBuf,
    filename: String,
    competitors: Vec<Competitor>,
    existing: u32,
}

impl ConflictGroup {
    fn new(directory: PathBuf, filename: String) -> Self {
        Self {
            directory,
            filename,
            competitors: Vec::new(),
            existing: 0,
        }
    }

    /// Count a file already sitting at `directory/filename`, unless it is one of
    /// the competitors' own source (a re-run over files already in place).
    fn probe_existing(&mut self, listing: &HashSet<OsString>) {
        if !listing.contains(&OsString::from(&self.filename)) {
            return;
        }
        let target = self.directory.join(&self.filename);
        for c in &mut self.competitors {
            let src = lock(&c.descriptor).source().to_path_buf();
            if same_file(&src, &target).unwrap_or(false) {
                c.in_place = true;
                trace!(target = %target.display(), "existing file is a batch source");
                return;
            }
        }
        self.existing = 1;
    }

    /// Assign indices per the group policy, skipping numbers whose name is
    /// already `taken` in the directory. Returns how many descriptors were indexed.
    fn assign_indices(mut self, taken: &mut HashSet<OsString>) -> usize {
        let total = self.existing as usize + self.competitors.len();
        if total <= 1 {
            return 0;
        }

        self.competitors
            .sort_by_key(|c| (Reverse(c.in_place), Reverse(c.size)));

        let mut indexed = 0;
        let mut number = self.existing + 1;
        for c in &self.competitors {
            if number == 1 {
                number += 1;
                continue;
            }
            let mut d = lock(&c.descriptor);
            let mut name = indexed_filename(d.basename(), d.suffix(), number);
            while taken.contains(&OsString::from(&name)) {
                trace!(%name, "indexed name already claimed; trying next");
                number += 1;
                name = indexed_filename(d.basename(), d.suffix(), number);
            }
            if d.assign_index(number) {
                taken.insert(OsString::from(name));
                indexed += 1;
            }
            number += 1;
        }
        debug!(
            dir = %self.directory.display(),
            name = %self.filename,
            existing = self.existing,
            competitors = self.competitors.len(),
            indexed,
            "resolved name collision"
        );
        indexed
    }
}

/// Exact names present in `dir`; empty when the directory does not exist yet.
fn list_names(dir: &Path) -> HashSet<OsString> {
    match fs::read_dir(dir) {
        Ok(rd) => rd.filter_map(Result::ok).map(|e| e.file_name()).collect(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => HashSet::new(),
        Err(e) => {
            warn!(
                dir = %dir.display(),
                error = %e,
                "Cannot list destination; existing files will not be detected"
            );
            HashSet::new()
        }
    }
}

/// Group `descriptors` and assign disambiguation indices where names collide.
///
/// Descriptors that already carry an index are left alone. Returns the number
/// of descriptors that received a new index.
pub fn resolve_conflicts(descriptors: &[SharedDescriptor]) -> usize {
    let mut by_dir: BTreeMap<PathBuf, BTreeMap<String, ConflictGroup>> = BTreeMap::new();
    let mut claimed: BTreeMap<PathBuf, Vec<OsString>> = BTreeMap::new();

    for d in descriptors {
        let (dir, filename, size) = {
            let g = lock(d);
            let root = g.destination_root();
            let dir = dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
            if g.index().is_some() {
                claimed
                    .entry(dir)
                    .or_default()
                    .push(OsString::from(g.effective_filename()));
                continue;
            }
            (dir, g.desired_filename(), g.size())
        };
        by_dir
            .entry(dir.clone())
            .or_default()
            .entry(filename.clone())
            .or_insert_with(|| ConflictGroup::new(dir, filename))
            .competitors
            .push(Competitor {
                descriptor: d.clone(),
                size,
                in_place: false,
            });
    }

    let mut indexed = 0;
    for (dir, groups) in by_dir {
        let listing = list_names(&dir);
        // Every name some descriptor asks for, plus what is on disk, is off limits
        // for generated names.
        let mut taken = listing.clone();
        taken.extend(groups.keys().map(OsString::from));
        taken.extend(claimed.remove(&dir).unwrap_or_default());
        for (_, mut group) in groups {
            group.probe_existing(&listing);
            indexed += group.assign_indices(&mut taken);
        }
    }

    if indexed > 0 {
        info!(indexed, "Assigned duplicate indices");
    }
    indexed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::MoveDescriptor;
    use tempfile::tempdir;

    fn desc(src: &Path, root: &Path, name: &str, size: u64) -> SharedDescriptor {
        let (b, s) = crate::descriptor::split_filename(name);
        MoveDescriptor::new(src, root, b, s, size).share()
    }

    #[test]
    fn indexed_name_places_marker_before_suffix() {
        assert_eq!(indexed_filename("movie", ".mkv", 2), "movie (2).mkv");
        assert_eq!(indexed_filename(".env", "", 3), ".env (3)");
    }

    #[test]
    fn long_names_are_truncated_to_fit() {
        let stem = "é".repeat(200);
        let name = indexed_filename(&stem, ".mkv", 12);
        assert!(name.len() <= MAX_FILENAME_LEN);
        assert!(name.ends_with(" (12).mkv"));
    }

    #[test]
    fn single_descriptor_is_left_alone() {
        let td = tempdir().unwrap();
        let d = desc(&td.path().join("a"), td.path(), "x.mkv", 1);
        assert_eq!(resolve_conflicts(std::slice::from_ref(&d)), 0);
        assert_eq!(lock(&d).index(), None);
    }

    #[test]
    fn existing_file_indexes_every_competitor() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("x.mkv"), b"old").unwrap();
        let a = desc(&td.path().join("a"), td.path(), "x.mkv", 10);
        let b = desc(&td.path().join("b"), td.path(), "x.mkv", 20);
        assert_eq!(resolve_conflicts(&[a.clone(), b.clone()]), 2);
        assert_eq!(lock(&b).index(), Some(2));
        assert_eq!(lock(&a).index(), Some(3));
    }

    #[test]
    fn equal_sizes_keep_batch_order() {
        let td = tempdir().unwrap();
        let ds: Vec<_> = (0..3)
            .map(|i| desc(&td.path().join(format!("s{i}")), td.path(), "x.mkv", 7))
            .collect();
        resolve_conflicts(&ds);
        let idx: Vec<_> = ds.iter().map(|d| lock(d).index()).collect();
        assert_eq!(idx, vec![None, Some(2), Some(3)]);
    }

    #[test]
    fn source_already_in_place_stays_primary() {
        let td = tempdir().unwrap();
        let in_place = td.path().join("x.mkv");
        fs::write(&in_place, b"small").unwrap();
        let other = td.path().join("other.mkv");
        fs::write(&other, b"much larger file").unwrap();
        let a = desc(&in_place, td.path(), "x.mkv", 5);
        let b = desc(&other, td.path(), "x.mkv", 16);
        resolve_conflicts(&[b.clone(), a.clone()]);
        assert_eq!(lock(&a).index(), None);
        assert_eq!(lock(&b).index(), Some(2));
    }

    #[test]
    fn generated_names_skip_names_claimed_in_batch() {
        let td = tempdir().unwrap();
        let literal = desc(&td.path().join("a"), td.path(), "x (2).mkv", 1);
        let big = desc(&td.path().join("b"), td.path(), "x.mkv", 30);
        let small = desc(&td.path().join("c"), td.path(), "x.mkv", 20);
        let pre = desc(&td.path().join("d"), td.path(), "x.mkv", 10);
        lock(&pre).assign_index(3);

        resolve_conflicts(&[literal.clone(), big.clone(), small.clone(), pre.clone()]);
        assert_eq!(lock(&literal).index(), None);
        assert_eq!(lock(&big).index(), None);
        assert_eq!(lock(&small).effective_filename(), "x (4).mkv");
    }

    #[test]
    fn unreadable_destination_logs_and_lists_nothing() {
        let td = tempdir().unwrap();
        let file = td.path().join("plain-file");
        fs::write(&file, b"x").unwrap();
        assert!(list_names(&file).is_empty());
        assert!(list_names(&td.path().join("missing")).is_empty());
    }

    #[test]
    fn different_directories_do_not_collide() {
        let td = tempdir().unwrap();
        let d1 = td.path().join("one");
        let d2 = td.path().join("two");
        let a = desc(&td.path().join("a"), &d1, "x.mkv", 1);
        let b = desc(&td.path().join("b"), &d2, "x.mkv", 2);
        assert_eq!(resolve_conflicts(&[a, b]), 0);
    }
}
