//! Rotated (archived) log files.
//!
//! An archive is a former active file renamed to `<log>.<ns-timestamp>`.
//! The archive set of a log is every entry in the log's directory whose name
//! matches `<log-file-name>.*`; each of them must end in a numeric timestamp
//! so that "oldest first" is well defined.
//!
//! # Invariants
//!
//! - Archives are never modified; they are only created by rename and
//!   destroyed by [`prune`].
//! - After [`prune`] with a retention of `n`, the `n` newest archives (by
//!   timestamp) remain and nothing older survives next to them.

use std::cmp::Ordering;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::WheelError;

/// A rotated file and the timestamp parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub path: PathBuf,
    pub timestamp: u64,
}

/// Name the archive for `log_path` rotated at `timestamp`: `<log_path>.<timestamp>`.
#[must_use]
pub fn archive_path(log_path: &Path, timestamp: u64) -> PathBuf {
    let mut name = OsString::from(log_path.as_os_str());
    name.push(format!(".{timestamp}"));
    PathBuf::from(name)
}

/// Extract the numeric suffix after the final `.` of a file name.
///
/// Returns `None` if there is no `.` or the suffix is not all ASCII digits.
#[must_use]
pub fn timestamp_suffix(name: &str) -> Option<u64> {
    let (_, suffix) = name.rsplit_once('.')?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Order archives oldest first by timestamp, breaking ties on the path so
/// the order is total.
#[must_use]
pub fn oldest_first(a: &Archive, b: &Archive) -> Ordering {
    a.timestamp
        .cmp(&b.timestamp)
        .then_with(|| a.path.cmp(&b.path))
}

/// Directory that holds `log_path` and its archives.
fn log_dir(log_path: &Path) -> &Path {
    match log_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// `"<file-name>."`, the prefix every archive name starts with.
fn archive_prefix(log_path: &Path) -> Option<String> {
    let file_name = log_path.file_name()?;
    Some(format!("{}.", file_name.to_string_lossy()))
}

/// Visit every directory entry matching `<log_path>.*`, passing its path and
/// parsed timestamp (if any).
fn scan(
    log_path: &Path,
    mut visit: impl FnMut(PathBuf, Option<u64>) -> Result<(), WheelError>,
) -> Result<(), WheelError> {
    let dir = log_dir(log_path);
    let Some(prefix) = archive_prefix(log_path) else {
        return Ok(());
    };
    let list_err = |source| WheelError::List {
        dir: dir.to_path_buf(),
        source,
    };

    for entry in fs::read_dir(dir).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(rest) = name.strip_prefix(prefix.as_str()) else {
            continue;
        };
        // `rest` is everything the glob's `*` matched; only its final
        // dot-separated piece is the timestamp.
        let timestamp = timestamp_suffix(&format!(".{rest}"));
        visit(entry.path(), timestamp)?;
    }
    Ok(())
}

/// List the archive set of `log_path`, oldest first.
///
/// # Errors
///
/// Returns [`WheelError::List`] if the directory cannot be read and
/// [`WheelError::MalformedArchiveName`] if any matching entry lacks a
/// numeric timestamp suffix.
pub fn list_archives(log_path: &Path) -> Result<Vec<Archive>, WheelError> {
    let mut archives = Vec::new();
    scan(log_path, |path, timestamp| match timestamp {
        Some(timestamp) => {
            archives.push(Archive { path, timestamp });
            Ok(())
        }
        None => Err(WheelError::MalformedArchiveName { path }),
    })?;
    archives.sort_by(oldest_first);
    Ok(archives)
}

/// Newest archive timestamp on disk, ignoring entries without a numeric
/// suffix. Used to seed the rotation clock at startup; malformed names are
/// reported by the next rotation instead.
///
/// # Errors
///
/// Returns [`WheelError::List`] if the directory cannot be read.
pub fn newest_timestamp(log_path: &Path) -> Result<Option<u64>, WheelError> {
    let mut newest = None;
    scan(log_path, |_, timestamp| {
        newest = newest.max(timestamp);
        Ok(())
    })?;
    Ok(newest)
}

/// Delete the oldest archives until at most `max_old_files` remain.
///
/// `archives` must already be sorted with [`oldest_first`]. Returns the
/// removed paths, oldest first.
///
/// # Errors
///
/// Returns [`WheelError::Remove`] on the first deletion that fails; nothing
/// after it is attempted.
pub fn prune(archives: &[Archive], max_old_files: usize) -> Result<Vec<PathBuf>, WheelError> {
    let excess = archives.len().saturating_sub(max_old_files);
    let mut removed = Vec::with_capacity(excess);
    for stale in &archives[..excess] {
        fs::remove_file(&stale.path).map_err(|source| WheelError::Remove {
            path: stale.path.clone(),
            source,
        })?;
        debug!(path = %stale.path.display(), timestamp = stale.timestamp, "pruned archive");
        removed.push(stale.path.clone());
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().expect("tempdir");
        let log = tmp.path().join("app.log");
        (tmp, log)
    }

    fn touch(path: &Path) {
        fs::write(path, b"x\n").expect("write");
    }

    fn names(archives: &[Archive]) -> Vec<String> {
        archives
            .iter()
            .map(|a| a.path.file_name().expect("name").to_string_lossy().into_owned())
            .collect()
    }

    // -----------------------------------------------------------------------
    // timestamp_suffix / oldest_first
    // -----------------------------------------------------------------------

    #[test]
    fn parse_valid_suffixes() {
        assert_eq!(
            timestamp_suffix("app.log.1700000000000000000"),
            Some(1_700_000_000_000_000_000)
        );
        assert_eq!(timestamp_suffix("log.0"), Some(0));
        assert_eq!(timestamp_suffix("a.b.c.42"), Some(42));
    }

    #[test]
    fn parse_invalid_suffixes() {
        assert_eq!(timestamp_suffix("app"), None);
        assert_eq!(timestamp_suffix("app.log"), None);
        assert_eq!(timestamp_suffix("app.log."), None);
        assert_eq!(timestamp_suffix("app.log.12ab"), None);
        assert_eq!(timestamp_suffix("app.log.+12"), None);
        assert_eq!(timestamp_suffix("app.log.-12"), None);
        assert_eq!(timestamp_suffix("app.log.99999999999999999999999"), None);
    }

    #[test]
    fn oldest_first_compares_numerically_not_lexically() {
        let nine = Archive {
            path: PathBuf::from("log.9"),
            timestamp: 9,
        };
        let ten = Archive {
            path: PathBuf::from("log.10"),
            timestamp: 10,
        };
        assert_eq!(oldest_first(&nine, &ten), Ordering::Less);
        assert_eq!(oldest_first(&ten, &nine), Ordering::Greater);
        assert_eq!(oldest_first(&ten, &ten.clone()), Ordering::Equal);
    }

    #[test]
    fn archive_path_appends_timestamp() {
        assert_eq!(
            archive_path(Path::new("/var/log/app/log"), 17),
            PathBuf::from("/var/log/app/log.17")
        );
        assert_eq!(archive_path(Path::new("log"), 3), PathBuf::from("log.3"));
    }

    // -----------------------------------------------------------------------
    // list_archives
    // -----------------------------------------------------------------------

    #[test]
    fn list_empty_dir() {
        let (_tmp, log) = setup();
        assert!(list_archives(&log).expect("list").is_empty());
    }

    #[test]
    fn list_returns_oldest_first() {
        let (_tmp, log) = setup();
        touch(&archive_path(&log, 300));
        touch(&archive_path(&log, 20));
        touch(&archive_path(&log, 1000));

        let archives = list_archives(&log).expect("list");
        assert_eq!(names(&archives), ["app.log.20", "app.log.300", "app.log.1000"]);
        assert_eq!(archives[0].timestamp, 20);
    }

    #[test]
    fn list_ignores_active_file_and_unrelated_names() {
        let (tmp, log) = setup();
        touch(&log);
        touch(&tmp.path().join("app.logger.5"));
        touch(&tmp.path().join("other.log.5"));
        touch(&tmp.path().join("app.lo"));
        touch(&archive_path(&log, 7));

        let archives = list_archives(&log).expect("list");
        assert_eq!(names(&archives), ["app.log.7"]);
    }

    #[test]
    fn list_fails_on_malformed_name() {
        let (tmp, log) = setup();
        touch(&archive_path(&log, 7));
        touch(&tmp.path().join("app.log.gz"));

        let err = list_archives(&log).expect_err("malformed");
        match err {
            WheelError::MalformedArchiveName { path } => {
                assert!(path.ends_with("app.log.gz"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn list_uses_final_dot_piece() {
        let (tmp, log) = setup();
        touch(&tmp.path().join("app.log.old.15"));
        let archives = list_archives(&log).expect("list");
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].timestamp, 15);
    }

    #[test]
    fn list_missing_dir_fails() {
        let (tmp, _) = setup();
        let log = tmp.path().join("missing").join("app.log");
        let err = list_archives(&log).expect_err("no dir");
        assert!(matches!(err, WheelError::List { .. }));
    }

    #[test]
    fn newest_timestamp_skips_malformed() {
        let (tmp, log) = setup();
        assert_eq!(newest_timestamp(&log).expect("scan"), None);

        touch(&archive_path(&log, 5));
        touch(&archive_path(&log, 50));
        touch(&tmp.path().join("app.log.bak"));
        assert_eq!(newest_timestamp(&log).expect("scan"), Some(50));
    }

    // -----------------------------------------------------------------------
    // prune
    // -----------------------------------------------------------------------

    #[test]
    fn prune_keeps_newest() {
        let (_tmp, log) = setup();
        for ts in [1, 2, 3, 4] {
            touch(&archive_path(&log, ts));
        }
        let archives = list_archives(&log).expect("list");

        let removed = prune(&archives, 2).expect("prune");
        assert_eq!(removed, vec![archive_path(&log, 1), archive_path(&log, 2)]);
        assert_eq!(names(&list_archives(&log).expect("list")), ["app.log.3", "app.log.4"]);
    }

    #[test]
    fn prune_under_limit_is_noop() {
        let (_tmp, log) = setup();
        touch(&archive_path(&log, 1));
        let archives = list_archives(&log).expect("list");
        assert!(prune(&archives, 2).expect("prune").is_empty());
        assert_eq!(list_archives(&log).expect("list").len(), 1);
    }

    #[test]
    fn prune_to_zero_removes_everything() {
        let (_tmp, log) = setup();
        touch(&archive_path(&log, 1));
        touch(&archive_path(&log, 2));
        let archives = list_archives(&log).expect("list");
        assert_eq!(prune(&archives, 0).expect("prune").len(), 2);
        assert!(list_archives(&log).expect("list").is_empty());
    }

    #[test]
    fn prune_missing_file_is_fatal() {
        let (_tmp, log) = setup();
        let archives = vec![
            Archive {
                path: archive_path(&log, 1),
                timestamp: 1,
            },
            Archive {
                path: archive_path(&log, 2),
                timestamp: 2,
            },
        ];
        let err = prune(&archives, 1).expect_err("nothing to remove");
        assert!(matches!(err, WheelError::Remove { .. }));
    }
}
