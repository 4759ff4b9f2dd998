//! Size-bounded log writer.
//!
//! [`RotatingWriter`] appends lines to a single active file and rotates it
//! once the next line would push the file past `max_bytes`.
//!
//! # Layout
//!
//! ```text
//! /var/log/app/
//!   log                        # active file, appended to
//!   log.1760000000123456789    # archive (older)
//!   log.1760000042987654321    # archive (newer)
//! ```
//!
//! # Invariants
//!
//! - Every write unit is `line + "\n"`; a line is never split across files.
//! - A line longer than `max_bytes - 1` is truncated to exactly
//!   `max_bytes - 1` bytes, so no single write can exceed the budget.
//! - The byte counter is never pushed strictly past `max_bytes`; a file may
//!   end exactly at the budget and the next line rotates it.
//! - On startup an existing active file is appended to and its size on disk
//!   seeds the counter.
//! - An archive's bytes are exactly the active file's bytes at rotation: the
//!   buffer is flushed before the rename and nothing is rewritten.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::archive::{self, archive_path};
use crate::clock::RotationClock;
use crate::config::RotationConfig;
use crate::error::WheelError;
use crate::lock::lock_active;

/// The open active file and the bytes counted toward its budget.
#[derive(Debug)]
pub struct ActiveFile {
    path: PathBuf,
    out: BufWriter<File>,
    bytes_written: u64,
}

impl ActiveFile {
    /// Open `path` for appending, creating it if needed.
    ///
    /// A fresh file starts at 0 bytes; an existing one starts at its size on
    /// disk so a restart keeps counting toward the same ceiling. The handle
    /// is exclusively locked.
    ///
    /// # Errors
    ///
    /// Returns [`WheelError::Open`] if the file cannot be opened or stat'd
    /// and [`WheelError::Locked`] if another writer holds it.
    pub fn open(path: &Path) -> Result<Self, WheelError> {
        let open_err = |source| WheelError::Open {
            path: path.to_path_buf(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_err)?;
        lock_active(&file, path)?;
        let bytes_written = file.metadata().map_err(open_err)?.len();

        if bytes_written > 0 {
            info!(path = %path.display(), bytes = bytes_written, "resuming log file");
        } else {
            debug!(path = %path.display(), "opened empty log file");
        }

        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            bytes_written,
        })
    }

    /// Bytes counted toward the budget since the file was opened or created.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn append(&mut self, line: &[u8]) -> Result<(), WheelError> {
        self.out
            .write_all(line)
            .and_then(|()| self.out.write_all(b"\n"))
            .map_err(|source| WheelError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.bytes_written += line.len() as u64 + 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), WheelError> {
        self.out.flush().map_err(|source| WheelError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Flush buffered bytes and close the handle, releasing its lock.
    ///
    /// With `durable`, the file is also `sync_all`'d first.
    ///
    /// # Errors
    ///
    /// Returns [`WheelError::Write`] if flushing or syncing fails.
    pub fn close(self, durable: bool) -> Result<(), WheelError> {
        let Self { path, out, .. } = self;
        let file = out.into_inner().map_err(|err| WheelError::Write {
            path: path.clone(),
            source: err.into_error(),
        })?;
        if durable {
            file.sync_all()
                .map_err(|source| WheelError::Write { path, source })?;
        }
        drop(file);
        Ok(())
    }
}

/// What one rotation did.
#[derive(Debug)]
pub struct Rotation {
    /// Fresh active file at the original path.
    pub active: ActiveFile,
    /// Where the previous active file now lives.
    pub archived: PathBuf,
    /// Archives deleted by retention, oldest first.
    pub pruned: Vec<PathBuf>,
}

/// Archive `active`, prune old archives and open a fresh active file.
///
/// Steps, in order: flush and close; rename to `<log>.<ts>`; list
/// `<log>.*`; sort oldest first; delete all but the newest
/// `config.max_old_files`; reopen the log path. The old handle is consumed,
/// so only the returned [`ActiveFile`] can be written afterwards.
///
/// # Errors
///
/// Any step failing aborts the rotation with the matching [`WheelError`];
/// nothing is retried. An archive name that already exists is
/// [`WheelError::TargetExists`] rather than an overwrite.
pub fn rotate(
    active: ActiveFile,
    config: &RotationConfig,
    clock: &mut RotationClock,
) -> Result<Rotation, WheelError> {
    let bytes = active.bytes_written();
    active.close(config.durable)?;

    let log_path = config.log_path.as_path();
    let archived = archive_path(log_path, clock.next_timestamp());
    if fs::symlink_metadata(&archived).is_ok() {
        return Err(WheelError::TargetExists { path: archived });
    }
    fs::rename(log_path, &archived).map_err(|source| WheelError::Rename {
        from: log_path.to_path_buf(),
        to: archived.clone(),
        source,
    })?;

    let archives = archive::list_archives(log_path)?;
    let pruned = archive::prune(&archives, config.max_old_files)?;

    let active = ActiveFile::open(log_path)?;
    info!(
        archived = %archived.display(),
        bytes,
        retained = archives.len() - pruned.len(),
        pruned = pruned.len(),
        "rotated log file"
    );

    Ok(Rotation {
        active,
        archived,
        pruned,
    })
}

/// Counters reported when a writer finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub lines_written: u64,
    pub lines_truncated: u64,
    pub rotations: u64,
    pub archives_pruned: u64,
}

/// Appends lines to the active log file, rotating it by size.
///
/// The writer is the only owner of the active handle and its byte counter.
/// All errors are fatal: after any `Err` the writer must be dropped.
#[derive(Debug)]
pub struct RotatingWriter {
    config: RotationConfig,
    clock: RotationClock,
    /// `None` only after a rotation failed part way.
    active: Option<ActiveFile>,
    stats: WriterStats,
}

impl RotatingWriter {
    /// Validate `config` and open (or resume) the active file.
    ///
    /// The rotation clock is seeded from the newest archive already on
    /// disk, so archive names stay increasing across restarts.
    ///
    /// # Errors
    ///
    /// Returns configuration errors from [`RotationConfig::validate`],
    /// [`WheelError::List`] if the log directory cannot be read, and any
    /// error from [`ActiveFile::open`].
    pub fn open(config: RotationConfig) -> Result<Self, WheelError> {
        config.validate()?;
        let seed = archive::newest_timestamp(&config.log_path)?.unwrap_or(0);
        let active = ActiveFile::open(&config.log_path)?;
        Ok(Self {
            config,
            clock: RotationClock::starting_after(seed),
            active: Some(active),
            stats: WriterStats::default(),
        })
    }

    #[must_use]
    pub const fn stats(&self) -> WriterStats {
        self.stats
    }

    /// Bytes counted toward the active file's budget.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.active.as_ref().map_or(0, ActiveFile::bytes_written)
    }

    /// Longest line, in bytes, that fits the budget with its newline.
    fn line_limit(&self) -> usize {
        usize::try_from(self.config.max_bytes - 1).unwrap_or(usize::MAX)
    }

    fn active_mut(&mut self) -> Result<&mut ActiveFile, WheelError> {
        self.active.as_mut().ok_or_else(|| WheelError::Poisoned {
            path: self.config.log_path.clone(),
        })
    }

    /// Append `line` plus a newline, rotating first if it would not fit.
    ///
    /// # Errors
    ///
    /// Returns the first I/O, retention or lock error hit while writing or
    /// rotating.
    pub fn write_line(&mut self, line: &[u8]) -> Result<(), WheelError> {
        let limit = self.line_limit();
        let line = if line.len() > limit {
            debug!(len = line.len(), limit, "truncating oversized line");
            self.stats.lines_truncated += 1;
            &line[..limit]
        } else {
            line
        };

        let needed = line.len() as u64 + 1;
        if self.active_mut()?.bytes_written() + needed > self.config.max_bytes {
            self.rotate()?;
        }

        self.active_mut()?.append(line)?;
        self.stats.lines_written += 1;
        Ok(())
    }

    /// Rotate now, regardless of size.
    ///
    /// # Errors
    ///
    /// See [`rotate`]. On error the writer holds no active file and every
    /// later call fails with [`WheelError::Poisoned`].
    pub fn rotate(&mut self) -> Result<PathBuf, WheelError> {
        let current = self.active.take().ok_or_else(|| WheelError::Poisoned {
            path: self.config.log_path.clone(),
        })?;
        let Rotation {
            active,
            archived,
            pruned,
        } = rotate(current, &self.config, &mut self.clock)?;

        self.active = Some(active);
        self.stats.rotations += 1;
        self.stats.archives_pruned += pruned.len() as u64;
        Ok(archived)
    }

    /// Push buffered lines to the OS.
    ///
    /// # Errors
    ///
    /// Returns [`WheelError::Write`] if the flush fails.
    pub fn flush(&mut self) -> Result<(), WheelError> {
        self.active_mut()?.flush()
    }

    /// Flush and close the active file at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`WheelError::Write`] if the final flush or sync fails.
    pub fn finish(mut self) -> Result<WriterStats, WheelError> {
        let active = self.active.take().ok_or_else(|| WheelError::Poisoned {
            path: self.config.log_path.clone(),
        })?;
        let bytes = active.bytes_written();
        active.close(self.config.durable)?;
        info!(
            path = %self.config.log_path.display(),
            bytes,
            lines = self.stats.lines_written,
            truncated = self.stats.lines_truncated,
            rotations = self.stats.rotations,
            pruned = self.stats.archives_pruned,
            "closed log file"
        );
        Ok(self.stats)
    }
}
