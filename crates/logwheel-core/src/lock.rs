use fs2::FileExt;
use std::{fs::File, io, path::Path};

use crate::error::WheelError;

/// Take an exclusive advisory lock on an open active log file.
///
/// The lock lives as long as the handle: closing the file (or renaming it
/// away and dropping the handle during rotation) releases it. A second
/// writer opening the same path fails here instead of interleaving lines.
///
/// # Errors
///
/// Returns [`WheelError::Locked`] if another handle holds the lock, or
/// [`WheelError::Open`] if the lock call itself fails.
pub fn lock_active(file: &File, path: &Path) -> Result<(), WheelError> {
    match FileExt::try_lock_exclusive(file) {
        Ok(()) => Ok(()),
        Err(err) if is_contended(&err) => Err(WheelError::Locked {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(WheelError::Open {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
