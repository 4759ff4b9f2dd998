use std::fmt;
use std::io;
use std::path::PathBuf;

/// Machine-readable error codes for operators and supervising scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MissingLogPath,
    InvalidConfig,
    ConfigParseError,
    LogFileOpenFailed,
    LogFileWriteFailed,
    WriterPoisoned,
    RotationRenameFailed,
    RotationTargetExists,
    ArchiveListFailed,
    ArchivePruneFailed,
    MalformedArchiveName,
    LockContention,
    InputReadFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingLogPath => "E1001",
            Self::InvalidConfig => "E1002",
            Self::ConfigParseError => "E1003",
            Self::LogFileOpenFailed => "E2001",
            Self::LogFileWriteFailed => "E2002",
            Self::WriterPoisoned => "E2003",
            Self::RotationRenameFailed => "E3001",
            Self::RotationTargetExists => "E3002",
            Self::ArchiveListFailed => "E3003",
            Self::ArchivePruneFailed => "E3004",
            Self::MalformedArchiveName => "E3005",
            Self::LockContention => "E5001",
            Self::InputReadFailed => "E6001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingLogPath => "Log path not configured",
            Self::InvalidConfig => "Invalid rotation settings",
            Self::ConfigParseError => "Config file parse error",
            Self::LogFileOpenFailed => "Log file open failed",
            Self::LogFileWriteFailed => "Log file write failed",
            Self::WriterPoisoned => "Writer unusable after a failed rotation",
            Self::RotationRenameFailed => "Rotation rename failed",
            Self::RotationTargetExists => "Rotated file already exists",
            Self::ArchiveListFailed => "Rotated file listing failed",
            Self::ArchivePruneFailed => "Rotated file removal failed",
            Self::MalformedArchiveName => "Malformed rotated file name",
            Self::LockContention => "Log file locked by another writer",
            Self::InputReadFailed => "Input read failed",
        }
    }

    /// Optional remediation hint surfaced alongside the error.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::MissingLogPath => Some("Pass `--log <PATH>` or set `log` in the config file."),
            Self::InvalidConfig => Some("`max_bytes` must be at least 1."),
            Self::ConfigParseError => Some("Fix the TOML syntax in the config file and retry."),
            Self::LogFileOpenFailed | Self::LogFileWriteFailed => {
                Some("Check disk space and write permissions.")
            }
            Self::RotationRenameFailed => {
                Some("Rotated files must live on the same filesystem as the log file.")
            }
            Self::RotationTargetExists => {
                Some("Check the system clock; rotated names are nanosecond timestamps.")
            }
            Self::ArchiveListFailed | Self::ArchivePruneFailed => {
                Some("Check permissions on the log directory.")
            }
            Self::MalformedArchiveName => {
                Some("Move files named `<log>.<something>` out of the log directory.")
            }
            Self::LockContention => Some("Only one logwheel may write a given log path."),
            Self::WriterPoisoned | Self::InputReadFailed => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by the rotation engine. Every one of them is fatal to the
/// writer that produced it.
#[derive(Debug, thiserror::Error)]
pub enum WheelError {
    /// No log path was configured.
    #[error("{}: a log path is required", ErrorCode::MissingLogPath)]
    MissingLogPath,

    /// Rotation settings failed validation.
    #[error("{}: {0}", ErrorCode::InvalidConfig)]
    InvalidConfig(String),

    /// Opening, creating or stat-ing the active log file failed.
    #[error("{}: failed to open {}: {source}", ErrorCode::LogFileOpenFailed, .path.display())]
    Open { path: PathBuf, source: io::Error },

    /// Writing, flushing or syncing the active log file failed.
    #[error("{}: failed to write {}: {source}", ErrorCode::LogFileWriteFailed, .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// A previous rotation failed and left no active file.
    #[error("{}: no active file for {}", ErrorCode::WriterPoisoned, .path.display())]
    Poisoned { path: PathBuf },

    /// Renaming the active file to its archive name failed.
    #[error(
        "{}: failed to rename {} to {}: {source}",
        ErrorCode::RotationRenameFailed,
        .from.display(),
        .to.display()
    )]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    /// The archive name picked for a rotation is already taken.
    #[error("{}: rotated file {} already exists", ErrorCode::RotationTargetExists, .path.display())]
    TargetExists { path: PathBuf },

    /// Listing the log directory for archives failed.
    #[error("{}: failed to list {}: {source}", ErrorCode::ArchiveListFailed, .dir.display())]
    List { dir: PathBuf, source: io::Error },

    /// Deleting a stale archive failed.
    #[error("{}: failed to remove {}: {source}", ErrorCode::ArchivePruneFailed, .path.display())]
    Remove { path: PathBuf, source: io::Error },

    /// A file matching `<log>.*` carries no numeric timestamp suffix.
    #[error(
        "{}: missing timestamp suffix: {}",
        ErrorCode::MalformedArchiveName,
        .path.display()
    )]
    MalformedArchiveName { path: PathBuf },

    /// Another process holds the lock on the active file.
    #[error("{}: {} is locked by another writer", ErrorCode::LockContention, .path.display())]
    Locked { path: PathBuf },

    /// Reading the input stream failed.
    #[error("{}: failed to read input: {0}", ErrorCode::InputReadFailed)]
    Input(#[source] io::Error),
}

impl WheelError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingLogPath => ErrorCode::MissingLogPath,
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
            Self::Open { .. } => ErrorCode::LogFileOpenFailed,
            Self::Write { .. } => ErrorCode::LogFileWriteFailed,
            Self::Poisoned { .. } => ErrorCode::WriterPoisoned,
            Self::Rename { .. } => ErrorCode::RotationRenameFailed,
            Self::TargetExists { .. } => ErrorCode::RotationTargetExists,
            Self::List { .. } => ErrorCode::ArchiveListFailed,
            Self::Remove { .. } => ErrorCode::ArchivePruneFailed,
            Self::MalformedArchiveName { .. } => ErrorCode::MalformedArchiveName,
            Self::Locked { .. } => ErrorCode::LockContention,
            Self::Input(_) => ErrorCode::InputReadFailed,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
