use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{ErrorCode, WheelError};

/// Archives kept when nothing else is configured.
pub const DEFAULT_MAX_OLD_FILES: usize = 2;

/// Rotation threshold when nothing else is configured (50 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 50 * (1 << 20);

/// Fully resolved settings for one [`RotatingWriter`](crate::writer::RotatingWriter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationConfig {
    /// Active log file. Archives are written next to it as `<log_path>.<ts>`.
    pub log_path: PathBuf,
    /// Archives retained after each rotation.
    pub max_old_files: usize,
    /// Ceiling on the active file's accumulated bytes, newlines included.
    pub max_bytes: u64,
    /// `sync_all` the active file before it is archived and at shutdown.
    pub durable: bool,
}

impl RotationConfig {
    /// Settings for `log_path` with default limits.
    #[must_use]
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            max_old_files: DEFAULT_MAX_OLD_FILES,
            max_bytes: DEFAULT_MAX_BYTES,
            durable: false,
        }
    }

    #[must_use]
    pub const fn with_max_old_files(mut self, max_old_files: usize) -> Self {
        self.max_old_files = max_old_files;
        self
    }

    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub const fn with_durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    /// Check the settings before any file is touched.
    ///
    /// # Errors
    ///
    /// Returns [`WheelError::MissingLogPath`] if the path is empty and
    /// [`WheelError::InvalidConfig`] if it has no file name or `max_bytes`
    /// is zero.
    pub fn validate(&self) -> Result<(), WheelError> {
        if self.log_path.as_os_str().is_empty() {
            return Err(WheelError::MissingLogPath);
        }
        if self.log_path.file_name().is_none() {
            return Err(WheelError::InvalidConfig(format!(
                "log path {} does not name a file",
                self.log_path.display()
            )));
        }
        if self.max_bytes == 0 {
            return Err(WheelError::InvalidConfig(
                "max_bytes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partially specified settings, as read from a TOML file or from flags.
///
/// Unset fields fall through to the next layer in [`WheelSettings::merge`]
/// and finally to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WheelSettings {
    #[serde(default)]
    pub log: Option<PathBuf>,
    #[serde(default)]
    pub max_old_files: Option<usize>,
    #[serde(default)]
    pub max_bytes: Option<u64>,
    #[serde(default)]
    pub durable: Option<bool>,
}

impl WheelSettings {
    /// Layer `self` over `lower`: fields set here win.
    #[must_use]
    pub fn merge(self, lower: Self) -> Self {
        Self {
            log: self.log.or(lower.log),
            max_old_files: self.max_old_files.or(lower.max_old_files),
            max_bytes: self.max_bytes.or(lower.max_bytes),
            durable: self.durable.or(lower.durable),
        }
    }

    /// Fill in defaults and validate.
    ///
    /// # Errors
    ///
    /// Returns [`WheelError::MissingLogPath`] when no layer set `log`, or any
    /// error from [`RotationConfig::validate`].
    pub fn resolve(self) -> Result<RotationConfig, WheelError> {
        let log_path = self.log.ok_or(WheelError::MissingLogPath)?;
        let config = RotationConfig {
            log_path,
            max_old_files: self.max_old_files.unwrap_or(DEFAULT_MAX_OLD_FILES),
            max_bytes: self.max_bytes.unwrap_or(DEFAULT_MAX_BYTES),
            durable: self.durable.unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Read settings from a TOML file.
///
/// # Errors
///
/// Fails if the file cannot be read or is not valid TOML for
/// [`WheelSettings`].
pub fn load_settings(path: &Path) -> Result<WheelSettings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<WheelSettings>(&content).with_context(|| {
        format!(
            "{}: {} in {}",
            ErrorCode::ConfigParseError,
            ErrorCode::ConfigParseError.message(),
            path.display()
        )
    })
}
