//! logwheel-core: the rotation and retention engine behind `logwheel`.
//!
//! Lines read from a stream are appended to one active log file. When the
//! next line would push that file past its byte budget, the file is renamed
//! to `<log>.<nanosecond-timestamp>`, archives beyond the retention count are
//! deleted oldest first, and a fresh active file is opened at the original
//! path.
//!
//! # Conventions
//!
//! - **Errors**: library functions return [`WheelError`]; every error is
//!   fatal to the writer that raised it.
//! - **Logging**: `tracing` macros only; the binary decides where they go.

pub mod archive;
pub mod clock;
pub mod config;
pub mod error;
pub mod lock;
pub mod source;
pub mod writer;

pub use config::{RotationConfig, WheelSettings};
pub use error::{ErrorCode, WheelError};
pub use source::{LineSource, pump};
pub use writer::{RotatingWriter, WriterStats};
