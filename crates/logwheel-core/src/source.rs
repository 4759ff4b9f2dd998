//! Line input: split a byte stream into lines and feed them to a writer.

use std::io::{BufRead, BufReader, Read};

use tracing::debug;

use crate::error::WheelError;
use crate::writer::{RotatingWriter, WriterStats};

const READ_BUFFER_BYTES: usize = 64 * 1024;

/// Lazily yields lines from a byte stream with terminators stripped.
///
/// Lines are raw bytes; content is never decoded. A `\r` directly before
/// the `\n` is dropped along with it, and a final line without a trailing
/// newline is still yielded.
pub struct LineSource<R> {
    reader: BufReader<R>,
}

impl<R: Read> LineSource<R> {
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::with_capacity(READ_BUFFER_BYTES, inner),
        }
    }

    /// True when no complete line is buffered, i.e. yielding the next line
    /// needs a read that may block. A trailing partial line does not count.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        !self.reader.buffer().contains(&b'\n')
    }
}

impl<R: Read> Iterator for LineSource<R> {
    type Item = Result<Vec<u8>, WheelError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                }
                Some(Ok(line))
            }
            Err(err) => Some(Err(WheelError::Input(err))),
        }
    }
}

/// Copy every line from `source` into `writer`, then close the writer.
///
/// Output is flushed whenever no complete line is left in the input buffer,
/// so a quiet producer's lines reach disk before logwheel blocks waiting for
/// more.
///
/// # Errors
///
/// Stops at the first read, write or rotation error. The writer is dropped
/// without [`RotatingWriter::finish`]; dropping the active file still makes
/// a best-effort flush of buffered lines, but its errors are not reported
/// and nothing is synced. A writer poisoned by a failed rotation has no
/// active file left to flush.
pub fn pump<R: Read>(
    mut source: LineSource<R>,
    mut writer: RotatingWriter,
) -> Result<WriterStats, WheelError> {
    while let Some(line) = source.next() {
        writer.write_line(&line?)?;
        if source.is_drained() {
            writer.flush()?;
        }
    }
    debug!("input exhausted");
    writer.finish()
}
