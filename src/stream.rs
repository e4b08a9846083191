//! Byte streams for the reader and the print intrinsics.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};

use crate::error::Error;

/// A byte-wise input source with one byte of pushback. Pushback is
/// consumed before the underlying stream and never held across a nested
/// reader call, so handing the same stream to a subordinate reader is
/// safe.
pub struct InStream {
    src: Box<dyn Read>,
    pushback: Option<u8>,
}

impl InStream {
    pub fn file(path: &str) -> Result<Self, Error> {
        let file = File::open(path)
            .map_err(|e| Error::Io(io::Error::new(e.kind(), format!("{path}: {e}"))))?;
        Ok(Self::from_read(Box::new(BufReader::new(file))))
    }

    pub fn stdin() -> Self {
        Self::from_read(Box::new(io::stdin()))
    }

    pub fn from_read(src: Box<dyn Read>) -> Self {
        Self {
            src,
            pushback: None,
        }
    }

    /// The next byte, or `None` at end of input.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(byte) = self.pushback.take() {
            return Ok(Some(byte));
        }
        let mut byte = [0u8; 1];
        loop {
            match self.src.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Give one byte back; the next `read_byte` returns it first.
    pub fn unread(&mut self, byte: u8) {
        debug_assert!(self.pushback.is_none());
        self.pushback = Some(byte);
    }
}

/// Destination for the print intrinsics; the `*OUT*` slot points at the
/// current one.
pub struct OutStream {
    dst: Box<dyn Write>,
}

impl OutStream {
    pub fn stdout() -> Self {
        Self::from_write(Box::new(io::stdout()))
    }

    pub fn from_write(dst: Box<dyn Write>) -> Self {
        Self { dst }
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.dst.write_all(bytes)
    }
}
