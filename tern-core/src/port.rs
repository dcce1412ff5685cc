//!
//! Facilities for feeding bytes to a suspended evaluation.
//!

use std::collections::VecDeque;
use std::io::{BufReader, Read};

use log::warn;

/// Anything that can serve the evaluator's input requests one byte at a
/// time. `None` means end of input.
pub trait ByteSource {
    fn read_byte(&mut self) -> Option<u8>;
}

/// An in-memory source. The buffer can be refilled between runs, which
/// is how an interactive shell feeds line-at-a-time input.
#[derive(Debug, Default)]
pub struct BufferSource {
    bytes: VecDeque<u8>,
}

impl BufferSource {
    pub fn new() -> BufferSource {
        BufferSource::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.bytes.extend(bytes.iter().copied());
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&str> for BufferSource {
    fn from(s: &str) -> BufferSource {
        let mut src = BufferSource::new();
        src.feed(s.as_bytes());
        src
    }
}

impl ByteSource for BufferSource {
    fn read_byte(&mut self) -> Option<u8> {
        self.bytes.pop_front()
    }
}

/// Adapts any reader into a byte source. Read errors are reported once
/// and then treated as end of input.
pub struct ReadSource<R: Read> {
    inner: BufReader<R>,
    failed: bool,
}

impl<R: Read> ReadSource<R> {
    pub fn new(inner: R) -> ReadSource<R> {
        ReadSource {
            inner: BufReader::new(inner),
            failed: false,
        }
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn read_byte(&mut self) -> Option<u8> {
        if self.failed {
            return None;
        }
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return None,
                Ok(_) => return Some(buf[0]),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("input source failed: {}", e);
                    self.failed = true;
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_source_yields_bytes_then_eof() {
        let mut src = BufferSource::from("ab");
        assert_eq!(src.read_byte(), Some(b'a'));
        assert_eq!(src.read_byte(), Some(b'b'));
        assert_eq!(src.read_byte(), None);
    }

    #[test]
    fn buffer_source_can_be_refilled() {
        let mut src = BufferSource::from("a");
        assert_eq!(src.read_byte(), Some(b'a'));
        assert_eq!(src.read_byte(), None);
        src.feed(b"b");
        assert_eq!(src.read_byte(), Some(b'b'));
    }

    #[test]
    fn read_source_wraps_any_reader() {
        let mut src = ReadSource::new(&b"xy"[..]);
        assert_eq!(src.read_byte(), Some(b'x'));
        assert_eq!(src.read_byte(), Some(b'y'));
        assert_eq!(src.read_byte(), None);
    }
}
