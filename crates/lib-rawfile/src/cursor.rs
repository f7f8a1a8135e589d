//! Sequential reader over an in-memory raw file.

use crate::error::{DecodeError, DecodeResult};

/// Maximum length of a header or variable line, terminator included.
pub const LINE_LIMIT: usize = 512;

/// Forward-only cursor over an immutable byte buffer.
///
/// Text lines and binary blocks are read from the same buffer, so the cursor
/// never decodes or buffers anything itself: every read hands back a slice
/// of the original input.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    lines_read: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, lines_read: 0 }
    }

    /// Byte offset of the next read.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Number of text lines consumed so far.
    #[inline]
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Read one line of at most `limit` bytes, terminator included.
    ///
    /// The returned slice excludes the `\n`. At end of input an empty slice
    /// is returned. A final line without terminator is returned as-is when it
    /// fits; a line with no terminator within `limit` bytes is an error.
    pub fn read_line(&mut self, limit: usize) -> DecodeResult<&'a [u8]> {
        let rest = &self.data[self.pos..];
        if rest.is_empty() {
            return Ok(rest);
        }
        self.lines_read += 1;

        let window = &rest[..rest.len().min(limit)];
        match window.iter().position(|&b| b == b'\n') {
            Some(end) => {
                self.pos += end + 1;
                Ok(&rest[..end])
            }
            None if rest.len() <= limit => {
                self.pos = self.data.len();
                Ok(rest)
            }
            None => Err(DecodeError::LineTooLong {
                line: self.lines_read,
                limit,
            }),
        }
    }

    /// Read exactly `len` bytes, or `None` if fewer remain.
    ///
    /// The cursor does not move when the read fails.
    pub fn read_exact(&mut self, len: usize) -> Option<&'a [u8]> {
        if len > self.remaining() {
            return None;
        }
        let block = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Some(block)
    }

    /// Skip a single byte. Returns `false` at end of input.
    pub fn skip_byte(&mut self) -> bool {
        if self.is_eof() {
            return false;
        }
        self.pos += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_lines_and_eof() {
        let mut cursor = ByteCursor::new(b"Title: x\nFlags: real\nlast");

        assert_eq!(cursor.read_line(LINE_LIMIT).unwrap(), b"Title: x");
        assert_eq!(cursor.read_line(LINE_LIMIT).unwrap(), b"Flags: real");
        assert_eq!(cursor.read_line(LINE_LIMIT).unwrap(), b"last");
        assert!(cursor.is_eof());
        assert_eq!(cursor.read_line(LINE_LIMIT).unwrap(), b"");
        assert_eq!(cursor.lines_read(), 3);
    }

    #[test]
    fn test_line_limit() {
        let long = vec![b'a'; 20];
        let mut cursor = ByteCursor::new(&long);
        assert!(matches!(
            cursor.read_line(8),
            Err(DecodeError::LineTooLong { line: 1, limit: 8 })
        ));

        // Terminator counts toward the limit.
        let mut cursor = ByteCursor::new(b"1234567\nrest");
        assert_eq!(cursor.read_line(8).unwrap(), b"1234567");
    }

    #[test]
    fn test_read_exact_does_not_move_on_short_read() {
        let mut cursor = ByteCursor::new(&[1, 2, 3, 4]);
        assert_eq!(cursor.read_exact(2), Some(&[1u8, 2][..]));
        assert_eq!(cursor.read_exact(3), None);
        assert_eq!(cursor.position(), 2);
        assert!(cursor.skip_byte());
        assert_eq!(cursor.remaining(), 1);
    }
}
