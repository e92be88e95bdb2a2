//! Byte-stream view of a [`PieceTable`] for layout and paint code.

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::{Error, Result};
use crate::table::PieceTable;

/// Seekable reader over a table's UTF-8 bytes.
///
/// Each call takes the table's read lock on its own, so a reader can be
/// held across edits; positions are plain byte offsets into whatever the
/// document is at the time of the call.
#[derive(Clone, Copy, Debug)]
pub struct Reader<'a> {
    table: &'a PieceTable,
    pos: u64,
}

impl<'a> Reader<'a> {
    #[must_use]
    pub fn new(table: &'a PieceTable) -> Self {
        Self { table, pos: 0 }
    }

    /// Current byte position.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Random access read; does not move the reader.
    pub fn read_at(&self, buf: &mut [u8], byte_offset: usize) -> Result<usize> {
        self.table.read_at(buf, byte_offset)
    }

    /// Rune at `rune_offset`; does not move the reader.
    pub fn read_rune_at(&self, rune_offset: usize) -> Result<char> {
        self.table.read_rune_at(rune_offset)
    }

    /// Byte offset of `rune_index`.
    #[must_use]
    pub fn rune_offset(&self, rune_index: usize) -> usize {
        self.table.rune_offset(rune_index)
    }

    /// Paragraph count of the document.
    #[must_use]
    pub fn lines(&self) -> usize {
        self.table.lines()
    }

    /// Document length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len_bytes()
    }

    /// Check if the document is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Read for Reader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let Ok(offset) = usize::try_from(self.pos) else {
            return Ok(0);
        };
        match self.table.read_at(buf, offset) {
            Ok(n) => {
                self.pos += n as u64;
                Ok(n)
            }
            Err(Error::Eof) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl Seek for Reader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.table.len_bytes();
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::End(delta) => len as i128 + i128::from(delta),
            SeekFrom::Current(delta) => i128::from(self.pos) + i128::from(delta),
        };
        let Ok(target) = u64::try_from(target) else {
            return Err(Error::OutOfRange {
                offset: target,
                len,
            }
            .into());
        };
        self.pos = target;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_to_string() {
        let table = PieceTable::with_text("hello");
        table.insert(5, ", wörld");
        let mut out = String::new();
        table.reader().read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello, wörld");
    }

    #[test]
    fn test_small_reads_cross_pieces() {
        let table = PieceTable::with_text("abc");
        table.insert(1, "XY");
        let mut reader = table.reader();
        let mut buf = [0u8; 2];
        let mut chunks = Vec::new();
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            chunks.push(String::from_utf8(buf[..n].to_vec()).unwrap());
        }
        assert_eq!(chunks.concat(), "aXYbc");
        assert_eq!(reader.position(), 5);
    }

    #[test]
    fn test_seek() {
        let table = PieceTable::with_text("0123456789");
        let mut reader = table.reader();
        assert_eq!(reader.seek(SeekFrom::End(-3)).unwrap(), 7);
        assert_eq!(reader.seek(SeekFrom::Current(-2)).unwrap(), 5);
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "56789");

        assert_eq!(reader.seek(SeekFrom::Start(42)).unwrap(), 42);
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);

        let err = reader.seek(SeekFrom::Current(-100)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_random_access_helpers() {
        let table = PieceTable::with_text("a\nb日");
        let reader = table.reader();
        assert_eq!(reader.read_rune_at(3).unwrap(), '日');
        assert_eq!(reader.rune_offset(3), 3);
        assert_eq!(reader.rune_offset(4), 6);
        assert_eq!(reader.lines(), 2);
        assert_eq!(reader.len(), 6);
        assert!(!reader.is_empty());

        let mut buf = [0u8; 3];
        assert_eq!(reader.read_at(&mut buf, 3).unwrap(), 3);
        assert_eq!(std::str::from_utf8(&buf).unwrap(), "日");
        assert!(matches!(reader.read_at(&mut buf, 6), Err(Error::Eof)));
    }
}
