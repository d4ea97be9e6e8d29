//! The streaming-source variant of the revertible iterator (`spec.md` §4.1).
//!
//! Positions are `(chunk_index, chunk_offset)` pairs ordered lexicographically
//! rather than a single integer, since the total length of the source is not
//! known up front. Chunks are decoded from the underlying `Read` in fixed-size
//! byte batches (default 8192, per `spec.md` §6 "wire/byte formats") and are
//! retained for the entire lifetime of the iterator once loaded — a save can
//! always be reverted to, however far back it was taken.

use std::io::Read;

use crate::error::IteratorClosed;

use super::RevertibleIter;

/// Default chunk size in bytes, per `spec.md` §3/§6.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// A position in a streaming source: which loaded chunk, and the char offset
/// within that chunk's decoded text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StreamPos {
    chunk: usize,
    offset: usize,
}

/// A revertible iterator over a chunked, incrementally UTF-8-decoded byte
/// source.
///
/// `verify_section` (spec.md §4.1's name for the forward-load step) is folded
/// into `has_next`/`peek`: both load a new chunk on demand when the current
/// one is exhausted but the underlying reader isn't.
pub struct StreamIter<R> {
    reader: Option<R>,
    chunk_size: usize,
    /// Append-only: every chunk ever decoded, kept for the iterator's
    /// lifetime so saved positions made against earlier chunks stay valid.
    chunks: Vec<Vec<char>>,
    /// Bytes read from `reader` that did not yet form a complete UTF-8
    /// sequence, carried over into the next read.
    pending_bytes: Vec<u8>,
    section: usize,
    section_offset: usize,
    saves: Vec<StreamPos>,
    closed: bool,
}

impl<R: Read> StreamIter<R> {
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader: Some(reader),
            chunk_size,
            chunks: vec![Vec::new()],
            pending_bytes: Vec::new(),
            section: 0,
            section_offset: 0,
            saves: Vec::new(),
            closed: false,
        }
    }

    /// Releases the underlying reader. Subsequent `ensure_open` checks fail
    /// with [`IteratorClosed`]; already-loaded chunks remain readable through
    /// the plain `RevertibleIter` methods (closing does not retroactively
    /// invalidate positions the engine already holds).
    pub fn close(&mut self) {
        self.reader = None;
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Guard used by streaming entry points (`spec.md` §7 `iterator-closed`)
    /// before handing the iterator to the match engine.
    pub fn ensure_open(&self) -> Result<(), IteratorClosed> {
        if self.closed {
            Err(IteratorClosed)
        } else {
            Ok(())
        }
    }

    fn current_chunk_len(&self) -> usize {
        self.chunks[self.section].len()
    }

    /// Advances to the next loaded chunk, or reads and decodes one more from
    /// the reader, whenever the current chunk is exhausted. No-op once the
    /// reader is spent or closed and there's nothing buffered to advance to.
    fn load_more(&mut self) {
        if self.section_offset < self.current_chunk_len() {
            return;
        }
        if self.section + 1 < self.chunks.len() {
            self.section += 1;
            self.section_offset = 0;
            return;
        }
        let Some(reader) = self.reader.as_mut() else {
            return;
        };

        let mut buf = vec![0u8; self.chunk_size];
        let read = reader.read(&mut buf).unwrap_or(0);
        if read == 0 {
            self.reader = None;
            return;
        }
        buf.truncate(read);

        let mut bytes = std::mem::take(&mut self.pending_bytes);
        bytes.extend_from_slice(&buf);
        let (decoded, rest) = decode_utf8_prefix(&bytes);
        self.pending_bytes = rest;

        if decoded.is_empty() {
            // Only incomplete multi-byte bytes arrived; try again next call.
            return;
        }
        self.chunks.push(decoded);
        self.section += 1;
        self.section_offset = 0;
    }
}

/// Splits `bytes` into the longest valid UTF-8 prefix (as `Vec<char>`) and the
/// trailing incomplete sequence to carry over, never surfacing a decode error
/// to callers: a chunk boundary mid-character is an implementation detail,
/// not a match failure.
fn decode_utf8_prefix(bytes: &[u8]) -> (Vec<char>, Vec<u8>) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.chars().collect(), Vec::new()),
        Err(e) => {
            let valid_len = e.valid_up_to();
            let (valid, rest) = bytes.split_at(valid_len);
            let s = std::str::from_utf8(valid).expect("validated by valid_up_to");
            (s.chars().collect(), rest.to_vec())
        }
    }
}

impl<R: Read> RevertibleIter for StreamIter<R> {
    type Elem = char;
    type Pos = StreamPos;

    fn peek(&mut self) -> Option<char> {
        self.load_more();
        self.chunks[self.section].get(self.section_offset).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.section_offset += 1;
        Some(c)
    }

    fn position(&self) -> StreamPos {
        StreamPos {
            chunk: self.section,
            offset: self.section_offset,
        }
    }

    fn seek(&mut self, pos: StreamPos) {
        self.section = pos.chunk;
        self.section_offset = pos.offset;
    }

    fn has_next(&mut self) -> bool {
        self.load_more();
        self.section_offset < self.current_chunk_len()
    }

    fn substring(&self, start: StreamPos, end: StreamPos) -> String {
        if start.chunk == end.chunk {
            return self.chunks[start.chunk][start.offset..end.offset]
                .iter()
                .collect();
        }
        let mut out = String::new();
        out.extend(&self.chunks[start.chunk][start.offset..]);
        for chunk in &self.chunks[start.chunk + 1..end.chunk] {
            out.extend(chunk);
        }
        out.extend(&self.chunks[end.chunk][..end.offset]);
        out
    }

    fn offset(&self) -> usize {
        self.chunks[..self.section]
            .iter()
            .map(Vec::len)
            .sum::<usize>()
            + self.section_offset
    }

    fn saves_mut(&mut self) -> &mut Vec<StreamPos> {
        &mut self.saves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_across_chunk_boundaries() {
        let data = "hello world".as_bytes().to_vec();
        let mut it = StreamIter::with_chunk_size(&data[..], 4);
        let mut out = String::new();
        while let Some(c) = it.next() {
            out.push(c);
        }
        assert_eq!(out, "hello world");
    }

    #[test]
    fn splits_multibyte_char_across_chunks() {
        // 'é' is 2 bytes in UTF-8; chunk size 1 forces a mid-character split.
        let data = "héllo".as_bytes().to_vec();
        let mut it = StreamIter::with_chunk_size(&data[..], 1);
        let mut out = String::new();
        while let Some(c) = it.next() {
            out.push(c);
        }
        assert_eq!(out, "héllo");
    }

    #[test]
    fn save_revert_across_chunk_load() {
        let data = "abcdefgh".as_bytes().to_vec();
        let mut it = StreamIter::with_chunk_size(&data[..], 2);
        it.save();
        let mut first_pass = String::new();
        for _ in 0..5 {
            if let Some(c) = it.next() {
                first_pass.push(c);
            }
        }
        it.revert();
        let mut second_pass = String::new();
        for _ in 0..5 {
            if let Some(c) = it.next() {
                second_pass.push(c);
            }
        }
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn close_then_ensure_open_fails() {
        let data = b"abc".to_vec();
        let mut it = StreamIter::with_chunk_size(&data[..], 8);
        assert!(it.ensure_open().is_ok());
        assert!(!it.is_closed());
        it.close();
        assert!(it.is_closed());
        assert!(it.ensure_open().is_err());
    }
}
