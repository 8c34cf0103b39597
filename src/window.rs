//! The sliding output window: a 32768-byte ring buffer that sources length/distance
//! back-references and streams completed bytes out to the sink as they are produced.
//!
//! Bytes may be buffered here within a block, but never retained across a block boundary, so
//! decompressing arbitrarily large input never requires arbitrarily large memory for output
//! already produced.

use std::io::Write;

use crc32fast::Hasher;

use crate::error::{Error, Result};

pub const WINDOW_SIZE: usize = 32 * 1024;

/// Owns the 32768-byte back-reference ring and the running CRC32/length of everything it has
/// ever emitted.
pub struct Window<'w, W: Write> {
    sink: &'w mut W,
    ring: Box<[u8; WINDOW_SIZE]>,
    /// Next write position in `ring`.
    cursor: usize,
    /// Total bytes ever emitted (not capped at window size); used to bound back-reference
    /// distance per §3's invariant `d <= min(32768, bytes_emitted_so_far)`.
    total_emitted: u64,
    hasher: Hasher,
    /// Bytes produced so far in the current block, buffered here and flushed at least once per
    /// block so unemitted data never survives a block boundary.
    scratch: Vec<u8>,
}

/// Flush the scratch buffer to the sink once it grows past this many bytes, so large blocks don't
/// hold an unbounded amount of not-yet-written data in memory.
const SCRATCH_FLUSH_THRESHOLD: usize = 8 * 1024;

impl<'w, W: Write> Window<'w, W> {
    pub fn new(sink: &'w mut W) -> Self {
        Self {
            sink,
            ring: Box::new([0u8; WINDOW_SIZE]),
            cursor: 0,
            total_emitted: 0,
            hasher: Hasher::new(),
            scratch: Vec::with_capacity(SCRATCH_FLUSH_THRESHOLD),
        }
    }

    pub fn bytes_emitted(&self) -> u64 {
        self.total_emitted
    }

    pub fn crc32(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    fn push(&mut self, byte: u8) {
        self.ring[self.cursor] = byte;
        self.cursor = (self.cursor + 1) % WINDOW_SIZE;
        self.total_emitted += 1;
        self.scratch.push(byte);
    }

    /// Emits a single literal byte.
    pub fn emit_literal(&mut self, byte: u8) -> Result<()> {
        self.push(byte);
        if self.scratch.len() >= SCRATCH_FLUSH_THRESHOLD {
            self.flush_scratch()?;
        }
        Ok(())
    }

    /// Emits a length/distance back-reference, replicating byte-by-byte so that overlapping
    /// copies (`distance < length`) repeat correctly instead of being memmove'd from a stale
    /// source range.
    pub fn emit_backref(&mut self, distance: usize, length: usize) -> Result<()> {
        if distance == 0 || distance as u64 > self.total_emitted.min(WINDOW_SIZE as u64) {
            return Err(Error::malformed(format!(
                "back-reference distance {distance} exceeds {} available bytes",
                self.total_emitted.min(WINDOW_SIZE as u64)
            )));
        }
        if !(3..=258).contains(&length) {
            return Err(Error::malformed(format!("back-reference length {length} out of range [3,258]")));
        }
        for _ in 0..length {
            let src = (self.cursor + WINDOW_SIZE - distance) % WINDOW_SIZE;
            let byte = self.ring[src];
            self.push(byte);
        }
        if self.scratch.len() >= SCRATCH_FLUSH_THRESHOLD {
            self.flush_scratch()?;
        }
        Ok(())
    }

    /// Appends raw bytes from a stored block, bypassing Huffman decode but still updating the
    /// ring and checksum.
    pub fn emit_stored(&mut self, bytes: &[u8]) -> Result<()> {
        for &b in bytes {
            self.push(b);
        }
        self.flush_scratch()
    }

    /// Flushes any buffered bytes to the sink and rolls them into the running CRC32. Must be
    /// called at least once per block so data never survives a block boundary unflushed.
    pub fn flush_scratch(&mut self) -> Result<()> {
        if !self.scratch.is_empty() {
            self.hasher.update(&self.scratch);
            self.sink.write_all(&self.scratch)?;
            self.scratch.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_then_overlapping_backref_replicates_byte_by_byte() {
        let mut out = Vec::new();
        {
            let mut window = Window::new(&mut out);
            window.emit_literal(b'A').unwrap();
            // distance=1, length=258: run-length replication of a single byte.
            window.emit_backref(1, 258).unwrap();
            window.flush_scratch().unwrap();
        }
        assert_eq!(out.len(), 259);
        assert!(out.iter().all(|&b| b == b'A'));
    }

    #[test]
    fn backref_distance_exceeding_emitted_bytes_is_rejected() {
        let mut out = Vec::new();
        let mut window = Window::new(&mut out);
        window.emit_literal(b'A').unwrap();
        assert!(window.emit_backref(2, 3).is_err());
    }

    #[test]
    fn backref_distance_exceeding_window_size_is_rejected() {
        let mut out = Vec::new();
        let mut window = Window::new(&mut out);
        for _ in 0..WINDOW_SIZE {
            window.emit_literal(b'x').unwrap();
        }
        assert!(window.emit_backref(WINDOW_SIZE + 1, 3).is_err());
    }

    #[test]
    fn repeating_pattern_backref_distance_less_than_length() {
        let mut out = Vec::new();
        {
            let mut window = Window::new(&mut out);
            for b in b"ab" {
                window.emit_literal(*b).unwrap();
            }
            // distance=2, length=6 -> repeats "ab" three more times
            window.emit_backref(2, 6).unwrap();
            window.flush_scratch().unwrap();
        }
        assert_eq!(out, b"abababab");
    }

    #[test]
    fn crc32_matches_incremental_hash_of_all_emitted_bytes() {
        let mut out = Vec::new();
        let crc = {
            let mut window = Window::new(&mut out);
            for b in b"Hello, World!\n" {
                window.emit_literal(*b).unwrap();
            }
            window.flush_scratch().unwrap();
            window.crc32()
        };
        let mut expected = Hasher::new();
        expected.update(b"Hello, World!\n");
        assert_eq!(crc, expected.finalize());
    }
}
