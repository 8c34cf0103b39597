//! LSB-first bit extraction over a byte source.
//!
//! RFC 1951's bit packing is: within each byte, the least-significant bit is read first; for
//! Huffman codes the packed bits, in read order, spell the code from most-significant to
//! least-significant. Both integer-field decoding and Huffman decoding are streams of single
//! bits; only the assembly rule differs, which is why `read_bits_lsb_first` and `read_code_bit`
//! exist as distinct entry points even though they pull from the same underlying bit cursor.

use std::io::Read;

use crate::error::{Error, Result};

/// Reads individual bits, LSB-first within each byte, from any `Read` source.
///
/// Bytes are buffered into a small bit accumulator (`bit_buf`/`bit_count`) rather than tracked as
/// a byte index plus a bit index, so that peeking ahead for Huffman table lookups doesn't require
/// unreading a byte.
pub struct BitReader<R> {
    source: R,
    bit_buf: u64,
    bit_count: u32,
}

impl<R: Read> BitReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            bit_buf: 0,
            bit_count: 0,
        }
    }

    fn try_fetch_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.source.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(Error::IoError(e)),
        }
    }

    fn refill(&mut self, want: u32) -> Result<()> {
        while self.bit_count < want {
            match self.try_fetch_byte()? {
                Some(byte) => {
                    self.bit_buf |= (byte as u64) << self.bit_count;
                    self.bit_count += 8;
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Peeks the next `n` bits (`n <= 32`) without advancing, assembled LSB-first (the first bit
    /// to be read becomes bit 0). Bits past the true end of the source are zero.
    pub fn peek_bits(&mut self, n: u32) -> Result<u32> {
        debug_assert!(n <= 32);
        self.refill(n)?;
        let mask: u64 = if n == 32 { u32::MAX as u64 } else { (1u64 << n) - 1 };
        Ok((self.bit_buf & mask) as u32)
    }

    /// Advances the cursor by `n` bits previously inspected with `peek_bits`. Fails with
    /// `UnexpectedEof` if fewer than `n` bits were actually available.
    pub fn consume(&mut self, n: u32) -> Result<()> {
        if self.bit_count < n {
            return Err(Error::UnexpectedEof);
        }
        self.bit_buf >>= n;
        self.bit_count -= n;
        Ok(())
    }

    /// Returns the next bit, advancing the cursor, crossing a byte boundary if needed.
    pub fn read_bit(&mut self) -> Result<u32> {
        let bit = self.peek_bits(1)?;
        self.consume(1)?;
        Ok(bit)
    }

    /// Identical mechanism to [`read_bit`](Self::read_bit); kept as a distinct name because
    /// callers that assemble a Huffman code MSB-first (the fixed-distance 5-bit code) read this
    /// way rather than LSB-first.
    pub fn read_code_bit(&mut self) -> Result<u32> {
        self.read_bit()
    }

    /// Reads `n` bits (`n <= 16`) and assembles them so the first bit read becomes bit 0 of the
    /// result, the second bit 1, and so on.
    pub fn read_bits_lsb_first(&mut self, n: u32) -> Result<u32> {
        debug_assert!(n <= 16);
        let v = self.peek_bits(n)?;
        self.consume(n)?;
        Ok(v)
    }

    /// Reads `n` bits (`n <= 16`) assembled MSB-first: the first bit read becomes the highest of
    /// the `n` bits. Used for the fixed-distance code in BTYPE=1 blocks.
    pub fn read_bits_msb_first(&mut self, n: u32) -> Result<u32> {
        debug_assert!(n <= 16);
        let mut result = 0u32;
        for _ in 0..n {
            result = (result << 1) | self.read_code_bit()?;
        }
        Ok(result)
    }

    /// Discards bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        let drop = self.bit_count % 8;
        self.bit_buf >>= drop;
        self.bit_count -= drop;
    }

    /// Byte-aligned bulk read. Caller must have called `align_to_byte` first (stored blocks
    /// always do).
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        debug_assert_eq!(self.bit_count % 8, 0, "read_bytes called without byte alignment");
        let mut out = Vec::with_capacity(n);
        while out.len() < n && self.bit_count > 0 {
            out.push((self.bit_buf & 0xFF) as u8);
            self.bit_buf >>= 8;
            self.bit_count -= 8;
        }
        let remaining = n - out.len();
        if remaining > 0 {
            let mut buf = vec![0u8; remaining];
            self.source.read_exact(&mut buf).map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    Error::UnexpectedEof
                } else {
                    Error::IoError(e)
                }
            })?;
            out.extend(buf);
        }
        Ok(out)
    }
}
