//! Orchestrates successive DEFLATE blocks until `BFINAL` is seen, owning the sliding output
//! window for the duration of one call.

use std::io::{Read, Write};

use log::debug;

use crate::bit_reader::BitReader;
use crate::block::decode_block;
use crate::error::Result;
use crate::window::Window;

/// What an `inflate` call produced, independent of whether the caller cares about gzip framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflateReport {
    pub bytes_emitted: u64,
    pub crc32: u32,
}

/// Decodes a DEFLATE bitstream from `reader`, writing the decompressed bytes to `sink` as they
/// are produced. `sink` sees bytes in strict decoded order.
///
/// Takes the `BitReader` by reference rather than owning the underlying source: `BitReader`
/// buffers ahead of the last consumed bit (whole bytes, to satisfy `peek_bits` for Huffman
/// lookups), so after the final block it typically holds one or two bytes that were fetched but
/// never consumed. Those bytes are not DEFLATE data — for a gzip member they're the start of the
/// trailer — so the caller must keep the same reader alive to read them back out instead of
/// losing them when a fresh reader (or the underlying source) is dropped.
pub fn inflate<R: Read, W: Write>(reader: &mut BitReader<R>, sink: &mut W) -> Result<InflateReport> {
    let mut window = Window::new(sink);

    loop {
        let is_final = decode_block(reader, &mut window)?;
        if is_final {
            break;
        }
    }

    window.flush_scratch()?;
    let report = InflateReport {
        bytes_emitted: window.bytes_emitted(),
        crc32: window.crc32(),
    };
    debug!("inflate complete: {} bytes, crc32={:#010x}", report.bytes_emitted, report.crc32);
    Ok(report)
}
