//! RFC 1952 gzip envelope: header parsing, optional metadata fields, and trailer verification.
//!
//! This module is the "external collaborator" the DEFLATE core doesn't know about — the
//! inflater never reaches back into it — but it's what makes this crate a complete gzip
//! decompressor rather than a library stub with the envelope parser left as an exercise.

use std::io::{BufRead, Read, Write};

use log::{debug, warn};

use crate::bit_reader::BitReader;
use crate::error::{Error, Result};
use crate::inflate::inflate;

const ID1: u8 = 0x1F;
const ID2: u8 = 0x8B;
const COMPRESSION_METHOD_DEFLATE: u8 = 8;

const FTEXT: u8 = 1 << 0;
const FHCRC: u8 = 1 << 1;
const FEXTRA: u8 = 1 << 2;
const FNAME: u8 = 1 << 3;
const FCOMMENT: u8 = 1 << 4;

/// The gzip header fields a caller might want to display or reuse (e.g. to pick an output
/// filename), kept independent of the Huffman/window internals below.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct GzipHeader {
    pub mtime: u32,
    pub os: u8,
    pub is_text: bool,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub extra: Option<Vec<u8>>,
}

/// The result of decompressing one gzip member: its header metadata and how much data came out.
#[derive(Debug, Clone)]
pub struct DecompressReport {
    pub header: GzipHeader,
    pub bytes_written: u64,
}

/// Decompresses a single gzip member from `source`, writing the decompressed bytes to `sink`.
///
/// Verifies the trailer's CRC32 and ISIZE against what was actually produced; a mismatch is
/// `MalformedStream` even though decoding itself succeeded, matching real gzip's behavior of
/// catching silent corruption after a structurally valid bitstream.
pub fn decompress<R: Read, W: Write>(mut source: R, sink: &mut W) -> Result<DecompressReport> {
    let header = read_header(&mut source)?;
    debug!("gzip header: {header:?}");

    // `BitReader` fetches whole bytes ahead of the last consumed bit to satisfy Huffman
    // lookahead, so once the final block's BFINAL bit is seen it is typically holding one or two
    // buffered bytes that belong to the trailer, not the DEFLATE stream. Keep using this same
    // reader for the trailer instead of handing `inflate` a fresh view of `source`, or those
    // buffered bytes would be silently dropped and the trailer read misaligned.
    let mut reader = BitReader::new(source);
    let report = inflate(&mut reader, sink)?;

    reader.align_to_byte();
    let trailer = reader.read_bytes(8)?;
    let expected_crc32 = u32::from_le_bytes(trailer[0..4].try_into().unwrap());
    let expected_isize = u32::from_le_bytes(trailer[4..8].try_into().unwrap());

    if report.crc32 != expected_crc32 {
        return Err(Error::malformed(format!(
            "CRC32 mismatch: header says {expected_crc32:#010x}, computed {:#010x}",
            report.crc32
        )));
    }
    let actual_isize = (report.bytes_emitted % (1u64 << 32)) as u32;
    if actual_isize != expected_isize {
        return Err(Error::malformed(format!(
            "ISIZE mismatch: trailer says {expected_isize}, decompressed {actual_isize} bytes"
        )));
    }

    Ok(DecompressReport {
        header,
        bytes_written: report.bytes_emitted,
    })
}

fn read_bytes<R: Read, const N: usize>(source: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    source.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::IoError(e)
        }
    })?;
    Ok(buf)
}

fn read_u16_le<R: Read>(source: &mut R) -> Result<u16> {
    Ok(u16::from_le_bytes(read_bytes::<_, 2>(source)?))
}

fn read_null_terminated_latin1<R: Read>(source: &mut R) -> Result<String> {
    let mut bytes = Vec::new();
    loop {
        let [byte] = read_bytes::<_, 1>(source)?;
        if byte == 0 {
            break;
        }
        bytes.push(byte);
    }
    // The gzip spec mandates ISO 8859-1 (Latin-1) for these fields, which maps every byte
    // 1:1 onto a Unicode scalar value, so this conversion never fails.
    Ok(bytes.into_iter().map(|b| b as char).collect())
}

fn read_header<R: Read>(source: &mut R) -> Result<GzipHeader> {
    let fixed = read_bytes::<_, 10>(source)?;
    if fixed[0] != ID1 || fixed[1] != ID2 {
        return Err(Error::malformed("not a gzip stream (bad magic bytes)"));
    }
    if fixed[2] != COMPRESSION_METHOD_DEFLATE {
        return Err(Error::unsupported(format!("unsupported compression method {}", fixed[2])));
    }
    let flags = fixed[3];
    let mtime = u32::from_le_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]);
    let _xfl = fixed[8];
    let os = fixed[9];

    let mut header = GzipHeader {
        mtime,
        os,
        is_text: flags & FTEXT != 0,
        ..Default::default()
    };

    if flags & FEXTRA != 0 {
        let xlen = read_u16_le(source)? as usize;
        let mut extra = vec![0u8; xlen];
        source.read_exact(&mut extra).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::UnexpectedEof
            } else {
                Error::IoError(e)
            }
        })?;
        header.extra = Some(extra);
    }
    if flags & FNAME != 0 {
        header.name = Some(read_null_terminated_latin1(source)?);
    }
    if flags & FCOMMENT != 0 {
        header.comment = Some(read_null_terminated_latin1(source)?);
    }
    if flags & FHCRC != 0 {
        // RFC 1952 marks header-CRC16 verification optional; this parser reads it to stay
        // aligned with the stream but does not check it (the trailer CRC32 already covers the
        // one integrity property this crate promises).
        let _header_crc16 = read_u16_le(source)?;
        warn!("gzip header carries FHCRC; header CRC16 is read but not verified");
    }

    Ok(header)
}

/// Convenience wrapper for callers that already have a `BufRead` and want line-buffered reads at
/// the envelope layer (the CLI uses this so the underlying file isn't read one syscall per byte).
pub fn decompress_buffered<R: BufRead, W: Write>(source: R, sink: &mut W) -> Result<DecompressReport> {
    decompress(source, sink)
}
