//! A from-scratch gzip (RFC 1952) decompressor built on a DEFLATE (RFC 1951) inflater.
//!
//! The hard part lives in four cooperating pieces: [`bit_reader`] (LSB-first bit extraction),
//! [`huffman`] (canonical Huffman code construction and decoding), [`block`] (per-block dispatch
//! and the length/distance copy engine), and [`inflate`] (block orchestration and the sliding
//! output window in [`window`]). [`gzip`] wraps all of that with the RFC 1952 envelope and
//! trailer checksum that a real decompressor needs around the DEFLATE core.

pub mod bit_reader;
pub mod block;
pub mod error;
pub mod gzip;
pub mod huffman;
pub mod inflate;
pub mod window;

pub use error::{Error, Result};
pub use gzip::{decompress, DecompressReport, GzipHeader};
pub use inflate::{inflate as inflate_deflate, InflateReport};
