//! Per-block DEFLATE decoding: header dispatch, stored/fixed/dynamic paths, and the shared
//! length/distance copy engine.

use std::io::{Read, Write};
use std::sync::OnceLock;

use log::trace;

use crate::bit_reader::BitReader;
use crate::error::{Error, Result};
use crate::huffman::HuffmanTree;
use crate::window::Window;

const BTYPE_STORED: u32 = 0;
const BTYPE_FIXED: u32 = 1;
const BTYPE_DYNAMIC: u32 = 2;
const BTYPE_RESERVED: u32 = 3;

const END_OF_BLOCK: u16 = 256;

/// `(base_length, extra_bits)` for length symbols 257..285, indexed by `symbol - 257`.
const LENGTH_TABLE: [(u32, u32); 29] = [
    (3, 0), (4, 0), (5, 0), (6, 0), (7, 0), (8, 0), (9, 0), (10, 0),
    (11, 1), (13, 1), (15, 1), (17, 1),
    (19, 2), (23, 2), (27, 2), (31, 2),
    (35, 3), (43, 3), (51, 3), (59, 3),
    (67, 4), (83, 4), (99, 4), (115, 4),
    (131, 5), (163, 5), (195, 5), (227, 5),
    (258, 0),
];

/// `(base_distance, extra_bits)` for distance symbols 0..30.
const DISTANCE_TABLE: [(u32, u32); 30] = [
    (1, 0), (2, 0), (3, 0), (4, 0),
    (5, 1), (7, 1),
    (9, 2), (13, 2),
    (17, 3), (25, 3),
    (33, 4), (49, 4),
    (65, 5), (97, 5),
    (129, 6), (193, 6),
    (257, 7), (385, 7),
    (513, 8), (769, 8),
    (1025, 9), (1537, 9),
    (2049, 10), (3073, 10),
    (4097, 11), (6145, 11),
    (8193, 12), (12289, 12),
    (16385, 13), (24577, 13),
];

/// The code-length alphabet's fixed read order, RFC 1951 §3.2.7.
const CODE_LENGTH_ORDER: [usize; 19] = [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

struct FixedTrees {
    literal_length: HuffmanTree,
    distance_lengths: [u8; 32],
}

fn fixed_trees() -> &'static FixedTrees {
    static FIXED: OnceLock<FixedTrees> = OnceLock::new();
    FIXED.get_or_init(|| FixedTrees {
        literal_length: HuffmanTree::fixed_literal_length(),
        distance_lengths: [5u8; 32],
    })
}

/// Reads one DEFLATE block and applies it to `window`. Returns whether this was the final block
/// (`BFINAL == 1`).
pub fn decode_block<R: Read, W: Write>(reader: &mut BitReader<R>, window: &mut Window<W>) -> Result<bool> {
    let bfinal = reader.read_bits_lsb_first(1)? == 1;
    let btype = reader.read_bits_lsb_first(2)?;
    trace!("block: bfinal={bfinal} btype={btype}");

    match btype {
        BTYPE_STORED => decode_stored_block(reader, window)?,
        BTYPE_FIXED => {
            let fixed = fixed_trees();
            decode_huffman_block(reader, window, &fixed.literal_length, None)?;
        }
        BTYPE_DYNAMIC => {
            let (literal_length, distance) = read_dynamic_trees(reader)?;
            decode_huffman_block(reader, window, &literal_length, Some(&distance))?;
        }
        BTYPE_RESERVED => return Err(Error::malformed("reserved BTYPE=3")),
        _ => unreachable!("read_bits_lsb_first(2) cannot exceed 3"),
    }

    window.flush_scratch()?;
    Ok(bfinal)
}

fn decode_stored_block<R: Read, W: Write>(reader: &mut BitReader<R>, window: &mut Window<W>) -> Result<()> {
    reader.align_to_byte();
    let len_bytes = reader.read_bytes(2)?;
    let nlen_bytes = reader.read_bytes(2)?;
    let len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]);
    let nlen = u16::from_le_bytes([nlen_bytes[0], nlen_bytes[1]]);
    if nlen != !len {
        return Err(Error::malformed(format!("stored block LEN={len:#06x} NLEN={nlen:#06x} are not complements")));
    }
    let data = reader.read_bytes(len as usize)?;
    window.emit_stored(&data)
}

/// Decodes a fixed or dynamic block's literal/length + distance stream. `distance_tree` is
/// `None` for fixed blocks, where the distance code is instead a trivial MSB-first 5-bit field.
fn decode_huffman_block<R: Read, W: Write>(
    reader: &mut BitReader<R>,
    window: &mut Window<W>,
    literal_length: &HuffmanTree,
    distance_tree: Option<&HuffmanTree>,
) -> Result<()> {
    loop {
        let symbol = literal_length.decode_symbol(reader)?;
        match symbol {
            0..=255 => window.emit_literal(symbol as u8)?,
            END_OF_BLOCK => return Ok(()),
            257..=285 => {
                let (base_len, extra_len_bits) = LENGTH_TABLE[symbol as usize - 257];
                let length = base_len + reader.read_bits_lsb_first(extra_len_bits)?;

                let dist_symbol = match distance_tree {
                    Some(tree) => tree.decode_symbol(reader)? as u32,
                    None => reader.read_bits_msb_first(5)?,
                };
                if dist_symbol as usize >= DISTANCE_TABLE.len() {
                    return Err(Error::malformed(format!("distance symbol {dist_symbol} out of range")));
                }
                let (base_dist, extra_dist_bits) = DISTANCE_TABLE[dist_symbol as usize];
                let distance = base_dist + reader.read_bits_lsb_first(extra_dist_bits)?;

                window.emit_backref(distance as usize, length as usize)?;
            }
            _ => return Err(Error::malformed(format!("literal/length symbol {symbol} out of alphabet"))),
        }
    }
}

/// Reads HLIT/HDIST/HCLEN, the code-length alphabet, and the run-length-encoded combined length
/// vector, splitting it into the literal/length and distance trees for a dynamic block.
fn read_dynamic_trees<R: Read>(reader: &mut BitReader<R>) -> Result<(HuffmanTree, HuffmanTree)> {
    let hlit_raw = reader.read_bits_lsb_first(5)?;
    let hdist_raw = reader.read_bits_lsb_first(5)?;
    if hlit_raw > 29 {
        return Err(Error::malformed(format!("HLIT field {hlit_raw} exceeds the maximum of 29")));
    }
    if hdist_raw > 29 {
        return Err(Error::malformed(format!("HDIST field {hdist_raw} exceeds the maximum of 29")));
    }
    let hlit = hlit_raw as usize + 257;
    let hdist = hdist_raw as usize + 1;
    let hclen = reader.read_bits_lsb_first(4)? as usize + 4;

    let mut code_length_lengths = [0u8; 19];
    for &position in CODE_LENGTH_ORDER.iter().take(hclen) {
        code_length_lengths[position] = reader.read_bits_lsb_first(3)? as u8;
    }
    let code_length_tree = HuffmanTree::new(&code_length_lengths)?;

    let total = hlit + hdist;
    let mut lengths = Vec::with_capacity(total);
    while lengths.len() < total {
        let symbol = code_length_tree.decode_symbol(reader)?;
        match symbol {
            0..=15 => lengths.push(symbol as u8),
            16 => {
                let &prev = lengths
                    .last()
                    .ok_or_else(|| Error::malformed("code-length symbol 16 at position 0"))?;
                let repeat = 3 + reader.read_bits_lsb_first(2)?;
                for _ in 0..repeat {
                    lengths.push(prev);
                }
            }
            17 => {
                let repeat = 3 + reader.read_bits_lsb_first(3)?;
                for _ in 0..repeat {
                    lengths.push(0);
                }
            }
            18 => {
                let repeat = 11 + reader.read_bits_lsb_first(7)?;
                for _ in 0..repeat {
                    lengths.push(0);
                }
            }
            _ => return Err(Error::malformed(format!("code-length symbol {symbol} out of alphabet"))),
        }
    }
    if lengths.len() != total {
        return Err(Error::malformed("dynamic tree length run overshot HLIT+HDIST"));
    }

    let literal_length = HuffmanTree::new(&lengths[..hlit])?;
    let distance = HuffmanTree::new(&lengths[hlit..])?;
    Ok((literal_length, distance))
}
