//! Hand-assembled dynamic-Huffman-block bitstreams, exercising boundaries that a compressor's
//! own encoder rarely produces on its own: HCLEN at its maximum, a code-length symbol 18 run long
//! enough to need two emissions, and a literal/length alphabet at HLIT's minimum (257 codes).

use flate_rs::bit_reader::BitReader;
use flate_rs::block::decode_block;
use flate_rs::window::Window;

fn push_lsb(bits: &mut Vec<u32>, value: u32, n: u32) {
    for i in 0..n {
        bits.push((value >> i) & 1);
    }
}

fn push_msb_code(bits: &mut Vec<u32>, code: u32, len: u32) {
    for i in (0..len).rev() {
        bits.push((code >> i) & 1);
    }
}

fn bits_to_bytes(bits: &[u32]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, &b) in bits.iter().enumerate() {
        if b != 0 {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

/// HLIT=257 (field 0, the minimum), HDIST=1 (field 0), HCLEN=19 (field 15, the maximum). The
/// combined length run uses code-length symbol 18 twice (138 then 52 zeros) to cover a 190-byte
/// stretch of unused symbols, with two explicit length-1 entries (for 'A' and end-of-block)
/// carried by the code-length alphabet's literal symbol "1".
#[test]
fn dynamic_block_with_max_hclen_and_long_symbol_18_run_decodes_one_literal() {
    let mut bits = Vec::new();
    push_lsb(&mut bits, 1, 1); // bfinal
    push_lsb(&mut bits, 2, 2); // btype = dynamic
    push_lsb(&mut bits, 0, 5); // hlit -> 257
    push_lsb(&mut bits, 0, 5); // hdist -> 1
    push_lsb(&mut bits, 15, 4); // hclen -> 19 (maximum)

    // CODE_LENGTH_ORDER = [16,17,18,0,8,7,9,6,10,5,11,4,12,3,13,2,14,1,15]; only symbols
    // {0,1,16,18} carry a nonzero code-length-code length (2 each, a complete 4-leaf code).
    let code_length_lengths = [2, 0, 2, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0];
    for &len in &code_length_lengths {
        push_lsb(&mut bits, len, 3);
    }

    // Canonical codes for {0,1,16,18} all length 2, assigned in ascending symbol order:
    // 0 -> 00, 1 -> 01, 16 -> 10, 18 -> 11.
    const SYM_0: u32 = 0b00;
    const SYM_1: u32 = 0b01;
    const SYM_18: u32 = 0b11;

    // positions 0..65 (65 entries) = 0, via one symbol-18 run.
    push_msb_code(&mut bits, SYM_18, 2);
    push_lsb(&mut bits, 65 - 11, 7);
    // position 65 ('A') = length 1.
    push_msb_code(&mut bits, SYM_1, 2);
    // positions 66..256 (190 entries) = 0, via two symbol-18 runs (138 + 52).
    push_msb_code(&mut bits, SYM_18, 2);
    push_lsb(&mut bits, 138 - 11, 7);
    push_msb_code(&mut bits, SYM_18, 2);
    push_lsb(&mut bits, 52 - 11, 7);
    // position 256 (end-of-block) = length 1.
    push_msb_code(&mut bits, SYM_1, 2);
    // position 257 (the lone distance code) = length 0.
    push_msb_code(&mut bits, SYM_0, 2);

    // Literal/length tree now has exactly two length-1 symbols: 65 ('A') and 256 (EOB), assigned
    // codes 0 and 1 respectively in ascending symbol order.
    push_msb_code(&mut bits, 0, 1); // 'A'
    push_msb_code(&mut bits, 1, 1); // end-of-block

    let bytes = bits_to_bytes(&bits);
    let mut reader = BitReader::new(&bytes[..]);
    let mut out = Vec::new();
    let mut window = Window::new(&mut out);
    let bfinal = decode_block(&mut reader, &mut window).unwrap();
    window.flush_scratch().unwrap();

    assert!(bfinal);
    assert_eq!(out, b"A");
}

/// HCLEN=4 (the minimum), using only the code-length alphabet's run-length symbol 18 to describe
/// an all-zero-length literal/length and distance table. The resulting literal/length tree is
/// empty, so attempting to decode anything from it is a malformed-stream error rather than a
/// panic.
#[test]
fn dynamic_block_with_min_hclen_and_all_zero_lengths_is_rejected() {
    let mut bits = Vec::new();
    push_lsb(&mut bits, 1, 1); // bfinal
    push_lsb(&mut bits, 2, 2); // btype = dynamic
    push_lsb(&mut bits, 0, 5); // hlit -> 257
    push_lsb(&mut bits, 0, 5); // hdist -> 1
    push_lsb(&mut bits, 0, 4); // hclen -> 4 (minimum)

    // CODE_LENGTH_ORDER's first four entries are [16,17,18,0]; only symbol 18 gets a nonzero
    // length, making it the sole (degenerate, length-1) code in that alphabet.
    let code_length_lengths = [0u32, 0, 1, 0];
    for &len in &code_length_lengths {
        push_lsb(&mut bits, len, 3);
    }

    // symbol 18's code is the single bit 0. Two runs (138 + 120 = 258 = HLIT + HDIST) cover every
    // combined literal/length and distance entry with length 0.
    push_msb_code(&mut bits, 0, 1);
    push_lsb(&mut bits, 138 - 11, 7);
    push_msb_code(&mut bits, 0, 1);
    push_lsb(&mut bits, 120 - 11, 7);

    let bytes = bits_to_bytes(&bits);
    let mut reader = BitReader::new(&bytes[..]);
    let mut out = Vec::new();
    let mut window = Window::new(&mut out);
    let err = decode_block(&mut reader, &mut window).unwrap_err();
    assert!(matches!(err, flate_rs::Error::MalformedStream(_)));
}
