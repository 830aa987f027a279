//! Base-alphabet conversion for binary payloads and digest fingerprints.
//!
//! Input bytes are consumed four at a time as little-endian 32-bit words and
//! each word is rewritten in a custom base. The binary codec adds two marker
//! characters, neither of which appears in its alphabet:
//!
//! - `_` terminates a chunk that came out shorter than the full width (and
//!   stands alone for an all-zero word);
//! - a run of trailing `=` records how many bytes the final partial chunk
//!   held, so decoding recovers the exact original length.

use crate::error::{CodecError, CodecResult};

/// Alphabet for digest fingerprints: 41 symbols.
const FINGERPRINT_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDE";

/// Alphabet for binary payloads: 89 symbols. Excludes `_` and `=`, which are
/// reserved as the pad and tail markers.
const ENCODE_CHARS: &[u8] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ~!@#$%^&*()\"-;:?\\/'[]<>{}+,";

/// Terminator for chunks shorter than [`ENCODE_WIDTH`].
const PAD_CHAR: u8 = b'_';
/// Tail marker: one per byte of the final partial chunk.
const END_CHAR: u8 = b'=';

/// Width of the largest 31-bit value in the fingerprint alphabet.
const FINGERPRINT_WIDTH: usize = 6;
/// Width of the largest 31-bit value in the binary alphabet.
const ENCODE_WIDTH: usize = 5;

/// Rewrite a 32-bit word in the given base, most significant digit first.
fn dec_to_base(chars: &[u8], mut word: u32) -> String {
    let base = chars.len() as u32;
    let mut digits = Vec::new();
    loop {
        digits.push(chars[(word % base) as usize]);
        word /= base;
        if word == 0 {
            break;
        }
    }
    digits.reverse();
    String::from_utf8(digits).expect("alphabet is ASCII")
}

/// Read a chunk back into a 32-bit word. The empty chunk is zero.
fn base_to_dec(chars: &[u8], chunk: &str) -> CodecResult<u32> {
    let base = chars.len() as u64;
    let mut acc: u64 = 0;
    for b in chunk.bytes() {
        let weight = chars
            .iter()
            .position(|&c| c == b)
            .ok_or(CodecError::ForeignSymbol(b as char))? as u64;
        acc = acc * base + weight;
        if acc > u64::from(u32::MAX) {
            return Err(CodecError::ChunkOverflow);
        }
    }
    Ok(acc as u32)
}

/// Little-endian word from a chunk of up to four bytes, zero-filled.
fn le_word(chunk: &[u8]) -> u32 {
    let mut bytes = [0u8; 4];
    bytes[..chunk.len()].copy_from_slice(chunk);
    u32::from_le_bytes(bytes)
}

/// Short fixed-width fingerprint of digest bytes.
///
/// Each 4-byte word becomes [`FINGERPRINT_WIDTH`] symbols, left-padded with
/// the alphabet's zero symbol, so equal-length inputs always produce
/// equal-length fingerprints.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() / 4 * FINGERPRINT_WIDTH + FINGERPRINT_WIDTH);
    for chunk in bytes.chunks(4) {
        let digits = dec_to_base(FINGERPRINT_CHARS, le_word(chunk));
        for _ in digits.len()..FINGERPRINT_WIDTH {
            out.push(FINGERPRINT_CHARS[0] as char);
        }
        out.push_str(&digits);
    }
    out
}

/// Encode arbitrary bytes as text over the 89-symbol alphabet.
pub fn encode_binary(data: &[u8]) -> String {
    let tail = data.len() % 4;
    let mut out = String::with_capacity(data.len() / 4 * (ENCODE_WIDTH + 1) + 4);
    for chunk in data.chunks(4) {
        let word = le_word(chunk);
        if word == 0 {
            // An all-zero word has no digits; the pad alone stands for it.
            out.push(PAD_CHAR as char);
            continue;
        }
        let digits = dec_to_base(ENCODE_CHARS, word);
        let short = digits.len() < ENCODE_WIDTH;
        out.push_str(&digits);
        if short {
            out.push(PAD_CHAR as char);
        }
    }
    for _ in 0..tail {
        out.push(END_CHAR as char);
    }
    out
}

/// Decode text produced by [`encode_binary`] back into the exact original
/// bytes, including a final partial chunk of one to three bytes.
pub fn decode_binary(text: &str) -> CodecResult<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut prev = 0usize;
    loop {
        let pad_pos = bytes[prev.min(bytes.len())..]
            .iter()
            .position(|&b| b == PAD_CHAR)
            .map(|i| i + prev);
        let (end, full) = match pad_pos {
            Some(pos) if pos >= prev + ENCODE_WIDTH => (prev + ENCODE_WIDTH, true),
            Some(pos) => (pos, false),
            None => {
                if prev >= bytes.len() {
                    break;
                }
                if bytes[prev] == END_CHAR {
                    let marks = bytes.len() - prev;
                    if marks >= 4 || bytes[prev..].iter().any(|&b| b != END_CHAR) {
                        return Err(CodecError::MalformedTail);
                    }
                    // The final word carried `marks` real bytes; drop the fill.
                    let drop = 4 - marks;
                    if out.len() < drop {
                        return Err(CodecError::MalformedTail);
                    }
                    out.truncate(out.len() - drop);
                    break;
                }
                ((prev + ENCODE_WIDTH).min(bytes.len()), true)
            }
        };
        let word = base_to_dec(ENCODE_CHARS, &text[prev..end])?;
        out.extend_from_slice(&word.to_le_bytes());
        prev = end + usize::from(!full);
    }
    Ok(out)
}
