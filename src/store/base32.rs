//! Nix-flavoured base32 and hash compression
//!
//! The alphabet omits `e`, `o`, `u` and `t`, and the bit order is the one
//! the Nix store uses for path ids: the last output character holds the
//! lowest bits of the first byte.

use crate::error::{FodError, FodResult};

/// The 32-character alphabet used in store path ids
pub const ALPHABET: &[u8; 32] = b"0123456789abcdfghijklmnpqrsvwxyz";

/// Fold `digest` into `size` bytes by XOR-ing byte `i` into position `i % size`.
pub fn compress_hash(digest: &[u8], size: usize) -> Vec<u8> {
    let mut out = vec![0u8; size];
    if size == 0 {
        return out;
    }
    for (i, byte) in digest.iter().enumerate() {
        out[i % size] ^= byte;
    }
    out
}

/// Number of characters `encode` produces for `len` input bytes
pub fn encoded_len(len: usize) -> usize {
    if len == 0 {
        0
    } else {
        (len * 8 - 1) / 5 + 1
    }
}

/// Encode bytes into Nix base32.
pub fn encode(bytes: &[u8]) -> String {
    let len = encoded_len(bytes.len());
    let mut out = String::with_capacity(len);

    for n in (0..len).rev() {
        let bit = n * 5;
        let i = bit / 8;
        let j = bit % 8;
        let low = u16::from(bytes[i]) >> j;
        let high = bytes
            .get(i + 1)
            .map_or(0, |&next| u16::from(next) << (8 - j));
        let c = ((low | high) & 0x1f) as usize;
        out.push(ALPHABET[c] as char);
    }

    out
}

/// Decode a Nix base32 string back into bytes.
///
/// Rejects characters outside [`ALPHABET`] and set bits beyond the
/// byte-aligned length.
pub fn decode(text: &str) -> FodResult<Vec<u8>> {
    let chars = text.as_bytes();
    let size = chars.len() * 5 / 8;
    let mut out = vec![0u8; size];

    for (n, &ch) in chars.iter().rev().enumerate() {
        let digit = ALPHABET
            .iter()
            .position(|&a| a == ch)
            .ok_or_else(|| FodError::InvalidBase32(text.to_string()))? as u16;

        let bit = n * 5;
        let i = bit / 8;
        let j = bit % 8;
        let shifted = digit << j;

        if i < size {
            out[i] |= (shifted & 0xff) as u8;
        } else if shifted & 0xff != 0 {
            return Err(FodError::InvalidBase32(text.to_string()));
        }

        let carry = (shifted >> 8) as u8;
        if i + 1 < size {
            out[i + 1] |= carry;
        } else if carry != 0 {
            return Err(FodError::InvalidBase32(text.to_string()));
        }
    }

    Ok(out)
}
