//! Hashing and the base32 text encoding shared by addresses and ids.
//!
//! SHA-512/256 is the ledger's hash: address checksums, transaction ids and
//! phrase checksums. Blake2b is used for local derivations only.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use sha2::Sha512_256;

type Blake2b256 = Blake2b<U32>;

/// RFC 4648 base32 alphabet.
pub(crate) const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// SHA-512/256 of `data`.
pub fn sha512_256(data: &[u8]) -> [u8; 32] {
    sha512_256_multi(&[data])
}

/// SHA-512/256 of the concatenation of `parts`.
pub fn sha512_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Encode bytes as RFC 4648 base32 without `=` padding.
pub fn encode_base32_unpadded(bytes: &[u8]) -> String {
    let num_chars = (bytes.len() * 8).div_ceil(5);
    let mut result = String::with_capacity(num_chars);

    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | byte as u64;
        bits_in_buffer += 8;
        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            let idx = ((buffer >> bits_in_buffer) & 0x1F) as usize;
            result.push(BASE32_ALPHABET[idx] as char);
        }
    }
    // Remaining bits (padded with zeros on the right).
    if bits_in_buffer > 0 {
        let idx = ((buffer << (5 - bits_in_buffer)) & 0x1F) as usize;
        result.push(BASE32_ALPHABET[idx] as char);
    }

    result
}
