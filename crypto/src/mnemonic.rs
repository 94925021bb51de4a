//! Mnemonic codec for 32-byte secrets.
//!
//! Backup phrases (master derivation keys) and exported account keys are both
//! 32-byte secrets, written as 25 words from the BIP39 English list: 24 words
//! carry the secret as little-endian 11-bit groups, and the last word is a
//! checksum taken from the first 11 bits of SHA-512/256(secret). This is the
//! phrase format the custody daemon and ledger tooling exchange.

use bip39::Language;
use thiserror::Error;
use zeroize::Zeroize;

use crate::hash::sha512_256;

/// Number of words in a phrase, checksum word included.
pub const PHRASE_WORDS: usize = 25;

const KEY_WORDS: usize = PHRASE_WORDS - 1;
const BITS_PER_WORD: u32 = 11;
const WORD_MASK: u32 = (1 << BITS_PER_WORD) - 1;

/// Errors arising from mnemonic operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MnemonicError {
    #[error("mnemonic must have 25 words, got {0}")]
    WordCount(usize),

    #[error("'{0}' is not in the word list")]
    UnknownWord(String),

    #[error("mnemonic checksum word does not match")]
    Checksum,

    #[error("mnemonic does not encode a 32-byte secret")]
    Padding,
}

fn words() -> &'static [&'static str; 2048] {
    Language::English.word_list()
}

/// Split bytes into little-endian 11-bit groups; a trailing partial group is kept.
fn to_word_indices(bytes: &[u8]) -> Vec<u16> {
    let mut out = Vec::with_capacity((bytes.len() * 8).div_ceil(BITS_PER_WORD as usize));
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for &byte in bytes {
        buffer |= u32::from(byte) << bits;
        bits += 8;
        if bits >= BITS_PER_WORD {
            out.push((buffer & WORD_MASK) as u16);
            buffer >>= BITS_PER_WORD;
            bits -= BITS_PER_WORD;
        }
    }
    if bits != 0 {
        out.push((buffer & WORD_MASK) as u16);
    }
    out
}

/// Inverse of [`to_word_indices`]; a trailing partial byte is kept.
fn from_word_indices(indices: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity((indices.len() * BITS_PER_WORD as usize).div_ceil(8));
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for &index in indices {
        buffer |= u32::from(index) << bits;
        bits += BITS_PER_WORD;
        while bits >= 8 {
            out.push((buffer & 0xFF) as u8);
            buffer >>= 8;
            bits -= 8;
        }
    }
    if bits != 0 {
        out.push(buffer as u8);
    }
    out
}

fn checksum_word(secret: &[u8; 32]) -> &'static str {
    let digest = sha512_256(secret);
    let index = to_word_indices(&digest[..2])[0];
    words()[index as usize]
}

/// Encode a 32-byte secret as a 25-word phrase.
pub fn encode_mnemonic(secret: &[u8; 32]) -> Result<String, MnemonicError> {
    let list = words();
    let mut indices = to_word_indices(secret);
    let mut phrase: Vec<&str> = indices.iter().map(|&i| list[i as usize]).collect();
    phrase.push(checksum_word(secret));
    indices.zeroize();
    Ok(phrase.join(" "))
}

/// Decode a 25-word phrase back into the 32-byte secret it encodes.
///
/// Surrounding whitespace, runs of inner whitespace and upper-case letters
/// are tolerated.
pub fn decode_mnemonic(phrase: &str) -> Result<[u8; 32], MnemonicError> {
    let lowered = phrase.to_lowercase();
    let given: Vec<&str> = lowered.split_whitespace().collect();
    if given.len() != PHRASE_WORDS {
        return Err(MnemonicError::WordCount(given.len()));
    }

    let list = words();
    let mut indices = given[..KEY_WORDS]
        .iter()
        .map(|word| {
            list.iter()
                .position(|candidate| candidate == word)
                .map(|i| i as u16)
                .ok_or_else(|| MnemonicError::UnknownWord(word.to_string()))
        })
        .collect::<Result<Vec<u16>, _>>()?;

    let mut bytes = from_word_indices(&indices);
    indices.zeroize();
    // 24 words carry 264 bits: 32 bytes of secret and a zero byte of padding.
    if bytes.len() != 33 || bytes[32] != 0 {
        bytes.zeroize();
        return Err(MnemonicError::Padding);
    }
    let mut secret = [0u8; 32];
    secret.copy_from_slice(&bytes[..32]);
    bytes.zeroize();

    if given[KEY_WORDS] != checksum_word(&secret) {
        secret.zeroize();
        return Err(MnemonicError::Checksum);
    }
    Ok(secret)
}

/// Validate that a phrase decodes to a 32-byte secret.
pub fn validate_mnemonic(phrase: &str) -> bool {
    decode_mnemonic(phrase).is_ok()
}
