//! Account address derivation from public keys.
//!
//! Address format: base32(public_key || checksum), RFC 4648 alphabet, no padding.
//!
//! Checksum: last 4 bytes of SHA-512/256(public_key).
//! Total address length: ceil((32 + 4) * 8 / 5) = 58 characters.

use keykeeper_types::{Address, PublicKey};
use thiserror::Error;

use crate::hash::{encode_base32_unpadded, sha512_256, BASE32_ALPHABET};

/// Reverse lookup table: ASCII byte → 5-bit value (0xFF = invalid).
const BASE32_DECODE: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let alpha = BASE32_ALPHABET;
    let mut i = 0;
    while i < 32 {
        table[alpha[i] as usize] = i as u8;
        i += 1;
    }
    table
};

const CHECKSUM_LEN: usize = 4;
const DECODED_LEN: usize = 32 + CHECKSUM_LEN;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must be {expected} characters, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("address contains a character outside the base32 alphabet")]
    Alphabet,

    #[error("address checksum does not match its public key")]
    Checksum,
}

fn checksum(public_key: &[u8; 32]) -> [u8; CHECKSUM_LEN] {
    let hash = sha512_256(public_key);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&hash[32 - CHECKSUM_LEN..]);
    out
}

/// Decode a base32 string into a fixed-size byte array. Returns `None` on
/// invalid characters, wrong length, or non-zero trailing bits.
fn decode_base32_fixed<const N: usize>(s: &str) -> Option<[u8; N]> {
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;
    let mut result = [0u8; N];
    let mut pos = 0;

    for c in s.bytes() {
        if c >= 128 {
            return None;
        }
        let val = BASE32_DECODE[c as usize];
        if val == 0xFF {
            return None;
        }
        buffer = (buffer << 5) | val as u64;
        bits_in_buffer += 5;
        if bits_in_buffer >= 8 {
            bits_in_buffer -= 8;
            if pos >= N {
                return None;
            }
            result[pos] = (buffer >> bits_in_buffer) as u8;
            pos += 1;
        }
    }

    if pos < N || buffer & ((1 << bits_in_buffer) - 1) != 0 {
        return None;
    }
    Some(result)
}

/// Derive the address of an Ed25519 public key.
pub fn derive_address(public_key: &PublicKey) -> Address {
    let mut bytes = [0u8; DECODED_LEN];
    bytes[..32].copy_from_slice(public_key.as_bytes());
    bytes[32..].copy_from_slice(&checksum(public_key.as_bytes()));
    Address::new(encode_base32_unpadded(&bytes))
}

/// Extract the public key bytes from an address, verifying its checksum.
pub fn decode_address(address: &Address) -> Result<[u8; 32], AddressError> {
    let raw = address.as_str();
    if raw.len() != Address::ENCODED_LEN {
        return Err(AddressError::Length {
            expected: Address::ENCODED_LEN,
            actual: raw.len(),
        });
    }
    let decoded: [u8; DECODED_LEN] = decode_base32_fixed(raw).ok_or(AddressError::Alphabet)?;

    let mut public_key = [0u8; 32];
    public_key.copy_from_slice(&decoded[..32]);
    if decoded[32..] != checksum(&public_key) {
        return Err(AddressError::Checksum);
    }
    Ok(public_key)
}

/// Validate that an address is well-formed and its checksum is correct.
pub fn validate_address(address: &Address) -> bool {
    decode_address(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, keypair_from_seed};

    #[test]
    fn derive_and_validate() {
        let kp = generate_keypair();
        let addr = derive_address(&kp.public);
        assert_eq!(addr.as_str().len(), Address::ENCODED_LEN);
        assert!(addr.is_well_formed());
        assert!(validate_address(&addr));
    }

    #[test]
    fn zero_key_matches_ledger_address() {
        let expected = format!("{}Y5HFKQ", "A".repeat(52));
        let addr = derive_address(&PublicKey([0u8; 32]));
        assert_eq!(addr.as_str(), expected);
        assert!(validate_address(&Address::new(expected)));
    }

    #[test]
    fn derive_is_deterministic() {
        let kp = keypair_from_seed(&[7u8; 32]);
        assert_eq!(derive_address(&kp.public), derive_address(&kp.public));
    }

    #[test]
    fn decode_returns_public_key() {
        let kp = generate_keypair();
        let addr = derive_address(&kp.public);
        assert_eq!(decode_address(&addr).unwrap(), *kp.public.as_bytes());
    }

    #[test]
    fn invalid_checksum_rejected() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let addr = derive_address(&kp.public);
        let mut raw: Vec<char> = addr.as_str().chars().collect();
        // Flip a character inside the public-key section.
        raw[0] = if raw[0] == 'A' { 'B' } else { 'A' };
        let tampered = Address::new(raw.into_iter().collect::<String>());
        assert_eq!(decode_address(&tampered), Err(AddressError::Checksum));
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(matches!(
            decode_address(&Address::new("TOOSHORT")),
            Err(AddressError::Length { actual: 8, .. })
        ));
    }

    #[test]
    fn lowercase_rejected() {
        let kp = keypair_from_seed(&[2u8; 32]);
        let lower = Address::new(derive_address(&kp.public).as_str().to_lowercase());
        assert_eq!(decode_address(&lower), Err(AddressError::Alphabet));
    }

    #[test]
    fn different_keys_different_addresses() {
        let k1 = generate_keypair();
        let k2 = generate_keypair();
        assert_ne!(derive_address(&k1.public), derive_address(&k2.public));
    }
}
