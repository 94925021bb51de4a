//! Cryptographic helpers for keykeeper.
//!
//! - **Ed25519** for account keys and transaction signatures
//! - **SHA-512/256** for address checksums, transaction ids and phrase checksums
//! - **Blake2b** for local derivations
//! - Address encoding: RFC 4648 base32 of public key + 4-byte checksum
//! - 25-word mnemonic codec (BIP39 English words) for backup phrases and exported keys
//! - Deterministic child-key derivation from a wallet's master derivation key

pub mod address;
pub mod derive;
pub mod hash;
pub mod keys;
pub mod mnemonic;
pub mod sign;

pub use address::{decode_address, derive_address, validate_address, AddressError};
pub use derive::{derive_account_keypair, generate_master_key};
pub use hash::{blake2b_256, blake2b_256_multi, encode_base32_unpadded, sha512_256, sha512_256_multi};
pub use keys::{
    generate_keypair, keypair_from_exported, keypair_from_private, keypair_from_seed,
    public_from_private, KeyError,
};
pub use mnemonic::{decode_mnemonic, encode_mnemonic, validate_mnemonic, MnemonicError};
pub use sign::{sign_message, sign_tagged, verify_signature, verify_tagged};
