//! Deterministic account derivation from a master derivation key.
//!
//! Account `i` of a wallet is the Ed25519 key whose seed is the first 32 bytes
//! of `HMAC-SHA512(key = mdk, msg = DOMAIN || i as big-endian u64)`. Two
//! wallets seeded with the same master derivation key therefore produce the
//! same accounts at the same indices.

use hmac::{Hmac, Mac};
use keykeeper_types::{KeyPair, MasterDerivationKey};
use rand::RngCore;
use sha2::Sha512;
use zeroize::Zeroize;

use crate::keys::keypair_from_seed;

type HmacSha512 = Hmac<Sha512>;

const DOMAIN: &[u8] = b"keykeeper/account/";

/// Generate a fresh master derivation key from the OS random source.
pub fn generate_master_key() -> MasterDerivationKey {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    MasterDerivationKey(bytes)
}

/// Derive the key pair for account `index` of the wallet owning `mdk`.
pub fn derive_account_keypair(mdk: &MasterDerivationKey, index: u64) -> KeyPair {
    // HMAC accepts keys of any length, so construction cannot fail.
    let mut mac = <HmacSha512 as Mac>::new_from_slice(mdk.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC-SHA512 accepts 32-byte keys"));
    mac.update(DOMAIN);
    mac.update(&index.to_be_bytes());
    let output = mac.finalize().into_bytes();

    let mut seed = [0u8; 32];
    seed.copy_from_slice(&output[..32]);
    let keypair = keypair_from_seed(&seed);
    seed.zeroize();
    keypair
}
