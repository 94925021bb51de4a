//! Ed25519 account keys.

use ed25519_dalek::SigningKey;
use keykeeper_types::{KeyPair, PrivateKey, PublicKey};
use rand::rngs::OsRng;
use thiserror::Error;

/// Errors from importing externally supplied key bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("exported key must be 32 or 64 bytes, got {0}")]
    Length(usize),

    #[error("exported key's public half does not match its secret half")]
    PublicMismatch,
}

/// Generate a new Ed25519 key pair from a secure random source.
pub fn generate_keypair() -> KeyPair {
    keypair_from_signing_key(SigningKey::generate(&mut OsRng))
}

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    PublicKey(SigningKey::from_bytes(private.as_bytes()).verifying_key().to_bytes())
}

/// Reconstruct a full key pair from a private key.
pub fn keypair_from_private(private: PrivateKey) -> KeyPair {
    let public = public_from_private(&private);
    KeyPair { public, private }
}

/// Derive a key pair from a 32-byte seed (deterministic).
///
/// Account keys derived from a master derivation key go through here.
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    keypair_from_signing_key(SigningKey::from_bytes(seed))
}

/// Import key bytes as exported by a custody service.
///
/// Accepts either the bare 32-byte seed or the 64-byte `seed || public`
/// layout, in which case the public half must match the seed.
pub fn keypair_from_exported(bytes: &[u8]) -> Result<KeyPair, KeyError> {
    let (seed, public) = match bytes.len() {
        32 => (bytes, None),
        64 => (&bytes[..32], Some(&bytes[32..])),
        other => return Err(KeyError::Length(other)),
    };
    let mut secret = [0u8; 32];
    secret.copy_from_slice(seed);
    let keypair = keypair_from_seed(&secret);
    zeroize::Zeroize::zeroize(&mut secret);

    match public {
        Some(public) if public != keypair.public.as_bytes() => Err(KeyError::PublicMismatch),
        _ => Ok(keypair),
    }
}

fn keypair_from_signing_key(signing_key: SigningKey) -> KeyPair {
    KeyPair {
        public: PublicKey(signing_key.verifying_key().to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_valid_keypair() {
        let kp = generate_keypair();
        assert_ne!(kp.public.0, [0u8; 32]);
        assert_ne!(kp.private.0, [0u8; 32]);
    }

    #[test]
    fn public_from_private_is_deterministic() {
        let kp = generate_keypair();
        assert_eq!(kp.public, public_from_private(&kp.private));
    }

    #[test]
    fn keypair_from_seed_deterministic() {
        let kp1 = keypair_from_seed(&[42u8; 32]);
        let kp2 = keypair_from_seed(&[42u8; 32]);
        assert_eq!(kp1.public, kp2.public);
        assert_eq!(kp1.private.0, kp2.private.0);
    }

    #[test]
    fn exported_seed_or_seed_and_public_import() {
        let kp = keypair_from_seed(&[5u8; 32]);
        let short = keypair_from_exported(&[5u8; 32]).unwrap();
        assert_eq!(short.public, kp.public);

        let mut long = [5u8; 64].to_vec();
        long[32..].copy_from_slice(kp.public.as_bytes());
        assert_eq!(keypair_from_exported(&long).unwrap().public, kp.public);
    }

    #[test]
    fn exported_with_wrong_public_half_rejected() {
        let bogus = [5u8; 64];
        assert_eq!(
            keypair_from_exported(&bogus).err(),
            Some(KeyError::PublicMismatch)
        );
    }

    #[test]
    fn exported_with_bad_length_rejected() {
        assert_eq!(
            keypair_from_exported(&[0u8; 16]).err(),
            Some(KeyError::Length(16))
        );
    }
}
