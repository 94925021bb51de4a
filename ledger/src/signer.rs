//! Transaction signing capability.

use async_trait::async_trait;
use keykeeper_crypto::{derive_address, sign_tagged};
use keykeeper_types::{Address, KeyPair, Result};
use std::collections::HashMap;

use crate::error::SIGNER_UNAVAILABLE;
use crate::transaction::{SignedTransaction, Transaction, TX_TAG};

/// Something that can sign transactions as one or more addresses.
///
/// The address that must sign a transaction is the sender's *auth address*,
/// which differs from the sender once the sender has been rekeyed.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Whether this signer holds the key for `address`.
    async fn can_sign_for(&self, address: &Address) -> Result<bool>;

    /// Sign `txn` with the key of `signer`.
    async fn sign(&self, txn: &Transaction, signer: &Address) -> Result<SignedTransaction>;
}

/// Signs with key pairs held in memory.
pub struct KeyPairSigner {
    keys: HashMap<Address, KeyPair>,
}

impl KeyPairSigner {
    pub fn new(keypairs: impl IntoIterator<Item = KeyPair>) -> Self {
        let keys = keypairs
            .into_iter()
            .map(|kp| (derive_address(&kp.public), kp))
            .collect();
        Self { keys }
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.keys.keys()
    }
}

/// Sign `txn` with `keypair`, recording `signer` as the signing address.
pub fn sign_with(txn: &Transaction, keypair: &KeyPair, signer: &Address) -> Result<SignedTransaction> {
    let bytes = txn.encode()?;
    let signature = sign_tagged(TX_TAG, &bytes, &keypair.private);
    Ok(SignedTransaction::new(txn.clone(), signature, signer))
}

#[async_trait]
impl TransactionSigner for KeyPairSigner {
    async fn can_sign_for(&self, address: &Address) -> Result<bool> {
        Ok(self.keys.contains_key(address))
    }

    async fn sign(&self, txn: &Transaction, signer: &Address) -> Result<SignedTransaction> {
        let keypair = self.keys.get(signer).ok_or_else(|| {
            SIGNER_UNAVAILABLE.error(format!("no key held for signer {signer}"))
        })?;
        sign_with(txn, keypair, signer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::SuggestedParams;
    use keykeeper_crypto::{keypair_from_seed, verify_tagged};
    use keykeeper_types::PublicKey;

    fn params() -> SuggestedParams {
        SuggestedParams {
            fee: 1000,
            min_fee: 1000,
            first_valid: 1,
            last_valid: 1001,
            genesis_id: "dev".into(),
            genesis_hash: "BwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwc=".into(),
        }
    }

    #[tokio::test]
    async fn signs_for_held_key_only() {
        let owner = keypair_from_seed(&[1u8; 32]);
        let owner_addr = derive_address(&owner.public);
        let owner_public = PublicKey(owner.public.0);
        let stranger = derive_address(&keypair_from_seed(&[2u8; 32]).public);
        let signer = KeyPairSigner::new([owner]);

        assert!(signer.can_sign_for(&owner_addr).await.unwrap());
        assert!(!signer.can_sign_for(&stranger).await.unwrap());

        let txn = Transaction::payment(&owner_addr, &owner_addr, 0, Vec::new(), &params()).unwrap();
        let signed = signer.sign(&txn, &owner_addr).await.unwrap();
        assert!(verify_tagged(
            TX_TAG,
            &txn.encode().unwrap(),
            &signed.signature,
            &owner_public
        ));

        let err = signer.sign(&txn, &stranger).await.unwrap_err();
        assert!(err.is(SIGNER_UNAVAILABLE));
    }
}
