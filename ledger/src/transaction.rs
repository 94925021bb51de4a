//! Payment transactions, their signed envelope, and suggested parameters.
//!
//! The canonical byte form of a transaction is its canonical msgpack map
//! (`amt fee fv gen gh lv note rcv rekey snd type`, zero fields left out,
//! addresses as their 32-byte public keys). A transaction's id is the
//! unpadded base32 SHA-512/256 digest of `"TX" || bytes`, and signatures are
//! made over the same tagged bytes. A signed transaction travels as the map
//! `{sgnr, sig, txn}`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use keykeeper_crypto::{
    decode_address, derive_address, encode_base32_unpadded, sha512_256_multi, validate_address,
};
use keykeeper_types::{Address, Error, PublicKey, Result, Signature};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{
    INVALID_ADDRESS, MAKE_PAYMENT_TXN_FAILED, SETTING_REKEY_TO_FAILED,
    TRANSACTION_ENCODING_FAILED,
};
use crate::msgpack::{MapBuilder, Value};

/// Domain tag prepended to transaction bytes before hashing or signing.
pub const TX_TAG: &[u8] = b"TX";

/// Transaction type tag of a payment.
pub const PAYMENT_TYPE: &str = "pay";

/// Number of rounds a transaction stays valid after `first_valid`.
pub const VALIDITY_WINDOW: u64 = 1000;

/// Network parameters needed to build a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedParams {
    /// Suggested fee (flat, in base units).
    pub fee: u64,
    /// Minimum fee the network accepts.
    pub min_fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    /// Base64 of the 32-byte genesis hash, as reported by the node.
    pub genesis_hash: String,
}

/// Identifier assigned to a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A payment transaction, optionally carrying a rekey instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Address,
    pub receiver: Address,
    pub amount: u64,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: String,
    pub note: Vec<u8>,
    /// When set, the sender's signing authority moves to this address once
    /// the transaction is applied.
    pub rekey_to: Option<Address>,
}

fn check_address(address: &Address, role: &str) -> Result<()> {
    if validate_address(address) {
        Ok(())
    } else {
        Err(INVALID_ADDRESS.error(format!("{role} address is not valid: {address}")))
    }
}

fn encoding_failed(message: impl Into<String>) -> Error {
    TRANSACTION_ENCODING_FAILED.error(message)
}

fn address_bytes(address: &Address) -> Result<[u8; 32]> {
    decode_address(address).map_err(|e| {
        encoding_failed(format!("cannot encode address {address}")).with_upstream(e)
    })
}

fn genesis_hash_bytes(genesis_hash: &str) -> Result<[u8; 32]> {
    let bytes = BASE64.decode(genesis_hash).map_err(|e| {
        encoding_failed("genesis hash is not valid base64").with_upstream(e)
    })?;
    bytes.as_slice().try_into().map_err(|_| {
        encoding_failed(format!("genesis hash must be 32 bytes, got {}", bytes.len()))
    })
}

fn fixed_bin<const N: usize>(value: Option<&Value>, field: &str) -> Result<Option<[u8; N]>> {
    match value {
        None => Ok(None),
        Some(Value::Bin(bytes)) => bytes
            .as_slice()
            .try_into()
            .map(Some)
            .map_err(|_| encoding_failed(format!("field '{field}' must be {N} bytes"))),
        Some(_) => Err(encoding_failed(format!("field '{field}' must be a byte string"))),
    }
}

fn uint_field(value: Option<&Value>, field: &str) -> Result<u64> {
    match value {
        None => Ok(0),
        Some(Value::Uint(n)) => Ok(*n),
        Some(_) => Err(encoding_failed(format!("field '{field}' must be an unsigned integer"))),
    }
}

fn address_field(value: Option<&Value>, field: &str) -> Result<Option<Address>> {
    Ok(fixed_bin::<32>(value, field)?.map(|key| derive_address(&PublicKey(key))))
}

fn decode_map(bytes: &[u8], what: &str) -> Result<Value> {
    let value = Value::decode(bytes)
        .map_err(|e| encoding_failed(format!("failed to decode {what}")).with_upstream(e))?;
    match value {
        Value::Map(_) => Ok(value),
        _ => Err(encoding_failed(format!("{what} is not a map"))),
    }
}

fn reject_unknown_keys(value: &Value, known: &[&str], what: &str) -> Result<()> {
    match value.keys().find(|key| !known.contains(key)) {
        Some(key) => Err(encoding_failed(format!("unexpected field '{key}' in {what}"))),
        None => Ok(()),
    }
}

impl Transaction {
    /// Build a payment of `amount` from `sender` to `receiver`.
    pub fn payment(
        sender: &Address,
        receiver: &Address,
        amount: u64,
        note: Vec<u8>,
        params: &SuggestedParams,
    ) -> Result<Self> {
        check_address(sender, "sender")
            .and_then(|_| check_address(receiver, "receiver"))
            .and_then(|_| genesis_hash_bytes(&params.genesis_hash).map(|_| ()))
            .map_err(|e| {
                MAKE_PAYMENT_TXN_FAILED
                    .error("failed to construct payment transaction")
                    .with_cause(e)
            })?;

        Ok(Self {
            sender: sender.clone(),
            receiver: receiver.clone(),
            amount,
            fee: params.fee.max(params.min_fee),
            first_valid: params.first_valid,
            last_valid: params.last_valid,
            genesis_id: params.genesis_id.clone(),
            genesis_hash: params.genesis_hash.clone(),
            note,
            rekey_to: None,
        })
    }

    /// Set the rekey field.
    pub fn rekey(&mut self, to: &Address) -> Result<()> {
        check_address(to, "rekey target").map_err(|e| {
            SETTING_REKEY_TO_FAILED
                .error(format!("failed to set the rekey field on the transaction: {to}"))
                .with_cause(e)
        })?;
        self.rekey_to = Some(to.clone());
        Ok(())
    }

    fn to_value(&self) -> Result<Value> {
        let mut map = MapBuilder::new()
            .uint("amt", self.amount)
            .uint("fee", self.fee)
            .uint("fv", self.first_valid)
            .str("gen", &self.genesis_id)
            .bin("gh", &genesis_hash_bytes(&self.genesis_hash)?)
            .uint("lv", self.last_valid)
            .bin("note", &self.note)
            .bin("rcv", &address_bytes(&self.receiver)?)
            .bin("snd", &address_bytes(&self.sender)?)
            .str("type", PAYMENT_TYPE);
        if let Some(target) = &self.rekey_to {
            map = map.bin("rekey", &address_bytes(target)?);
        }
        Ok(map.build())
    }

    fn from_value(value: &Value) -> Result<Self> {
        const FIELDS: &[&str] = &[
            "amt", "fee", "fv", "gen", "gh", "lv", "note", "rcv", "rekey", "snd", "type",
        ];
        reject_unknown_keys(value, FIELDS, "transaction")?;
        match value.get("type") {
            Some(Value::Str(kind)) if kind == PAYMENT_TYPE => {}
            _ => return Err(encoding_failed("transaction is not a payment")),
        }
        let genesis_id = match value.get("gen") {
            None => String::new(),
            Some(Value::Str(id)) => id.clone(),
            Some(_) => return Err(encoding_failed("field 'gen' must be a string")),
        };
        let note = match value.get("note") {
            None => Vec::new(),
            Some(Value::Bin(note)) => note.clone(),
            Some(_) => return Err(encoding_failed("field 'note' must be a byte string")),
        };
        let zero = || derive_address(&PublicKey([0u8; 32]));
        Ok(Self {
            sender: address_field(value.get("snd"), "snd")?.unwrap_or_else(zero),
            receiver: address_field(value.get("rcv"), "rcv")?.unwrap_or_else(zero),
            amount: uint_field(value.get("amt"), "amt")?,
            fee: uint_field(value.get("fee"), "fee")?,
            first_valid: uint_field(value.get("fv"), "fv")?,
            last_valid: uint_field(value.get("lv"), "lv")?,
            genesis_id,
            genesis_hash: BASE64.encode(fixed_bin::<32>(value.get("gh"), "gh")?.unwrap_or([0u8; 32])),
            note,
            rekey_to: address_field(value.get("rekey"), "rekey")?,
        })
    }

    /// Canonical bytes of this transaction.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.to_value()?.encode())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::from_value(&decode_map(bytes, "transaction")?)
    }

    /// The id this transaction will have once submitted.
    pub fn id(&self) -> Result<TxId> {
        let bytes = self.encode()?;
        let digest = sha512_256_multi(&[TX_TAG, &bytes]);
        Ok(TxId(encode_base32_unpadded(&digest)))
    }
}

/// A transaction plus the signature that authorizes it.
///
/// `auth_addr` is present when the signer is not the sender, i.e. the sender
/// has been rekeyed and its auth address signed on its behalf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub txn: Transaction,
    pub signature: Signature,
    pub auth_addr: Option<Address>,
}

impl SignedTransaction {
    pub fn new(txn: Transaction, signature: Signature, signer: &Address) -> Self {
        let auth_addr = (signer != &txn.sender).then(|| signer.clone());
        Self {
            txn,
            signature,
            auth_addr,
        }
    }

    /// The address whose key produced the signature.
    pub fn signer(&self) -> &Address {
        self.auth_addr.as_ref().unwrap_or(&self.txn.sender)
    }

    /// Wire bytes accepted by the node's raw transaction endpoint.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut map = MapBuilder::new()
            .bin("sig", self.signature.as_bytes())
            .map("txn", self.txn.to_value()?);
        if let Some(auth_addr) = &self.auth_addr {
            map = map.bin("sgnr", &address_bytes(auth_addr)?);
        }
        Ok(map.build().encode())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value = decode_map(bytes, "signed transaction")?;
        reject_unknown_keys(&value, &["sgnr", "sig", "txn"], "signed transaction")?;
        let signature = fixed_bin::<64>(value.get("sig"), "sig")?
            .ok_or_else(|| encoding_failed("signed transaction has no signature"))?;
        let txn = match value.get("txn") {
            Some(txn @ Value::Map(_)) => Transaction::from_value(txn)?,
            _ => return Err(encoding_failed("signed transaction has no transaction")),
        };
        Ok(Self {
            txn,
            signature: Signature(signature),
            auth_addr: address_field(value.get("sgnr"), "sgnr")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keykeeper_crypto::{keypair_from_seed, sign_tagged};

    const GENESIS_HASH: &str = "BwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwc=";

    fn params() -> SuggestedParams {
        SuggestedParams {
            fee: 0,
            min_fee: 1000,
            first_valid: 10,
            last_valid: 10 + VALIDITY_WINDOW,
            genesis_id: "devnet-v1".into(),
            genesis_hash: GENESIS_HASH.into(),
        }
    }

    fn address(seed: u8) -> Address {
        derive_address(&keypair_from_seed(&[seed; 32]).public)
    }

    fn key_of(address: &Address) -> Vec<u8> {
        decode_address(address).unwrap().to_vec()
    }

    #[test]
    fn payment_uses_min_fee_and_params() {
        let txn = Transaction::payment(&address(1), &address(2), 5, Vec::new(), &params()).unwrap();
        assert_eq!(txn.fee, 1000);
        assert_eq!(txn.first_valid, 10);
        assert_eq!(txn.last_valid, 1010);
        assert_eq!(txn.rekey_to, None);
    }

    #[test]
    fn payment_rejects_invalid_sender() {
        let err = Transaction::payment(
            &Address::new("NOT-AN-ADDRESS"),
            &address(2),
            0,
            Vec::new(),
            &params(),
        )
        .unwrap_err();
        assert!(err.is(MAKE_PAYMENT_TXN_FAILED));
        assert!(err.is(INVALID_ADDRESS));
    }

    #[test]
    fn payment_rejects_short_genesis_hash() {
        let mut params = params();
        params.genesis_hash = "R2VuZXNpcw==".into();
        let err = Transaction::payment(&address(1), &address(1), 0, Vec::new(), &params)
            .unwrap_err();
        assert!(err.is(MAKE_PAYMENT_TXN_FAILED));
        assert!(err.is(TRANSACTION_ENCODING_FAILED));
    }

    #[test]
    fn rekey_rejects_invalid_target() {
        let mut txn =
            Transaction::payment(&address(1), &address(1), 0, Vec::new(), &params()).unwrap();
        let err = txn.rekey(&Address::new("bogus")).unwrap_err();
        assert!(err.is(SETTING_REKEY_TO_FAILED));
        assert_eq!(txn.rekey_to, None);
    }

    #[test]
    fn rekey_transaction_encodes_as_canonical_map() {
        let (sender, target) = (address(1), address(3));
        let mut txn = Transaction::payment(&sender, &sender, 0, Vec::new(), &params()).unwrap();
        txn.rekey(&target).unwrap();

        let bytes = txn.encode().unwrap();
        let value = Value::decode(&bytes).unwrap();
        // Zero amount and empty note are left out; keys come back sorted.
        assert_eq!(
            value.keys().collect::<Vec<_>>(),
            ["fee", "fv", "gen", "gh", "lv", "rcv", "rekey", "snd", "type"]
        );
        assert_eq!(value.get("fee"), Some(&Value::Uint(1000)));
        assert_eq!(value.get("type"), Some(&Value::Str("pay".into())));
        assert_eq!(value.get("gh"), Some(&Value::Bin(vec![7u8; 32])));
        assert_eq!(value.get("snd"), Some(&Value::Bin(key_of(&sender))));
        assert_eq!(value.get("rekey"), Some(&Value::Bin(key_of(&target))));
        // fixmap of 9 entries, then the fixstr "fee".
        assert_eq!(&bytes[..5], &[0x89, 0xa3, b'f', b'e', b'e']);

        assert_eq!(Transaction::decode(&bytes).unwrap(), txn);
    }

    #[test]
    fn id_is_sha512_256_of_tagged_bytes() {
        let mut txn =
            Transaction::payment(&address(1), &address(1), 0, Vec::new(), &params()).unwrap();
        let bytes = txn.encode().unwrap();
        let expected = encode_base32_unpadded(&sha512_256_multi(&[TX_TAG, bytes.as_slice()]));
        let before = txn.id().unwrap();
        assert_eq!(before.as_str(), expected);
        assert_eq!(before.as_str().len(), 52);

        txn.rekey(&address(3)).unwrap();
        assert_ne!(before, txn.id().unwrap());
    }

    #[test]
    fn signed_envelope_records_foreign_signer() {
        let txn = Transaction::payment(&address(1), &address(1), 0, Vec::new(), &params()).unwrap();
        let key = keypair_from_seed(&[3u8; 32]);
        let sig = sign_tagged(TX_TAG, &txn.encode().unwrap(), &key.private);

        let by_self = SignedTransaction::new(txn.clone(), sig.clone(), &address(1));
        assert_eq!(by_self.auth_addr, None);
        assert_eq!(by_self.signer(), &address(1));
        let wire = Value::decode(&by_self.encode().unwrap()).unwrap();
        assert_eq!(wire.keys().collect::<Vec<_>>(), ["sig", "txn"]);

        let by_other = SignedTransaction::new(txn, sig, &address(3));
        assert_eq!(by_other.auth_addr, Some(address(3)));
        let bytes = by_other.encode().unwrap();
        let wire = Value::decode(&bytes).unwrap();
        assert_eq!(wire.keys().collect::<Vec<_>>(), ["sgnr", "sig", "txn"]);
        assert_eq!(SignedTransaction::decode(&bytes).unwrap(), by_other);
    }

    #[test]
    fn decode_garbage_fails() {
        let err = SignedTransaction::decode(&[0xFF, 0x01]).unwrap_err();
        assert!(err.is(TRANSACTION_ENCODING_FAILED));
        let not_a_payment = MapBuilder::new().str("type", "axfer").build().encode();
        assert!(Transaction::decode(&not_a_payment)
            .unwrap_err()
            .is(TRANSACTION_ENCODING_FAILED));
        let unknown = MapBuilder::new().str("type", "pay").uint("xyz", 1).build().encode();
        assert!(Transaction::decode(&unknown).is_err());
    }
}
