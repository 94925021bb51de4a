//! Nullable ledger: balances and auth addresses held in memory.

use async_trait::async_trait;
use keykeeper_crypto::{decode_address, verify_tagged};
use keykeeper_ledger::error::{LEDGER_REQUEST_FAILED, TRANSACTION_REJECTED};
use keykeeper_ledger::transaction::{TX_TAG, VALIDITY_WINDOW};
use keykeeper_ledger::{AccountInfo, LedgerService, SignedTransaction, SuggestedParams, TxId};
use keykeeper_types::{Address, PublicKey, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Fee the null ledger suggests and requires.
pub const MIN_FEE: u64 = 1000;

pub const GENESIS_ID: &str = "nullnet-v1";
pub const GENESIS_HASH: &str = "bnVsbG5ldC9nZW5lc2lzLWhhc2gvMDAwMDAwMDAwMDA=";

/// A single-node in-memory ledger for testing.
///
/// Applies submitted payments the way the core expects a real node to:
/// the signature must come from the sender's current auth address, the
/// transaction must be inside its validity window and affordable, and a
/// `rekey_to` field moves the sender's auth address (rekeying to the sender
/// itself clears it). Each accepted transaction advances the round by one.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullLedger {
    state: Mutex<LedgerState>,
}

struct LedgerState {
    round: u64,
    accounts: HashMap<Address, AccountRecord>,
    submitted: Vec<SignedTransaction>,
    unavailable: bool,
}

#[derive(Clone, Default)]
struct AccountRecord {
    amount: u64,
    auth_addr: Option<Address>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState {
                round: 1,
                accounts: HashMap::new(),
                submitted: Vec::new(),
                unavailable: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credit `amount` to `address`.
    pub fn fund(&self, address: &Address, amount: u64) {
        self.state().accounts.entry(address.clone()).or_default().amount += amount;
    }

    pub fn balance(&self, address: &Address) -> u64 {
        self.state()
            .accounts
            .get(address)
            .map(|account| account.amount)
            .unwrap_or(0)
    }

    pub fn round(&self) -> u64 {
        self.state().round
    }

    /// Every accepted transaction, in order.
    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.state().submitted.clone()
    }

    /// Make every call fail as if the node were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    fn enter(&self, call: &str) -> Result<MutexGuard<'_, LedgerState>> {
        let state = self.state();
        if state.unavailable {
            return Err(LEDGER_REQUEST_FAILED.error(format!("{call}: connection refused")));
        }
        Ok(state)
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn rejected(reason: impl std::fmt::Display) -> keykeeper_types::Error {
    TRANSACTION_REJECTED.error(format!("transaction rejected: {reason}"))
}

impl LedgerState {
    fn apply(&mut self, signed: SignedTransaction) -> Result<TxId> {
        let txn = &signed.txn;
        if txn.genesis_id != GENESIS_ID || txn.genesis_hash != GENESIS_HASH {
            return Err(rejected("genesis mismatch"));
        }
        if self.round < txn.first_valid || self.round > txn.last_valid {
            return Err(rejected(format!(
                "round {} outside validity window {}..={}",
                self.round, txn.first_valid, txn.last_valid
            )));
        }
        if txn.fee < MIN_FEE {
            return Err(rejected(format!("fee {} below minimum {MIN_FEE}", txn.fee)));
        }

        let sender = self.accounts.get(&txn.sender).cloned().unwrap_or_default();
        let authorized = sender.auth_addr.clone().unwrap_or_else(|| txn.sender.clone());
        if signed.signer() != &authorized {
            return Err(rejected(format!(
                "should have been authorized by {authorized} but was actually authorized by {}",
                signed.signer()
            )));
        }
        let public = decode_address(signed.signer()).map_err(rejected)?;
        let bytes = txn.encode()?;
        if !verify_tagged(TX_TAG, &bytes, &signed.signature, &PublicKey(public)) {
            return Err(rejected("invalid signature"));
        }

        let debit = txn.amount.saturating_add(txn.fee);
        if sender.amount < debit {
            return Err(rejected(format!(
                "{} balance {} below {debit}",
                txn.sender, sender.amount
            )));
        }

        let tx_id = txn.id()?;
        let sender_entry = self.accounts.entry(txn.sender.clone()).or_default();
        sender_entry.amount -= debit;
        if let Some(target) = &txn.rekey_to {
            sender_entry.auth_addr = (target != &txn.sender).then(|| target.clone());
        }
        self.accounts.entry(txn.receiver.clone()).or_default().amount += txn.amount;
        self.round += 1;
        self.submitted.push(signed);
        Ok(tx_id)
    }
}

#[async_trait]
impl LedgerService for NullLedger {
    async fn account_information(&self, address: &Address) -> Result<AccountInfo> {
        let state = self.enter("account_information")?;
        let account = state.accounts.get(address).cloned().unwrap_or_default();
        Ok(AccountInfo {
            address: address.clone(),
            amount: account.amount,
            auth_addr: account.auth_addr,
        })
    }

    async fn suggested_params(&self) -> Result<SuggestedParams> {
        let state = self.enter("suggested_params")?;
        Ok(SuggestedParams {
            fee: 0,
            min_fee: MIN_FEE,
            first_valid: state.round,
            last_valid: state.round + VALIDITY_WINDOW,
            genesis_id: GENESIS_ID.to_string(),
            genesis_hash: GENESIS_HASH.to_string(),
        })
    }

    async fn send_raw_transaction(&self, signed: &[u8]) -> Result<TxId> {
        let mut state = self.enter("send_raw_transaction")?;
        let signed = SignedTransaction::decode(signed).map_err(|e| {
            rejected("malformed signed transaction").with_cause(e)
        })?;
        state.apply(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keykeeper_crypto::{derive_address, keypair_from_seed};
    use keykeeper_ledger::signer::sign_with;
    use keykeeper_ledger::Transaction;
    use keykeeper_types::KeyPair;

    fn account(seed: u8) -> (KeyPair, Address) {
        let keypair = keypair_from_seed(&[seed; 32]);
        let address = derive_address(&keypair.public);
        (keypair, address)
    }

    async fn payment(ledger: &NullLedger, from: &Address, to: &Address, amount: u64) -> Transaction {
        let params = ledger.suggested_params().await.unwrap();
        Transaction::payment(from, to, amount, Vec::new(), &params).unwrap()
    }

    #[tokio::test]
    async fn accepted_payment_moves_funds_and_advances_round() {
        let ledger = NullLedger::new();
        let (alice_key, alice) = account(1);
        let (_, bob) = account(2);
        ledger.fund(&alice, 10_000);

        let txn = payment(&ledger, &alice, &bob, 500).await;
        let signed = sign_with(&txn, &alice_key, &alice).unwrap();
        let tx_id = ledger.send_raw_transaction(&signed.encode().unwrap()).await.unwrap();

        assert_eq!(tx_id, txn.id().unwrap());
        assert_eq!(ledger.balance(&alice), 10_000 - 500 - MIN_FEE);
        assert_eq!(ledger.balance(&bob), 500);
        assert_eq!(ledger.round(), 2);
        assert_eq!(ledger.submitted().len(), 1);
    }

    #[tokio::test]
    async fn wrong_signer_is_rejected() {
        let ledger = NullLedger::new();
        let (_, alice) = account(1);
        let (mallory_key, mallory) = account(3);
        ledger.fund(&alice, 10_000);

        let txn = payment(&ledger, &alice, &alice, 0).await;
        let signed = sign_with(&txn, &mallory_key, &mallory).unwrap();
        let err = ledger
            .send_raw_transaction(&signed.encode().unwrap())
            .await
            .unwrap_err();
        assert!(err.is(TRANSACTION_REJECTED));
        assert_eq!(ledger.round(), 1);
    }

    #[tokio::test]
    async fn forged_signature_is_rejected() {
        let ledger = NullLedger::new();
        let (_, alice) = account(1);
        let (mallory_key, _) = account(3);
        ledger.fund(&alice, 10_000);

        let txn = payment(&ledger, &alice, &alice, 0).await;
        // Claims to be signed by alice, but with mallory's key.
        let signed = sign_with(&txn, &mallory_key, &alice).unwrap();
        let err = ledger
            .send_raw_transaction(&signed.encode().unwrap())
            .await
            .unwrap_err();
        assert!(err.message().contains("invalid signature"));
    }

    #[tokio::test]
    async fn unfunded_sender_is_rejected() {
        let ledger = NullLedger::new();
        let (alice_key, alice) = account(1);
        let txn = payment(&ledger, &alice, &alice, 0).await;
        let signed = sign_with(&txn, &alice_key, &alice).unwrap();
        let err = ledger
            .send_raw_transaction(&signed.encode().unwrap())
            .await
            .unwrap_err();
        assert!(err.is(TRANSACTION_REJECTED));
    }

    #[tokio::test]
    async fn unavailable_node_fails_every_call() {
        let ledger = NullLedger::new();
        ledger.set_unavailable(true);
        let err = ledger.suggested_params().await.unwrap_err();
        assert!(err.is(LEDGER_REQUEST_FAILED));
    }
}
