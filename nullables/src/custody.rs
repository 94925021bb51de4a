//! Nullable custody service: wallets and keys held in memory.

use async_trait::async_trait;
use keykeeper_crypto::{blake2b_256_multi, derive_account_keypair, derive_address};
use keykeeper_custody::error::{
    ACCOUNT_NOT_FOUND, CUSTODY_REQUEST_FAILED, INVALID_WALLET_HANDLE, WALLET_ALREADY_EXISTS,
    WALLET_NOT_FOUND, WRONG_PASSWORD,
};
use keykeeper_custody::CustodyService;
use keykeeper_types::{
    Address, MasterDerivationKey, PrivateKey, Result, Wallet, WalletHandle, WalletId,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// An in-memory custody service for testing.
///
/// Behaves like a custody daemon as seen from the client: wallet names are
/// unique, handles must be live, passwords are checked, and accounts are
/// derived from each wallet's master derivation key by index, so a wallet
/// recovered from another's key yields the same addresses in the same order.
/// Wallet ids, handle tokens and fresh master keys are deterministic.
///
/// Failures can be injected per operation, and every call and every handle
/// is counted so tests can assert that leases were released.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullCustody {
    state: Mutex<CustodyState>,
}

#[derive(Default)]
struct CustodyState {
    wallets: Vec<WalletRecord>,
    /// Live handle token → wallet id.
    handles: HashMap<String, WalletId>,
    wallets_created: u64,
    handles_issued: u64,
    handles_released: u64,
    calls: u64,
    faults: Faults,
}

struct WalletRecord {
    id: WalletId,
    name: String,
    password: String,
    master_key: MasterDerivationKey,
    next_index: u64,
    /// Held accounts with their derivation index, in creation order.
    accounts: Vec<(Address, u64)>,
}

#[derive(Default)]
struct Faults {
    unavailable: bool,
    generate_budget: Option<usize>,
    failing_deletes: HashSet<Address>,
    panicking_deletes: HashSet<Address>,
    failing_release: bool,
}

impl NullCustody {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CustodyState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, CustodyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call fail as if the daemon were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().faults.unavailable = unavailable;
    }

    /// Let `n` more keys be generated, then fail every generation.
    pub fn fail_generate_after(&self, n: usize) {
        self.state().faults.generate_budget = Some(n);
    }

    /// Fail every deletion of `address` with an upstream error.
    pub fn fail_delete_of(&self, address: &Address) {
        self.state().faults.failing_deletes.insert(address.clone());
    }

    /// Panic inside the deletion of `address`.
    pub fn panic_on_delete_of(&self, address: &Address) {
        self.state().faults.panicking_deletes.insert(address.clone());
    }

    /// Fail every handle release (the handle is still dropped server-side).
    pub fn fail_release(&self, failing: bool) {
        self.state().faults.failing_release = failing;
    }

    /// Number of service calls received so far.
    pub fn calls(&self) -> u64 {
        self.state().calls
    }

    pub fn handles_issued(&self) -> u64 {
        self.state().handles_issued
    }

    pub fn handles_released(&self) -> u64 {
        self.state().handles_released
    }

    /// Handles issued and not yet released.
    pub fn open_handles(&self) -> usize {
        self.state().handles.len()
    }

    /// The accounts a wallet holds, without going through a handle.
    pub fn accounts_of(&self, wallet_name: &str) -> Vec<Address> {
        self.state()
            .wallets
            .iter()
            .find(|w| w.name == wallet_name)
            .map(|w| w.accounts.iter().map(|(address, _)| address.clone()).collect())
            .unwrap_or_default()
    }

    /// Count the call and fail it when the daemon is marked unavailable.
    fn enter(&self, call: &str) -> Result<MutexGuard<'_, CustodyState>> {
        let mut state = self.state();
        state.calls += 1;
        if state.faults.unavailable {
            return Err(CUSTODY_REQUEST_FAILED.error(format!("{call}: connection refused")));
        }
        Ok(state)
    }
}

impl Default for NullCustody {
    fn default() -> Self {
        Self::new()
    }
}

impl CustodyState {
    fn wallet_for(&mut self, handle: &WalletHandle) -> Result<&mut WalletRecord> {
        let id = self
            .handles
            .get(handle.token())
            .cloned()
            .ok_or_else(|| INVALID_WALLET_HANDLE.error("handle does not exist or has expired"))?;
        self.wallets
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| WALLET_NOT_FOUND.error("wallet not found"))
    }

    fn unlocked_wallet(&mut self, handle: &WalletHandle, password: &str) -> Result<&mut WalletRecord> {
        let wallet = self.wallet_for(handle)?;
        if wallet.password != password {
            return Err(WRONG_PASSWORD.error("wrong password"));
        }
        Ok(wallet)
    }
}

fn fresh_master_key(n: u64) -> MasterDerivationKey {
    MasterDerivationKey(blake2b_256_multi(&[b"null-custody/master-key/".as_slice(), &n.to_be_bytes()]))
}

#[async_trait]
impl CustodyService for NullCustody {
    async fn list_wallets(&self) -> Result<Vec<Wallet>> {
        let state = self.enter("list_wallets")?;
        Ok(state
            .wallets
            .iter()
            .map(|w| Wallet::new(w.id.clone(), w.name.clone()))
            .collect())
    }

    async fn create_wallet(
        &self,
        name: &str,
        password: &str,
        _driver: &str,
        master_key: Option<&MasterDerivationKey>,
    ) -> Result<Wallet> {
        let mut state = self.enter("create_wallet")?;
        if state.wallets.iter().any(|w| w.name == name) {
            return Err(WALLET_ALREADY_EXISTS.error("wallet with same name already exists"));
        }
        state.wallets_created += 1;
        let n = state.wallets_created;
        let master_key = match master_key {
            Some(mdk) => MasterDerivationKey(*mdk.as_bytes()),
            None => fresh_master_key(n),
        };
        let record = WalletRecord {
            id: WalletId::new(format!("null-wallet-{n:04}")),
            name: name.to_string(),
            password: password.to_string(),
            master_key,
            next_index: 0,
            accounts: Vec::new(),
        };
        let wallet = Wallet::new(record.id.clone(), record.name.clone());
        state.wallets.push(record);
        Ok(wallet)
    }

    async fn init_wallet_handle(&self, wallet_id: &WalletId, password: &str) -> Result<WalletHandle> {
        let mut state = self.enter("init_wallet_handle")?;
        let wallet = state
            .wallets
            .iter()
            .find(|w| &w.id == wallet_id)
            .ok_or_else(|| WALLET_NOT_FOUND.error("wallet not found"))?;
        if wallet.password != password {
            return Err(WRONG_PASSWORD.error("wrong password"));
        }
        state.handles_issued += 1;
        let token = format!("null-handle-{:06}", state.handles_issued);
        state.handles.insert(token.clone(), wallet_id.clone());
        Ok(WalletHandle::new(token))
    }

    async fn release_wallet_handle(&self, handle: &WalletHandle) -> Result<()> {
        let mut state = self.enter("release_wallet_handle")?;
        if state.handles.remove(handle.token()).is_none() {
            return Err(INVALID_WALLET_HANDLE.error("handle does not exist or has expired"));
        }
        state.handles_released += 1;
        if state.faults.failing_release {
            return Err(CUSTODY_REQUEST_FAILED.error("release_wallet_handle: connection reset"));
        }
        Ok(())
    }

    async fn list_keys(&self, handle: &WalletHandle) -> Result<Vec<Address>> {
        let mut state = self.enter("list_keys")?;
        let wallet = state.wallet_for(handle)?;
        Ok(wallet.accounts.iter().map(|(address, _)| address.clone()).collect())
    }

    async fn generate_key(&self, handle: &WalletHandle) -> Result<Address> {
        let mut state = self.enter("generate_key")?;
        if let Some(budget) = state.faults.generate_budget.as_mut() {
            if *budget == 0 {
                return Err(CUSTODY_REQUEST_FAILED.error("generate_key: connection reset"));
            }
            *budget -= 1;
        }
        let wallet = state.wallet_for(handle)?;
        let index = wallet.next_index;
        wallet.next_index += 1;
        let address = derive_address(&derive_account_keypair(&wallet.master_key, index).public);
        wallet.accounts.push((address.clone(), index));
        Ok(address)
    }

    async fn delete_key(&self, handle: &WalletHandle, password: &str, address: &Address) -> Result<()> {
        tokio::task::yield_now().await;
        let panics = {
            let mut state = self.enter("delete_key")?;
            state.unlocked_wallet(handle, password)?;
            if state.faults.failing_deletes.contains(address) {
                return Err(CUSTODY_REQUEST_FAILED.error("delete_key: connection reset"));
            }
            state.faults.panicking_deletes.contains(address)
        };
        if panics {
            panic!("null custody: injected panic deleting {address}");
        }

        let mut state = self.state();
        let wallet = state.unlocked_wallet(handle, password)?;
        let before = wallet.accounts.len();
        wallet.accounts.retain(|(held, _)| held != address);
        if wallet.accounts.len() == before {
            return Err(ACCOUNT_NOT_FOUND.error("key does not exist in this wallet"));
        }
        Ok(())
    }

    async fn export_key(
        &self,
        handle: &WalletHandle,
        password: &str,
        address: &Address,
    ) -> Result<PrivateKey> {
        let mut state = self.enter("export_key")?;
        let wallet = state.unlocked_wallet(handle, password)?;
        let index = wallet
            .accounts
            .iter()
            .find(|(held, _)| held == address)
            .map(|(_, index)| *index)
            .ok_or_else(|| ACCOUNT_NOT_FOUND.error("key does not exist in this wallet"))?;
        let keypair = derive_account_keypair(&wallet.master_key, index);
        Ok(PrivateKey(*keypair.private.as_bytes()))
    }

    async fn export_master_derivation_key(
        &self,
        handle: &WalletHandle,
        password: &str,
    ) -> Result<MasterDerivationKey> {
        let mut state = self.enter("export_master_derivation_key")?;
        let wallet = state.unlocked_wallet(handle, password)?;
        Ok(MasterDerivationKey(*wallet.master_key.as_bytes()))
    }
}
