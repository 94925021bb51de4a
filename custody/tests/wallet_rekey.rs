//! Rekeying accounts whose keys live in a custody wallet.

use std::sync::Arc;

use keykeeper_custody::{AccountManager, CustodyAccounts, CustodyWallets, WalletManager, WalletSigner};
use keykeeper_ledger::error::{SIGNER_UNAVAILABLE, SIGN_TRANSACTION_FAILED};
use keykeeper_ledger::{get_auth_addr, LedgerRekeying, Rekeying, TransactionSigner};
use keykeeper_nullables::{NullCustody, NullLedger};
use keykeeper_types::Address;

const FUNDS: u64 = 1_000_000;

struct World {
    custody: Arc<NullCustody>,
    ledger: Arc<NullLedger>,
    accounts: Vec<Address>,
}

async fn world(count: usize) -> World {
    let custody = Arc::new(NullCustody::new());
    let ledger = Arc::new(NullLedger::new());
    CustodyWallets::new(custody.clone())
        .create("hot", "pw")
        .await
        .unwrap();
    let accounts = CustodyAccounts::new(custody.clone())
        .create_accounts("hot", "pw", count)
        .await
        .unwrap();
    for address in &accounts {
        ledger.fund(address, FUNDS);
    }
    World {
        custody,
        ledger,
        accounts,
    }
}

#[tokio::test]
async fn wallet_signer_knows_its_accounts() {
    let w = world(2).await;
    let signer = WalletSigner::new(w.custody.clone(), "hot", "pw").unwrap();
    assert_eq!(signer.wallet_name(), "hot");
    assert!(signer.can_sign_for(&w.accounts[0]).await.unwrap());
    assert_eq!(w.custody.open_handles(), 0);
}

#[tokio::test]
async fn rekey_round_trip_with_wallet_keys() {
    let w = world(2).await;
    let (a, b) = (&w.accounts[0], &w.accounts[1]);
    let signer = Arc::new(WalletSigner::new(w.custody.clone(), "hot", "pw").unwrap());
    let rekeying = LedgerRekeying::new(w.ledger.clone(), signer);

    rekeying.rekey(a, b).await.unwrap();
    assert_eq!(&get_auth_addr(w.ledger.as_ref(), a).await.unwrap(), b);

    rekeying.rekey_back(a).await.unwrap();
    assert_eq!(&get_auth_addr(w.ledger.as_ref(), a).await.unwrap(), a);
    assert_eq!(w.custody.open_handles(), 0);
}

#[tokio::test]
async fn deleted_auth_key_cannot_sign() {
    let w = world(2).await;
    let (a, b) = (&w.accounts[0], &w.accounts[1]);
    let signer = Arc::new(WalletSigner::new(w.custody.clone(), "hot", "pw").unwrap());
    let rekeying = LedgerRekeying::new(w.ledger.clone(), signer);
    rekeying.rekey(a, b).await.unwrap();

    CustodyAccounts::new(w.custody.clone())
        .delete_account("hot", "pw", b)
        .await
        .unwrap();

    let err = rekeying.rekey_back(a).await.unwrap_err();
    assert!(err.is(SIGN_TRANSACTION_FAILED));
    assert!(err.is(SIGNER_UNAVAILABLE));
    assert_eq!(&get_auth_addr(w.ledger.as_ref(), a).await.unwrap(), b);
}
