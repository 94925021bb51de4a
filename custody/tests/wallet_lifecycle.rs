//! Wallet creation, lookup, backup and recovery against the in-memory custody service.

use std::sync::Arc;

use keykeeper_custody::error::{
    CREATE_WALLET_FAILED, CUSTODY_REQUEST_FAILED, INVALID_BACKUP_PHRASE, INVALID_WALLET_NAME,
    INVALID_WALLET_PASSWORD, LIST_WALLETS_FAILED, WALLET_ALREADY_EXISTS, WALLET_NOT_FOUND,
    WRONG_PASSWORD,
};
use keykeeper_crypto::mnemonic::PHRASE_WORDS;
use keykeeper_custody::{AccountManager, CustodyAccounts, CustodyWallets, WalletManager};
use keykeeper_nullables::NullCustody;
use keykeeper_types::Category;

fn setup() -> (Arc<NullCustody>, CustodyWallets) {
    let custody = Arc::new(NullCustody::new());
    let wallets = CustodyWallets::new(custody.clone());
    (custody, wallets)
}

#[tokio::test]
async fn created_wallet_is_listed_and_found_by_trimmed_name() {
    let (_custody, wallets) = setup();
    let created = wallets.create("  savings  ", "hunter2").await.unwrap();
    assert_eq!(created.name, "savings");

    let listed = wallets.list().await.unwrap();
    assert!(listed.iter().any(|w| w.name == "savings"));

    let found = wallets.get("savings").await.unwrap();
    assert_eq!(found, created);
    assert!(wallets.contains("\tsavings").await.unwrap());
    assert!(!wallets.contains("checking").await.unwrap());
}

#[tokio::test]
async fn list_keeps_backend_order() {
    let (_custody, wallets) = setup();
    for name in ["zeta", "alpha", "mu"] {
        wallets.create(name, "pw").await.unwrap();
    }
    let names: Vec<String> = wallets.list().await.unwrap().into_iter().map(|w| w.name).collect();
    assert_eq!(names, ["zeta", "alpha", "mu"]);
}

#[tokio::test]
async fn duplicate_name_is_already_exists() {
    let (_custody, wallets) = setup();
    wallets.create("savings", "pw").await.unwrap();
    let err = wallets.create(" savings ", "other").await.unwrap_err();
    assert!(err.is(WALLET_ALREADY_EXISTS));
    assert_eq!(err.category(), Category::AlreadyExists);
    assert!(!err.is(CREATE_WALLET_FAILED));
}

#[tokio::test]
async fn blank_input_never_reaches_the_backend() {
    let (custody, wallets) = setup();

    let err = wallets.create("   ", "pw").await.unwrap_err();
    assert!(err.is(INVALID_WALLET_NAME));
    let err = wallets.create("savings", " \n ").await.unwrap_err();
    assert!(err.is(INVALID_WALLET_PASSWORD));
    let err = wallets.export_backup_phrase("", "pw").await.unwrap_err();
    assert!(err.is(INVALID_WALLET_NAME));
    let err = wallets.export_backup_phrase("savings", "").await.unwrap_err();
    assert!(err.is(INVALID_WALLET_PASSWORD));
    let err = wallets.get(" ").await.unwrap_err();
    assert_eq!(err.category(), Category::Validation);

    assert_eq!(custody.calls(), 0);
}

#[tokio::test]
async fn validation_messages_match_across_entry_points() {
    let (_custody, wallets) = setup();
    let from_create = wallets.create(" ", "pw").await.unwrap_err();
    let from_export = wallets.export_backup_phrase(" ", "pw").await.unwrap_err();
    let from_recover = wallets.recover(" ", "pw", "phrase").await.unwrap_err();
    assert_eq!(from_create.message(), from_export.message());
    assert_eq!(from_create.message(), from_recover.message());
}

#[tokio::test]
async fn missing_wallet_is_not_found() {
    let (_custody, wallets) = setup();
    let err = wallets.get("nope").await.unwrap_err();
    assert!(err.is(WALLET_NOT_FOUND));
    let err = wallets.export_backup_phrase("nope", "pw").await.unwrap_err();
    assert!(err.is(WALLET_NOT_FOUND));
}

#[tokio::test]
async fn wrong_password_is_permission_error() {
    let (custody, wallets) = setup();
    wallets.create("savings", "right").await.unwrap();
    let err = wallets.export_backup_phrase("savings", "wrong").await.unwrap_err();
    assert!(err.is(WRONG_PASSWORD));
    assert_eq!(err.category(), Category::Permission);
    assert_eq!(custody.open_handles(), 0);
}

#[tokio::test]
async fn unreachable_service_is_wrapped() {
    let (custody, wallets) = setup();
    custody.set_unavailable(true);
    let err = wallets.list().await.unwrap_err();
    assert!(err.is(LIST_WALLETS_FAILED));
    assert!(err.is(CUSTODY_REQUEST_FAILED));
    assert_eq!(err.category(), Category::Upstream);
}

#[tokio::test]
async fn backup_phrase_is_25_words_and_stable() {
    let (_custody, wallets) = setup();
    wallets.create("savings", "pw").await.unwrap();
    let phrase = wallets.export_backup_phrase("savings", "pw").await.unwrap();
    assert_eq!(phrase.split_whitespace().count(), PHRASE_WORDS);
    assert_eq!(wallets.export_backup_phrase("savings", "pw").await.unwrap(), phrase);
}

#[tokio::test]
async fn recovered_wallet_derives_the_same_accounts() {
    let custody = Arc::new(NullCustody::new());
    let wallets = CustodyWallets::new(custody.clone());
    let accounts = CustodyAccounts::new(custody.clone());

    let original = wallets.create("original", "pw").await.unwrap();
    let originals = accounts.create_accounts("original", "pw", 4).await.unwrap();
    let phrase = wallets.export_backup_phrase("original", "pw").await.unwrap();

    let recovered = wallets.recover("copy", "other-pw", &phrase).await.unwrap();
    assert_ne!(recovered.id, original.id);
    assert_eq!(recovered.name, "copy");
    assert!(accounts.list_accounts("copy", "other-pw").await.unwrap().is_empty());

    let rederived = accounts.create_accounts("copy", "other-pw", 4).await.unwrap();
    assert_eq!(rederived, originals);

    let a = accounts
        .export_private_key("original", "pw", &originals[2])
        .await
        .unwrap();
    let b = accounts
        .export_private_key("copy", "other-pw", &rederived[2])
        .await
        .unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn recover_rejects_bad_phrase() {
    let (custody, wallets) = setup();
    let err = wallets
        .recover("copy", "pw", "definitely not a backup phrase")
        .await
        .unwrap_err();
    assert!(err.is(INVALID_BACKUP_PHRASE));
    assert_eq!(err.category(), Category::Validation);
    assert_eq!(custody.calls(), 0);
}

#[tokio::test]
async fn recover_into_taken_name_is_already_exists() {
    let (_custody, wallets) = setup();
    wallets.create("savings", "pw").await.unwrap();
    let phrase = wallets.export_backup_phrase("savings", "pw").await.unwrap();
    let err = wallets.recover("savings", "pw", &phrase).await.unwrap_err();
    assert!(err.is(WALLET_ALREADY_EXISTS));
}
