//! Handle leases are released on every exit path.

use std::sync::Arc;
use std::time::Duration;

use keykeeper_custody::error::{INIT_WALLET_HANDLE_FAILED, WALLET_NOT_FOUND, WRONG_PASSWORD};
use keykeeper_custody::{CustodyService, CustodyWallets, HandleSession, WalletCredential, WalletManager};
use keykeeper_nullables::NullCustody;
use keykeeper_types::{Category, ErrorKind};

const BOOM: ErrorKind =
    ErrorKind::new("Boom", Category::Protocol, 0x018c_7f00_0000_7000_8000_0000_0000_0b00);

async fn setup() -> (Arc<NullCustody>, HandleSession, WalletCredential) {
    let custody = Arc::new(NullCustody::new());
    CustodyWallets::new(custody.clone())
        .create("w", "pw")
        .await
        .unwrap();
    let session = HandleSession::new(custody.clone());
    let credential = WalletCredential::new("w", "pw").unwrap();
    (custody, session, credential)
}

/// Give spawned releases a chance to run.
async fn settle(custody: &NullCustody) {
    for _ in 0..50 {
        if custody.open_handles() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn released_after_success() {
    let (custody, session, credential) = setup().await;
    let service = custody.clone();
    let keys = session
        .with_handle(&credential, |handle| async move { service.list_keys(&handle).await })
        .await
        .unwrap();
    assert!(keys.is_empty());
    assert_eq!(custody.handles_issued(), 1);
    assert_eq!(custody.handles_released(), 1);
    assert_eq!(custody.open_handles(), 0);
}

#[tokio::test]
async fn released_after_closure_error() {
    let (custody, session, credential) = setup().await;
    let err = session
        .with_handle(&credential, |_handle| async { Err::<(), _>(BOOM.error("inner failure")) })
        .await
        .unwrap_err();
    assert!(err.is(BOOM));
    assert_eq!(custody.open_handles(), 0);
}

#[tokio::test]
async fn release_failure_does_not_mask_result() {
    let (custody, session, credential) = setup().await;
    custody.fail_release(true);

    let value = session
        .with_handle(&credential, |_handle| async { Ok(42) })
        .await
        .unwrap();
    assert_eq!(value, 42);

    let err = session
        .with_handle(&credential, |_handle| async { Err::<(), _>(BOOM.error("primary")) })
        .await
        .unwrap_err();
    assert!(err.is(BOOM));
    assert_eq!(err.message(), "primary");
    assert_eq!(custody.handles_released(), 2);
}

#[tokio::test]
async fn released_after_panic() {
    let (custody, session, credential) = setup().await;
    let task_session = session.clone();
    let task_credential = credential.clone();
    let joined = tokio::spawn(async move {
        task_session
            .with_handle(&task_credential, |_handle| async {
                if true {
                    panic!("closure blew up");
                }
                Ok(())
            })
            .await
    })
    .await;
    assert!(joined.unwrap_err().is_panic());

    settle(&custody).await;
    assert_eq!(custody.handles_issued(), 1);
    assert_eq!(custody.open_handles(), 0);
}

#[tokio::test]
async fn released_after_cancellation() {
    let (custody, session, credential) = setup().await;
    let outcome = tokio::time::timeout(
        Duration::from_millis(20),
        session.with_handle(&credential, |_handle| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }),
    )
    .await;
    assert!(outcome.is_err());

    settle(&custody).await;
    assert_eq!(custody.handles_issued(), 1);
    assert_eq!(custody.open_handles(), 0);
}

#[tokio::test]
async fn concurrent_sessions_lease_independently() {
    let (custody, session, credential) = setup().await;
    let (a, b) = tokio::join!(
        session.with_handle(&credential, |handle| async move { Ok(handle) }),
        session.with_handle(&credential, |handle| async move { Ok(handle) }),
    );
    assert_ne!(a.unwrap(), b.unwrap());
    assert_eq!(custody.handles_issued(), 2);
    assert_eq!(custody.open_handles(), 0);
}

#[tokio::test]
async fn lease_failures_skip_the_closure() {
    let (custody, session, _) = setup().await;

    let missing = WalletCredential::new("other", "pw").unwrap();
    let err = session
        .with_handle(&missing, |_handle| async { Ok(()) })
        .await
        .unwrap_err();
    assert!(err.is(WALLET_NOT_FOUND));

    let wrong = WalletCredential::new("w", "nope").unwrap();
    let err = session
        .with_handle(&wrong, |_handle| async { Ok(()) })
        .await
        .unwrap_err();
    assert!(err.is(WRONG_PASSWORD));
    assert!(!err.is(INIT_WALLET_HANDLE_FAILED));

    assert_eq!(custody.handles_issued(), 0);
}

#[tokio::test]
async fn unreachable_service_wraps_lease_failure() {
    let custody = Arc::new(NullCustody::new());
    let wallet = custody.create_wallet("w", "pw", "sqlite", None).await.unwrap();
    assert_eq!(wallet.name, "w");
    let session = HandleSession::new(custody.clone());
    custody.set_unavailable(true);

    let credential = WalletCredential::new("w", "pw").unwrap();
    let err = session
        .with_handle(&credential, |_handle| async { Ok(()) })
        .await
        .unwrap_err();
    assert_eq!(err.category(), Category::Upstream);
}
