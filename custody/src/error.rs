//! Error kinds raised by the custody client.
//!
//! Semantic kinds (not found, already exists, wrong password) come straight
//! from the custody service and pass through the higher layers unchanged.
//! Transport and decoding failures are raised as [`CUSTODY_REQUEST_FAILED`]
//! and then wrapped by the operation that issued the call, so a caller sees
//! e.g. `ListKeysFailed <- CustodyRequestFailed <- reqwest::Error`.

use keykeeper_types::{Category, Error, ErrorKind};

pub const INVALID_WALLET_NAME: ErrorKind = ErrorKind::new(
    "InvalidWalletName",
    Category::Validation,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_0001,
);

pub const INVALID_WALLET_PASSWORD: ErrorKind = ErrorKind::new(
    "InvalidWalletPassword",
    Category::Validation,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_0002,
);

pub const INVALID_ACCOUNT_COUNT: ErrorKind = ErrorKind::new(
    "InvalidAccountCount",
    Category::Validation,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_0003,
);

pub const EMPTY_ADDRESS_LIST: ErrorKind = ErrorKind::new(
    "EmptyAddressList",
    Category::Validation,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_0004,
);

pub const INVALID_BACKUP_PHRASE: ErrorKind = ErrorKind::new(
    "InvalidBackupPhrase",
    Category::Validation,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_0005,
);

pub const WALLET_NOT_FOUND: ErrorKind = ErrorKind::new(
    "WalletNotFound",
    Category::NotFound,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_0006,
);

pub const ACCOUNT_NOT_FOUND: ErrorKind = ErrorKind::new(
    "AccountNotFound",
    Category::NotFound,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_0007,
);

pub const WALLET_ALREADY_EXISTS: ErrorKind = ErrorKind::new(
    "WalletAlreadyExists",
    Category::AlreadyExists,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_0008,
);

pub const WRONG_PASSWORD: ErrorKind = ErrorKind::new(
    "WrongPassword",
    Category::Permission,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_0009,
);

/// The handle was released, expired, or never issued.
pub const INVALID_WALLET_HANDLE: ErrorKind = ErrorKind::new(
    "InvalidWalletHandle",
    Category::Permission,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_000a,
);

/// Transport, HTTP status, or response decoding failure talking to the
/// custody service.
pub const CUSTODY_REQUEST_FAILED: ErrorKind = ErrorKind::new(
    "CustodyRequestFailed",
    Category::Upstream,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_000b,
);

pub const LIST_WALLETS_FAILED: ErrorKind = ErrorKind::new(
    "ListWalletsFailed",
    Category::Upstream,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_000c,
);

pub const CREATE_WALLET_FAILED: ErrorKind = ErrorKind::new(
    "CreateWalletFailed",
    Category::Upstream,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_000d,
);

pub const INIT_WALLET_HANDLE_FAILED: ErrorKind = ErrorKind::new(
    "InitWalletHandleFailed",
    Category::Upstream,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_000e,
);

pub const LIST_KEYS_FAILED: ErrorKind = ErrorKind::new(
    "ListKeysFailed",
    Category::Upstream,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_000f,
);

pub const GENERATE_KEY_FAILED: ErrorKind = ErrorKind::new(
    "GenerateKeyFailed",
    Category::Upstream,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_0010,
);

pub const DELETE_KEY_FAILED: ErrorKind = ErrorKind::new(
    "DeleteKeyFailed",
    Category::Upstream,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_0011,
);

pub const EXPORT_KEY_FAILED: ErrorKind = ErrorKind::new(
    "ExportKeyFailed",
    Category::Upstream,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_0012,
);

pub const EXPORT_MASTER_KEY_FAILED: ErrorKind = ErrorKind::new(
    "ExportMasterKeyFailed",
    Category::Upstream,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_0013,
);

/// A secret exported from custody could not be rendered as a phrase.
pub const KEY_ENCODING_FAILED: ErrorKind = ErrorKind::new(
    "KeyEncodingFailed",
    Category::Protocol,
    0x018c_5a20_71d4_7c02_8e13_4b6f_a250_0014,
);

/// Wrap upstream failures in `kind`; let semantic failures through as they are.
pub(crate) fn in_context(kind: ErrorKind, message: impl Into<String>) -> impl FnOnce(Error) -> Error {
    let message = message.into();
    move |e| {
        if e.category() == Category::Upstream {
            kind.error(message).with_cause(e)
        } else {
            e
        }
    }
}
