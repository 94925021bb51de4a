//! Error kinds raised by the ledger client and the rekey protocol.

use keykeeper_types::{Category, ErrorKind};

pub const GET_AUTH_ADDR_FAILED: ErrorKind = ErrorKind::new(
    "GetAuthAddrFailed",
    Category::Upstream,
    0x018c_4e10_2c3f_7a01_9b2e_5d1a_8f40_0001,
);

pub const GET_SUGGESTED_PARAMS_FAILED: ErrorKind = ErrorKind::new(
    "GetSuggestedParamsFailed",
    Category::Upstream,
    0x018c_4e10_2c3f_7a01_9b2e_5d1a_8f40_0002,
);

pub const INVALID_ADDRESS: ErrorKind = ErrorKind::new(
    "InvalidAddress",
    Category::Validation,
    0x018c_4e10_2c3f_7a01_9b2e_5d1a_8f40_0003,
);

pub const MAKE_PAYMENT_TXN_FAILED: ErrorKind = ErrorKind::new(
    "MakePaymentTxnFailed",
    Category::Validation,
    0x018c_4e10_2c3f_7a01_9b2e_5d1a_8f40_0004,
);

pub const SETTING_REKEY_TO_FAILED: ErrorKind = ErrorKind::new(
    "SettingRekeyToFailed",
    Category::Validation,
    0x018c_4e10_2c3f_7a01_9b2e_5d1a_8f40_0005,
);

pub const SIGN_TRANSACTION_FAILED: ErrorKind = ErrorKind::new(
    "SignTransactionFailed",
    Category::Protocol,
    0x018c_4e10_2c3f_7a01_9b2e_5d1a_8f40_0006,
);

/// The signer holds no key for the address that must sign.
pub const SIGNER_UNAVAILABLE: ErrorKind = ErrorKind::new(
    "SignerUnavailable",
    Category::NotFound,
    0x018c_4e10_2c3f_7a01_9b2e_5d1a_8f40_0007,
);

pub const SUBMIT_TRANSACTION_FAILED: ErrorKind = ErrorKind::new(
    "SubmitTransactionFailed",
    Category::Upstream,
    0x018c_4e10_2c3f_7a01_9b2e_5d1a_8f40_0008,
);

/// The node refused a well-formed submission (bad signature, wrong signer, …).
pub const TRANSACTION_REJECTED: ErrorKind = ErrorKind::new(
    "TransactionRejected",
    Category::Protocol,
    0x018c_4e10_2c3f_7a01_9b2e_5d1a_8f40_0009,
);

pub const ACCOUNT_ALREADY_REKEYED: ErrorKind = ErrorKind::new(
    "AccountAlreadyRekeyed",
    Category::Protocol,
    0x018c_4e10_2c3f_7a01_9b2e_5d1a_8f40_000a,
);

pub const TRANSACTION_ENCODING_FAILED: ErrorKind = ErrorKind::new(
    "TransactionEncodingFailed",
    Category::Validation,
    0x018c_4e10_2c3f_7a01_9b2e_5d1a_8f40_000b,
);

/// Transport, HTTP status, or response decoding failure talking to the node.
pub const LEDGER_REQUEST_FAILED: ErrorKind = ErrorKind::new(
    "LedgerRequestFailed",
    Category::Upstream,
    0x018c_4e10_2c3f_7a01_9b2e_5d1a_8f40_000c,
);
