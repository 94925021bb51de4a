//! Identity-based errors with causal chaining.
//!
//! Every failure carries a stable [`ErrorId`] that is distinct from its
//! human-readable message, so callers can match on the *kind* of failure even
//! when message text changes. Each kind is declared once as an [`ErrorKind`]
//! constant next to the code that raises it:
//!
//! ```
//! use keykeeper_types::{Category, ErrorKind};
//!
//! pub const WALLET_NOT_FOUND: ErrorKind =
//!     ErrorKind::new("WalletNotFound", Category::NotFound, 0x018c_2a1e_6f3b_7d40_9a51_0c7e_11d2_0a01);
//!
//! let err = WALLET_NOT_FOUND.error("no wallet named 'savings'");
//! assert!(err.is(WALLET_NOT_FOUND));
//! ```
//!
//! Errors link to their cause. Matching walks the chain: an error *is* a kind
//! when its own id equals the kind's id or, failing that, when its cause is.
//! The chain ends either in another identified [`Error`] or in an opaque
//! upstream error (HTTP, decoding, I/O) that can be recovered with
//! [`Error::find_upstream`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Result alias used across the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Stable identifier of an error kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ErrorId(Uuid);

impl ErrorId {
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Broad class of a failure, used to decide remediation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Bad input detected locally before any remote call.
    Validation,
    /// The wallet or account does not exist.
    NotFound,
    /// A uniquely named resource already exists.
    AlreadyExists,
    /// The custody service rejected the credentials.
    Permission,
    /// A remote service or the transport failed.
    Upstream,
    /// A precondition of a multi-step protocol does not hold.
    Protocol,
}

/// A named error kind with a stable identifier.
///
/// Equality is by identifier only.
#[derive(Clone, Copy, Debug)]
pub struct ErrorKind {
    id: ErrorId,
    name: &'static str,
    category: Category,
}

impl ErrorKind {
    pub const fn new(name: &'static str, category: Category, id: u128) -> Self {
        Self {
            id: ErrorId::from_u128(id),
            name,
            category,
        }
    }

    pub const fn id(&self) -> ErrorId {
        self.id
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn category(&self) -> Category {
        self.category
    }

    /// Construct an error of this kind.
    pub fn error(self, message: impl Into<String>) -> Error {
        Error::new(self, message)
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ErrorKind {}

/// The next link in an error chain.
///
/// Displays as, and forwards `source()` to, the wrapped error.
#[derive(Debug)]
pub enum Cause {
    Identified(Box<Error>),
    Upstream(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Identified(e) => fmt::Display::fmt(e, f),
            Cause::Upstream(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Cause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Cause::Identified(e) => std::error::Error::source(e.as_ref()),
            Cause::Upstream(e) => e.source(),
        }
    }
}

impl From<Error> for Cause {
    fn from(e: Error) -> Self {
        Cause::Identified(Box::new(e))
    }
}

/// An identified failure with an optional cause.
#[derive(Debug, Error)]
#[error("{}[{}]: {message}", .kind.name(), .kind.id())]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<Cause>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Chain an identified error as this error's cause.
    pub fn with_cause(mut self, cause: Error) -> Self {
        self.cause = Some(Cause::from(cause));
        self
    }

    /// Chain an opaque upstream error (transport, decoding, …) as the cause.
    pub fn with_upstream<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Cause::Upstream(Box::new(cause)));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn id(&self) -> ErrorId {
        self.kind.id
    }

    pub fn name(&self) -> &'static str {
        self.kind.name
    }

    /// Category of the immediate kind (not of any cause).
    pub fn category(&self) -> Category {
        self.kind.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// True when this error, or any identified error in its cause chain, has
    /// the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        if self.kind == kind {
            return true;
        }
        match &self.cause {
            Some(Cause::Identified(cause)) => cause.is(kind),
            _ => false,
        }
    }

    /// True when this error matches `target`'s kind anywhere in its chain.
    ///
    /// Only `target`'s own kind is considered; its cause is ignored.
    pub fn matches(&self, target: &Error) -> bool {
        self.is(target.kind)
    }

    /// Walk the chain of identified errors, starting with `self`.
    pub fn chain(&self) -> impl Iterator<Item = &Error> {
        std::iter::successors(Some(self), |e| match &e.cause {
            Some(Cause::Identified(cause)) => Some(cause.as_ref()),
            _ => None,
        })
    }

    /// The opaque upstream error at the end of the chain, if there is one.
    pub fn upstream(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.chain().find_map(|e| match &e.cause {
            Some(Cause::Upstream(upstream)) => Some(upstream.as_ref()),
            _ => None,
        })
    }

    /// Drill through the chain (including the upstream error's own sources)
    /// to the first error of type `E`.
    pub fn find_upstream<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        let mut current: Option<&(dyn std::error::Error + 'static)> =
            self.upstream().map(|e| e as &(dyn std::error::Error + 'static));
        while let Some(err) = current {
            if let Some(found) = err.downcast_ref::<E>() {
                return Some(found);
            }
            current = err.source();
        }
        None
    }

    /// Render the whole chain on one line, outermost first.
    pub fn report(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(" <- ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOO: ErrorKind =
        ErrorKind::new("Foo", Category::Validation, 0x018c_2a1e_0000_7000_8000_0000_0000_0f00);
    const BAR: ErrorKind =
        ErrorKind::new("Bar", Category::NotFound, 0x018c_2a1e_0000_7000_8000_0000_0000_0ba0);
    const BAZ: ErrorKind =
        ErrorKind::new("Baz", Category::Upstream, 0x018c_2a1e_0000_7000_8000_0000_0000_0ba2);

    #[derive(Debug, Error)]
    #[error("socket closed")]
    struct SocketClosed;

    #[test]
    fn error_matches_its_own_kind() {
        let err = FOO.error("foo failed");
        assert!(err.is(FOO));
        assert!(err.matches(&FOO.error("different message")));
        assert!(!err.is(BAR));
        assert!(!err.matches(&BAR.error("foo failed")));
    }

    #[test]
    fn error_matches_anywhere_in_chain() {
        let err = FOO
            .error("outer")
            .with_cause(BAR.error("middle").with_cause(BAZ.error("inner")));
        assert!(err.is(FOO));
        assert!(err.is(BAR));
        assert!(err.is(BAZ));
        assert_eq!(err.category(), Category::Validation);
        assert_eq!(err.chain().count(), 3);
    }

    #[test]
    fn cause_does_not_leak_into_target_matching() {
        let err = FOO.error("outer");
        let target = BAR.error("target").with_cause(FOO.error("inner"));
        assert!(!err.matches(&target));
    }

    #[test]
    fn upstream_cause_is_recoverable() {
        let err = FOO
            .error("outer")
            .with_cause(BAZ.error("inner").with_upstream(SocketClosed));
        assert!(err.find_upstream::<SocketClosed>().is_some());
        assert!(err.find_upstream::<std::io::Error>().is_none());
        assert!(!err.is(BAR));
    }

    #[test]
    fn display_carries_name_and_id() {
        let err = BAR.error("no such wallet");
        let rendered = err.to_string();
        assert!(rendered.starts_with("Bar["));
        assert!(rendered.contains(&BAR.id().to_string()));
        assert!(rendered.ends_with("no such wallet"));
    }

    #[test]
    fn report_renders_full_chain() {
        let err = FOO
            .error("outer")
            .with_cause(BAZ.error("inner").with_upstream(SocketClosed));
        let report = err.report();
        assert!(report.contains("outer"));
        assert!(report.contains("inner"));
        assert!(report.ends_with("socket closed"));
    }

    #[test]
    fn source_exposes_cause() {
        let err = FOO.error("outer").with_cause(BAR.error("inner"));
        let source = std::error::Error::source(&err).expect("has source");
        assert!(source.to_string().contains("inner"));
    }
}
