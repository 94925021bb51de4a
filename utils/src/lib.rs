//! Shared utilities for keykeeper.

pub mod http;
pub mod logging;

pub use http::HttpSettings;
pub use logging::{init_logging, LogFormat};
