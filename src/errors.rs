//! Typed error hierarchy for callboard.
//!
//! Three enums cover the three places things go wrong:
//! - `ConfigError`: missing or malformed environment configuration
//! - `StoreError`: reading, validating or rewriting the numbers file
//! - `ProviderError`: the voice-call provider rejected or never answered a request

use thiserror::Error;

/// Errors raised while building the runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Missing required environment variables: {}. Set them in your deployment environment or .env file.",
        .missing.join(" and ")
    )]
    MissingCredentials { missing: Vec<&'static str> },

    #[error("Invalid value for {name}: '{value}' ({message})")]
    InvalidValue {
        name: &'static str,
        value: String,
        message: String,
    },
}

/// Errors from the file-backed number list.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Phone number is required")]
    EmptyNumber,

    #[error("Invalid phone number '{0}': must start with + and be at least 10 characters")]
    InvalidNumber(String),

    #[error("Failed to read numbers file at {path}: {source}")]
    ReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write numbers file at {path}: {source}")]
    WriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Number store lock poisoned")]
    LockPoisoned,

    #[error("Store task panicked")]
    TaskPanicked,
}

/// Errors from the voice-call provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP {status} from provider: {message}{}", .code.map(|c| format!(" (code {})", c)).unwrap_or_default())]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("Request to provider failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
}
