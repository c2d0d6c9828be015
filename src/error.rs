//! Error types for the job-invite agent.

use crate::state::Cursor;

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),
}

/// Configuration-related errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Cursor persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Corrupt state file {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error on state file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Mailbox (IMAP) errors.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Failed to connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    #[error("Login rejected for {address}")]
    AuthFailed { address: String },

    #[error("Could not select mailbox {mailbox}")]
    SelectFailed { mailbox: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Failed to fetch message UID {uid}: {reason}")]
    Fetch { uid: u32, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),
}

/// Remote (AI) classifier errors. Absorbed by the rule-based fallback,
/// never surfaced past the classifier.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Classifier request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Classifier returned status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Malformed classifier response: {0}")]
    MalformedResponse(String),
}

/// Outbound notification errors. Logged and absorbed by the poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Outcome of a failed poll cycle.
///
/// `Connect` means no progress was made and the cursor must not be
/// persisted. `Aborted` carries the cursor as far as the cycle got, which
/// the driver persists so already-processed messages are not re-notified.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Mailbox connection failed: {0}")]
    Connect(#[source] MailboxError),

    #[error("Cycle aborted at UID {}: {source}", .cursor.last_uid)]
    Aborted {
        cursor: Cursor,
        #[source]
        source: MailboxError,
    },
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
