// src/error.rs

//! Unified error handling for the portal client.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, UnipaError>;

/// Unified client error type.
///
/// The portal protocol distinguishes four failure families: transport
/// failures (the server did not answer with 200), login rejections (the
/// server answered 200 but embedded an error message), structure failures
/// (markup the client depends on is missing), and plain misuse (calling a
/// feature before logging in). None of them are recovered internally.
#[derive(Error, Debug)]
pub enum UnipaError {
    /// HTTP request failed below the protocol level
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-200 status
    #[error("Unexpected status {status} from {url}")]
    Transport { url: String, status: u16 },

    /// Login was rejected; carries the server-provided message text
    #[error("Login rejected: {0}")]
    LoginRejected(String),

    /// An expected form/table/panel/button was absent from the markup
    #[error("Portal structure error: {0}")]
    Structure(String),

    /// A feature call was made before a successful login
    #[error("Not logged in")]
    NotLoggedIn,

    /// Operation is not implemented against the portal
    #[error("Not implemented: {0}")]
    Unimplemented(&'static str),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl UnipaError {
    /// Create a transport error from an observed status code.
    pub fn transport(url: impl Into<String>, status: reqwest::StatusCode) -> Self {
        Self::Transport {
            url: url.into(),
            status: status.as_u16(),
        }
    }

    /// Create a structure error naming the missing markup.
    pub fn structure(message: impl Into<String>) -> Self {
        Self::Structure(message.into())
    }

    /// Create a login-rejection error carrying the server message.
    pub fn login_rejected(message: impl Into<String>) -> Self {
        Self::LoginRejected(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
