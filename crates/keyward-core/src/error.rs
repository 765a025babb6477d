//! Error types for Keyward

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    // Directory Errors
    #[error("Directory connection failed: {0}")]
    ConnectionFailed(ConnectionFailure),

    #[error("Directory bind rejected (code {rc}): {message}")]
    BindFailed { rc: u32, message: String },

    #[error("Directory certificate verification failed: {0}")]
    CertVerificationFailed(String),

    #[error("Directory search for '{username}' matched {matches} entries")]
    SearchAmbiguous { username: String, matches: usize },

    // Authentication Errors
    #[error("Authentication failed")]
    AuthFailed,

    #[error("User not found: {0}")]
    NotFound(String),

    // Store Errors
    #[error("Identity store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Identity already exists: {0}")]
    Conflict(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Why a directory connection could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionFailure {
    /// Bind and search did not finish within the configured deadline
    Timeout { seconds: u64 },
    /// Network or transport level failure
    Unreachable(String),
    /// The service account was rejected by the directory
    ServiceBind(String),
    /// The directory answered with an unexpected result code
    Protocol(String),
}

impl fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionFailure::Timeout { seconds } => write!(f, "timed out after {}s", seconds),
            ConnectionFailure::Unreachable(msg) => write!(f, "unreachable: {}", msg),
            ConnectionFailure::ServiceBind(msg) => write!(f, "service account bind failed: {}", msg),
            ConnectionFailure::Protocol(msg) => write!(f, "protocol error: {}", msg),
        }
    }
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::ConfigInvalid(_) => "ConfigInvalid",
            Error::ConnectionFailed(_) => "ConnectionFailed",
            Error::BindFailed { .. } => "BindFailed",
            Error::CertVerificationFailed(_) => "CertVerificationFailed",
            Error::SearchAmbiguous { .. } => "SearchAmbiguous",
            Error::AuthFailed => "AuthFailed",
            Error::NotFound(_) => "NotFound",
            Error::StoreUnavailable(_) => "StoreUnavailable",
            Error::Conflict(_) => "Conflict",
            Error::Io(_) => "StoreUnavailable",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::ConnectionFailed(ConnectionFailure::Timeout { .. })
        )
    }

    pub fn timeout(seconds: u64) -> Self {
        Error::ConnectionFailed(ConnectionFailure::Timeout { seconds })
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Error::ConnectionFailed(ConnectionFailure::Unreachable(message.into()))
    }
}
