//! Error types for the Aircall client-core library
//!
//! Every failure that crosses a module boundary is expressed as a
//! [`ClientError`]. Errors raised by the vendor SDK during initialization are
//! additionally classified into one of three buckets ([`InitFailureKind`])
//! because each bucket requires a different user remedy: a network block is
//! fixed by disabling an ad-blocker, an authentication failure by logging in
//! again. Conflating the two would send users down the wrong remediation
//! path, so the classification is load-bearing, not cosmetic.
//!
//! # Examples
//!
//! ```rust
//! use aircall_client_core::error::{ClientError, InitFailureKind};
//!
//! let err = ClientError::SdkError {
//!     reason: "net::ERR_BLOCKED_BY_CLIENT".to_string(),
//! };
//! assert_eq!(InitFailureKind::classify(&err.to_string()), InitFailureKind::Blocked);
//!
//! let err = ClientError::SdkError {
//!     reason: "401 Unauthorized".to_string(),
//! };
//! assert_eq!(InitFailureKind::classify(&err.to_string()), InitFailureKind::AuthRequired);
//! ```

use thiserror::Error;

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors produced by the call integration controller
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The browser environment cannot support the embedded workspace
    #[error("Environment unsupported: {reason}")]
    EnvironmentUnsupported {
        /// Why the environment was rejected
        reason: String,
    },

    /// SDK initialization was blocked by the network environment
    #[error("Initialization blocked: {reason}")]
    InitializationBlocked {
        /// The underlying SDK failure message
        reason: String,
    },

    /// The SDK requires the user to authenticate
    #[error("Authentication required: {reason}")]
    AuthenticationRequired {
        /// The underlying SDK failure message
        reason: String,
    },

    /// The SDK reported that workspace creation failed
    #[error("Workspace creation failed: {reason}")]
    WorkspaceCreationFailed {
        /// The underlying SDK failure message
        reason: String,
    },

    /// A vendor SDK call failed
    #[error("SDK error: {reason}")]
    SdkError {
        /// The underlying SDK failure message
        reason: String,
    },

    /// Automatic reconnection gave up after the configured attempt budget
    #[error("Reconnection exhausted after {attempts} attempts")]
    ReconnectExhausted {
        /// How many attempts were made before giving up
        attempts: u32,
    },

    /// A call-control action was requested with no call in progress
    #[error("No active call")]
    NoActiveCall,

    /// A configuration field failed validation
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration {
        /// The offending field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// An awaited operation exceeded its deadline
    #[error("Operation timed out after {duration_ms}ms")]
    OperationTimeout {
        /// The deadline that was exceeded, in milliseconds
        duration_ms: u64,
    },

    /// Internal error
    #[error("Internal error: {message}")]
    InternalError {
        /// Description of the internal failure
        message: String,
    },
}

impl ClientError {
    /// Whether the error may clear up on its own and is worth retrying
    ///
    /// Blocking and configuration errors require the user to change
    /// something; retrying them silently only hides the real problem.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ClientError::SdkError { .. }
                | ClientError::OperationTimeout { .. }
                | ClientError::AuthenticationRequired { .. }
        )
    }

    /// Coarse category tag for structured logging
    pub fn category(&self) -> &'static str {
        match self {
            ClientError::EnvironmentUnsupported { .. } => "environment",
            ClientError::InitializationBlocked { .. } => "blocked",
            ClientError::AuthenticationRequired { .. } => "auth",
            ClientError::WorkspaceCreationFailed { .. } => "workspace",
            ClientError::SdkError { .. } => "sdk",
            ClientError::ReconnectExhausted { .. } => "reconnect",
            ClientError::NoActiveCall => "call",
            ClientError::InvalidConfiguration { .. } => "configuration",
            ClientError::OperationTimeout { .. } => "timeout",
            ClientError::InternalError { .. } => "internal",
        }
    }
}

/// Classification of an initialization failure message
///
/// The three buckets drive three different UI surfaces:
///
/// - [`Blocked`](InitFailureKind::Blocked) - the blocked-state surface with
///   remediation steps (disable blocker, supported browser, private window);
///   no silent retry is allowed.
/// - [`AuthRequired`](InitFailureKind::AuthRequired) - the login surface.
/// - [`Unknown`](InitFailureKind::Unknown) - the error is surfaced but a
///   login attempt is still offered. Misclassifying a recoverable issue as
///   fatal is the worse failure mode, so unknown errors degrade
///   optimistically rather than failing closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitFailureKind {
    /// Network block (ad-blocker, cookie policy, timeout)
    Blocked,
    /// The SDK wants credentials, not a different environment
    AuthRequired,
    /// Anything else
    Unknown,
}

impl InitFailureKind {
    /// Classify a raw failure message into a taxonomy bucket
    ///
    /// Matching is case-insensitive substring matching on the patterns the
    /// vendor SDK is known to emit. Network-block patterns are checked
    /// first, mirroring the order the conditions are listed in the product
    /// taxonomy.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let blocked = ["err_blocked_by_client", "timed out", "timeout", "net::"];
        if blocked.iter().any(|p| lower.contains(p)) {
            return InitFailureKind::Blocked;
        }
        let auth = ["401", "unauthorized", "authentication"];
        if auth.iter().any(|p| lower.contains(p)) {
            return InitFailureKind::AuthRequired;
        }
        InitFailureKind::Unknown
    }
}
