//! Common error types for Vouch components.

use thiserror::Error;

/// Common errors across Vouch components
#[derive(Debug, Error)]
pub enum VouchError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Redis connection/operation error
    #[error("Redis error: {0}")]
    Redis(String),

    /// Missing or malformed local input, never reaches the network
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Code Store rejected issuance of a one-time code
    #[error("Code dispatch failed: {0}")]
    Dispatch(String),

    /// No live code exists for this address (expired or never dispatched)
    #[error("Code expired or not found")]
    CodeExpired,

    /// Supplied code does not match the dispatched one
    #[error("Incorrect code")]
    CodeMismatch,

    /// Submission Store rejected the final create
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Resend requested while the cooldown is still running
    #[error("Resend available in {0}s")]
    CooldownActive(u32),

    /// A remote call for this session is already in flight
    #[error("A request for this session is already in progress")]
    Busy,

    /// Operation not permitted in the session's current phase
    #[error("Not permitted in phase {0}")]
    PhaseMismatch(&'static str),

    /// No session with the given id
    #[error("Unknown session")]
    UnknownSession,

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VouchError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Redis(_) => 503,
            Self::Validation(_) => 400,
            Self::Dispatch(_) => 502,
            Self::CodeExpired => 410,
            Self::CodeMismatch => 422,
            Self::Submission(_) => 502,
            Self::CooldownActive(_) => 429,
            Self::Busy => 409,
            Self::PhaseMismatch(_) => 409,
            Self::UnknownSession => 404,
            Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error should be retried by resubmitting unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Redis(_) | Self::Dispatch(_) | Self::Submission(_)
        )
    }
}
