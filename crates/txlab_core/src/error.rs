use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generic message for EVM transaction decode failures.
pub const EVM_DECODE_MESSAGE: &str =
    "Failed to decode transaction. Please check if the input is a valid EVM transaction.";

/// Generic message for Solana transaction decode failures.
pub const SOLANA_DECODE_MESSAGE: &str =
    "Failed to decode transaction. Please check if the input is a valid Solana transaction.";

/// Generic message for failed signer recovery.
pub const RECOVERY_FAILED_MESSAGE: &str = "Failed to recover address. Please check your inputs.";

/// Top-level toolbox error type.
///
/// Every operation in the workspace reports failures through one of these
/// variants so the presentation layer can render them uniformly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolboxError {
    /// Malformed or missing user input, detected before any decode, crypto or
    /// network work. The message names the offending field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Well-formed-looking input that failed structural parsing.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Signer recovery ran but produced no usable address.
    #[error("Recovery failure: {0}")]
    RecoveryFailure(String),

    /// Network failure, non-2xx HTTP status or timeout.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        duration_ms: Option<u64>,
    },

    /// Durable key-value store failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Classification of errors for logging and user display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Caller-correctable input problem.
    Validation,
    /// Structural parse failure of transactions or ABI data.
    Decode,
    /// Cryptographic recovery failure.
    Recovery,
    /// Network connectivity, HTTP status or timeout issue.
    Transport,
    /// Local persistence failure.
    System,
}

impl ToolboxError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn transport(msg: impl Into<String>, duration_ms: Option<u64>) -> Self {
        Self::Transport {
            message: msg.into(),
            duration_ms,
        }
    }

    /// Returns the broad error category for routing and display purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Decode(_) => ErrorCategory::Decode,
            Self::RecoveryFailure(_) => ErrorCategory::Recovery,
            Self::Transport { .. } => ErrorCategory::Transport,
            Self::Storage(_) => ErrorCategory::System,
        }
    }

    /// Elapsed time observed before a transport failure, if any.
    pub fn duration_ms(&self) -> Option<u64> {
        match self {
            Self::Transport { duration_ms, .. } => *duration_ms,
            _ => None,
        }
    }

    /// Returns a user-facing message.
    ///
    /// Decode and recovery messages are fixed strings chosen at the raise
    /// site; parser internals never reach this point. Transport messages keep
    /// the underlying status text because it helps the user retry.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Decode(msg) => msg.clone(),
            Self::RecoveryFailure(msg) => msg.clone(),
            Self::Transport {
                message,
                duration_ms: Some(ms),
            } => format!("{message} (after {ms}ms)"),
            Self::Transport { message, .. } => message.clone(),
            Self::Storage(_) => "Storage error. Check disk space and permissions.".into(),
        }
    }
}

impl From<anyhow::Error> for ToolboxError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
