//! Error types for profile transfers.

/// Result type alias for profile transfer operations.
pub type Result<T> = std::result::Result<T, TransferError>;

/// Errors reported by a [`TransferClient`](crate::TransferClient).
///
/// None of these is retried. The worker hands them back to the orchestrator
/// inside the completed task.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The service has no profile for this pass.
    #[error("No profile for pass {pass}")]
    NotFound { pass: String },

    /// The service could not be reached.
    #[error("Connection failed: {message}")]
    Connection { message: String },

    /// The service answered with an error status.
    #[error("Service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Worker thread could not be started.
    #[error(transparent)]
    Core(#[from] netpass_core::Error),
}

impl TransferError {
    pub fn not_found(pass: impl Into<String>) -> Self {
        Self::NotFound { pass: pass.into() }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }
}
