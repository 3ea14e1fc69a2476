//! Execution errors.

use clmm_keeper_data::DataError;
use clmm_keeper_domain::DomainError;
use clmm_keeper_protocols::ProtocolError;
use thiserror::Error;

/// Failure of one decision cycle.
///
/// None of these are fatal: the scheduler logs them and the next cycle
/// re-reads external state.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Data(#[from] DataError),

    /// A collaborator answered with something the controller cannot act on.
    #[error("unexpected state during {step}: {reason}")]
    UnexpectedState { step: &'static str, reason: String },
}

impl ExecutionError {
    /// Whether repeating the failed step unchanged may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ExecutionError::Protocol(e) => e.is_transient(),
            ExecutionError::Data(e) => e.is_transient(),
            ExecutionError::Domain(_) | ExecutionError::UnexpectedState { .. } => false,
        }
    }
}

/// Result alias for execution operations.
pub type Result<T> = std::result::Result<T, ExecutionError>;
