//! Errors in the library.
use thiserror::Error;

/// Errors raised by the agent fleet.
///
/// Session-scoped conditions ([`LisError::PoolExhausted`], [`LisError::UnknownSession`])
/// are recoverable for the service and reported as no-op results by the boundary layer.
/// [`LisError::CapacityExceeded`] is a contract violation and is never silently dropped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LisError {
    /// No agent is left in the pool for a new session.
    #[error("Agent pool exhausted, session {0} cannot be bound")]
    PoolExhausted(String),

    /// The session has never been bound to an agent.
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// A transition was appended to a full rollout buffer.
    #[error("Rollout buffer capacity exceeded (capacity = {capacity})")]
    CapacityExceeded {
        /// Capacity of the buffer.
        capacity: usize,
    },

    /// NaN or infinity found in loss or gradients.
    #[error("Numeric instability: {0}")]
    NumericInstability(String),

    /// Action probabilities are not a valid categorical distribution.
    #[error("Invalid action distribution: {0}")]
    InvalidDistribution(String),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),
}
