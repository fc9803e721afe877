//! Error types for channel establishment, operation dispatch, and handler
//! notification.
//!
//! All variants are cheaply cloneable so that a single failure can be handed
//! to every registered failure handler and still be propagated to the caller
//! unchanged.

use thiserror::Error;

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors produced by the on-demand channel and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ChannelError {
    /// Operation attempted after the channel was disposed.
    #[error("channel has been disposed")]
    Disposed,

    /// A caller-supplied cancellation token fired.
    #[error("operation was cancelled")]
    Cancelled,

    /// The channel builder failed before a session was established.
    #[error("channel establishment failed: {0}")]
    Build(String),

    /// An operation on the established channel failed.
    #[error("channel operation failed: {0}")]
    Operation(String),

    /// One or more notification handlers failed.
    #[error("{0}")]
    Handler(AggregateError),

    /// A command arrived that does not correlate with the pending request
    /// and no unrelated-command callback was supplied.
    #[error("received command {received_id:?} while awaiting the response to {expected_id:?}")]
    UnrelatedCommand {
        /// Identifier of the pending request
        expected_id: String,
        /// Identifier of the stray command
        received_id: String,
    },

    /// A request envelope was rejected before reaching the channel.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ChannelError {
    /// Collapse a batch of handler errors into a single error.
    ///
    /// Returns `None` for an empty batch. A single error is returned
    /// unchanged; multiple errors are wrapped in [`ChannelError::Handler`]
    /// with every inner error preserved.
    pub fn aggregate(mut errors: Vec<Self>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Handler(AggregateError::new(errors))),
        }
    }
}

/// Collection of errors raised by independently invoked handlers.
///
/// Handlers run to completion even when an earlier one fails, so a single
/// notification can produce several errors. All of them are preserved here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError {
    errors: Vec<ChannelError>,
}

impl AggregateError {
    /// Wrap a non-empty batch of handler errors.
    pub fn new(errors: Vec<ChannelError>) -> Self {
        debug_assert!(!errors.is_empty(), "aggregate of zero errors");
        Self { errors }
    }

    /// The inner errors, in handler registration order.
    pub fn errors(&self) -> &[ChannelError] {
        &self.errors
    }

    /// Consume the aggregate, yielding the inner errors.
    pub fn into_errors(self) -> Vec<ChannelError> {
        self.errors
    }
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} handler errors:", self.errors.len())?;
        for error in &self.errors {
            write!(f, " [{error}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}
