//! Snapshot value objects handed to channel lifecycle observers.

use crate::channel::underlying::UnderlyingChannel;
use crate::envelope::SessionState;
use crate::error::ChannelError;

/// Immutable snapshot of a channel's identity, taken at creation or
/// discard time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInformation {
    /// Session identifier assigned by the remote party, if any
    pub session_id: Option<String>,
    /// Session state at snapshot time
    pub state: SessionState,
}

impl ChannelInformation {
    pub(crate) fn snapshot(channel: &dyn UnderlyingChannel) -> Self {
        Self {
            session_id: channel.session_id(),
            state: channel.state(),
        }
    }
}

/// Snapshot describing a failed build or operation, handed to veto
/// handlers.
///
/// `session_id` and `state` are absent when the failure occurred before a
/// channel existed. `is_connected` is `true` only when a channel exists,
/// its transport reports connected, and its session state is
/// [`SessionState::Established`].
#[derive(Debug, Clone)]
pub struct FailedChannelInformation {
    /// Session identifier of the failed channel, if one was assigned
    pub session_id: Option<String>,
    /// Session state of the failed channel, if a channel existed
    pub state: Option<SessionState>,
    /// Whether the channel was connected and established at failure time
    pub is_connected: bool,
    /// The error that triggered the notification
    pub error: ChannelError,
    /// Name of the operation that failed
    pub operation_name: &'static str,
}

impl FailedChannelInformation {
    pub(crate) fn from_channel(
        channel: &dyn UnderlyingChannel,
        error: ChannelError,
        operation_name: &'static str,
    ) -> Self {
        let state = channel.state();
        Self {
            session_id: channel.session_id(),
            state: Some(state),
            is_connected: channel.is_connected() && state == SessionState::Established,
            error,
            operation_name,
        }
    }

    pub(crate) fn build_failure(error: ChannelError) -> Self {
        Self {
            session_id: None,
            state: None,
            is_connected: false,
            error,
            operation_name: "build_and_establish",
        }
    }
}
