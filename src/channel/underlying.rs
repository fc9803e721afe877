//! Collaborator traits for the underlying session channel and its builder.
//!
//! The on-demand channel never opens transports or negotiates sessions
//! itself; both concerns live behind the traits defined here.

use crate::envelope::{Command, Message, Notification, Session, SessionState};
use crate::error::ChannelResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// An established session channel over one transport connection.
///
/// Implementations own the framed connection and the negotiated session.
/// All send and receive operations refer to the four Courier envelope
/// kinds; serialization within each operation is the implementation's
/// concern.
///
/// # Concurrency
///
/// Two operations may be invoked in parallel on the same channel;
/// serialization on the wire is the implementation's responsibility.
#[async_trait]
pub trait UnderlyingChannel: Send + Sync {
    /// Send a message envelope.
    async fn send_message(&self, message: Message) -> ChannelResult<()>;

    /// Send a notification envelope.
    async fn send_notification(&self, notification: Notification) -> ChannelResult<()>;

    /// Send a command envelope.
    async fn send_command(&self, command: Command) -> ChannelResult<()>;

    /// Receive the next message envelope.
    async fn receive_message(&self, ct: &CancellationToken) -> ChannelResult<Message>;

    /// Receive the next notification envelope.
    async fn receive_notification(&self, ct: &CancellationToken) -> ChannelResult<Notification>;

    /// Receive the next command envelope.
    async fn receive_command(&self, ct: &CancellationToken) -> ChannelResult<Command>;

    /// Send the session envelope that requests graceful termination.
    async fn send_finishing_session(&self) -> ChannelResult<()>;

    /// Receive the session envelope that confirms graceful termination.
    async fn receive_finished_session(&self, ct: &CancellationToken) -> ChannelResult<Session>;

    /// Identifier assigned to the session by the remote party, if any.
    fn session_id(&self) -> Option<String>;

    /// Current session state.
    fn state(&self) -> SessionState;

    /// Whether the underlying transport currently reports itself connected.
    fn is_connected(&self) -> bool;

    /// Release transport and session resources. Idempotent.
    async fn release(&self) -> ChannelResult<()>;
}

/// Construction parameters of the inner channel builder.
///
/// The on-demand channel does not interpret these values; they are exposed
/// read-only for callers that need them (timeout tuning, diagnostics).
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Timeout applied by the built channel to individual send operations
    pub send_timeout: Duration,
    /// Capacity of the built channel's inbound envelope buffers
    pub envelope_buffer_size: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(30),
            envelope_buffer_size: 32,
        }
    }
}

/// Builds ready-to-use session channels.
///
/// A single call performs the complete establishment sequence: open the
/// transport, negotiate session options, and authenticate. The returned
/// channel is in state [`SessionState::Established`].
#[async_trait]
pub trait EstablishedChannelBuilder: Send + Sync {
    /// Open the transport, negotiate, and authenticate, returning an
    /// established channel.
    ///
    /// Each invocation is independent; a failed call leaves no state
    /// behind. Cancellation of `ct` aborts establishment and surfaces
    /// [`crate::ChannelError::Cancelled`].
    async fn build_and_establish(
        &self,
        ct: &CancellationToken,
    ) -> ChannelResult<Arc<dyn UnderlyingChannel>>;

    /// Construction parameters of the inner channel builder.
    fn config(&self) -> &BuilderConfig;
}
