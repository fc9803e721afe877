//! On-demand client channel with transparent failure recovery.
//!
//! [`OnDemandChannel`] is a façade over a lazily established session
//! channel. Every operation routes through one generic loop: acquire the
//! current channel (building it on first demand), run the operation, and on
//! failure discard the channel, consult the operation-failure handlers, and
//! either rebuild or surface the error.

use crate::channel::handlers::HandlerRegistry;
use crate::channel::holder::ChannelHolder;
use crate::channel::info::{ChannelInformation, FailedChannelInformation};
use crate::channel::underlying::{BuilderConfig, EstablishedChannelBuilder, UnderlyingChannel};
use crate::envelope::{Command, Message, Notification, SessionState};
use crate::error::{ChannelError, ChannelResult};
use crate::metrics::ChannelMetrics;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

type UnrelatedCommandHandler =
    Arc<dyn Fn(Command) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Self-healing client channel for the Courier protocol.
///
/// The channel is established lazily on the first operation and rebuilt
/// from scratch whenever an operation fails and the registered
/// operation-failure handlers vote to rebuild. Concurrent callers share a
/// single in-flight build. The façade is safe to share across tasks.
///
/// # Lifecycle observers
///
/// Four ordered handler lists observe the channel lifecycle:
///
/// - [`on_created`](Self::on_created) and
///   [`on_discarded`](Self::on_discarded) are informational; their errors
///   aggregate and surface to the caller of the triggering operation.
/// - [`on_creation_failed`](Self::on_creation_failed) and
///   [`on_operation_failed`](Self::on_operation_failed) return a boolean
///   verdict. Rebuilding continues only while every handler votes `true`;
///   with no handlers registered the channel rebuilds until the caller's
///   cancellation token fires.
pub struct OnDemandChannel {
    builder: Arc<dyn EstablishedChannelBuilder>,
    holder: ChannelHolder,
    handlers: Arc<HandlerRegistry>,
    metrics: Arc<ChannelMetrics>,
    unrelated_command_handler: RwLock<Option<UnrelatedCommandHandler>>,
    disposed: AtomicBool,
}

impl OnDemandChannel {
    /// Create a channel façade over the given builder.
    ///
    /// No transport activity happens here; the first operation triggers the
    /// first build.
    pub fn new(builder: Arc<dyn EstablishedChannelBuilder>) -> Self {
        let handlers = Arc::new(HandlerRegistry::new());
        let metrics = Arc::new(ChannelMetrics::new());
        Self {
            holder: ChannelHolder::new(
                Arc::clone(&builder),
                Arc::clone(&handlers),
                Arc::clone(&metrics),
            ),
            builder,
            handlers,
            metrics,
            unrelated_command_handler: RwLock::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    /// Whether a usable channel is currently held.
    ///
    /// Advisory only: the channel may fail between this check and the next
    /// operation.
    pub fn is_established(&self) -> bool {
        self.holder.has_usable_channel()
    }

    /// Construction parameters of the inner channel builder. Not
    /// interpreted by the façade.
    pub fn builder_config(&self) -> &BuilderConfig {
        self.builder.config()
    }

    /// Channel lifecycle metrics.
    pub fn metrics(&self) -> Arc<ChannelMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Register a handler invoked after each successful channel build.
    pub fn on_created<F, Fut>(&self, handler: F)
    where
        F: Fn(ChannelInformation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChannelResult<()>> + Send + 'static,
    {
        self.handlers.add_created(handler);
    }

    /// Register a handler invoked after each failure-driven channel
    /// discard.
    pub fn on_discarded<F, Fut>(&self, handler: F)
    where
        F: Fn(ChannelInformation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChannelResult<()>> + Send + 'static,
    {
        self.handlers.add_discarded(handler);
    }

    /// Register a veto handler consulted when a build fails.
    pub fn on_creation_failed<F, Fut>(&self, handler: F)
    where
        F: Fn(FailedChannelInformation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChannelResult<bool>> + Send + 'static,
    {
        self.handlers.add_creation_failed(handler);
    }

    /// Register a veto handler consulted when a channel operation fails.
    pub fn on_operation_failed<F, Fut>(&self, handler: F)
    where
        F: Fn(FailedChannelInformation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChannelResult<bool>> + Send + 'static,
    {
        self.handlers.add_operation_failed(handler);
    }

    /// Set the callback that receives commands not correlated with the
    /// pending [`process_command`](Self::process_command) request.
    ///
    /// Without a callback, a stray command fails the exchange with
    /// [`ChannelError::UnrelatedCommand`].
    pub fn set_unrelated_command_handler<F, Fut>(&self, handler: F)
    where
        F: Fn(Command) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: UnrelatedCommandHandler = Arc::new(move |command| Box::pin(handler(command)));
        *self
            .unrelated_command_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    /// Send a message envelope, building or rebuilding the channel as
    /// needed.
    pub async fn send_message(&self, message: Message) -> ChannelResult<()> {
        let ct = CancellationToken::new();
        self.run_operation("send_message", &ct, None, move |channel| {
            let message = message.clone();
            Box::pin(async move { channel.send_message(message).await })
        })
        .await
    }

    /// Send a notification envelope.
    pub async fn send_notification(&self, notification: Notification) -> ChannelResult<()> {
        let ct = CancellationToken::new();
        self.run_operation("send_notification", &ct, None, move |channel| {
            let notification = notification.clone();
            Box::pin(async move { channel.send_notification(notification).await })
        })
        .await
    }

    /// Send a command envelope without awaiting a response.
    pub async fn send_command(&self, command: Command) -> ChannelResult<()> {
        let ct = CancellationToken::new();
        self.run_operation("send_command", &ct, None, move |channel| {
            let command = command.clone();
            Box::pin(async move { channel.send_command(command).await })
        })
        .await
    }

    /// Receive the next message envelope.
    pub async fn receive_message(&self, ct: &CancellationToken) -> ChannelResult<Message> {
        let op_ct = ct.clone();
        self.run_operation("receive_message", ct, None, move |channel| {
            let ct = op_ct.clone();
            Box::pin(async move { channel.receive_message(&ct).await })
        })
        .await
    }

    /// Receive the next notification envelope.
    pub async fn receive_notification(
        &self,
        ct: &CancellationToken,
    ) -> ChannelResult<Notification> {
        let op_ct = ct.clone();
        self.run_operation("receive_notification", ct, None, move |channel| {
            let ct = op_ct.clone();
            Box::pin(async move { channel.receive_notification(&ct).await })
        })
        .await
    }

    /// Receive the next command envelope.
    pub async fn receive_command(&self, ct: &CancellationToken) -> ChannelResult<Command> {
        let op_ct = ct.clone();
        self.run_operation("receive_command", ct, None, move |channel| {
            let ct = op_ct.clone();
            Box::pin(async move { channel.receive_command(&ct).await })
        })
        .await
    }

    /// Send a command request and await the response bearing the same id.
    ///
    /// Commands arriving with a different id are handed to the
    /// unrelated-command callback when one is set, otherwise the exchange
    /// fails with [`ChannelError::UnrelatedCommand`].
    ///
    /// A failure before the request reaches the wire is retried like any
    /// other operation. Once the send has succeeded the request is never
    /// re-sent: a later failure still discards the channel and notifies the
    /// operation-failure handlers, but the error surfaces to the caller,
    /// which owns the decision to re-issue.
    pub async fn process_command(
        &self,
        request: Command,
        ct: &CancellationToken,
    ) -> ChannelResult<Command> {
        self.ensure_not_disposed()?;
        if request.id.is_empty() {
            return Err(ChannelError::InvalidRequest(
                "command id must not be empty".to_owned(),
            ));
        }

        let sent = Arc::new(AtomicBool::new(false));
        let request = Arc::new(request);
        let unrelated = self
            .unrelated_command_handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let op_ct = ct.clone();
        let op_sent = Arc::clone(&sent);

        self.run_operation("process_command", ct, Some(sent), move |channel| {
            let request = Arc::clone(&request);
            let sent = Arc::clone(&op_sent);
            let unrelated = unrelated.clone();
            let ct = op_ct.clone();
            Box::pin(async move {
                channel.send_command((*request).clone()).await?;
                sent.store(true, Ordering::SeqCst);
                loop {
                    let received = channel.receive_command(&ct).await?;
                    if received.id == request.id {
                        return Ok(received);
                    }
                    match unrelated {
                        Some(ref handler) => handler(received).await,
                        None => {
                            return Err(ChannelError::UnrelatedCommand {
                                expected_id: request.id.clone(),
                                received_id: received.id,
                            });
                        }
                    }
                }
            })
        })
        .await
    }

    /// Terminate the session gracefully.
    ///
    /// When the current channel is established, the finishing session
    /// envelope is sent and the finished confirmation awaited; the channel
    /// is released unconditionally afterwards. A channel in any other
    /// state is released without the handshake. Graceful termination is
    /// not a failure-driven discard, so discarded handlers do not fire.
    pub async fn finish(&self, ct: &CancellationToken) -> ChannelResult<()> {
        self.ensure_not_disposed()?;

        let Some(channel) = self.holder.take_current() else {
            return Ok(());
        };

        let handshake = if channel.state() == SessionState::Established {
            Self::finish_handshake(channel.as_ref(), ct).await
        } else {
            debug!(state = %channel.state(), "skipping finish handshake");
            Ok(())
        };

        if let Err(error) = channel.release().await {
            debug!(error = %error, "channel release failed during finish");
        }
        handshake
    }

    async fn finish_handshake(
        channel: &dyn UnderlyingChannel,
        ct: &CancellationToken,
    ) -> ChannelResult<()> {
        channel.send_finishing_session().await?;
        let finished = channel.receive_finished_session(ct).await?;
        if finished.state != SessionState::Finished {
            return Err(ChannelError::Operation(format!(
                "expected finished session, received state {}",
                finished.state
            )));
        }
        Ok(())
    }

    /// Dispose the façade, releasing the current channel if one exists.
    ///
    /// Idempotent. Every operation after disposal fails with
    /// [`ChannelError::Disposed`] before touching the holder or any
    /// handler. In-flight operations are not interrupted; they observe
    /// disposal on their next retry iteration.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(channel) = self.holder.take_current() {
            if let Err(error) = channel.release().await {
                debug!(error = %error, "channel release failed during dispose");
            }
        }
        debug!("channel facade disposed");
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn ensure_not_disposed(&self) -> ChannelResult<()> {
        if self.is_disposed() {
            return Err(ChannelError::Disposed);
        }
        Ok(())
    }

    /// The generic acquire/attempt/recover loop behind every operation.
    ///
    /// Terminates on success, cancellation, disposal, or a veto from the
    /// failure handlers. Cancellation never discards the channel and never
    /// reaches the failure handlers. When `point_of_no_return` is set and
    /// has flipped, the failure path still discards and notifies but the
    /// loop does not retry.
    async fn run_operation<T, F>(
        &self,
        operation_name: &'static str,
        ct: &CancellationToken,
        point_of_no_return: Option<Arc<AtomicBool>>,
        op: F,
    ) -> ChannelResult<T>
    where
        F: Fn(Arc<dyn UnderlyingChannel>) -> Pin<Box<dyn Future<Output = ChannelResult<T>> + Send>>,
    {
        loop {
            self.ensure_not_disposed()?;
            if ct.is_cancelled() {
                return Err(ChannelError::Cancelled);
            }

            let channel = self.holder.get_channel(ct).await?;

            match op(Arc::clone(&channel)).await {
                Ok(value) => return Ok(value),
                Err(ChannelError::Cancelled) => return Err(ChannelError::Cancelled),
                Err(error) => {
                    self.metrics.record_operation_failure();
                    warn!(
                        operation = operation_name,
                        error = %error,
                        "channel operation failed"
                    );
                    let failure = FailedChannelInformation::from_channel(
                        channel.as_ref(),
                        error.clone(),
                        operation_name,
                    );
                    self.holder.discard().await?;
                    let rebuild = self.handlers.notify_operation_failed(failure).await?;
                    let committed = point_of_no_return
                        .as_ref()
                        .is_some_and(|flag| flag.load(Ordering::SeqCst));
                    if !rebuild || committed {
                        return Err(error);
                    }
                    debug!(operation = operation_name, "rebuilding channel and retrying");
                }
            }
        }
    }
}
