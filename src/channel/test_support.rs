//! Scripted channel and builder fixtures shared by the unit tests.

use crate::channel::underlying::{BuilderConfig, EstablishedChannelBuilder, UnderlyingChannel};
use crate::envelope::{Command, Message, Notification, Session, SessionState};
use crate::error::{ChannelError, ChannelResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory channel with scripted failures and recorded traffic.
pub(crate) struct TestChannel {
    session_id: String,
    state: Mutex<SessionState>,
    connected: AtomicBool,
    release_count: AtomicU64,
    send_failures: Mutex<VecDeque<ChannelError>>,
    pub(crate) sent_messages: Mutex<Vec<Message>>,
    pub(crate) sent_commands: Mutex<Vec<Command>>,
    inbound_commands: Mutex<VecDeque<Command>>,
    receive_failures: Mutex<VecDeque<ChannelError>>,
    finishing_sent: AtomicU64,
    finished_received: AtomicU64,
    finished_reply: Mutex<Option<Session>>,
}

impl TestChannel {
    pub(crate) fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            state: Mutex::new(SessionState::Established),
            connected: AtomicBool::new(true),
            release_count: AtomicU64::new(0),
            send_failures: Mutex::new(VecDeque::new()),
            sent_messages: Mutex::new(Vec::new()),
            sent_commands: Mutex::new(Vec::new()),
            inbound_commands: Mutex::new(VecDeque::new()),
            receive_failures: Mutex::new(VecDeque::new()),
            finishing_sent: AtomicU64::new(0),
            finished_received: AtomicU64::new(0),
            finished_reply: Mutex::new(None),
        }
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        *lock(&self.state) = state;
    }

    /// Queue a failure consumed by the next send operation.
    pub(crate) fn push_send_failure(&self, error: ChannelError) {
        lock(&self.send_failures).push_back(error);
    }

    /// Queue a failure consumed by the next receive operation.
    pub(crate) fn push_receive_failure(&self, error: ChannelError) {
        lock(&self.receive_failures).push_back(error);
    }

    /// Queue a command returned by the next `receive_command`.
    pub(crate) fn push_inbound_command(&self, command: Command) {
        lock(&self.inbound_commands).push_back(command);
    }

    pub(crate) fn set_finished_reply(&self, session: Session) {
        *lock(&self.finished_reply) = Some(session);
    }

    pub(crate) fn release_count(&self) -> u64 {
        self.release_count.load(Ordering::SeqCst)
    }

    pub(crate) fn finishing_sent_count(&self) -> u64 {
        self.finishing_sent.load(Ordering::SeqCst)
    }

    pub(crate) fn finished_received_count(&self) -> u64 {
        self.finished_received.load(Ordering::SeqCst)
    }

    fn next_send_outcome(&self) -> ChannelResult<()> {
        match lock(&self.send_failures).pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl UnderlyingChannel for TestChannel {
    async fn send_message(&self, message: Message) -> ChannelResult<()> {
        self.next_send_outcome()?;
        lock(&self.sent_messages).push(message);
        Ok(())
    }

    async fn send_notification(&self, _notification: Notification) -> ChannelResult<()> {
        self.next_send_outcome()
    }

    async fn send_command(&self, command: Command) -> ChannelResult<()> {
        self.next_send_outcome()?;
        lock(&self.sent_commands).push(command);
        Ok(())
    }

    async fn receive_message(&self, ct: &CancellationToken) -> ChannelResult<Message> {
        if let Some(error) = lock(&self.receive_failures).pop_front() {
            return Err(error);
        }
        ct.cancelled().await;
        Err(ChannelError::Cancelled)
    }

    async fn receive_notification(&self, ct: &CancellationToken) -> ChannelResult<Notification> {
        if let Some(error) = lock(&self.receive_failures).pop_front() {
            return Err(error);
        }
        ct.cancelled().await;
        Err(ChannelError::Cancelled)
    }

    async fn receive_command(&self, ct: &CancellationToken) -> ChannelResult<Command> {
        if let Some(error) = lock(&self.receive_failures).pop_front() {
            return Err(error);
        }
        if let Some(command) = lock(&self.inbound_commands).pop_front() {
            return Ok(command);
        }
        ct.cancelled().await;
        Err(ChannelError::Cancelled)
    }

    async fn send_finishing_session(&self) -> ChannelResult<()> {
        self.next_send_outcome()?;
        self.finishing_sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn receive_finished_session(&self, _ct: &CancellationToken) -> ChannelResult<Session> {
        self.finished_received.fetch_add(1, Ordering::SeqCst);
        match lock(&self.finished_reply).take() {
            Some(session) => Ok(session),
            None => Ok(Session::with_state(SessionState::Finished)),
        }
    }

    fn session_id(&self) -> Option<String> {
        Some(self.session_id.clone())
    }

    fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn release(&self) -> ChannelResult<()> {
        self.release_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Builder whose outcomes are scripted up front.
///
/// Queued failures are consumed first; once the queue is empty every call
/// succeeds with a fresh [`TestChannel`] (session ids `session-1`,
/// `session-2`, ...). Built channels are retained for inspection.
pub(crate) struct ScriptedBuilder {
    failures: Mutex<VecDeque<ChannelError>>,
    built: Mutex<Vec<Arc<TestChannel>>>,
    calls: AtomicU64,
    build_delay: Mutex<Option<Duration>>,
    config: BuilderConfig,
}

impl ScriptedBuilder {
    pub(crate) fn new() -> Self {
        Self {
            failures: Mutex::new(VecDeque::new()),
            built: Mutex::new(Vec::new()),
            calls: AtomicU64::new(0),
            build_delay: Mutex::new(None),
            config: BuilderConfig::default(),
        }
    }

    pub(crate) fn push_failure(&self, error: ChannelError) {
        lock(&self.failures).push_back(error);
    }

    pub(crate) fn set_build_delay(&self, delay: Duration) {
        *lock(&self.build_delay) = Some(delay);
    }

    pub(crate) fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The `index`-th channel this builder produced.
    pub(crate) fn built(&self, index: usize) -> Arc<TestChannel> {
        Arc::clone(&lock(&self.built)[index])
    }
}

#[async_trait]
impl EstablishedChannelBuilder for ScriptedBuilder {
    async fn build_and_establish(
        &self,
        _ct: &CancellationToken,
    ) -> ChannelResult<Arc<dyn UnderlyingChannel>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = *lock(&self.build_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }
        let channel = Arc::new(TestChannel::new(format!("session-{call}")));
        lock(&self.built).push(Arc::clone(&channel));
        Ok(channel)
    }

    fn config(&self) -> &BuilderConfig {
        &self.config
    }
}
