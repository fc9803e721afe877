//! Guardianship of the single current channel and its single-flight
//! acquisition.
//!
//! At most one builder invocation is in flight at any instant; concurrent
//! demands either reuse the current channel or serialize behind the build
//! mutex and pick up the winner's result on the double-check. The build
//! mutex is held across nothing but the builder call itself; releases and
//! handler notifications happen outside it.

use crate::channel::handlers::HandlerRegistry;
use crate::channel::info::{ChannelInformation, FailedChannelInformation};
use crate::channel::underlying::{EstablishedChannelBuilder, UnderlyingChannel};
use crate::envelope::SessionState;
use crate::error::{ChannelError, ChannelResult};
use crate::metrics::ChannelMetrics;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub(crate) struct ChannelHolder {
    builder: Arc<dyn EstablishedChannelBuilder>,
    /// The single current channel. Guard is never held across an await.
    current: Mutex<Option<Arc<dyn UnderlyingChannel>>>,
    /// Serializes builder invocations.
    build_lock: tokio::sync::Mutex<()>,
    handlers: Arc<HandlerRegistry>,
    metrics: Arc<ChannelMetrics>,
}

impl ChannelHolder {
    pub(crate) fn new(
        builder: Arc<dyn EstablishedChannelBuilder>,
        handlers: Arc<HandlerRegistry>,
        metrics: Arc<ChannelMetrics>,
    ) -> Self {
        Self {
            builder,
            current: Mutex::new(None),
            build_lock: tokio::sync::Mutex::new(()),
            handlers,
            metrics,
        }
    }

    fn usable(channel: &Arc<dyn UnderlyingChannel>) -> bool {
        channel.state() == SessionState::Established && channel.is_connected()
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<Arc<dyn UnderlyingChannel>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot_current(&self) -> Option<Arc<dyn UnderlyingChannel>> {
        self.lock_current().clone()
    }

    /// Whether a usable channel is currently held.
    pub(crate) fn has_usable_channel(&self) -> bool {
        self.snapshot_current().is_some_and(|ch| Self::usable(&ch))
    }

    /// Produce the current channel, building one if necessary.
    ///
    /// On builder success the channel is stored, the build mutex released,
    /// created handlers notified, and only then is the channel returned.
    /// On builder failure the creation-failure verdict decides between
    /// another build round and surfacing the error. Cancellation propagates
    /// without any handler involvement.
    pub(crate) async fn get_channel(
        &self,
        ct: &CancellationToken,
    ) -> ChannelResult<Arc<dyn UnderlyingChannel>> {
        loop {
            if ct.is_cancelled() {
                return Err(ChannelError::Cancelled);
            }

            match self.snapshot_current() {
                Some(channel) if Self::usable(&channel) => return Ok(channel),
                Some(stale) => {
                    // Unusable channel found outside the lock: discard it
                    // (firing discarded handlers) before building.
                    debug!(
                        session_id = ?stale.session_id(),
                        state = %stale.state(),
                        "discarding unusable channel"
                    );
                    self.discard_stale(stale).await?;
                }
                None => {}
            }

            let guard = tokio::select! {
                guard = self.build_lock.lock() => guard,
                () = ct.cancelled() => return Err(ChannelError::Cancelled),
            };

            // Double-check: another caller may have finished a build while
            // this one waited on the mutex.
            match self.snapshot_current() {
                Some(channel) if Self::usable(&channel) => return Ok(channel),
                Some(_stale) => {
                    // Raced-in channel already dead; route it through the
                    // unlocked discard path.
                    drop(guard);
                    continue;
                }
                None => {}
            }

            self.metrics.record_build_attempt();
            let built = tokio::select! {
                result = self.builder.build_and_establish(ct) => result,
                () = ct.cancelled() => Err(ChannelError::Cancelled),
            };

            match built {
                Ok(channel) => {
                    *self.lock_current() = Some(Arc::clone(&channel));
                    drop(guard);
                    self.metrics.record_build_success();
                    let info = ChannelInformation::snapshot(channel.as_ref());
                    debug!(session_id = ?info.session_id, "channel established");
                    self.handlers.notify_created(info).await?;
                    return Ok(channel);
                }
                Err(ChannelError::Cancelled) => return Err(ChannelError::Cancelled),
                Err(error) => {
                    drop(guard);
                    self.metrics.record_build_failure();
                    warn!(error = %error, "channel establishment failed");
                    let info = FailedChannelInformation::build_failure(error.clone());
                    let rebuild = self.handlers.notify_creation_failed(info).await?;
                    if !rebuild {
                        debug!("creation-failure handlers vetoed another build attempt");
                        return Err(error);
                    }
                }
            }
        }
    }

    /// Remove and retire the current channel, whatever it is.
    ///
    /// Fires discarded handlers with a snapshot taken before removal. A
    /// no-op when no channel is held.
    pub(crate) async fn discard(&self) -> ChannelResult<()> {
        let removed = self.lock_current().take();
        match removed {
            Some(channel) => self.retire(channel).await,
            None => Ok(()),
        }
    }

    /// Remove the current channel without releasing it or notifying
    /// handlers. Used by graceful termination and disposal, which manage
    /// the channel themselves.
    pub(crate) fn take_current(&self) -> Option<Arc<dyn UnderlyingChannel>> {
        self.lock_current().take()
    }

    /// Discard `stale` only if it is still the current channel; a
    /// replacement installed by a concurrent build is left alone.
    async fn discard_stale(&self, stale: Arc<dyn UnderlyingChannel>) -> ChannelResult<()> {
        let removed = {
            let mut current = self.lock_current();
            match *current {
                Some(ref held) if Arc::ptr_eq(held, &stale) => current.take(),
                _ => None,
            }
        };
        match removed {
            Some(channel) => self.retire(channel).await,
            None => Ok(()),
        }
    }

    /// Release a removed channel and notify discarded handlers.
    ///
    /// Release failures are swallowed: the channel is already being
    /// abandoned.
    async fn retire(&self, channel: Arc<dyn UnderlyingChannel>) -> ChannelResult<()> {
        let info = ChannelInformation::snapshot(channel.as_ref());
        if let Err(error) = channel.release().await {
            debug!(error = %error, "channel release failed during discard");
        }
        self.metrics.record_discard();
        debug!(session_id = ?info.session_id, "channel discarded");
        self.handlers.notify_discarded(info).await
    }
}
