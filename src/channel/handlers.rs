//! Observer registry for channel lifecycle events.
//!
//! Two handler categories exist. Informational handlers (`created`,
//! `discarded`) are notified and their errors aggregated. Veto handlers
//! (`creation_failed`, `operation_failed`) additionally return a boolean
//! that decides whether the channel is rebuilt; the combined verdict is the
//! AND over every handler, and a handler error is a hard "do not rebuild".
//!
//! Lists are snapshotted at invocation time, so registration concurrent
//! with a running notification takes effect on the next event.

use crate::channel::info::{ChannelInformation, FailedChannelInformation};
use crate::error::{ChannelError, ChannelResult};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

type InformationalHandler = Arc<
    dyn Fn(ChannelInformation) -> Pin<Box<dyn Future<Output = ChannelResult<()>> + Send>>
        + Send
        + Sync,
>;

type VetoHandler = Arc<
    dyn Fn(FailedChannelInformation) -> Pin<Box<dyn Future<Output = ChannelResult<bool>> + Send>>
        + Send
        + Sync,
>;

#[derive(Default)]
pub(crate) struct HandlerRegistry {
    created: RwLock<Vec<InformationalHandler>>,
    discarded: RwLock<Vec<InformationalHandler>>,
    creation_failed: RwLock<Vec<VetoHandler>>,
    operation_failed: RwLock<Vec<VetoHandler>>,
}

impl HandlerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_created<F, Fut>(&self, handler: F)
    where
        F: Fn(ChannelInformation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChannelResult<()>> + Send + 'static,
    {
        let handler: InformationalHandler = Arc::new(move |info| Box::pin(handler(info)));
        self.created
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    pub(crate) fn add_discarded<F, Fut>(&self, handler: F)
    where
        F: Fn(ChannelInformation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChannelResult<()>> + Send + 'static,
    {
        let handler: InformationalHandler = Arc::new(move |info| Box::pin(handler(info)));
        self.discarded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    pub(crate) fn add_creation_failed<F, Fut>(&self, handler: F)
    where
        F: Fn(FailedChannelInformation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChannelResult<bool>> + Send + 'static,
    {
        let handler: VetoHandler = Arc::new(move |info| Box::pin(handler(info)));
        self.creation_failed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    pub(crate) fn add_operation_failed<F, Fut>(&self, handler: F)
    where
        F: Fn(FailedChannelInformation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChannelResult<bool>> + Send + 'static,
    {
        let handler: VetoHandler = Arc::new(move |info| Box::pin(handler(info)));
        self.operation_failed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    /// Notify created handlers in registration order.
    ///
    /// Every handler runs even when an earlier one fails; failures are
    /// aggregated into the returned error.
    pub(crate) async fn notify_created(&self, info: ChannelInformation) -> ChannelResult<()> {
        Self::notify_informational(&self.created, info).await
    }

    /// Notify discarded handlers in registration order.
    pub(crate) async fn notify_discarded(&self, info: ChannelInformation) -> ChannelResult<()> {
        Self::notify_informational(&self.discarded, info).await
    }

    /// Consult creation-failure veto handlers.
    ///
    /// Returns `Ok(true)` when every handler voted to rebuild (vacuously
    /// true for an empty list), `Ok(false)` when any voted against, and
    /// `Err` when any handler itself failed.
    pub(crate) async fn notify_creation_failed(
        &self,
        info: FailedChannelInformation,
    ) -> ChannelResult<bool> {
        Self::notify_veto(&self.creation_failed, info).await
    }

    /// Consult operation-failure veto handlers.
    pub(crate) async fn notify_operation_failed(
        &self,
        info: FailedChannelInformation,
    ) -> ChannelResult<bool> {
        Self::notify_veto(&self.operation_failed, info).await
    }

    async fn notify_informational(
        list: &RwLock<Vec<InformationalHandler>>,
        info: ChannelInformation,
    ) -> ChannelResult<()> {
        let snapshot = list
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mut errors = Vec::new();
        for handler in snapshot {
            if let Err(error) = handler(info.clone()).await {
                errors.push(error);
            }
        }
        match ChannelError::aggregate(errors) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn notify_veto(
        list: &RwLock<Vec<VetoHandler>>,
        info: FailedChannelInformation,
    ) -> ChannelResult<bool> {
        let snapshot = list
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mut errors = Vec::new();
        let mut verdict = true;
        // No short-circuit: every handler observes the failure.
        for handler in snapshot {
            match handler(info.clone()).await {
                Ok(vote) => verdict = verdict && vote,
                Err(error) => errors.push(error),
            }
        }
        if let Some(error) = ChannelError::aggregate(errors) {
            return Err(error);
        }
        Ok(verdict)
    }
}
