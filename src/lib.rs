#![forbid(unsafe_code)]

//! # courier-channel
//!
//! Self-healing client channel for the Courier bidirectional messaging
//! protocol.
//!
//! ## Overview
//!
//! Courier exchanges four envelope kinds (Message, Notification, Command,
//! and Session) over one persistent framed connection.
//! This crate provides the client-side core: [`OnDemandChannel`], a façade
//! that lazily establishes the underlying authenticated session channel,
//! serves every send/receive/process operation through it, detects
//! failures, and rebuilds the channel from scratch while preserving
//! concurrent-caller correctness.
//!
//! The crate provides:
//! - [`OnDemandChannel`] with per-envelope-kind send and receive
//!   operations, a correlated [`process_command`](OnDemandChannel::process_command)
//!   request/response exchange, graceful [`finish`](OnDemandChannel::finish),
//!   and strict [`dispose`](OnDemandChannel::dispose) semantics
//! - Single-flight channel establishment: concurrent demands share one
//!   in-flight build
//! - Lifecycle observers, including veto handlers that decide whether a
//!   failed channel is rebuilt
//! - [`UnderlyingChannel`] and [`EstablishedChannelBuilder`] traits behind
//!   which transports and session negotiation live
//!
//! Transport framing, session negotiation, and authentication are not part
//! of this crate; they belong to [`EstablishedChannelBuilder`]
//! implementations.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use courier_channel::envelope::Message;
//! use courier_channel::{
//!     BuilderConfig, ChannelError, ChannelResult, EstablishedChannelBuilder, OnDemandChannel,
//!     UnderlyingChannel,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! struct TcpChannelBuilder {
//!     config: BuilderConfig,
//! }
//!
//! #[async_trait]
//! impl EstablishedChannelBuilder for TcpChannelBuilder {
//!     async fn build_and_establish(
//!         &self,
//!         _ct: &CancellationToken,
//!     ) -> ChannelResult<Arc<dyn UnderlyingChannel>> {
//!         // Open the transport, negotiate the session, authenticate.
//!         Err(ChannelError::Build("not wired up in this example".to_owned()))
//!     }
//!
//!     fn config(&self) -> &BuilderConfig {
//!         &self.config
//!     }
//! }
//!
//! # async fn example() -> ChannelResult<()> {
//! let builder = Arc::new(TcpChannelBuilder {
//!     config: BuilderConfig::default(),
//! });
//! let channel = OnDemandChannel::new(builder);
//!
//! channel.on_created(|info| async move {
//!     println!("channel up: {:?}", info.session_id);
//!     Ok(())
//! });
//! channel.on_creation_failed(|failure| async move {
//!     // Rebuild unless establishment was refused outright.
//!     Ok(!matches!(failure.error, ChannelError::Build(_)))
//! });
//!
//! channel
//!     .send_message(Message::new(serde_json::json!("hello")))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod envelope;
pub mod error;
pub mod metrics;

// Re-export main types for convenience
pub use channel::{
    BuilderConfig, ChannelInformation, EstablishedChannelBuilder, FailedChannelInformation,
    OnDemandChannel, UnderlyingChannel,
};
pub use error::{AggregateError, ChannelError, ChannelResult};
pub use metrics::ChannelMetrics;
