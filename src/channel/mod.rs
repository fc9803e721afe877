//! On-demand client channel core.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                     OnDemandChannel                            │
//! │  ┌─────────────┐  ┌──────────────┐  ┌───────────────────────┐  │
//! │  │   Channel   │  │   Handler    │  │  Operation Executor   │  │
//! │  │   Holder    │  │   Registry   │  │                       │  │
//! │  └─────────────┘  └──────────────┘  │  - Failure Routing    │  │
//! │         │                │          │  - Discard + Rebuild  │  │
//! │         └────────────────┼──────────│  - Request/Response   │  │
//! │                          │          └───────────────────────┘  │
//! │                          │                    │                │
//! │                          └────────────────────┘                │
//! └────────────────────────────────────────────────────────────────┘
//!            │                                      │
//!            ▼                                      ▼
//!   EstablishedChannelBuilder              UnderlyingChannel
//!   (transport + negotiate + auth)         (send/receive envelopes)
//! ```
//!
//! # Module Organization
//!
//! - `underlying`: collaborator traits for the session channel and builder
//! - `info`: snapshot value objects handed to lifecycle observers
//! - `handlers`: ordered informational and veto handler lists
//! - `holder`: single current channel and single-flight acquisition
//! - `ondemand`: the façade with the generic retry/rebuild executor

mod handlers;
mod holder;
mod info;
mod ondemand;
#[cfg(test)]
mod test_support;
mod underlying;

pub use info::{ChannelInformation, FailedChannelInformation};
pub use ondemand::OnDemandChannel;
pub use underlying::{BuilderConfig, EstablishedChannelBuilder, UnderlyingChannel};
