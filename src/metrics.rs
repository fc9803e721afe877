//! Channel lifecycle metrics.
//!
//! Counters are observational only; no control flow inside the crate
//! consults them.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing channel establishment and failure activity.
///
/// # Thread Safety
///
/// All counters use atomic operations and are safe to read from multiple
/// threads while operations are in flight.
#[derive(Debug, Default)]
pub struct ChannelMetrics {
    /// Total number of builder invocations
    pub builds_attempted_total: AtomicU64,
    /// Total number of builder invocations that produced an established channel
    pub builds_succeeded_total: AtomicU64,
    /// Total number of builder invocations that failed
    pub builds_failed_total: AtomicU64,
    /// Total number of channel operations that failed
    pub operations_failed_total: AtomicU64,
    /// Total number of channels removed after failure or staleness
    pub channels_discarded_total: AtomicU64,
}

impl ChannelMetrics {
    /// Create a new metrics instance with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a builder invocation.
    pub fn record_build_attempt(&self) {
        self.builds_attempted_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful build.
    pub fn record_build_success(&self) {
        self.builds_succeeded_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed build.
    pub fn record_build_failure(&self) {
        self.builds_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed channel operation.
    pub fn record_operation_failure(&self) {
        self.operations_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a discarded channel.
    pub fn record_discard(&self) {
        self.channels_discarded_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Build success rate (0.0 to 1.0), reported as healthy before any
    /// build has been attempted.
    #[allow(clippy::as_conversions)] // u64 to f64 conversion for a rate
    pub fn build_success_rate(&self) -> f64 {
        let attempted = self.builds_attempted_total.load(Ordering::Relaxed);
        if attempted == 0 {
            return 1.0;
        }
        let succeeded = self.builds_succeeded_total.load(Ordering::Relaxed);
        succeeded as f64 / attempted as f64
    }
}
