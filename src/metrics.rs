//! Metric helpers for `bearerbox`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! every helper compiles to a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking live sessions.
pub const SESSIONS_ACTIVE: &str = "bearerbox_sessions_active";
/// Name of the gauge tracking requests held in correlation windows.
pub const REQUESTS_IN_FLIGHT: &str = "bearerbox_requests_in_flight";
/// Name of the counter tracking requests that expired unanswered.
pub const REQUESTS_EXPIRED: &str = "bearerbox_requests_expired_total";
/// Name of the counter tracking frames read or written.
pub const FRAMES_PROCESSED: &str = "bearerbox_frames_processed_total";
/// Name of the counter tracking transport error occurrences.
pub const ERRORS_TOTAL: &str = "bearerbox_errors_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Frames received from the gateway.
    Inbound,
    /// Frames written to the gateway.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), expect(dead_code, reason = "only labels metrics"))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the live sessions gauge.
pub fn inc_sessions() {
    #[cfg(feature = "metrics")]
    gauge!(SESSIONS_ACTIVE).increment(1.0);
}

/// Decrement the live sessions gauge.
pub fn dec_sessions() {
    #[cfg(feature = "metrics")]
    gauge!(SESSIONS_ACTIVE).decrement(1.0);
}

/// Record a request entering a window.
pub fn inc_in_flight() {
    #[cfg(feature = "metrics")]
    gauge!(REQUESTS_IN_FLIGHT).increment(1.0);
}

/// Record a request leaving a window.
pub fn dec_in_flight() {
    #[cfg(feature = "metrics")]
    gauge!(REQUESTS_IN_FLIGHT).decrement(1.0);
}

/// Record a request that expired.
pub fn inc_expired() {
    #[cfg(feature = "metrics")]
    counter!(REQUESTS_EXPIRED).increment(1);
}

/// Record a processed frame for the given direction.
pub fn inc_frames(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_PROCESSED, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record an error occurrence.
pub fn inc_errors() {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL).increment(1);
}
