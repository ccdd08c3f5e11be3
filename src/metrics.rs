//! Metric helpers for `syncwire`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate.

use metrics::{counter, gauge};

/// Name of the gauge tracking active connections.
pub const CONNECTIONS_ACTIVE: &str = "syncwire_connections_active";
/// Name of the counter tracking dispatched frames.
pub const FRAMES_DISPATCHED: &str = "syncwire_frames_dispatched_total";
/// Name of the counter tracking streams torn down by framing violations.
pub const STREAMS_CORRUPTED: &str = "syncwire_streams_corrupted_total";
/// Name of the counter tracking message bodies that failed to decode.
pub const DECODE_FAILURES: &str = "syncwire_decode_failures_total";

/// Direction of frame processing.
#[derive(Clone, Copy)]
pub enum Direction {
    /// Inbound frames received from a peer.
    Inbound,
    /// Outbound frames queued for a peer.
    Outbound,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the active connections gauge.
pub fn inc_connections() { gauge!(CONNECTIONS_ACTIVE).increment(1.0); }

/// Decrement the active connections gauge.
pub fn dec_connections() { gauge!(CONNECTIONS_ACTIVE).decrement(1.0); }

/// Record a dispatched frame for the given direction.
pub fn inc_frames(direction: Direction) {
    counter!(FRAMES_DISPATCHED, "direction" => direction.as_str()).increment(1);
}

/// Record a stream torn down by a framing violation.
///
/// `class` is [`FramingError::error_type`](crate::framing::FramingError::error_type),
/// separating grammar violations from limit violations.
pub fn inc_corrupt(class: &'static str) {
    counter!(STREAMS_CORRUPTED, "class" => class).increment(1);
}

/// Record a message body that failed to decode.
pub fn inc_decode_failures() { counter!(DECODE_FAILURES).increment(1); }
