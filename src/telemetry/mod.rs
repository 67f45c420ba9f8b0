//! Telemetry Module
//!
//! Request counters, latency histograms, and in-flight gauges, rendered in
//! the Prometheus text exposition format on demand. Collection is lock-free
//! (atomics only); rendering walks the fixed label space.

pub mod metrics;

pub use metrics::{track_request, Metrics};
