//! # Middleware
//!
//! - `metrics`: request counters and latency histograms.
//! - `tracing_layer`: request spans.

pub mod metrics;
pub mod tracing_layer;
