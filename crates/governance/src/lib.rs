//! Observability for the document agent.
//!
//! This crate provides:
//! - Structured logging through `tracing-subscriber`
//! - Prometheus metrics and recording helpers

pub mod metrics;
pub mod tracing_layer;

pub use metrics::{
    setup_metrics_recorder, track_classification, track_dispatch, track_request, track_tool_call,
};
pub use tracing_layer::configure_tracing;
