//! Observability setup for Replica: structured logging and optional
//! OpenTelemetry span export.

pub mod tracing_setup;
