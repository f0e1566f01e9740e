//! Ingest Infrastructure Library
//!
//! Process-level wiring shared by binaries: tracing subscriber setup.

pub mod telemetry;

pub use telemetry::{init_telemetry, shutdown_telemetry};
