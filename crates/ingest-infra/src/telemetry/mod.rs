//! Telemetry initialization
//!
//! Installs the global tracing subscriber. Output format follows [`LogFormat`]; the filter
//! comes from `RUST_LOG` when set.
//!
//! [`LogFormat`]: ingest_core::LogFormat

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry, DEFAULT_FILTER};
