//! Ingest Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration and constants
//! shared by every stage of the media ingestion pipeline.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{IngestConfig, LogFormat};
pub use error::{ErrorMetadata, IngestError, IngestResult, LogLevel, ValidationError};
pub use storage_types::StorageBackend;
