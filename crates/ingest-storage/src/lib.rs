//! Ingest Storage Library
//!
//! This crate provides the storage abstraction the upload transport writes through, and
//! implementations for the local filesystem and process memory.
//!
//! # Storage key format
//!
//! Keys are generated as `{prefix}/{scope}/{uuid}.{ext}`, where `scope` is the target room
//! id for single-room batches and `bulk` for fan-out batches. The random component makes
//! keys collision-free even when two selected files share a name.
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use ingest_core::StorageBackend;
pub use keys::generate_storage_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryStorage;
pub use traits::{Storage, StorageError, StorageResult};
