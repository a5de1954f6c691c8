#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for NATS client operations.
///
/// Use this target for logging client initialization, configuration, and client-level errors.
pub const TRACING_TARGET_CLIENT: &str = "tally_store::client";

/// Tracing target for NATS key-value store operations.
///
/// Use this target for logging KV bucket operations, key operations, and KV-related errors.
pub const TRACING_TARGET_KV: &str = "tally_store::kv";

/// Tracing target for NATS connection operations.
///
/// Use this target for logging connection establishment, reconnection, and connection errors.
pub const TRACING_TARGET_CONNECTION: &str = "tally_store::connection";

/// Tracing target for the in-memory backend.
pub const TRACING_TARGET_MEMORY: &str = "tally_store::memory";

mod client;
mod config;
mod error;
pub mod kv;
pub mod memory;
pub mod model;
pub mod prelude;
mod store;

pub use client::{NatsClient, NatsConfig};
pub use config::{StoreBackend, StoreConfig};
pub use error::{Error, Result};
pub use kv::NatsStore;
pub use memory::MemoryStore;
pub use store::{
    DocumentStore, LoginTokenRepository, PollRepository, StoreClient, UserRepository,
};
