//! NATS Key-Value store backend.
//!
//! This module provides type-safe abstractions over NATS KV:
//! - `KvStore<K, V, B>`: Generic type-safe key-value operations
//! - `KvKey`: Trait for key types
//! - `KvBucket`: Trait for bucket configuration
//! - `NatsStore`: the [`DocumentStore`](crate::DocumentStore) built on top of them

mod keyed_lock;
mod kv_bucket;
mod kv_key;
mod kv_store;
mod nats_store;

pub use kv_bucket::{KvBucket, LoginTokensBucket, PollsBucket, UserEmailsBucket, UsersBucket};
pub use kv_key::{EmailKey, KvKey, LoginTokenKey};
pub use kv_store::{KvEntry, KvStore, KvValue};
pub use nats_store::NatsStore;
