//! Type-safe NATS KV store wrapper.

use std::marker::PhantomData;
use std::time::{Duration, SystemTime};

use async_nats::jetstream::{self, kv};
use futures::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{KvBucket, KvKey};
use crate::{Error, Result, TRACING_TARGET_KV};

/// Type-safe NATS KV store wrapper.
///
/// This store is generic over:
/// - `K`: The key type
/// - `V`: The value type to store (must be serializable)
/// - `B`: The bucket configuration (determines name, description, TTL)
#[derive(Clone)]
pub struct KvStore<K, V, B>
where
    K: KvKey,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    B: KvBucket,
{
    store: kv::Store,
    _key: PhantomData<K>,
    _value: PhantomData<V>,
    _bucket: PhantomData<B>,
}

impl<K, V, B> KvStore<K, V, B>
where
    K: KvKey,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    B: KvBucket,
{
    /// Create or get a KV bucket using the bucket configuration.
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_KV)]
    pub(crate) async fn new(jetstream: &jetstream::Context) -> Result<Self> {
        Self::with_ttl(jetstream, B::TTL.unwrap_or_default()).await
    }

    /// Create or get a KV bucket with custom TTL.
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_KV)]
    pub(crate) async fn with_ttl(jetstream: &jetstream::Context, ttl: Duration) -> Result<Self> {
        let store = match jetstream.get_key_value(B::NAME).await {
            Ok(store) => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    bucket = %B::NAME,
                    "Using existing KV bucket"
                );
                store
            }
            Err(_) => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    bucket = %B::NAME,
                    ttl_secs = ttl.as_secs(),
                    "Creating new KV bucket"
                );
                let config = kv::Config {
                    bucket: B::NAME.to_string(),
                    description: B::DESCRIPTION.to_string(),
                    max_age: ttl,
                    history: 1,
                    ..Default::default()
                };
                jetstream
                    .create_key_value(config)
                    .await
                    .map_err(|e| Error::operation("kv_create", e.to_string()))?
            }
        };

        Ok(Self {
            store,
            _key: PhantomData,
            _value: PhantomData,
            _bucket: PhantomData,
        })
    }

    /// Returns the bucket name.
    #[inline]
    pub fn bucket_name(&self) -> &'static str {
        B::NAME
    }

    /// Put a value into the store.
    #[tracing::instrument(skip(self, value), target = TRACING_TARGET_KV)]
    pub async fn put(&self, key: &K, value: &V) -> Result<KvEntry> {
        let key_str = key.to_string();
        let json = serde_json::to_vec(value)?;
        let size = json.len();
        let revision = self
            .store
            .put(&key_str, json.into())
            .await
            .map_err(|e| Error::operation("kv_put", e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_KV,
            key = %key_str,
            revision = revision,
            size_bytes = size,
            "Put value to KV store"
        );

        Ok(KvEntry {
            key: key_str,
            revision,
            size: size as u64,
        })
    }

    /// Put a value only if the key does not exist yet.
    ///
    /// Returns `None` when another writer created the key first.
    #[tracing::instrument(skip(self, value), target = TRACING_TARGET_KV)]
    pub async fn create(&self, key: &K, value: &V) -> Result<Option<KvEntry>> {
        let key_str = key.to_string();
        let json = serde_json::to_vec(value)?;
        let size = json.len();

        match self.store.create(&key_str, json.into()).await {
            Ok(revision) => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    key = %key_str,
                    revision = revision,
                    "Created key in KV store"
                );
                Ok(Some(KvEntry {
                    key: key_str,
                    revision,
                    size: size as u64,
                }))
            }
            Err(e) if matches!(e.kind(), kv::CreateErrorKind::AlreadyExists) => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    key = %key_str,
                    "Key already exists in KV store"
                );
                Ok(None)
            }
            Err(e) => Err(Error::operation("kv_create_key", e.to_string())),
        }
    }

    /// Get a value from the store.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    pub async fn get(&self, key: &K) -> Result<Option<KvValue<V>>> {
        let key_str = key.to_string();
        match self.store.entry(&key_str).await {
            Ok(Some(entry)) if matches!(entry.operation, kv::Operation::Put) => {
                let size = entry.value.len();
                let deserialized = serde_json::from_slice(&entry.value)?;
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    key = %key_str,
                    size_bytes = size,
                    revision = entry.revision,
                    "Retrieved value from KV store"
                );
                Ok(Some(KvValue {
                    key: key_str,
                    value: deserialized,
                    revision: entry.revision,
                    size: size as u64,
                    created: entry.created.into(),
                }))
            }
            Ok(_) => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    key = %key_str,
                    "Key not found in KV store"
                );
                Ok(None)
            }
            Err(e) => Err(Error::operation("kv_get", e.to_string())),
        }
    }

    /// Get a value, returning just the data.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    pub async fn get_value(&self, key: &K) -> Result<Option<V>> {
        Ok(self.get(key).await?.map(|kv| kv.value))
    }

    /// Delete a key from the store.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    pub async fn delete(&self, key: &K) -> Result<()> {
        let key_str = key.to_string();
        self.store
            .purge(&key_str)
            .await
            .map_err(|e| Error::operation("kv_delete", e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_KV,
            key = %key_str,
            "Deleted key from KV store"
        );
        Ok(())
    }

    /// Delete a key only if it is still at the given revision.
    ///
    /// Returns `false` when the key was changed or removed concurrently.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    pub async fn delete_at_revision(&self, key: &K, revision: u64) -> Result<bool> {
        let key_str = key.to_string();
        match self
            .store
            .purge_expect_revision(&key_str, Some(revision))
            .await
        {
            Ok(()) => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    key = %key_str,
                    revision = revision,
                    "Deleted key at revision from KV store"
                );
                Ok(true)
            }
            Err(e) => match self.get(key).await? {
                Some(current) if current.revision == revision => {
                    Err(Error::operation("kv_delete_at_revision", e.to_string()))
                }
                _ => {
                    tracing::debug!(
                        target: TRACING_TARGET_KV,
                        key = %key_str,
                        revision = revision,
                        "Lost delete race in KV store"
                    );
                    Ok(false)
                }
            },
        }
    }

    /// Get all keys in the bucket.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    pub async fn keys(&self) -> Result<Vec<K>> {
        let mut keys = Vec::new();
        let mut key_stream = self
            .store
            .keys()
            .await
            .map_err(|e| Error::operation("kv_keys", e.to_string()))?;

        while let Some(key_result) = key_stream.next().await {
            match key_result {
                Ok(key_str) => {
                    if let Ok(key) = key_str.parse::<K>() {
                        keys.push(key);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        target: TRACING_TARGET_KV,
                        error = %e,
                        "Error reading key from bucket"
                    );
                }
            }
        }

        tracing::debug!(
            target: TRACING_TARGET_KV,
            count = keys.len(),
            bucket = %B::NAME,
            "Retrieved keys from bucket"
        );
        Ok(keys)
    }

    /// Get every value in the bucket.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    pub async fn values(&self) -> Result<Vec<V>> {
        let mut values = Vec::new();
        for key in self.keys().await? {
            if let Some(value) = self.get_value(&key).await? {
                values.push(value);
            }
        }
        Ok(values)
    }

    /// Update a value only if the revision matches (optimistic concurrency).
    ///
    /// Returns `None` when the revision no longer matches.
    #[tracing::instrument(skip(self, value), target = TRACING_TARGET_KV)]
    pub async fn update(&self, key: &K, value: &V, revision: u64) -> Result<Option<KvEntry>> {
        let key_str = key.to_string();
        let json = serde_json::to_vec(value)?;
        let size = json.len();

        let new_revision = match self.store.update(&key_str, json.into(), revision).await {
            Ok(new_revision) => new_revision,
            Err(e) if matches!(e.kind(), kv::UpdateErrorKind::WrongLastRevision) => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    key = %key_str,
                    revision = revision,
                    "Revision mismatch in KV store"
                );
                return Ok(None);
            }
            Err(e) => return Err(Error::operation("kv_update", e.to_string())),
        };

        tracing::debug!(
            target: TRACING_TARGET_KV,
            key = %key_str,
            old_revision = revision,
            new_revision = new_revision,
            size_bytes = size,
            "Updated value in KV store"
        );

        Ok(Some(KvEntry {
            key: key_str,
            revision: new_revision,
            size: size as u64,
        }))
    }
}

/// KV entry metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub key: String,
    pub revision: u64,
    pub size: u64,
}

/// KV value with metadata.
#[derive(Debug, Clone)]
pub struct KvValue<V> {
    pub key: String,
    pub value: V,
    pub revision: u64,
    pub size: u64,
    pub created: SystemTime,
}
