//! Per-key asynchronous locks.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable<K> = HashMap<K, Arc<AsyncMutex<()>>>;

/// Serializes work on the same key within this process.
///
/// Entries are created on first use and removed once the last holder or
/// waiter for a key is gone, so the table only tracks keys in use.
pub(crate) struct KeyedLocks<K> {
    table: Arc<Mutex<LockTable<K>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Waits until no other caller holds the lock for `key`.
    pub async fn lock(&self, key: K) -> KeyedGuard<K> {
        let mutex = lock_table(&self.table)
            .entry(key.clone())
            .or_default()
            .clone();

        KeyedGuard {
            guard: Some(mutex.lock_owned().await),
            table: self.table.clone(),
            key,
        }
    }

    /// Returns the number of keys currently locked or awaited.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        lock_table(&self.table).len()
    }
}

impl<K> Clone for KeyedLocks<K> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the lock for one key until dropped.
pub(crate) struct KeyedGuard<K>
where
    K: Eq + Hash,
{
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<Mutex<LockTable<K>>>,
    key: K,
}

impl<K> Drop for KeyedGuard<K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut table = lock_table(&self.table);
        if table
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            table.remove(&self.key);
        }
    }
}

fn lock_table<K>(table: &Mutex<LockTable<K>>) -> MutexGuard<'_, LockTable<K>> {
    // The table is only touched by infallible map operations.
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[tokio::test]
    async fn read_modify_write_is_serialized_per_key() -> anyhow::Result<()> {
        let locks = KeyedLocks::new();
        let counter = Arc::new(AtomicU64::new(0));

        let tasks: Vec<_> = (0..100)
            .map(|_| {
                let locks = locks.clone();
                let counter = counter.clone();
                tokio::spawn(async move {
                    let _guard = locks.lock("poll").await;
                    let seen = counter.load(Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    counter.store(seen + 1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await?;
        }

        assert_eq!(counter.load(Ordering::SeqCst), 100);
        assert_eq!(locks.len(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn different_keys_do_not_block_each_other() {
        let locks = KeyedLocks::new();
        let _first = locks.lock(1).await;
        let _second = locks.lock(2).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn entry_survives_while_a_waiter_remains() -> anyhow::Result<()> {
        let locks = KeyedLocks::new();
        let held = locks.lock("poll").await;

        let waiter = tokio::spawn({
            let locks = locks.clone();
            async move {
                let _guard = locks.lock("poll").await;
            }
        });
        tokio::task::yield_now().await;

        drop(held);
        waiter.await?;
        assert_eq!(locks.len(), 0);
        Ok(())
    }
}
