//! Generic JSON-array collection stored under a single key.
//!
//! Every repository persists its entity type as one serialized array. Reads
//! for display degrade to an empty list when the backend fails or the blob
//! is corrupt; read-modify-write cycles read strictly so that a failed read
//! never ends up overwriting the stored data.
//!
//! Writes hold the store's lock for the key from load to save. Several
//! repositories share one key, so a write from one must never overwrite a
//! write from another that landed in between.

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::backend::storage::traits::KeyValueStore;

/// Records that carry a stable identifier
pub trait Identified {
    fn id(&self) -> &str;
}

pub struct JsonCollection<T> {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonCollection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key,
            _marker: PhantomData,
        }
    }
}

impl<T> JsonCollection<T>
where
    T: Identified + Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _marker: PhantomData,
        }
    }

    /// Load the collection, propagating backend and parse failures
    pub async fn load(&self) -> Result<Vec<T>> {
        let blob = self
            .store
            .get(self.key)
            .await
            .with_context(|| format!("Failed to read collection {}", self.key))?;

        match blob {
            Some(data) if !data.trim().is_empty() => serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse collection {}", self.key)),
            _ => Ok(Vec::new()),
        }
    }

    /// Load the collection for display, treating any failure as empty
    pub async fn load_or_empty(&self) -> Vec<T> {
        match self.load().await {
            Ok(items) => items,
            Err(e) => {
                error!("Error loading {}: {:#}", self.key, e);
                Vec::new()
            }
        }
    }

    async fn save_all(&self, items: &[T]) -> Result<()> {
        let data = serde_json::to_string(items)
            .with_context(|| format!("Failed to serialize collection {}", self.key))?;
        self.store
            .set(self.key, &data)
            .await
            .with_context(|| format!("Failed to write collection {}", self.key))
    }

    /// Apply a change to the stored items and write them back
    pub async fn mutate<R: Send>(&self, change: impl FnOnce(&mut Vec<T>) -> R + Send) -> Result<R> {
        let lock = self.store.key_lock(self.key);
        let _guard = lock.lock().await;

        let mut items = self.load().await?;
        let result = change(&mut items);
        self.save_all(&items).await?;
        Ok(result)
    }

    /// Insert a record, or replace the record with the same id in place
    pub async fn upsert(&self, item: T) -> Result<()> {
        let key = self.key;
        self.mutate(move |items| {
            match items.iter().position(|existing| existing.id() == item.id()) {
                Some(index) => {
                    debug!("Replacing {} in {}", item.id(), key);
                    items[index] = item;
                }
                None => items.push(item),
            }
        })
        .await
    }

    /// Remove every record matching the predicate, returning how many were removed.
    /// Nothing is written when no record matches.
    pub async fn remove_where(&self, predicate: impl Fn(&T) -> bool + Send) -> Result<usize> {
        let lock = self.store.key_lock(self.key);
        let _guard = lock.lock().await;

        let mut items = self.load().await?;
        let before = items.len();
        items.retain(|item| !predicate(item));
        let removed = before - items.len();
        if removed > 0 {
            self.save_all(&items).await?;
        }
        Ok(removed)
    }

    pub async fn remove_by_id(&self, id: &str) -> Result<bool> {
        Ok(self.remove_where(|item| item.id() == id).await? > 0)
    }
}
