//! Class entries are stored as a JSON array under `tuition:classEntries`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use super::collection::JsonCollection;
use crate::backend::storage::traits::{ClassEntryStorage, KeyValueStore};
use shared::ClassEntry;

pub const CLASS_ENTRIES_KEY: &str = "tuition:classEntries";

#[derive(Clone)]
pub struct ClassEntryRepository {
    collection: JsonCollection<ClassEntry>,
}

impl ClassEntryRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            collection: JsonCollection::new(store, CLASS_ENTRIES_KEY),
        }
    }
}

#[async_trait]
impl ClassEntryStorage for ClassEntryRepository {
    async fn list_entries(&self) -> Vec<ClassEntry> {
        self.collection.load_or_empty().await
    }

    async fn list_entries_for_student(&self, student_id: &str) -> Vec<ClassEntry> {
        self.collection
            .load_or_empty()
            .await
            .into_iter()
            .filter(|entry| entry.student_id == student_id)
            .collect()
    }

    async fn count_entries_for_student(&self, student_id: &str) -> Result<usize> {
        let entries = self.collection.load().await?;
        Ok(entries
            .iter()
            .filter(|entry| entry.student_id == student_id)
            .count())
    }

    async fn save_entry(&self, entry: &ClassEntry) -> Result<()> {
        self.collection.upsert(entry.clone()).await
    }

    async fn delete_entry(&self, entry_id: &str) -> Result<bool> {
        self.collection.remove_by_id(entry_id).await
    }

    async fn delete_entries_for_student(&self, student_id: &str) -> Result<usize> {
        self.collection
            .remove_where(|entry| entry.student_id == student_id)
            .await
    }

    async fn delete_entries_for_date(&self, student_id: &str, date: NaiveDate) -> Result<usize> {
        self.collection
            .remove_where(|entry| entry.student_id == student_id && entry.date == date)
            .await
    }
}
