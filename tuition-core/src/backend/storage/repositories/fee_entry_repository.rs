//! Fee entries are stored as a JSON array under `tuition:feeEntries`.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::collection::JsonCollection;
use crate::backend::storage::traits::{FeeEntryStorage, KeyValueStore};
use shared::FeeEntry;

pub const FEE_ENTRIES_KEY: &str = "tuition:feeEntries";

#[derive(Clone)]
pub struct FeeEntryRepository {
    collection: JsonCollection<FeeEntry>,
}

impl FeeEntryRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            collection: JsonCollection::new(store, FEE_ENTRIES_KEY),
        }
    }
}

#[async_trait]
impl FeeEntryStorage for FeeEntryRepository {
    async fn list_fees(&self) -> Vec<FeeEntry> {
        self.collection.load_or_empty().await
    }

    async fn get_fee(&self, fee_id: &str) -> Result<Option<FeeEntry>> {
        let fees = self.collection.load().await?;
        Ok(fees.into_iter().find(|fee| fee.id == fee_id))
    }

    async fn find_fee_for_month(&self, student_id: &str, month: &str) -> Result<Option<FeeEntry>> {
        let fees = self.collection.load().await?;
        Ok(fees
            .into_iter()
            .find(|fee| fee.student_id == student_id && fee.month == month))
    }

    async fn save_fee(&self, fee: &FeeEntry) -> Result<()> {
        self.collection.upsert(fee.clone()).await
    }

    async fn delete_fee(&self, fee_id: &str) -> Result<bool> {
        self.collection.remove_by_id(fee_id).await
    }

    async fn delete_fees_for_student(&self, student_id: &str) -> Result<usize> {
        self.collection
            .remove_where(|fee| fee.student_id == student_id)
            .await
    }
}
