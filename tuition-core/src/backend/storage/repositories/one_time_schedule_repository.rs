//! One-time schedules are stored as a JSON array under `tuition:oneTimeSchedules`.
//!
//! At most one record exists per (student, date); saving a schedule drops any
//! other record for the same pair.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use std::sync::Arc;

use super::collection::JsonCollection;
use crate::backend::storage::traits::{KeyValueStore, OneTimeScheduleStorage};
use shared::OneTimeSchedule;

pub const ONE_TIME_SCHEDULES_KEY: &str = "tuition:oneTimeSchedules";

#[derive(Clone)]
pub struct OneTimeScheduleRepository {
    collection: JsonCollection<OneTimeSchedule>,
}

impl OneTimeScheduleRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            collection: JsonCollection::new(store, ONE_TIME_SCHEDULES_KEY),
        }
    }
}

#[async_trait]
impl OneTimeScheduleStorage for OneTimeScheduleRepository {
    async fn list_schedules(&self) -> Vec<OneTimeSchedule> {
        self.collection.load_or_empty().await
    }

    async fn find_schedule(&self, student_id: &str, date: NaiveDate) -> Result<Option<OneTimeSchedule>> {
        let schedules = self.collection.load().await?;
        Ok(schedules
            .into_iter()
            .find(|schedule| schedule.student_id == student_id && schedule.date == date))
    }

    async fn save_schedule(&self, schedule: &OneTimeSchedule) -> Result<()> {
        let schedule = schedule.clone();
        self.collection
            .mutate(move |schedules| {
                let before = schedules.len();
                schedules.retain(|existing| {
                    existing.id == schedule.id
                        || existing.student_id != schedule.student_id
                        || existing.date != schedule.date
                });
                if schedules.len() < before {
                    debug!(
                        "Dropped {} superseded schedule(s) for {} on {}",
                        before - schedules.len(),
                        schedule.student_id,
                        schedule.date
                    );
                }
                match schedules.iter().position(|existing| existing.id == schedule.id) {
                    Some(index) => schedules[index] = schedule,
                    None => schedules.push(schedule),
                }
            })
            .await
    }

    async fn delete_schedule(&self, schedule_id: &str) -> Result<bool> {
        self.collection.remove_by_id(schedule_id).await
    }

    async fn delete_schedules_for_student(&self, student_id: &str) -> Result<usize> {
        self.collection
            .remove_where(|schedule| schedule.student_id == student_id)
            .await
    }
}
