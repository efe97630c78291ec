//! # Student Repository
//!
//! Students are stored as a JSON array under `tuition:students`.
//!
//! ## Record shapes
//!
//! Older records carry a single 12-hour `time` ("10:00 AM") shared by every
//! weekday instead of a per-weekday `times` map, and may omit the cycle and
//! fee fields entirely. Those shapes are normalized here, once, into the
//! canonical [`Student`]; everything above the storage layer only sees the
//! canonical form, and every save writes the canonical form back.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::collection::{Identified, JsonCollection};
use crate::backend::domain::class_time::to_24_hour;
use crate::backend::storage::traits::{KeyValueStore, StudentStorage};
use shared::{Student, Weekday, DEFAULT_CLASSES_PER_CYCLE};

pub const STUDENTS_KEY: &str = "tuition:students";

/// Legacy records without a parseable time fall back to this class time
const LEGACY_FALLBACK_TIME: &str = "10:00";

/// Stored student record, tolerant of missing and legacy fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudentRecord {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    weekdays: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    times: Option<BTreeMap<String, String>>,
    /// Single class time used by records written before per-day times existed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time: Option<String>,
    #[serde(default)]
    classes_per_cycle: Option<u32>,
    #[serde(default)]
    initial_classes_completed: Option<u32>,
    #[serde(default)]
    tuition_fee: Option<f64>,
    #[serde(default)]
    mobile_number: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl Identified for StudentRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

impl From<&Student> for StudentRecord {
    fn from(student: &Student) -> Self {
        StudentRecord {
            id: student.id.clone(),
            name: student.name.clone(),
            weekdays: student.weekdays.iter().map(|d| d.name().to_string()).collect(),
            times: Some(
                student
                    .times
                    .iter()
                    .map(|(day, time)| (day.name().to_string(), time.clone()))
                    .collect(),
            ),
            time: None,
            classes_per_cycle: Some(student.classes_per_cycle),
            initial_classes_completed: Some(student.initial_classes_completed),
            tuition_fee: student.tuition_fee,
            mobile_number: student.mobile_number.clone(),
            created_at: Some(student.created_at),
        }
    }
}

impl From<StudentRecord> for Student {
    fn from(record: StudentRecord) -> Self {
        let mut weekdays: Vec<Weekday> = Vec::new();
        for name in &record.weekdays {
            match name.parse::<Weekday>() {
                Ok(day) if !weekdays.contains(&day) => weekdays.push(day),
                Ok(_) => {}
                Err(e) => warn!("Dropping weekday for student {}: {}", record.id, e),
            }
        }

        let times: BTreeMap<Weekday, String> = match (record.times, record.time) {
            (Some(times), _) => times
                .into_iter()
                .filter_map(|(day, time)| match day.parse::<Weekday>() {
                    Ok(day) => Some((day, time.trim().to_string())),
                    Err(e) => {
                        warn!("Dropping time for student {}: {}", record.id, e);
                        None
                    }
                })
                .collect(),
            (None, Some(legacy_time)) => {
                let converted = to_24_hour(&legacy_time).unwrap_or_else(|| {
                    warn!(
                        "Unreadable legacy time '{}' for student {}, using {}",
                        legacy_time, record.id, LEGACY_FALLBACK_TIME
                    );
                    LEGACY_FALLBACK_TIME.to_string()
                });
                weekdays.iter().map(|day| (*day, converted.clone())).collect()
            }
            (None, None) => BTreeMap::new(),
        };

        let classes_per_cycle = match record.classes_per_cycle {
            Some(count) if count > 0 => count,
            _ => DEFAULT_CLASSES_PER_CYCLE,
        };
        let initial_classes_completed = record
            .initial_classes_completed
            .unwrap_or(0)
            .min(classes_per_cycle);

        Student {
            id: record.id,
            name: record.name,
            weekdays,
            times,
            classes_per_cycle,
            initial_classes_completed,
            tuition_fee: record.tuition_fee.filter(|fee| fee.is_finite() && *fee >= 0.0),
            mobile_number: record.mobile_number.filter(|m| !m.trim().is_empty()),
            created_at: record.created_at.unwrap_or_default(),
        }
    }
}

/// JSON collection repository for students
#[derive(Clone)]
pub struct StudentRepository {
    collection: JsonCollection<StudentRecord>,
}

impl StudentRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            collection: JsonCollection::new(store, STUDENTS_KEY),
        }
    }
}

#[async_trait]
impl StudentStorage for StudentRepository {
    async fn list_students(&self) -> Vec<Student> {
        self.collection
            .load_or_empty()
            .await
            .into_iter()
            .map(Student::from)
            .collect()
    }

    async fn get_student(&self, student_id: &str) -> Result<Option<Student>> {
        let records = self.collection.load().await?;
        Ok(records
            .into_iter()
            .find(|record| record.id == student_id)
            .map(Student::from))
    }

    async fn save_student(&self, student: &Student) -> Result<()> {
        self.collection.upsert(StudentRecord::from(student)).await
    }

    async fn delete_student(&self, student_id: &str) -> Result<bool> {
        self.collection.remove_by_id(student_id).await
    }
}
