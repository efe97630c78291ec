//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow different
//! storage backends to be used interchangeably in the domain layer.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{ClassEntry, FeeEntry, OneTimeSchedule, Student};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Trait defining the raw persistence backend
///
/// Each entity collection lives under its own key as a serialized blob.
/// Implementations only need to move strings in and out; serialization
/// happens in the repositories.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve the blob stored under a key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a blob, replacing any existing value for the same key
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Write lock for a key. Every handle onto the same store must return
    /// the same mutex so read-modify-write cycles on a key serialize.
    fn key_lock(&self, key: &str) -> Arc<Mutex<()>>;
}

/// Trait defining the interface for student storage operations
#[async_trait]
pub trait StudentStorage: Send + Sync {
    /// List all students in insertion order. A failed read yields an empty list.
    async fn list_students(&self) -> Vec<Student>;

    /// Retrieve a specific student by ID
    async fn get_student(&self, student_id: &str) -> Result<Option<Student>>;

    /// Insert or fully replace a student
    async fn save_student(&self, student: &Student) -> Result<()>;

    /// Delete a student record only (no cascade)
    /// Returns true if the student was found and deleted
    async fn delete_student(&self, student_id: &str) -> Result<bool>;
}

/// Trait defining the interface for class entry storage operations
#[async_trait]
pub trait ClassEntryStorage: Send + Sync {
    /// List all class entries. A failed read yields an empty list.
    async fn list_entries(&self) -> Vec<ClassEntry>;

    /// List class entries for one student
    async fn list_entries_for_student(&self, student_id: &str) -> Vec<ClassEntry>;

    /// Count class entries for one student, propagating read failures
    async fn count_entries_for_student(&self, student_id: &str) -> Result<usize>;

    async fn save_entry(&self, entry: &ClassEntry) -> Result<()>;

    async fn delete_entry(&self, entry_id: &str) -> Result<bool>;

    /// Delete every entry for a student, returning the number removed
    async fn delete_entries_for_student(&self, student_id: &str) -> Result<usize>;

    /// Delete a student's entries dated on a specific day
    async fn delete_entries_for_date(&self, student_id: &str, date: NaiveDate) -> Result<usize>;
}

/// Trait defining the interface for one-time schedule storage operations
#[async_trait]
pub trait OneTimeScheduleStorage: Send + Sync {
    /// List all one-time schedules. A failed read yields an empty list.
    async fn list_schedules(&self) -> Vec<OneTimeSchedule>;

    /// Find the schedule for a student on a date, if any
    async fn find_schedule(&self, student_id: &str, date: NaiveDate) -> Result<Option<OneTimeSchedule>>;

    /// Insert or replace a schedule. Any other record for the same
    /// (student, date) pair is dropped so that at most one exists.
    async fn save_schedule(&self, schedule: &OneTimeSchedule) -> Result<()>;

    async fn delete_schedule(&self, schedule_id: &str) -> Result<bool>;

    async fn delete_schedules_for_student(&self, student_id: &str) -> Result<usize>;
}

/// Trait defining the interface for fee entry storage operations
#[async_trait]
pub trait FeeEntryStorage: Send + Sync {
    /// List all fee entries. A failed read yields an empty list.
    async fn list_fees(&self) -> Vec<FeeEntry>;

    async fn get_fee(&self, fee_id: &str) -> Result<Option<FeeEntry>>;

    /// Find a student's fee for a cycle label, propagating read failures
    async fn find_fee_for_month(&self, student_id: &str, month: &str) -> Result<Option<FeeEntry>>;

    async fn save_fee(&self, fee: &FeeEntry) -> Result<()>;

    async fn delete_fee(&self, fee_id: &str) -> Result<bool>;

    async fn delete_fees_for_student(&self, student_id: &str) -> Result<usize>;
}
