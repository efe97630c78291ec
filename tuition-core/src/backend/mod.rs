//! # Backend Module
//!
//! Domain services and storage for the tuition tracker. The services share
//! one key-value store and one clock; notification delivery is injected.

use anyhow::Result;
use log::{info, warn};
use shared::{Student, StudentDetails};
use std::sync::Arc;

pub mod config;
pub mod domain;
pub mod storage;

#[cfg(test)]
pub mod test_utils;

pub use config::{AppConfig, ReminderConfig};
pub use storage::{MemoryKeyValueStore, SqliteKeyValueStore};

use domain::{Clock, DeletedStudent, DomainResult, NotificationDispatcher, SystemClock};
use storage::traits::KeyValueStore;

/// Main backend struct that orchestrates all services
#[derive(Clone)]
pub struct Backend {
    pub student_service: domain::StudentService,
    pub schedule_service: domain::ScheduleService,
    pub calendar_service: domain::CalendarService,
    pub cycle_service: domain::CycleService,
    pub fee_service: domain::FeeService,
    pub notification_service: domain::NotificationService,
}

impl Backend {
    /// Create a backend instance with all services over one store
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        reminders: ReminderConfig,
    ) -> Self {
        Self {
            student_service: domain::StudentService::new(store.clone(), clock.clone()),
            schedule_service: domain::ScheduleService::new(store.clone(), clock.clone()),
            calendar_service: domain::CalendarService::new(store.clone()),
            cycle_service: domain::CycleService::new(store.clone(), clock.clone()),
            fee_service: domain::FeeService::new(store.clone(), clock.clone()),
            notification_service: domain::NotificationService::new(store, dispatcher, clock, reminders),
        }
    }

    /// Create a student and plan their class reminders
    pub async fn create_student(&self, details: StudentDetails) -> DomainResult<Student> {
        let student = self.student_service.create_student(details).await?;
        self.replan_reminders(&student).await;
        Ok(student)
    }

    /// Update a student and replace their class reminders
    pub async fn update_student(&self, student_id: &str, details: StudentDetails) -> DomainResult<Student> {
        let student = self.student_service.update_student(student_id, details).await?;
        self.replan_reminders(&student).await;
        Ok(student)
    }

    /// Delete a student with everything that references it, then drop their reminders
    pub async fn delete_student(&self, student_id: &str) -> DomainResult<DeletedStudent> {
        let deleted = self.student_service.delete_student(student_id).await?;
        if let Err(e) = self.notification_service.cancel_student(student_id).await {
            warn!("Failed to cancel reminders for {}: {:#}", deleted.student.name, e);
        }
        Ok(deleted)
    }

    // Reminder failures never undo or fail the data operation
    async fn replan_reminders(&self, student: &Student) {
        if let Err(e) = self.notification_service.replan_student(student).await {
            warn!("Failed to plan reminders for {}: {:#}", student.name, e);
        }
    }
}

/// Open the configured SQLite database and build the backend on the system clock
pub async fn initialize_backend(
    config: &AppConfig,
    dispatcher: Arc<dyn NotificationDispatcher>,
) -> Result<Backend> {
    let database_path = config.database_path();
    info!("Opening tuition database at {:?}", database_path);

    let store = SqliteKeyValueStore::open(&database_path).await?;

    Ok(Backend::new(
        Arc::new(store),
        Arc::new(SystemClock),
        dispatcher,
        config.reminders.clone(),
    ))
}
