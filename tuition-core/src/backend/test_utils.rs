//! Test environment shared by the domain service tests.
//!
//! Every environment gets its own in-memory store and a clock pinned to
//! Wednesday 2025-01-15 09:00 unless a different clock is given.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::domain::calendar::CalendarService;
use crate::backend::domain::clock::FixedClock;
use crate::backend::domain::cycle_service::CycleService;
use crate::backend::domain::fee_service::FeeService;
use crate::backend::domain::schedule_service::ScheduleService;
use crate::backend::domain::student_service::StudentService;
use crate::backend::storage::traits::{
    ClassEntryStorage, FeeEntryStorage, KeyValueStore, OneTimeScheduleStorage,
};
use crate::backend::storage::{
    ClassEntryRepository, FeeEntryRepository, MemoryKeyValueStore, OneTimeScheduleRepository,
};
use shared::{AddClassEntryRequest, ClassEntry, FeeEntry, OneTimeSchedule, Student, StudentDetails, Weekday};

pub struct TestEnvironment {
    pub store: MemoryKeyValueStore,
    pub clock: Arc<FixedClock>,
    pub student_service: StudentService,
    pub schedule_service: ScheduleService,
    pub calendar_service: CalendarService,
    pub cycle_service: CycleService,
    pub fee_service: FeeService,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self::with_clock(FixedClock::at(2025, 1, 15, 9, 0).expect("valid test instant"))
    }

    pub fn with_clock(clock: FixedClock) -> Self {
        let store = MemoryKeyValueStore::new();
        let clock = Arc::new(clock);
        let shared_store: Arc<dyn KeyValueStore> = Arc::new(store.clone());

        Self {
            student_service: StudentService::new(shared_store.clone(), clock.clone()),
            schedule_service: ScheduleService::new(shared_store.clone(), clock.clone()),
            calendar_service: CalendarService::new(shared_store.clone()),
            cycle_service: CycleService::new(shared_store.clone(), clock.clone()),
            fee_service: FeeService::new(shared_store, clock.clone()),
            store,
            clock,
        }
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::new(self.store.clone())
    }

    /// Create a student through the service with the given weekly schedule
    pub async fn create_student(
        &self,
        name: &str,
        schedule: &[(Weekday, &str)],
        classes_per_cycle: u32,
        tuition_fee: Option<f64>,
    ) -> Student {
        let mut details = student_details(name, schedule);
        details.classes_per_cycle = Some(classes_per_cycle);
        details.tuition_fee = tuition_fee;
        self.student_service
            .create_student(details)
            .await
            .expect("Failed to create test student")
    }

    pub fn entry_request(&self, student_id: &str, date: Option<NaiveDate>) -> AddClassEntryRequest {
        AddClassEntryRequest {
            student_id: student_id.to_string(),
            date,
            topics: None,
            remarks: None,
        }
    }

    pub async fn schedules(&self) -> Vec<OneTimeSchedule> {
        OneTimeScheduleRepository::new(self.store())
            .list_schedules()
            .await
    }

    pub async fn entries_for(&self, student_id: &str) -> Vec<ClassEntry> {
        ClassEntryRepository::new(self.store())
            .list_entries_for_student(student_id)
            .await
    }

    /// Write a fee directly, bypassing the service
    pub async fn save_fee(&self, fee: &FeeEntry) {
        FeeEntryRepository::new(self.store())
            .save_fee(fee)
            .await
            .expect("Failed to save fee");
    }
}

pub fn student_details(name: &str, schedule: &[(Weekday, &str)]) -> StudentDetails {
    StudentDetails {
        name: name.to_string(),
        weekdays: schedule.iter().map(|(day, _)| *day).collect(),
        times: schedule
            .iter()
            .map(|(day, time)| (*day, time.to_string()))
            .collect::<BTreeMap<_, _>>(),
        classes_per_cycle: None,
        initial_classes_completed: None,
        tuition_fee: None,
        mobile_number: None,
    }
}
