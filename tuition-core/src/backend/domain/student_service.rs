use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::domain::class_time::{format_class_time, parse_class_time};
use crate::backend::domain::clock::Clock;
use crate::backend::domain::errors::{DomainError, DomainResult};
use crate::backend::storage::traits::{
    ClassEntryStorage, FeeEntryStorage, KeyValueStore, OneTimeScheduleStorage, StudentStorage,
};
use crate::backend::storage::{
    ClassEntryRepository, FeeEntryRepository, OneTimeScheduleRepository, StudentRepository,
};
use shared::{Student, StudentDetails, Weekday, DEFAULT_CLASSES_PER_CYCLE};

const MAX_NAME_LENGTH: usize = 100;
const MIN_MOBILE_DIGITS: usize = 6;
const MAX_MOBILE_DIGITS: usize = 15;

/// Counts of records removed by a cascading student delete
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedStudent {
    pub student: Student,
    pub class_entries: usize,
    pub schedules: usize,
    pub fee_entries: usize,
}

/// Service for managing students
#[derive(Clone)]
pub struct StudentService {
    student_repository: StudentRepository,
    entry_repository: ClassEntryRepository,
    schedule_repository: OneTimeScheduleRepository,
    fee_repository: FeeEntryRepository,
    clock: Arc<dyn Clock>,
}

impl StudentService {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            student_repository: StudentRepository::new(store.clone()),
            entry_repository: ClassEntryRepository::new(store.clone()),
            schedule_repository: OneTimeScheduleRepository::new(store.clone()),
            fee_repository: FeeEntryRepository::new(store),
            clock,
        }
    }

    /// Create a new student
    pub async fn create_student(&self, details: StudentDetails) -> DomainResult<Student> {
        info!("Creating student: name={}", details.name.trim());

        let now = self.clock.utc_now();
        let student = self.build_student(
            Student::generate_id(now.timestamp_millis() as u64),
            now,
            details,
        )?;

        self.student_repository.save_student(&student).await?;

        info!("Created student: {} with ID: {}", student.name, student.id);
        Ok(student)
    }

    /// Replace the editable fields of an existing student
    pub async fn update_student(&self, student_id: &str, details: StudentDetails) -> DomainResult<Student> {
        info!("Updating student: {}", student_id);

        let existing = self
            .student_repository
            .get_student(student_id)
            .await?
            .ok_or_else(|| {
                warn!("Student not found: {}", student_id);
                DomainError::not_found("Student", student_id)
            })?;

        let student = self.build_student(existing.id, existing.created_at, details)?;
        self.student_repository.save_student(&student).await?;

        info!("Updated student: {} with ID: {}", student.name, student.id);
        Ok(student)
    }

    pub async fn get_student(&self, student_id: &str) -> DomainResult<Student> {
        debug!("Getting student: {}", student_id);
        self.student_repository
            .get_student(student_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Student", student_id))
    }

    /// List all students; a failed read yields an empty roster
    pub async fn list_students(&self) -> Vec<Student> {
        let students = self.student_repository.list_students().await;
        debug!("Found {} students", students.len());
        students
    }

    /// Delete a student, then every record that references it.
    ///
    /// The child deletes run independently after the student is gone; a
    /// failure part-way leaves orphaned children and is returned as an error.
    pub async fn delete_student(&self, student_id: &str) -> DomainResult<DeletedStudent> {
        info!("Deleting student: {}", student_id);

        let student = self
            .student_repository
            .get_student(student_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Student", student_id))?;

        self.student_repository.delete_student(student_id).await?;

        let class_entries = self.entry_repository.delete_entries_for_student(student_id).await?;
        let schedules = self
            .schedule_repository
            .delete_schedules_for_student(student_id)
            .await?;
        let fee_entries = self.fee_repository.delete_fees_for_student(student_id).await?;

        info!(
            "Deleted student {} ({} class entries, {} schedules, {} fee entries)",
            student.name, class_entries, schedules, fee_entries
        );

        Ok(DeletedStudent {
            student,
            class_entries,
            schedules,
            fee_entries,
        })
    }

    fn build_student(
        &self,
        id: String,
        created_at: chrono::DateTime<chrono::Utc>,
        details: StudentDetails,
    ) -> DomainResult<Student> {
        let name = details.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("Student name cannot be empty"));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(DomainError::validation(format!(
                "Student name cannot be longer than {} characters",
                MAX_NAME_LENGTH
            )));
        }

        let mut weekdays: Vec<Weekday> = Vec::new();
        for day in details.weekdays {
            if !weekdays.contains(&day) {
                weekdays.push(day);
            }
        }
        if weekdays.is_empty() {
            return Err(DomainError::validation("Select at least one weekday"));
        }

        let times = normalize_times(&weekdays, &details.times)?;

        let classes_per_cycle = details.classes_per_cycle.unwrap_or(DEFAULT_CLASSES_PER_CYCLE);
        if classes_per_cycle < 1 {
            return Err(DomainError::validation("Classes per cycle must be at least 1"));
        }
        let initial_classes_completed = details.initial_classes_completed.unwrap_or(0);
        if initial_classes_completed > classes_per_cycle {
            return Err(DomainError::validation(format!(
                "Initial classes completed ({}) cannot exceed classes per cycle ({})",
                initial_classes_completed, classes_per_cycle
            )));
        }

        if let Some(fee) = details.tuition_fee {
            if !fee.is_finite() || fee < 0.0 {
                return Err(DomainError::validation("Tuition fee must be a non-negative amount"));
            }
        }

        let mobile_number = match details.mobile_number.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(normalize_mobile_number(raw)?),
            _ => None,
        };

        Ok(Student {
            id,
            name,
            weekdays,
            times,
            classes_per_cycle,
            initial_classes_completed,
            tuition_fee: details.tuition_fee,
            mobile_number,
            created_at,
        })
    }
}

/// Keep one canonical "HH:MM" time per selected weekday
fn normalize_times(
    weekdays: &[Weekday],
    times: &BTreeMap<Weekday, String>,
) -> DomainResult<BTreeMap<Weekday, String>> {
    let missing: Vec<&str> = weekdays
        .iter()
        .filter(|day| times.get(*day).map_or(true, |t| t.trim().is_empty()))
        .map(|day| day.name())
        .collect();
    if !missing.is_empty() {
        return Err(DomainError::validation(format!(
            "Missing time for: {}",
            missing.join(", ")
        )));
    }

    let mut normalized = BTreeMap::new();
    for day in weekdays {
        let raw = times.get(day).map(|t| t.trim()).unwrap_or_default();
        let time = parse_class_time(raw).ok_or_else(|| {
            DomainError::validation(format!("Invalid time for {}: '{}'", day.name(), raw))
        })?;
        normalized.insert(*day, format_class_time(time));
    }
    Ok(normalized)
}

/// Strip spaces, dashes and '+' and require 6 to 15 digits
pub fn normalize_mobile_number(raw: &str) -> DomainResult<String> {
    let digits: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '+')
        .collect();

    let valid_length = (MIN_MOBILE_DIGITS..=MAX_MOBILE_DIGITS).contains(&digits.len());
    if !valid_length || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::validation(format!(
            "Invalid mobile number: '{}'",
            raw
        )));
    }
    Ok(digits)
}
