//! # Cycle Service
//!
//! Tracks progress through a student's billing cycle and records completed
//! classes. Progress is always derived from the stored entries:
//!
//! ```text
//! total_classes = entries + initial_classes_completed
//! is_complete   = total_classes >= classes_per_cycle
//! ```
//!
//! Recording a class that completes the cycle emits one fee entry for the
//! current month label, if the student has a tuition fee. The completion
//! guard, the insert and the fee check-then-create run under a per-student
//! lock so concurrent adds cannot slip past the guard or duplicate a fee.

use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::backend::domain::calendar::month_label;
use crate::backend::domain::clock::Clock;
use crate::backend::domain::errors::{DomainError, DomainResult};
use crate::backend::storage::traits::{
    ClassEntryStorage, FeeEntryStorage, KeyValueStore, StudentStorage,
};
use crate::backend::storage::{ClassEntryRepository, FeeEntryRepository, StudentRepository};
use shared::{
    AddClassEntryRequest, AddClassEntryResponse, ClassEntry, CycleProgress, EntryDateGroup,
    FeeEntry, FeeStatus, Student,
};

/// One async mutex per student id
#[derive(Clone, Default)]
struct StudentLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl StudentLocks {
    async fn for_student(&self, student_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(student_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Compute cycle progress from an entry count
pub fn compute_progress(student: &Student, entry_count: usize) -> CycleProgress {
    let total_classes = u32::try_from(entry_count)
        .unwrap_or(u32::MAX)
        .saturating_add(student.initial_classes_completed);
    let classes_per_cycle = student.classes_per_cycle.max(1);
    CycleProgress {
        student_id: student.id.clone(),
        total_classes,
        classes_per_cycle,
        is_complete: total_classes >= classes_per_cycle,
        remaining: classes_per_cycle.saturating_sub(total_classes),
        progress: (total_classes as f64 / classes_per_cycle as f64).min(1.0),
    }
}

/// Empty or whitespace-only notes are stored as absent
fn clean_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// Service for class entries and cycle completion
#[derive(Clone)]
pub struct CycleService {
    student_repository: StudentRepository,
    entry_repository: ClassEntryRepository,
    fee_repository: FeeEntryRepository,
    clock: Arc<dyn Clock>,
    locks: StudentLocks,
}

impl CycleService {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            student_repository: StudentRepository::new(store.clone()),
            entry_repository: ClassEntryRepository::new(store.clone()),
            fee_repository: FeeEntryRepository::new(store),
            clock,
            locks: StudentLocks::default(),
        }
    }

    /// Current cycle progress for a student
    pub async fn get_progress(&self, student_id: &str) -> DomainResult<CycleProgress> {
        let student = self.require_student(student_id).await?;
        let count = self.entry_repository.count_entries_for_student(student_id).await?;
        Ok(compute_progress(&student, count))
    }

    /// Record a completed class, emitting a fee when it completes the cycle
    pub async fn add_class_entry(&self, request: AddClassEntryRequest) -> DomainResult<AddClassEntryResponse> {
        info!("Adding class entry for student: {}", request.student_id);

        let lock = self.locks.for_student(&request.student_id).await;
        let _guard = lock.lock().await;

        let student = self.require_student(&request.student_id).await?;
        let count = self
            .entry_repository
            .count_entries_for_student(&student.id)
            .await?;
        let before = compute_progress(&student, count);
        if before.is_complete {
            warn!(
                "Cycle already complete for {} ({}/{})",
                student.name, before.total_classes, before.classes_per_cycle
            );
            return Err(DomainError::CycleComplete {
                student_id: student.id,
                total_classes: before.total_classes,
                classes_per_cycle: before.classes_per_cycle,
            });
        }

        let now = self.clock.utc_now();
        let today = self.clock.today();
        let entry = ClassEntry {
            id: ClassEntry::generate_id(now.timestamp_millis() as u64),
            student_id: student.id.clone(),
            date: request.date.unwrap_or(today),
            created_at: now,
            topics: clean_note(request.topics),
            remarks: clean_note(request.remarks),
        };
        self.entry_repository.save_entry(&entry).await?;
        info!("Recorded class {} for {} on {}", entry.id, student.name, entry.date);

        let progress = compute_progress(&student, count + 1);
        let fee_entry = if progress.is_complete {
            self.emit_cycle_fee(&student).await?
        } else {
            None
        };

        Ok(AddClassEntryResponse {
            entry,
            progress,
            fee_entry,
        })
    }

    /// Create this month's fee for a completed cycle unless one already exists
    async fn emit_cycle_fee(&self, student: &Student) -> DomainResult<Option<FeeEntry>> {
        let Some(amount) = student.tuition_fee else {
            debug!("Cycle complete for {} but no tuition fee configured", student.name);
            return Ok(None);
        };

        let today = self.clock.today();
        let month = month_label(today);
        if let Some(existing) = self
            .fee_repository
            .find_fee_for_month(&student.id, &month)
            .await?
        {
            info!("Fee {} already exists for {} in {}", existing.id, student.name, month);
            return Ok(None);
        }

        let now = self.clock.utc_now();
        let fee = FeeEntry {
            id: FeeEntry::generate_id(&student.id, now.timestamp_millis() as u64),
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            amount,
            month,
            date: today,
            status: FeeStatus::PaymentDue,
            created_at: now,
        };
        self.fee_repository.save_fee(&fee).await?;

        info!("Cycle complete for {}: created fee {} for {}", student.name, fee.id, fee.month);
        Ok(Some(fee))
    }

    /// Delete every class entry for a student, starting a new cycle.
    /// Fee history and schedules are untouched. Returns the number removed.
    pub async fn reset_cycle(&self, student_id: &str) -> DomainResult<usize> {
        info!("Resetting cycle for student: {}", student_id);

        let lock = self.locks.for_student(student_id).await;
        let _guard = lock.lock().await;

        let student = self.require_student(student_id).await?;
        let removed = self
            .entry_repository
            .delete_entries_for_student(student_id)
            .await?;

        info!("Reset cycle for {}: removed {} entries", student.name, removed);
        Ok(removed)
    }

    pub async fn delete_class_entry(&self, entry_id: &str) -> DomainResult<()> {
        info!("Deleting class entry: {}", entry_id);

        if !self.entry_repository.delete_entry(entry_id).await? {
            warn!("Class entry not found: {}", entry_id);
            return Err(DomainError::not_found("Class entry", entry_id));
        }
        Ok(())
    }

    /// Delete all of a student's entries recorded on one date
    pub async fn delete_entries_for_date(&self, student_id: &str, date: NaiveDate) -> DomainResult<usize> {
        info!("Deleting class entries for student {} on {}", student_id, date);

        let removed = self
            .entry_repository
            .delete_entries_for_date(student_id, date)
            .await?;
        debug!("Removed {} entries", removed);
        Ok(removed)
    }

    /// A student's entries grouped by date, newest date first
    pub async fn entries_by_date(&self, student_id: &str) -> Vec<EntryDateGroup> {
        let mut groups: BTreeMap<NaiveDate, Vec<ClassEntry>> = BTreeMap::new();
        for entry in self.entry_repository.list_entries_for_student(student_id).await {
            groups.entry(entry.date).or_default().push(entry);
        }

        groups
            .into_iter()
            .rev()
            .map(|(date, entries)| EntryDateGroup { date, entries })
            .collect()
    }

    async fn require_student(&self, student_id: &str) -> DomainResult<Student> {
        self.student_repository
            .get_student(student_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Student", student_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_utils::TestEnvironment;
    use shared::Weekday;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_alice_completes_cycle_with_one_fee() {
        let env = TestEnvironment::new();
        let alice = env
            .create_student("Alice", &[(Weekday::Monday, "10:00")], 3, Some(1000.0))
            .await;

        let first = env.cycle_service.add_class_entry(env.entry_request(&alice.id, Some(day(6)))).await.unwrap();
        let second = env.cycle_service.add_class_entry(env.entry_request(&alice.id, Some(day(8)))).await.unwrap();
        assert!(first.fee_entry.is_none());
        assert!(second.fee_entry.is_none());
        assert_eq!(second.progress.remaining, 1);

        let third = env
            .cycle_service
            .add_class_entry(env.entry_request(&alice.id, Some(day(13))))
            .await
            .expect("Failed to add third entry");
        assert!(third.progress.is_complete);
        assert_eq!(third.progress.progress, 1.0);
        let fee = third.fee_entry.expect("third entry should emit a fee");
        assert_eq!(fee.amount, 1000.0);
        assert_eq!(fee.status, FeeStatus::PaymentDue);
        assert_eq!(fee.month, "January 2025");
        assert_eq!(fee.date, env.clock.today());
        assert_eq!(fee.student_name, "Alice");

        let fourth = env
            .cycle_service
            .add_class_entry(env.entry_request(&alice.id, Some(day(15))))
            .await;
        match fourth {
            Err(DomainError::CycleComplete {
                total_classes,
                classes_per_cycle,
                ..
            }) => {
                assert_eq!(total_classes, 3);
                assert_eq!(classes_per_cycle, 3);
            }
            other => panic!("expected CycleComplete, got {:?}", other),
        }

        assert_eq!(env.entries_for(&alice.id).await.len(), 3);
        assert_eq!(env.fee_service.list_fees(Some(&alice.id)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_no_duplicate_fee_in_same_month_after_reset() {
        let env = TestEnvironment::new();
        let alice = env
            .create_student("Alice", &[(Weekday::Monday, "10:00")], 1, Some(800.0))
            .await;

        let first = env.cycle_service.add_class_entry(env.entry_request(&alice.id, None)).await.unwrap();
        assert!(first.fee_entry.is_some());

        env.cycle_service.reset_cycle(&alice.id).await.unwrap();
        let again = env.cycle_service.add_class_entry(env.entry_request(&alice.id, None)).await.unwrap();

        assert!(again.progress.is_complete);
        assert!(again.fee_entry.is_none());
        assert_eq!(env.fee_service.list_fees(Some(&alice.id)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_adds_respect_cycle_guard() {
        let env = TestEnvironment::new();
        let alice = env
            .create_student("Alice", &[(Weekday::Monday, "10:00")], 2, Some(300.0))
            .await;

        let mut handles = Vec::new();
        for _ in 0..5 {
            let service = env.cycle_service.clone();
            let request = env.entry_request(&alice.id, None);
            handles.push(tokio::spawn(async move { service.add_class_entry(request).await }));
        }

        let mut completed = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.expect("task panicked") {
                Ok(_) => completed += 1,
                Err(e) if e.is_cycle_complete() => rejected += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(completed, 2);
        assert_eq!(rejected, 3);
        assert_eq!(env.entries_for(&alice.id).await.len(), 2);
        assert_eq!(env.fee_service.list_fees(Some(&alice.id)).await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_for_different_students_all_persist() {
        let env = TestEnvironment::new();
        let mut students = Vec::new();
        for i in 0..8 {
            let student = env
                .create_student(&format!("Student {}", i), &[(Weekday::Monday, "10:00")], 50, None)
                .await;
            students.push(student);
        }

        let mut handles = Vec::new();
        for student in &students {
            for _ in 0..5 {
                // Separate services share only the store, like independent callers
                let service = CycleService::new(env.store(), env.clock.clone());
                let request = env.entry_request(&student.id, None);
                handles.push(tokio::spawn(async move { service.add_class_entry(request).await }));
            }
        }
        for handle in handles {
            handle.await.expect("task panicked").expect("Failed to add entry");
        }

        for student in &students {
            assert_eq!(env.entries_for(&student.id).await.len(), 5);
            let progress = env.cycle_service.get_progress(&student.id).await.unwrap();
            assert_eq!(progress.total_classes, 5);
        }
    }

    #[test]
    fn test_progress_saturates_on_huge_counts() {
        let mut student = shared::Student {
            id: "student::1".to_string(),
            name: "Alice".to_string(),
            weekdays: vec![Weekday::Monday],
            times: [(Weekday::Monday, "10:00".to_string())].into_iter().collect(),
            classes_per_cycle: 4,
            initial_classes_completed: 3,
            tuition_fee: None,
            mobile_number: None,
            created_at: chrono::Utc::now(),
        };

        let progress = compute_progress(&student, usize::MAX);
        assert_eq!(progress.total_classes, u32::MAX);
        assert!(progress.is_complete);
        assert_eq!(progress.remaining, 0);

        student.initial_classes_completed = 0;
        assert_eq!(compute_progress(&student, 3).total_classes, 3);
    }

    #[tokio::test]
    async fn test_initial_classes_count_towards_cycle() {
        let env = TestEnvironment::new();
        let mut details = crate::backend::test_utils::student_details("Bob", &[(Weekday::Monday, "10:00")]);
        details.classes_per_cycle = Some(4);
        details.initial_classes_completed = Some(3);
        details.tuition_fee = Some(0.0);
        let bob = env.student_service.create_student(details).await.unwrap();

        let progress = env.cycle_service.get_progress(&bob.id).await.unwrap();
        assert_eq!(progress.total_classes, 3);
        assert_eq!(progress.remaining, 1);

        let response = env.cycle_service.add_class_entry(env.entry_request(&bob.id, None)).await.unwrap();
        assert!(response.progress.is_complete);
        // A zero fee is still a configured fee
        assert_eq!(response.fee_entry.map(|f| f.amount), Some(0.0));

        let removed = env.cycle_service.reset_cycle(&bob.id).await.unwrap();
        assert_eq!(removed, 1);
        let progress = env.cycle_service.get_progress(&bob.id).await.unwrap();
        assert_eq!(progress.total_classes, 3);
        assert_eq!(env.fee_service.list_fees(Some(&bob.id)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_complete_cycle_without_fee() {
        let env = TestEnvironment::new();
        let cara = env
            .create_student("Cara", &[(Weekday::Friday, "10:00")], 1, None)
            .await;

        let response = env.cycle_service.add_class_entry(env.entry_request(&cara.id, None)).await.unwrap();

        assert!(response.progress.is_complete);
        assert!(response.fee_entry.is_none());
        assert!(env.fee_service.list_fees(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_add_entry_for_unknown_student() {
        let env = TestEnvironment::new();
        let result = env.cycle_service.add_class_entry(env.entry_request("ghost", None)).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
        assert!(env.cycle_service.entries_by_date("ghost").await.is_empty());
    }

    #[tokio::test]
    async fn test_notes_are_trimmed() {
        let env = TestEnvironment::new();
        let bob = env
            .create_student("Bob", &[(Weekday::Monday, "10:00")], 12, None)
            .await;
        let mut request = env.entry_request(&bob.id, None);
        request.topics = Some("  Fractions ".to_string());
        request.remarks = Some("   ".to_string());

        let response = env.cycle_service.add_class_entry(request).await.unwrap();

        assert_eq!(response.entry.topics.as_deref(), Some("Fractions"));
        assert_eq!(response.entry.remarks, None);
        assert_eq!(response.entry.date, env.clock.today());
    }

    #[tokio::test]
    async fn test_entries_by_date_and_deletes() {
        let env = TestEnvironment::new();
        let bob = env
            .create_student("Bob", &[(Weekday::Monday, "10:00")], 12, None)
            .await;
        for date in [day(6), day(13), day(6), day(10)] {
            env.cycle_service
                .add_class_entry(env.entry_request(&bob.id, Some(date)))
                .await
                .unwrap();
        }

        let groups = env.cycle_service.entries_by_date(&bob.id).await;
        let dates: Vec<NaiveDate> = groups.iter().map(|g| g.date).collect();
        assert_eq!(dates, vec![day(13), day(10), day(6)]);
        assert_eq!(groups[2].entries.len(), 2);

        assert_eq!(env.cycle_service.delete_entries_for_date(&bob.id, day(6)).await.unwrap(), 2);
        let entry_id = groups[0].entries[0].id.clone();
        env.cycle_service
            .delete_class_entry(&entry_id)
            .await
            .expect("Failed to delete entry");
        let missing = env.cycle_service.delete_class_entry(&entry_id).await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));

        let progress = env.cycle_service.get_progress(&bob.id).await.unwrap();
        assert_eq!(progress.total_classes, 1);
    }
}
