//! Date-level schedule queries and one-time schedule edits.

use chrono::NaiveDate;
use log::{info, warn};
use std::sync::Arc;

use crate::backend::domain::class_time::{format_class_time, parse_class_time};
use crate::backend::domain::clock::Clock;
use crate::backend::domain::errors::{DomainError, DomainResult};
use crate::backend::domain::schedule_resolver::resolve;
use crate::backend::storage::traits::{
    ClassEntryStorage, KeyValueStore, OneTimeScheduleStorage, StudentStorage,
};
use crate::backend::storage::{ClassEntryRepository, OneTimeScheduleRepository, StudentRepository};
use shared::{ClassStatus, OneTimeSchedule, ResolvedClass, Student, TodayClass, Weekday};

/// Service resolving which classes happen on a date and editing one-time schedules
#[derive(Clone)]
pub struct ScheduleService {
    student_repository: StudentRepository,
    schedule_repository: OneTimeScheduleRepository,
    entry_repository: ClassEntryRepository,
    clock: Arc<dyn Clock>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            student_repository: StudentRepository::new(store.clone()),
            schedule_repository: OneTimeScheduleRepository::new(store.clone()),
            entry_repository: ClassEntryRepository::new(store),
            clock,
        }
    }

    /// Classes taking place on a date
    pub async fn classes_for_date(&self, date: NaiveDate) -> Vec<ResolvedClass> {
        let students = self.student_repository.list_students().await;
        let schedules = self.schedule_repository.list_schedules().await;
        resolve(date, &students, &schedules)
    }

    /// Today's classes with their progress relative to the clock
    pub async fn todays_classes(&self) -> Vec<TodayClass> {
        let now = self.clock.local_now();
        let today = now.date();
        let classes = self.classes_for_date(today).await;
        let entries = self.entry_repository.list_entries().await;

        info!("Found {} classes for {}", classes.len(), today);

        classes
            .into_iter()
            .map(|class| {
                let upcoming = match parse_class_time(&class.time) {
                    Some(time) => {
                        let class_at = today.and_time(time);
                        (class_at >= now).then(|| {
                            let minutes = (class_at - now).num_minutes();
                            ClassStatus::Upcoming {
                                hours: minutes / 60,
                                minutes: minutes % 60,
                            }
                        })
                    }
                    None => {
                        warn!(
                            "Unreadable class time '{}' for student {}",
                            class.time, class.student.id
                        );
                        None
                    }
                };

                let status = upcoming.unwrap_or_else(|| {
                    let recorded = entries
                        .iter()
                        .any(|entry| entry.student_id == class.student.id && entry.date == today);
                    if recorded {
                        ClassStatus::Finished
                    } else {
                        ClassStatus::Started
                    }
                });

                TodayClass { class, status }
            })
            .collect()
    }

    /// Set the class time for one date, overriding or adding to the weekly schedule
    pub async fn set_time_for_date(
        &self,
        student_id: &str,
        date: NaiveDate,
        time: &str,
    ) -> DomainResult<OneTimeSchedule> {
        info!("Setting class time for student {} on {} to {}", student_id, date, time);

        let time = parse_class_time(time)
            .map(format_class_time)
            .ok_or_else(|| DomainError::validation(format!("Invalid class time: '{}'", time.trim())))?;
        self.require_student(student_id).await?;

        let schedule = match self.schedule_repository.find_schedule(student_id, date).await? {
            Some(mut existing) => {
                existing.time = time;
                existing
            }
            None => self.new_schedule(student_id, date, time),
        };
        self.schedule_repository.save_schedule(&schedule).await?;

        info!("Saved one-time schedule {} for student {}", schedule.id, student_id);
        Ok(schedule)
    }

    /// Cancel a student's class on one date.
    ///
    /// A weekly class is hidden with a removal marker; a one-time addition is
    /// deleted. Rejected once a class entry has been recorded for that date.
    pub async fn cancel_class_for_date(&self, student_id: &str, date: NaiveDate) -> DomainResult<()> {
        info!("Cancelling class for student {} on {}", student_id, date);

        let student = self.require_student(student_id).await?;

        let recorded = self
            .entry_repository
            .list_entries_for_student(student_id)
            .await
            .iter()
            .any(|entry| entry.date == date);
        if recorded {
            warn!("Refusing to cancel class for {} on {}: already recorded", student_id, date);
            return Err(DomainError::validation(
                "A class entry already exists for this date, delete it before cancelling the class",
            ));
        }

        let existing = self.schedule_repository.find_schedule(student_id, date).await?;

        if student.has_weekly_class_on(Weekday::of(date)) {
            let mut marker = existing.unwrap_or_else(|| self.new_schedule(student_id, date, String::new()));
            marker.time = String::new();
            self.schedule_repository.save_schedule(&marker).await?;
            info!("Weekly class for {} on {} marked as removed", student.name, date);
        } else if let Some(addition) = existing {
            self.schedule_repository.delete_schedule(&addition.id).await?;
            info!("Deleted one-time class {} for {}", addition.id, student.name);
        } else {
            info!("No class to cancel for {} on {}", student.name, date);
        }

        Ok(())
    }

    /// Drop any one-time change for a date so the weekly schedule applies again.
    /// Returns whether a record was removed.
    pub async fn restore_weekly_for_date(&self, student_id: &str, date: NaiveDate) -> DomainResult<bool> {
        info!("Restoring weekly schedule for student {} on {}", student_id, date);

        match self.schedule_repository.find_schedule(student_id, date).await? {
            Some(schedule) => Ok(self.schedule_repository.delete_schedule(&schedule.id).await?),
            None => Ok(false),
        }
    }

    pub async fn delete_one_time_schedule(&self, schedule_id: &str) -> DomainResult<()> {
        info!("Deleting one-time schedule {}", schedule_id);

        if !self.schedule_repository.delete_schedule(schedule_id).await? {
            warn!("One-time schedule not found: {}", schedule_id);
            return Err(DomainError::not_found("One-time schedule", schedule_id));
        }
        Ok(())
    }

    async fn require_student(&self, student_id: &str) -> DomainResult<Student> {
        self.student_repository
            .get_student(student_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Student", student_id))
    }

    fn new_schedule(&self, student_id: &str, date: NaiveDate, time: String) -> OneTimeSchedule {
        let now = self.clock.utc_now();
        OneTimeSchedule {
            id: OneTimeSchedule::generate_id(now.timestamp_millis() as u64),
            student_id: student_id.to_string(),
            date,
            time,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::clock::FixedClock;
    use crate::backend::test_utils::TestEnvironment;
    use shared::ScheduleOrigin;

    // 2025-01-13 is a Monday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 13).unwrap()
    }

    #[tokio::test]
    async fn test_bob_monday_removal() {
        let env = TestEnvironment::new();
        let bob = env
            .create_student("Bob", &[(Weekday::Monday, "10:00")], 12, None)
            .await;

        assert_eq!(env.schedule_service.classes_for_date(monday()).await.len(), 1);

        env.schedule_service
            .cancel_class_for_date(&bob.id, monday())
            .await
            .expect("Failed to cancel class");

        let classes = env.schedule_service.classes_for_date(monday()).await;
        assert!(classes.iter().all(|c| c.student.id != bob.id));

        // Re-adding with a time gives exactly one override
        env.schedule_service
            .set_time_for_date(&bob.id, monday(), "11:30")
            .await
            .expect("Failed to set time");
        let classes = env.schedule_service.classes_for_date(monday()).await;
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].time, "11:30");
        assert_eq!(classes[0].origin, ScheduleOrigin::OneTime);
        assert_eq!(env.schedules().await.len(), 1);
    }

    #[tokio::test]
    async fn test_set_time_updates_existing_record() {
        let env = TestEnvironment::new();
        let cara = env
            .create_student("Cara", &[(Weekday::Friday, "09:00")], 12, None)
            .await;

        let first = env
            .schedule_service
            .set_time_for_date(&cara.id, monday(), "15:00")
            .await
            .unwrap();
        let second = env
            .schedule_service
            .set_time_for_date(&cara.id, monday(), "9:45")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.time, "09:45");
        let schedules = env.schedules().await;
        assert_eq!(schedules.len(), 1);
    }

    #[tokio::test]
    async fn test_set_time_validation() {
        let env = TestEnvironment::new();
        let cara = env
            .create_student("Cara", &[(Weekday::Friday, "09:00")], 12, None)
            .await;

        let bad_time = env.schedule_service.set_time_for_date(&cara.id, monday(), "25:00").await;
        assert!(matches!(bad_time, Err(DomainError::Validation(_))));

        let unknown = env.schedule_service.set_time_for_date("ghost", monday(), "10:00").await;
        assert!(matches!(unknown, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_cancel_one_time_addition_deletes_it() {
        let env = TestEnvironment::new();
        let cara = env
            .create_student("Cara", &[(Weekday::Friday, "09:00")], 12, None)
            .await;
        env.schedule_service
            .set_time_for_date(&cara.id, monday(), "15:00")
            .await
            .unwrap();

        env.schedule_service
            .cancel_class_for_date(&cara.id, monday())
            .await
            .unwrap();

        assert!(env.schedules().await.is_empty());
        assert!(env.schedule_service.classes_for_date(monday()).await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_rejected_after_entry_recorded() {
        let env = TestEnvironment::new();
        let bob = env
            .create_student("Bob", &[(Weekday::Monday, "10:00")], 12, None)
            .await;
        env.cycle_service
            .add_class_entry(env.entry_request(&bob.id, Some(monday())))
            .await
            .unwrap();

        let result = env.schedule_service.cancel_class_for_date(&bob.id, monday()).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(env.schedules().await.is_empty());
    }

    #[tokio::test]
    async fn test_restore_weekly_and_delete_schedule() {
        let env = TestEnvironment::new();
        let bob = env
            .create_student("Bob", &[(Weekday::Monday, "10:00")], 12, None)
            .await;
        env.schedule_service
            .cancel_class_for_date(&bob.id, monday())
            .await
            .unwrap();

        assert!(env.schedule_service.restore_weekly_for_date(&bob.id, monday()).await.unwrap());
        assert!(!env.schedule_service.restore_weekly_for_date(&bob.id, monday()).await.unwrap());
        assert_eq!(env.schedule_service.classes_for_date(monday()).await.len(), 1);

        let schedule = env
            .schedule_service
            .set_time_for_date(&bob.id, monday(), "12:00")
            .await
            .unwrap();
        env.schedule_service
            .delete_one_time_schedule(&schedule.id)
            .await
            .expect("Failed to delete schedule");
        let missing = env.schedule_service.delete_one_time_schedule(&schedule.id).await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_todays_classes_status() {
        // Monday 2025-01-13, 09:15 local
        let env = TestEnvironment::with_clock(FixedClock::at(2025, 1, 13, 9, 15).unwrap());
        let early = env
            .create_student("Early", &[(Weekday::Monday, "08:00")], 12, None)
            .await;
        let done = env
            .create_student("Done", &[(Weekday::Monday, "07:30")], 12, None)
            .await;
        let later = env
            .create_student("Later", &[(Weekday::Monday, "11:20")], 12, None)
            .await;
        let soon = env
            .create_student("Soon", &[(Weekday::Monday, "09:50")], 12, None)
            .await;
        env.cycle_service
            .add_class_entry(env.entry_request(&done.id, None))
            .await
            .unwrap();

        let today = env.schedule_service.todays_classes().await;
        let status_of = |id: &str| {
            today
                .iter()
                .find(|c| c.class.student.id == id)
                .map(|c| c.status.clone())
                .expect("class should be listed")
        };

        assert_eq!(today.len(), 4);
        assert_eq!(status_of(&early.id), ClassStatus::Started);
        assert_eq!(status_of(&done.id), ClassStatus::Finished);
        assert_eq!(status_of(&later.id), ClassStatus::Upcoming { hours: 2, minutes: 5 });
        assert_eq!(status_of(&soon.id), ClassStatus::Upcoming { hours: 0, minutes: 35 });
        assert_eq!(status_of(&soon.id).describe(), "35m remaining");
    }
}
