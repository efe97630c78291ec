//! # Notification Service
//!
//! Hands planned class reminders to a [`NotificationDispatcher`]. Replanning
//! a student cancels everything under the student's identifier prefix before
//! scheduling again, so repeated replans never duplicate reminders.
//!
//! A whole-roster replan first cancels the entire reminder namespace, so
//! reminders of students that no longer exist are dropped too.
//!
//! Whole-roster replans go through [`NotificationService::request_replan_all`],
//! which allows a single pass in flight. Requests arriving meanwhile are
//! coalesced into one extra pass that the in-flight caller runs before
//! returning.
//!
//! Reminder failures are reported and logged, never propagated into data
//! operations.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::config::ReminderConfig;
use crate::backend::domain::clock::Clock;
use crate::backend::domain::notification_planner::{plan_reminders, reminder_prefix, REMINDER_NAMESPACE};
use crate::backend::storage::traits::{KeyValueStore, StudentStorage};
use crate::backend::storage::StudentRepository;
use shared::{ReplanFailure, ReplanReport, Student};

/// Delivery side of reminders, e.g. the OS notification scheduler
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Cancel every scheduled reminder whose identifier starts with the prefix
    async fn cancel(&self, identifier_prefix: &str) -> Result<()>;

    async fn schedule(&self, identifier: &str, fire_at: NaiveDateTime, title: &str, body: &str) -> Result<()>;
}

/// Dispatcher that only logs what it would schedule
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn cancel(&self, identifier_prefix: &str) -> Result<()> {
        debug!("Cancelling reminders with prefix {}", identifier_prefix);
        Ok(())
    }

    async fn schedule(&self, identifier: &str, fire_at: NaiveDateTime, title: &str, body: &str) -> Result<()> {
        info!("Reminder {} at {}: {} - {}", identifier, fire_at, title, body);
        Ok(())
    }
}

/// Result of asking for a whole-roster replan
#[derive(Debug, Clone, PartialEq)]
pub enum ReplanOutcome {
    /// This caller ran the replan; the report covers its final pass
    Completed(ReplanReport),
    /// A replan was already running and will run once more when it finishes
    Coalesced,
}

#[derive(Debug, Default)]
struct ReplanState {
    in_flight: bool,
    pending: bool,
}

/// Clears the in-flight flag if the running pass is dropped mid-way
struct InFlightGuard<'a> {
    state: &'a Mutex<ReplanState>,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = lock_state(self.state);
            state.in_flight = false;
            state.pending = false;
        }
    }
}

fn lock_state(state: &Mutex<ReplanState>) -> MutexGuard<'_, ReplanState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Service for planning class reminders
#[derive(Clone)]
pub struct NotificationService {
    student_repository: StudentRepository,
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    config: ReminderConfig,
    replan_state: Arc<Mutex<ReplanState>>,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        config: ReminderConfig,
    ) -> Self {
        Self {
            student_repository: StudentRepository::new(store),
            dispatcher,
            clock,
            config,
            replan_state: Arc::new(Mutex::new(ReplanState::default())),
        }
    }

    /// Replace a student's scheduled reminders. Returns how many were scheduled.
    pub async fn replan_student(&self, student: &Student) -> Result<usize> {
        if !self.config.enabled {
            debug!("Reminders disabled, skipping {}", student.name);
            return Ok(0);
        }

        self.dispatcher.cancel(&reminder_prefix(&student.id)).await?;

        let reminders = plan_reminders(student, self.clock.local_now(), &self.config);
        for reminder in &reminders {
            self.dispatcher
                .schedule(&reminder.identifier, reminder.fire_at, &reminder.title, &reminder.body)
                .await?;
        }

        debug!("Scheduled {} reminders for {}", reminders.len(), student.name);
        Ok(reminders.len())
    }

    /// Cancel all reminders of a student, e.g. after the student was deleted
    pub async fn cancel_student(&self, student_id: &str) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        self.dispatcher.cancel(&reminder_prefix(student_id)).await
    }

    /// Replan every student independently, collecting failures
    pub async fn replan_all(&self) -> ReplanReport {
        let mut report = ReplanReport::default();
        if !self.config.enabled {
            debug!("Reminders disabled, skipping replan");
            return report;
        }

        if let Err(e) = self.dispatcher.cancel(REMINDER_NAMESPACE).await {
            warn!("Failed to cancel existing reminders: {:#}", e);
        }

        let students = self.student_repository.list_students().await;
        info!("Replanning reminders for {} students", students.len());

        for student in &students {
            match self.replan_student(student).await {
                Ok(count) => {
                    report.students_planned += 1;
                    report.reminders_scheduled += count;
                }
                Err(e) => {
                    warn!("Failed to plan reminders for {}: {:#}", student.name, e);
                    report.failures.push(ReplanFailure {
                        student_id: student.id.clone(),
                        student_name: student.name.clone(),
                        message: format!("{:#}", e),
                    });
                }
            }
        }

        info!(
            "Replanned {} students: {} reminders, {} failures",
            report.students_planned,
            report.reminders_scheduled,
            report.failures.len()
        );
        report
    }

    /// Replan the whole roster unless a replan is already running
    pub async fn request_replan_all(&self) -> ReplanOutcome {
        {
            let mut state = lock_state(&self.replan_state);
            if state.in_flight {
                debug!("Replan already in flight, coalescing request");
                state.pending = true;
                return ReplanOutcome::Coalesced;
            }
            state.in_flight = true;
        }
        let mut guard = InFlightGuard {
            state: &self.replan_state,
            armed: true,
        };

        loop {
            let report = self.replan_all().await;

            // Pending check and in-flight release must share one lock
            let finished = {
                let mut state = lock_state(&self.replan_state);
                if state.pending {
                    state.pending = false;
                    false
                } else {
                    state.in_flight = false;
                    true
                }
            };
            if finished {
                guard.armed = false;
                return ReplanOutcome::Completed(report);
            }
            debug!("Running coalesced replan");
        }
    }
}
