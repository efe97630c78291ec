//! Calendar domain logic for the tuition tracker.
//!
//! Builds the month grid shown by the calendar screen: padding cells up to
//! the first weekday, then one cell per day carrying the classes resolved for
//! that date and how many completed classes were recorded on it.

use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::domain::errors::{DomainError, DomainResult};
use crate::backend::domain::schedule_resolver::resolve;
use crate::backend::storage::traits::{
    ClassEntryStorage, KeyValueStore, OneTimeScheduleStorage, StudentStorage,
};
use crate::backend::storage::{ClassEntryRepository, OneTimeScheduleRepository, StudentRepository};
use shared::{CalendarDay, CalendarDayType, CalendarMonth, ClassEntry, OneTimeSchedule, Student};

/// Human-readable cycle label for a date, e.g. "January 2025"
pub fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// Parse a "Month YYYY" label back to the first day of that month
pub fn parse_month_label(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("1 {}", label.trim()), "%d %B %Y").ok()
}

/// Calendar service that handles all calendar-related business logic
#[derive(Clone)]
pub struct CalendarService {
    student_repository: StudentRepository,
    schedule_repository: OneTimeScheduleRepository,
    entry_repository: ClassEntryRepository,
}

impl CalendarService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            student_repository: StudentRepository::new(store.clone()),
            schedule_repository: OneTimeScheduleRepository::new(store.clone()),
            entry_repository: ClassEntryRepository::new(store),
        }
    }

    /// Load the roster, schedules and entries, then build the month grid
    pub async fn get_calendar_month(&self, month: u32, year: i32) -> DomainResult<CalendarMonth> {
        info!("Getting calendar month {}/{}", month, year);

        let students = self.student_repository.list_students().await;
        let schedules = self.schedule_repository.list_schedules().await;
        let entries = self.entry_repository.list_entries().await;

        let calendar = self.generate_calendar_month(month, year, &students, &schedules, &entries)?;

        let class_count: usize = calendar.days.iter().map(|day| day.classes.len()).sum();
        info!(
            "Generated calendar {} {} with {} classes",
            self.month_name(month),
            year,
            class_count
        );
        Ok(calendar)
    }

    /// Generate a calendar month view from already loaded records
    pub fn generate_calendar_month(
        &self,
        month: u32,
        year: i32,
        students: &[Student],
        schedules: &[OneTimeSchedule],
        entries: &[ClassEntry],
    ) -> DomainResult<CalendarMonth> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(format!("Invalid month: {}", month)));
        }

        let days_in_month = self.days_in_month(month, year);
        let first_day = self.first_day_of_month(month, year);
        debug!(
            "Calendar {}/{}: {} days, first weekday {}",
            month, year, days_in_month, first_day
        );

        let entries_by_day = self.count_entries_by_day(month, year, entries);

        let mut calendar_days = Vec::with_capacity((first_day + days_in_month) as usize);

        for _ in 0..first_day {
            calendar_days.push(CalendarDay {
                day: 0,
                day_type: CalendarDayType::PaddingBefore,
                classes: Vec::new(),
                entry_count: 0,
            });
        }

        for day in 1..=days_in_month {
            let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                continue;
            };
            calendar_days.push(CalendarDay {
                day,
                day_type: CalendarDayType::MonthDay,
                classes: resolve(date, students, schedules),
                entry_count: entries_by_day.get(&day).copied().unwrap_or(0),
            });
        }

        Ok(CalendarMonth {
            month,
            year,
            days: calendar_days,
            first_day_of_week: first_day,
        })
    }

    fn count_entries_by_day(&self, month: u32, year: i32, entries: &[ClassEntry]) -> HashMap<u32, usize> {
        let mut counts = HashMap::new();
        for entry in entries {
            if entry.date.year() == year && entry.date.month() == month {
                *counts.entry(entry.date.day()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Get the number of days in a given month and year
    pub fn days_in_month(&self, month: u32, year: i32) -> u32 {
        match month {
            2 => if self.is_leap_year(year) { 29 } else { 28 },
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }

    /// Check if a year is a leap year
    pub fn is_leap_year(&self, year: i32) -> bool {
        year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
    }

    /// Get the first day of month (0 = Sunday, 1 = Monday, etc.)
    pub fn first_day_of_month(&self, month: u32, year: i32) -> u32 {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|date| date.weekday().num_days_from_sunday())
            .unwrap_or(0)
    }

    /// Get the human-readable name for a month number
    pub fn month_name(&self, month: u32) -> &'static str {
        match month {
            1 => "January", 2 => "February", 3 => "March", 4 => "April",
            5 => "May", 6 => "June", 7 => "July", 8 => "August",
            9 => "September", 10 => "October", 11 => "November", 12 => "December",
            _ => "Invalid Month",
        }
    }
}
