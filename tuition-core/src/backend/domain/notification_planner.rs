//! Pure computation of class reminders for one student.

use chrono::{Duration, NaiveDateTime};
use shared::{PlannedReminder, Student, Weekday};

use crate::backend::config::ReminderConfig;
use crate::backend::domain::class_time::parse_class_time;

pub const REMINDER_TITLE: &str = "Tuition Reminder";

/// Identifier prefix shared by every class reminder of every student
pub const REMINDER_NAMESPACE: &str = "student-";

/// Identifier prefix shared by every reminder of a student
pub fn reminder_prefix(student_id: &str) -> String {
    format!("{}{}-", REMINDER_NAMESPACE, student_id)
}

pub fn reminder_identifier(student_id: &str, weekday: Weekday, week_offset: u32) -> String {
    format!("{}{}-{}", reminder_prefix(student_id), weekday.name(), week_offset)
}

/// "1 hour", "45 minutes", "1 hour 30 minutes"
fn describe_lead(lead_minutes: u32) -> String {
    let hours = lead_minutes / 60;
    let minutes = lead_minutes % 60;
    let plural = |n: u32, unit: &str| {
        if n == 1 {
            format!("1 {}", unit)
        } else {
            format!("{} {}s", n, unit)
        }
    };
    match (hours, minutes) {
        (0, m) => plural(m, "minute"),
        (h, 0) => plural(h, "hour"),
        (h, m) => format!("{} {}", plural(h, "hour"), plural(m, "minute")),
    }
}

/// Reminders for the student's weekly classes over the configured number of weeks.
///
/// The first occurrence of each weekday is today when its class time is
/// still ahead of `now`, otherwise the next matching weekday. Reminders that
/// would fire at or before `now` are skipped.
pub fn plan_reminders(student: &Student, now: NaiveDateTime, config: &ReminderConfig) -> Vec<PlannedReminder> {
    let today = now.date();
    let today_index = Weekday::of(today).index();
    let lead = Duration::minutes(config.lead_minutes as i64);
    let body = format!(
        "You have a class with {} in {}",
        student.name,
        describe_lead(config.lead_minutes)
    );

    let mut reminders = Vec::new();
    for weekday in &student.weekdays {
        let Some(time) = student.time_for(*weekday).and_then(parse_class_time) else {
            continue;
        };

        let mut days_ahead = (weekday.index() + 7 - today_index) % 7;
        if days_ahead == 0 && time <= now.time() {
            days_ahead = 7;
        }
        let first = today + Duration::days(days_ahead as i64);

        for week_offset in 0..config.weeks {
            let class_at = (first + Duration::days(7 * week_offset as i64)).and_time(time);
            let fire_at = class_at - lead;
            if fire_at <= now {
                continue;
            }
            reminders.push(PlannedReminder {
                identifier: reminder_identifier(&student.id, *weekday, week_offset),
                student_id: student.id.clone(),
                weekday: *weekday,
                week_offset,
                class_at,
                fire_at,
                title: REMINDER_TITLE.to_string(),
                body: body.clone(),
            });
        }
    }

    reminders
}
