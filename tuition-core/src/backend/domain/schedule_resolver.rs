//! Merge of weekly schedules and one-time overrides for a single date.
//!
//! [`resolve`] is a pure function of its inputs. Weekly classes come first in
//! roster order, then one-time additions in schedule order.

use chrono::NaiveDate;
use shared::{OneTimeSchedule, ResolvedClass, ScheduleOrigin, Student, Weekday};

/// Resolve the classes taking place on `date`
pub fn resolve(date: NaiveDate, students: &[Student], schedules: &[OneTimeSchedule]) -> Vec<ResolvedClass> {
    let weekday = Weekday::of(date);

    let mut classes: Vec<ResolvedClass> = students
        .iter()
        .filter(|student| student.weekdays.contains(&weekday))
        .filter_map(|student| {
            student.time_for(weekday).map(|time| ResolvedClass {
                student: student.clone(),
                time: time.to_string(),
                origin: ScheduleOrigin::Weekly,
            })
        })
        .collect();

    for schedule in schedules.iter().filter(|s| s.date == date) {
        let Some(student) = students.iter().find(|s| s.id == schedule.student_id) else {
            continue;
        };

        let weekly_index = classes.iter().position(|class| {
            class.student.id == student.id && class.origin == ScheduleOrigin::Weekly
        });

        if schedule.is_removal() {
            if let Some(index) = weekly_index {
                classes.remove(index);
            }
            continue;
        }

        let one_time = ResolvedClass {
            student: student.clone(),
            time: schedule.time.trim().to_string(),
            origin: ScheduleOrigin::OneTime,
        };
        match weekly_index {
            Some(index) => classes[index] = one_time,
            None if !classes.iter().any(|class| class.student.id == student.id) => {
                classes.push(one_time)
            }
            None => {}
        }
    }

    classes
}
