use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Number of classes in a billing cycle when a student does not configure one
pub const DEFAULT_CLASSES_PER_CYCLE: u32 = 12;

/// Short random suffix appended to timestamp-based IDs so that two records
/// created within the same millisecond never collide
fn id_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Day of the week, stored by its full English name ("Monday")
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// All weekdays in calendar-grid order (Sunday first)
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Full English name of the day
    pub fn name(&self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }

    /// 0 = Sunday, 1 = Monday, ..., 6 = Saturday
    pub fn index(&self) -> u32 {
        self.to_chrono().num_days_from_sunday()
    }

    /// Weekday a calendar date falls on
    pub fn of(date: NaiveDate) -> Self {
        Self::from(date.weekday())
    }

    pub fn to_chrono(&self) -> chrono::Weekday {
        match self {
            Weekday::Sunday => chrono::Weekday::Sun,
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Sun => Weekday::Sunday,
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekdayParseError(pub String);

impl fmt::Display for WeekdayParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid weekday name: {}", self.0)
    }
}

impl std::error::Error for WeekdayParseError {}

impl FromStr for Weekday {
    type Err = WeekdayParseError;

    /// Accepts full or three-letter names, case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Weekday::ALL
            .iter()
            .copied()
            .find(|day| {
                let name = day.name().to_lowercase();
                name == lowered || &name[..3] == lowered.as_str()
            })
            .ok_or_else(|| WeekdayParseError(s.to_string()))
    }
}

/// Represents a student in the tuition tracking system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    /// Days with a recurring weekly class, in the order the tutor picked them
    pub weekdays: Vec<Weekday>,
    /// Class time per weekday, 24-hour "HH:MM"
    pub times: BTreeMap<Weekday, String>,
    pub classes_per_cycle: u32,
    /// Classes already taught before the student was added to the tracker
    pub initial_classes_completed: u32,
    pub tuition_fee: Option<f64>,
    /// Digits only, see the student service for normalization rules
    pub mobile_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Student {
    /// Generate a student ID based on timestamp
    pub fn generate_id(epoch_millis: u64) -> String {
        format!("student::{}::{}", epoch_millis, id_suffix())
    }

    /// Configured class time for a weekday, ignoring blank values
    pub fn time_for(&self, weekday: Weekday) -> Option<&str> {
        self.times
            .get(&weekday)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }

    /// Whether the weekly schedule produces a class on this weekday.
    /// A selected weekday without a time yields no occurrence.
    pub fn has_weekly_class_on(&self, weekday: Weekday) -> bool {
        self.weekdays.contains(&weekday) && self.time_for(weekday).is_some()
    }
}

/// A single completed class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassEntry {
    pub id: String,
    pub student_id: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    /// Topics covered in this class
    pub topics: Option<String>,
    /// Remarks or homework assigned
    pub remarks: Option<String>,
}

impl ClassEntry {
    pub fn generate_id(epoch_millis: u64) -> String {
        format!("class::{}::{}", epoch_millis, id_suffix())
    }
}

/// Date-specific addition, override or removal layered on the weekly schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTimeSchedule {
    pub id: String,
    pub student_id: String,
    pub date: NaiveDate,
    /// "HH:MM", or empty to cancel the weekly class on this date
    pub time: String,
    pub created_at: DateTime<Utc>,
}

impl OneTimeSchedule {
    pub fn generate_id(epoch_millis: u64) -> String {
        format!("schedule::{}::{}", epoch_millis, id_suffix())
    }

    /// An empty time marks a cancelled weekly class
    pub fn is_removal(&self) -> bool {
        self.time.trim().is_empty()
    }
}

/// Payment state of a fee entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeeStatus {
    #[default]
    #[serde(rename = "Payment Due")]
    PaymentDue,
    Completed,
}

impl FeeStatus {
    /// The opposite state; fee entries only move by manual toggles
    pub fn toggled(&self) -> Self {
        match self {
            FeeStatus::PaymentDue => FeeStatus::Completed,
            FeeStatus::Completed => FeeStatus::PaymentDue,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeeStatus::PaymentDue => "Payment Due",
            FeeStatus::Completed => "Completed",
        }
    }
}

/// A billing record, generated when a cycle completes or added manually
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEntry {
    pub id: String,
    pub student_id: String,
    /// Name of the student when the fee was created
    pub student_name: String,
    pub amount: f64,
    /// Free-form cycle label, e.g. "January 2025"
    pub month: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub status: FeeStatus,
    pub created_at: DateTime<Utc>,
}

impl FeeEntry {
    pub fn generate_id(student_id: &str, epoch_millis: u64) -> String {
        format!("fee::{}::{}::{}", student_id, epoch_millis, id_suffix())
    }
}

/// Where a resolved class came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleOrigin {
    Weekly,
    OneTime,
}

/// A class that takes place on a specific date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedClass {
    pub student: Student,
    /// 24-hour "HH:MM"
    pub time: String,
    pub origin: ScheduleOrigin,
}

/// Progress of a class scheduled for today
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassStatus {
    Upcoming { hours: i64, minutes: i64 },
    /// Class time has passed and no entry was recorded today
    Started,
    /// Class time has passed and an entry exists for today
    Finished,
}

impl ClassStatus {
    /// Short human-readable status line
    pub fn describe(&self) -> String {
        match self {
            ClassStatus::Upcoming { hours, minutes } if *hours > 0 => {
                format!("{}h {}m remaining", hours, minutes)
            }
            ClassStatus::Upcoming { minutes, .. } => format!("{}m remaining", minutes),
            ClassStatus::Started => "Class time started".to_string(),
            ClassStatus::Finished => "Class Finished".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodayClass {
    pub class: ResolvedClass,
    pub status: ClassStatus,
}

/// Type of calendar cell for explicit rendering logic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CalendarDayType {
    /// Empty padding cell before the first day of the month
    PaddingBefore,
    /// Actual day within the month
    MonthDay,
}

/// A single cell in the calendar grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    /// Day of month, 0 for padding cells
    pub day: u32,
    pub day_type: CalendarDayType,
    pub classes: Vec<ResolvedClass>,
    /// Number of completed-class entries dated on this day
    pub entry_count: usize,
}

/// A calendar month with its resolved classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub month: u32,
    pub year: i32,
    pub days: Vec<CalendarDay>,
    pub first_day_of_week: u32, // 0 = Sunday, 1 = Monday, etc.
}

/// Derived progress towards the end of a billing cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleProgress {
    pub student_id: String,
    /// Recorded entries plus initial classes completed
    pub total_classes: u32,
    pub classes_per_cycle: u32,
    pub is_complete: bool,
    pub remaining: u32,
    /// Fraction of the cycle done, capped at 1.0
    pub progress: f64,
}

/// Class entries recorded on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDateGroup {
    pub date: NaiveDate,
    pub entries: Vec<ClassEntry>,
}

/// Sum of fee amounts for one cycle label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFeeTotal {
    pub month: String,
    pub total: f64,
}

/// Editable student fields, used for both creating and updating a student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDetails {
    pub name: String,
    pub weekdays: Vec<Weekday>,
    pub times: BTreeMap<Weekday, String>,
    /// Defaults to 12 when not provided
    pub classes_per_cycle: Option<u32>,
    pub initial_classes_completed: Option<u32>,
    pub tuition_fee: Option<f64>,
    /// Raw input, spaces, dashes and '+' are stripped before validation
    pub mobile_number: Option<String>,
}

/// Request for recording a completed class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddClassEntryRequest {
    pub student_id: String,
    /// Defaults to today when not provided
    pub date: Option<NaiveDate>,
    pub topics: Option<String>,
    pub remarks: Option<String>,
}

/// Response after recording a completed class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddClassEntryResponse {
    pub entry: ClassEntry,
    pub progress: CycleProgress,
    /// Fee generated because this entry completed the cycle
    pub fee_entry: Option<FeeEntry>,
}

/// Request for adding a fee entry by hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateFeeRequest {
    pub student_id: String,
    pub amount: f64,
    pub month: String,
}

/// A reminder to hand to the notification dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedReminder {
    /// "student-{student_id}-{Weekday}-{week_offset}"
    pub identifier: String,
    pub student_id: String,
    pub weekday: Weekday,
    pub week_offset: u32,
    /// Local wall-clock time of the class
    pub class_at: NaiveDateTime,
    /// Local wall-clock time the reminder fires
    pub fire_at: NaiveDateTime,
    pub title: String,
    pub body: String,
}

/// A student whose reminders could not be planned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplanFailure {
    pub student_id: String,
    pub student_name: String,
    pub message: String,
}

/// Outcome of replanning reminders for the whole roster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplanReport {
    pub students_planned: usize,
    pub reminders_scheduled: usize,
    pub failures: Vec<ReplanFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_from_str() {
        assert_eq!("Monday".parse::<Weekday>(), Ok(Weekday::Monday));
        assert_eq!("sunday".parse::<Weekday>(), Ok(Weekday::Sunday));
        assert_eq!("Sat".parse::<Weekday>(), Ok(Weekday::Saturday));
        assert!("Funday".parse::<Weekday>().is_err());
        assert!("".parse::<Weekday>().is_err());
    }

    #[test]
    fn test_weekday_index_and_date() {
        assert_eq!(Weekday::Sunday.index(), 0);
        assert_eq!(Weekday::Saturday.index(), 6);
        // 2025-01-06 was a Monday
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(Weekday::of(date), Weekday::Monday);
        for (i, day) in Weekday::ALL.iter().enumerate() {
            assert_eq!(day.index() as usize, i);
        }
    }

    #[test]
    fn test_weekday_serializes_by_name() {
        let json = serde_json::to_string(&Weekday::Wednesday).unwrap();
        assert_eq!(json, "\"Wednesday\"");
    }

    #[test]
    fn test_student_time_for_ignores_blank_times() {
        let mut times = BTreeMap::new();
        times.insert(Weekday::Monday, "10:00".to_string());
        times.insert(Weekday::Friday, "  ".to_string());
        let student = Student {
            id: Student::generate_id(1000),
            name: "Alice".to_string(),
            weekdays: vec![Weekday::Monday, Weekday::Friday, Weekday::Sunday],
            times,
            classes_per_cycle: DEFAULT_CLASSES_PER_CYCLE,
            initial_classes_completed: 0,
            tuition_fee: None,
            mobile_number: None,
            created_at: Utc::now(),
        };

        assert_eq!(student.time_for(Weekday::Monday), Some("10:00"));
        assert!(student.has_weekly_class_on(Weekday::Monday));
        assert!(!student.has_weekly_class_on(Weekday::Friday));
        assert!(!student.has_weekly_class_on(Weekday::Sunday));
        assert!(!student.has_weekly_class_on(Weekday::Tuesday));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let first = ClassEntry::generate_id(1702516122000);
        let second = ClassEntry::generate_id(1702516122000);
        assert!(first.starts_with("class::1702516122000::"));
        assert_ne!(first, second);
        assert!(FeeEntry::generate_id("student::1", 5).starts_with("fee::student::1::5::"));
    }

    #[test]
    fn test_fee_status_toggle_round_trip() {
        let status = FeeStatus::default();
        assert_eq!(status, FeeStatus::PaymentDue);
        assert_eq!(status.toggled(), FeeStatus::Completed);
        assert_eq!(status.toggled().toggled(), status);
        assert_eq!(
            serde_json::to_string(&FeeStatus::PaymentDue).unwrap(),
            "\"Payment Due\""
        );
    }

    #[test]
    fn test_one_time_schedule_removal_marker() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let mut schedule = OneTimeSchedule {
            id: OneTimeSchedule::generate_id(1),
            student_id: "student::1".to_string(),
            date,
            time: String::new(),
            created_at: Utc::now(),
        };
        assert!(schedule.is_removal());
        schedule.time = "09:30".to_string();
        assert!(!schedule.is_removal());
    }

    #[test]
    fn test_class_status_describe() {
        assert_eq!(ClassStatus::Upcoming { hours: 2, minutes: 5 }.describe(), "2h 5m remaining");
        assert_eq!(ClassStatus::Upcoming { hours: 0, minutes: 45 }.describe(), "45m remaining");
        assert_eq!(ClassStatus::Started.describe(), "Class time started");
        assert_eq!(ClassStatus::Finished.describe(), "Class Finished");
    }
}
