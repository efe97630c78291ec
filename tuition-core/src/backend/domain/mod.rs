//! Domain services and pure engines of the tuition tracker.

pub mod calendar;
pub mod class_time;
pub mod clock;
pub mod cycle_service;
pub mod errors;
pub mod fee_service;
pub mod notification_planner;
pub mod notification_service;
pub mod schedule_resolver;
pub mod schedule_service;
pub mod student_service;

pub use calendar::CalendarService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use cycle_service::CycleService;
pub use errors::{DomainError, DomainResult};
pub use fee_service::FeeService;
pub use notification_service::{
    LoggingDispatcher, NotificationDispatcher, NotificationService, ReplanOutcome,
};
pub use schedule_service::ScheduleService;
pub use student_service::{DeletedStudent, StudentService};
