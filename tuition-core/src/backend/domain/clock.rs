//! Injected source of the current time.
//!
//! Services never read the system clock directly so that "today", fee month
//! labels and reminder windows can be pinned in tests.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

pub trait Clock: Send + Sync {
    /// Local wall-clock time, used for schedules and day boundaries
    fn local_now(&self) -> NaiveDateTime;

    /// Absolute time, used for record timestamps and ids
    fn utc_now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.local_now().date()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant; local time is treated as UTC
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    local: NaiveDateTime,
}

impl FixedClock {
    pub fn new(local: NaiveDateTime) -> Self {
        Self { local }
    }

    /// Convenience constructor; returns None for an invalid date or time
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .map(Self::new)
    }
}

impl Clock for FixedClock {
    fn local_now(&self) -> NaiveDateTime {
        self.local
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.local)
    }
}
