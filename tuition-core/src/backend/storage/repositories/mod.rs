//! JSON collection repositories, one per entity, on top of a [`KeyValueStore`].
//!
//! [`KeyValueStore`]: crate::backend::storage::traits::KeyValueStore

pub mod class_entry_repository;
pub mod collection;
pub mod fee_entry_repository;
pub mod one_time_schedule_repository;
pub mod student_repository;

pub use class_entry_repository::{ClassEntryRepository, CLASS_ENTRIES_KEY};
pub use collection::{Identified, JsonCollection};
pub use fee_entry_repository::{FeeEntryRepository, FEE_ENTRIES_KEY};
pub use one_time_schedule_repository::{OneTimeScheduleRepository, ONE_TIME_SCHEDULES_KEY};
pub use student_repository::{StudentRepository, STUDENTS_KEY};

use shared::{ClassEntry, FeeEntry, OneTimeSchedule};

impl Identified for ClassEntry {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for OneTimeSchedule {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for FeeEntry {
    fn id(&self) -> &str {
        &self.id
    }
}
