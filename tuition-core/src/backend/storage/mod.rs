//! Storage layer: a string key-value backend plus typed repositories.

pub mod locks;
pub mod memory;
pub mod repositories;
pub mod sqlite;
pub mod traits;

pub use locks::KeyLocks;
pub use memory::MemoryKeyValueStore;
pub use repositories::{
    ClassEntryRepository, FeeEntryRepository, OneTimeScheduleRepository, StudentRepository,
};
pub use sqlite::SqliteKeyValueStore;
pub use traits::*;
