//! SQLite implementation of the key-value backend

pub mod db;

pub use db::SqliteKeyValueStore;
