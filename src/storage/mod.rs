//! Storage layer: SQLite-backed implementations of the service contracts.

pub mod history;
