//! Core types and utilities shared across the cwquery workspace.
//!
//! This crate holds the pieces every other crate needs: the environment tag
//! that selects an upstream endpoint set, the query-history record and its
//! storage abstraction, and the reference catalogs (LOINC document types,
//! MIME content types) exposed to clients of the harness.

pub mod catalog;
pub mod environment;
pub mod history;

pub use environment::Environment;
pub use history::{
    DynHistoryStore, HistoryError, MemoryHistoryStore, NewQueryHistoryRecord, QueryHistoryRecord,
    QueryHistoryStore, QueryOutcome, HISTORY_RETURN_LIMIT,
};
