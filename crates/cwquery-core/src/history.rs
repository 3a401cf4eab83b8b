//! Query-history records and the storage abstraction behind them.
//!
//! Every execute-query attempt, successful or not, is recorded as a
//! [`QueryHistoryRecord`]. The store is abstracted behind the
//! [`QueryHistoryStore`] trait so the in-memory backend can be swapped for a
//! durable one without touching the request-mediation logic.
//!
//! Retention is bounded at read time: [`QueryHistoryStore::recent`] never
//! returns more than [`HISTORY_RETURN_LIMIT`] records. Older entries remain
//! in the store until an explicit [`QueryHistoryStore::clear`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::environment::Environment;

/// Maximum number of records a list operation returns, newest first.
pub const HISTORY_RETURN_LIMIT: usize = 20;

/// Errors that can occur during history-store operations.
///
/// The in-memory backend never fails, but the trait surfaces errors so a
/// durable backend can report them.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// An internal storage error occurred.
    #[error("History store error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },
}

impl HistoryError {
    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Outcome tag of a recorded query attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryOutcome {
    /// Upstream returned a 2xx response.
    Success,
    /// Upstream returned an error status, timed out, or was unreachable.
    Error,
}

/// Fields the caller supplies when appending a record.
///
/// The store assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQueryHistoryRecord {
    /// The fully constructed upstream query URL.
    pub query_url: String,
    /// Environment the query targeted.
    pub environment: Environment,
    /// Composite `AAID|localId` patient identifier.
    pub patient_identifier: String,
    /// The full parameter set used for the query.
    pub parameters: Value,
    /// Round-trip time in milliseconds.
    pub response_time_ms: u64,
    /// Number of documents the upstream reported.
    pub document_count: u64,
    /// Outcome of the attempt.
    pub status: QueryOutcome,
}

/// A write-once history record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHistoryRecord {
    /// Unique record id.
    pub id: Uuid,
    /// The fully constructed upstream query URL.
    pub query_url: String,
    /// Environment the query targeted.
    pub environment: Environment,
    /// Composite `AAID|localId` patient identifier.
    pub patient_identifier: String,
    /// The full parameter set used for the query.
    pub parameters: Value,
    /// Round-trip time in milliseconds.
    pub response_time_ms: u64,
    /// Number of documents the upstream reported.
    pub document_count: u64,
    /// Outcome of the attempt.
    pub status: QueryOutcome,
    /// When the record was written.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Storage abstraction for query history.
///
/// Implementations must be thread-safe (`Send + Sync`). Appends must be
/// atomic: a record is either fully visible to `recent` or not at all.
#[async_trait]
pub trait QueryHistoryStore: Send + Sync {
    /// Appends a record, assigning its id and creation timestamp.
    async fn append(&self, record: NewQueryHistoryRecord)
    -> Result<QueryHistoryRecord, HistoryError>;

    /// Returns up to [`HISTORY_RETURN_LIMIT`] records, newest first.
    async fn recent(&self) -> Result<Vec<QueryHistoryRecord>, HistoryError>;

    /// Removes all records.
    async fn clear(&self) -> Result<(), HistoryError>;
}

/// Type alias for a shareable history store instance.
pub type DynHistoryStore = Arc<dyn QueryHistoryStore>;

/// In-memory history store with process lifetime.
///
/// Records are lost on restart; that is an accepted property of the harness,
/// not a defect.
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: RwLock<Vec<QueryHistoryRecord>>,
}

impl MemoryHistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a shareable store instance.
    #[must_use]
    pub fn shared() -> DynHistoryStore {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl QueryHistoryStore for MemoryHistoryStore {
    async fn append(
        &self,
        record: NewQueryHistoryRecord,
    ) -> Result<QueryHistoryRecord, HistoryError> {
        let entry = QueryHistoryRecord {
            id: Uuid::new_v4(),
            query_url: record.query_url,
            environment: record.environment,
            patient_identifier: record.patient_identifier,
            parameters: record.parameters,
            response_time_ms: record.response_time_ms,
            document_count: record.document_count,
            status: record.status,
            created_at: OffsetDateTime::now_utc(),
        };
        let mut records = self.records.write().await;
        records.push(entry.clone());
        Ok(entry)
    }

    async fn recent(&self) -> Result<Vec<QueryHistoryRecord>, HistoryError> {
        let records = self.records.read().await;
        // Reverse insertion order stands in for newest-first; timestamps can
        // collide within the clock resolution.
        Ok(records
            .iter()
            .rev()
            .take(HISTORY_RETURN_LIMIT)
            .cloned()
            .collect())
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        let mut records = self.records.write().await;
        records.clear();
        Ok(())
    }
}
