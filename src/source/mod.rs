//! Data sources for student profiles and activity progress.
//!
//! The engine only talks to the [`DataSource`] trait; concrete sources
//! convert their raw documents into typed records.

pub mod snapshot;

pub use snapshot::SnapshotSource;

use crate::models::{ActivityProgressRecord, StudentProfile};
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while fetching report inputs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    #[error("student not found: {0}")]
    StudentNotFound(String),

    #[error("data source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Provider of the documents a report is built from.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the lifetime profile of a student.
    async fn fetch_student_profile(&self, student_id: &str) -> Result<StudentProfile, SourceError>;

    /// Fetch active records scheduled on or after `since`, newest first,
    /// at most `max_count` of them.
    async fn fetch_recent_activity_records(
        &self,
        student_id: &str,
        since: NaiveDate,
        max_count: usize,
    ) -> Result<Vec<ActivityProgressRecord>, SourceError>;
}
