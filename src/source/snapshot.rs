//! JSON snapshot data source.
//!
//! Loads an export of the `students` and `activityProgress` collections and
//! serves it through [`DataSource`]. Raw documents are loosely shaped: most
//! fields are optional and timestamps arrive as RFC 3339 strings, epoch
//! milliseconds or `{seconds, nanoseconds}` objects. All of that is resolved
//! here so the rest of the crate only sees typed records.

use super::{DataSource, SourceError};
use crate::models::{ActivityProgressRecord, ActivitySnapshot, ActivityStatus, StudentProfile};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    #[serde(default)]
    students: Vec<RawStudent>,
    #[serde(default)]
    activity_progress: Vec<RawProgress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStudent {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    school: String,
    #[serde(default)]
    grade: String,
    #[serde(default)]
    total_points: u64,
    #[serde(default)]
    level: u32,
    #[serde(default)]
    streak: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProgress {
    #[serde(default)]
    id: Option<String>,
    student_id: String,
    scheduled_date: RawTimestamp,
    #[serde(default)]
    day_of_week: Option<u8>,
    status: ActivityStatus,
    #[serde(default)]
    points_earned: Option<f64>,
    #[serde(default)]
    time_spent: Option<f64>,
    #[serde(default)]
    completed_at: Option<RawTimestamp>,
    #[serde(default)]
    activity: Option<RawActivity>,
    #[serde(default)]
    is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawActivity {
    #[serde(rename = "type", default)]
    activity_type: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    FractionalMillis(f64),
    Parts {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(alias = "_nanoseconds", default)]
        nanoseconds: u32,
    },
    Text(String),
}

impl RawTimestamp {
    fn to_utc(&self) -> Result<DateTime<Utc>, SourceError> {
        match self {
            RawTimestamp::Millis(ms) => Utc
                .timestamp_millis_opt(*ms)
                .single()
                .ok_or_else(|| SourceError::Malformed(format!("timestamp out of range: {}", ms))),
            RawTimestamp::FractionalMillis(ms) => Some(ms.trunc())
                .filter(|ms| ms.is_finite())
                .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())
                .ok_or_else(|| SourceError::Malformed(format!("timestamp out of range: {}", ms))),
            RawTimestamp::Parts {
                seconds,
                nanoseconds,
            } => Utc.timestamp_opt(*seconds, *nanoseconds).single().ok_or_else(|| {
                SourceError::Malformed(format!("timestamp out of range: {}s", seconds))
            }),
            RawTimestamp::Text(text) => {
                if let Ok(at) = DateTime::parse_from_rfc3339(text) {
                    return Ok(at.with_timezone(&Utc));
                }
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| Utc.from_utc_datetime(&naive))
                    .ok_or_else(|| SourceError::Malformed(format!("unparseable date: {}", text)))
            }
        }
    }
}

impl RawProgress {
    fn into_record(self, index: usize) -> Result<ActivityProgressRecord, SourceError> {
        let scheduled_date = self.scheduled_date.to_utc()?.date_naive();
        let day_of_week = match self.day_of_week {
            Some(day) if day <= 6 => day,
            Some(day) => {
                return Err(SourceError::Malformed(format!(
                    "dayOfWeek must be between 0 and 6, got {}",
                    day
                )))
            }
            None => scheduled_date.weekday().num_days_from_sunday() as u8,
        };
        let completed_at = self.completed_at.as_ref().map(RawTimestamp::to_utc).transpose()?;
        let activity = self.activity.unwrap_or(RawActivity {
            activity_type: None,
            title: None,
        });

        Ok(ActivityProgressRecord {
            id: self.id.unwrap_or_else(|| format!("record-{}", index)),
            student_id: self.student_id,
            scheduled_date,
            day_of_week,
            status: self.status,
            points_earned: self.points_earned.unwrap_or(0.0),
            time_spent_minutes: self.time_spent.unwrap_or(0.0),
            completed_at,
            activity: ActivitySnapshot {
                activity_type: activity
                    .activity_type
                    .unwrap_or_else(|| "general".to_string()),
                title: activity.title.unwrap_or_default(),
            },
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

/// Data source backed by an in-memory JSON snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    profiles: HashMap<String, StudentProfile>,
    /// Records per student, newest scheduled date first.
    records: HashMap<String, Vec<ActivityProgressRecord>>,
}

impl SnapshotSource {
    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SourceError::Unavailable(format!("failed to read {}: {}", path.display(), e))
        })?;
        let source = Self::from_json(&content)?;
        info!(
            "Loaded snapshot with {} students from {}",
            source.profiles.len(),
            path.display()
        );
        Ok(source)
    }

    /// Parse a snapshot from JSON text.
    pub fn from_json(content: &str) -> Result<Self, SourceError> {
        let raw: RawSnapshot =
            serde_json::from_str(content).map_err(|e| SourceError::Malformed(e.to_string()))?;

        let profiles = raw
            .students
            .into_iter()
            .map(|s| {
                (
                    s.id.clone(),
                    StudentProfile {
                        id: s.id,
                        name: s.name,
                        school: s.school,
                        grade: s.grade,
                        total_points: s.total_points,
                        level: s.level,
                        streak: s.streak,
                    },
                )
            })
            .collect();

        let mut records: HashMap<String, Vec<ActivityProgressRecord>> = HashMap::new();
        for (index, progress) in raw.activity_progress.into_iter().enumerate() {
            let record = progress.into_record(index)?;
            records
                .entry(record.student_id.clone())
                .or_default()
                .push(record);
        }

        for student_records in records.values_mut() {
            student_records.sort_by(|a, b| b.scheduled_date.cmp(&a.scheduled_date));
        }

        Ok(Self { profiles, records })
    }

    /// Every student id in the snapshot, sorted.
    pub fn student_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.profiles.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of active records scheduled on or after `since`.
    pub fn count_records_since(&self, student_id: &str, since: NaiveDate) -> usize {
        self.records
            .get(student_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.is_active && r.scheduled_date >= since)
                    .count()
            })
            .unwrap_or(0)
    }
}

#[async_trait]
impl DataSource for SnapshotSource {
    async fn fetch_student_profile(&self, student_id: &str) -> Result<StudentProfile, SourceError> {
        self.profiles
            .get(student_id)
            .cloned()
            .ok_or_else(|| SourceError::StudentNotFound(student_id.to_string()))
    }

    async fn fetch_recent_activity_records(
        &self,
        student_id: &str,
        since: NaiveDate,
        max_count: usize,
    ) -> Result<Vec<ActivityProgressRecord>, SourceError> {
        let records: Vec<ActivityProgressRecord> = self
            .records
            .get(student_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.is_active && r.scheduled_date >= since)
                    .take(max_count)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            "Fetched {} records for student {} since {}",
            records.len(),
            student_id,
            since
        );
        Ok(records)
    }
}
