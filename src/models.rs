//! Data models for the progress reporter.
//!
//! This module contains the typed records consumed by the engine
//! (activity progress, student profiles) and the report structures
//! it produces.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Weekday names indexed the way records store `day_of_week` (0 = Sunday).
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Returns the weekday name for a record day index.
pub fn weekday_name(index: u8) -> &'static str {
    WEEKDAY_NAMES
        .get(index as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// Completion status of a scheduled activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    /// Scheduled, not started.
    Pending,
    /// Finished by the student.
    Completed,
    /// Explicitly skipped.
    Skipped,
    /// Started but not finished.
    InProgress,
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityStatus::Pending => write!(f, "pending"),
            ActivityStatus::Completed => write!(f, "completed"),
            ActivityStatus::Skipped => write!(f, "skipped"),
            ActivityStatus::InProgress => write!(f, "in_progress"),
        }
    }
}

/// Activity definition as it looked when the activity was assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    /// Activity type (e.g. "reading", "motor").
    pub activity_type: String,
    /// Human readable title.
    pub title: String,
}

/// One scheduled occurrence of an activity for a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityProgressRecord {
    pub id: String,
    pub student_id: String,
    pub scheduled_date: NaiveDate,
    /// Day of week of the schedule slot, 0 = Sunday.
    pub day_of_week: u8,
    pub status: ActivityStatus,
    pub points_earned: f64,
    pub time_spent_minutes: f64,
    pub completed_at: Option<DateTime<Utc>>,
    pub activity: ActivitySnapshot,
    pub is_active: bool,
}

impl ActivityProgressRecord {
    /// Whether the record is marked completed.
    pub fn is_completed(&self) -> bool {
        self.status == ActivityStatus::Completed
    }

    /// Whether the record is marked skipped.
    pub fn is_skipped(&self) -> bool {
        self.status == ActivityStatus::Skipped
    }

    /// Completed on the same calendar day it was scheduled for.
    pub fn completed_on_schedule(&self) -> bool {
        self.is_completed()
            && self
                .completed_at
                .map(|at| at.date_naive() == self.scheduled_date)
                .unwrap_or(false)
    }
}

/// Lifetime profile data for a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: String,
    pub name: String,
    pub school: String,
    pub grade: String,
    pub total_points: u64,
    pub level: u32,
    pub streak: u32,
}

/// Calendar week a record belongs to (Monday through Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeekKey {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
}

impl WeekKey {
    /// Returns the week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_monday() as i64;
        // Clamped at the ends of the representable date range
        let week_start = date
            .checked_sub_signed(Duration::days(offset))
            .unwrap_or(NaiveDate::MIN);
        Self {
            week_start,
            week_end: week_start
                .checked_add_signed(Duration::days(6))
                .unwrap_or(NaiveDate::MAX),
        }
    }

    /// ISO week number of the week.
    pub fn week_number(&self) -> u32 {
        self.week_start.iso_week().week()
    }

    /// ISO week-numbering year of the week.
    pub fn iso_year(&self) -> i32 {
        self.week_start.iso_week().year()
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.week_start, self.week_end)
    }
}

/// Summary counters for one week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub total_activities: usize,
    pub completed_activities: usize,
    pub skipped_activities: usize,
    /// Percentage of records completed.
    pub completion_rate: f64,
    /// Points earned by completed records.
    pub total_points: f64,
    pub average_score: f64,
    /// Average minutes spent per completed record.
    pub average_time: f64,
    /// Percentage of the 7 weekdays with at least one completion.
    pub consistency_score: f64,
    /// Percentage of completions done on the scheduled day.
    pub adherence_score: f64,
}

/// Per-weekday or per-activity-type breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakdownStats {
    pub total: usize,
    pub completed: usize,
    pub skipped: usize,
    pub average_score: f64,
    pub average_time: f64,
}

impl BreakdownStats {
    /// Percentage of records completed, 0 for an empty breakdown.
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// Qualitative observations derived from weekly metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyInsights {
    pub strengths: Vec<String>,
    pub challenges: Vec<String>,
    pub recommendations: Vec<String>,
}

impl WeeklyInsights {
    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty() && self.challenges.is_empty() && self.recommendations.is_empty()
    }
}

/// Aggregate over one week bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReportData {
    pub week_key: WeekKey,
    pub week_number: u32,
    pub iso_year: i32,
    pub summary: WeeklySummary,
    /// Seven entries indexed by day of week (0 = Sunday).
    pub by_day: Vec<BreakdownStats>,
    pub by_activity_type: BTreeMap<String, BreakdownStats>,
    pub insights: WeeklyInsights,
}

/// Lifetime metrics for a student.
///
/// `total_points`, `level` and `streak` mirror the profile document; the
/// remaining fields are computed from the activity window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallMetrics {
    pub total_points: u64,
    pub level: u32,
    pub streak: u32,
    pub total_activities_completed: usize,
    pub average_completion_rate: f64,
    pub total_time_spent: f64,
    pub last_activity_date: Option<DateTime<Utc>>,
}

/// Direction of recent average scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Improving => write!(f, "Improving"),
            TrendDirection::Stable => write!(f, "Stable"),
            TrendDirection::Declining => write!(f, "Declining"),
        }
    }
}

impl TrendDirection {
    /// Returns an arrow representation of the direction.
    pub fn arrow(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "↗",
            TrendDirection::Stable => "→",
            TrendDirection::Declining => "↘",
        }
    }
}

/// How much data backs a trend classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendConfidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for TrendConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendConfidence::Low => write!(f, "low"),
            TrendConfidence::Medium => write!(f, "medium"),
            TrendConfidence::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    pub confidence: TrendConfidence,
    /// Mean week-over-week change of the average score.
    pub average_change: f64,
    pub scores_used: usize,
}

impl Default for TrendAnalysis {
    fn default() -> Self {
        Self {
            direction: TrendDirection::Stable,
            confidence: TrendConfidence::Low,
            average_change: 0.0,
            scores_used: 0,
        }
    }
}

/// Where a report's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFreshness {
    /// Computed for this request.
    Realtime,
    /// Served from the report cache.
    Cached,
    /// Fallback substituted after a data failure.
    Stale,
}

impl fmt::Display for DataFreshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFreshness::Realtime => write!(f, "realtime"),
            DataFreshness::Cached => write!(f, "cached"),
            DataFreshness::Stale => write!(f, "stale"),
        }
    }
}

/// Complete progress report for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentReport {
    pub student_id: String,
    pub student_name: String,
    pub school: String,
    pub grade: String,
    pub overall: OverallMetrics,
    /// Most recent week first.
    pub weekly_reports: Vec<WeeklyReportData>,
    pub trend: TrendAnalysis,
    pub data_freshness: DataFreshness,
    pub generated_at: DateTime<Utc>,
}

impl StudentReport {
    /// Zeroed report returned when the student's data cannot be loaded.
    pub fn fallback(student_id: &str, generated_at: DateTime<Utc>) -> Self {
        Self {
            student_id: student_id.to_string(),
            student_name: "Unknown student".to_string(),
            school: String::new(),
            grade: String::new(),
            overall: OverallMetrics::default(),
            weekly_reports: Vec::new(),
            trend: TrendAnalysis::default(),
            data_freshness: DataFreshness::Stale,
            generated_at,
        }
    }

    /// Most recent weekly report, if any week had data.
    pub fn latest_week(&self) -> Option<&WeeklyReportData> {
        self.weekly_reports.first()
    }
}

/// Window used when comparing students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonPeriod {
    Week,
    Month,
    Quarter,
}

impl ComparisonPeriod {
    /// Number of most recent weekly reports a period covers.
    pub fn weeks(&self) -> usize {
        match self {
            ComparisonPeriod::Week => 1,
            ComparisonPeriod::Month => 4,
            ComparisonPeriod::Quarter => 8,
        }
    }
}

impl fmt::Display for ComparisonPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonPeriod::Week => write!(f, "week"),
            ComparisonPeriod::Month => write!(f, "month"),
            ComparisonPeriod::Quarter => write!(f, "quarter"),
        }
    }
}

/// One student's row in a comparative report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentComparison {
    pub student_id: String,
    pub student_name: String,
    pub school: String,
    pub grade: String,
    pub completion_rate: f64,
    pub average_score: f64,
    pub consistency_score: f64,
    pub streak: u32,
    pub total_points: u64,
    pub trend: TrendDirection,
    /// Whether the student's most recent week has data.
    pub has_recent_data: bool,
}

/// Group averages over students with recent data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupAverages {
    pub completion_rate: f64,
    pub average_score: f64,
    pub consistency_score: f64,
    pub streak: f64,
    pub students_with_data: usize,
}

/// Side-by-side comparison of several students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparativeReport {
    pub period: ComparisonPeriod,
    pub student_count: usize,
    /// Sorted by completion rate, highest first.
    pub students: Vec<StudentComparison>,
    pub averages: GroupAverages,
    /// Students whose report could not be generated.
    pub failed_students: Vec<String>,
    pub generated_at: DateTime<Utc>,
}
