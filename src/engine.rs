//! Report aggregation engine.
//!
//! Fetches a student's profile and recent activity progress, reduces them
//! into weekly reports, overall metrics and a trend, and memoizes the result
//! in a [`ReportCache`]. Data failures never reach the caller: a student
//! report degrades to a zeroed fallback, and a comparative report simply
//! leaves the failing student out.

use crate::analysis::{self, determine_trend};
use crate::cache::ReportCache;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::models::{
    ComparativeReport, ComparisonPeriod, DataFreshness, GroupAverages, StudentComparison,
    StudentProfile, StudentReport,
};
use crate::source::{DataSource, SourceError};
use chrono::Duration;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Limits applied when building a report.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub lookback_days: i64,
    pub max_records: usize,
    pub max_weeks: usize,
    pub overall_weeks: usize,
    pub trend_window: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            lookback_days: config.lookback_days,
            max_records: config.max_records,
            max_weeks: config.max_weeks,
            overall_weeks: config.overall_weeks,
            trend_window: config.trend_window,
        }
    }
}

/// Result of processing one student in a comparative report.
#[derive(Debug, Clone, PartialEq)]
pub enum StudentOutcome {
    Included(StudentComparison),
    Failed { student_id: String, reason: String },
}

/// Builds and caches student progress reports.
pub struct ReportEngine {
    source: Arc<dyn DataSource>,
    cache: Arc<dyn ReportCache>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl ReportEngine {
    pub fn new(
        source: Arc<dyn DataSource>,
        cache: Arc<dyn ReportCache>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            source,
            cache,
            clock,
            settings,
        }
    }

    /// Generate the progress report for a student.
    ///
    /// Always returns a well-formed report; check `data_freshness` for
    /// `Stale` to detect a fallback.
    pub async fn generate_student_report(&self, student_id: &str) -> StudentReport {
        if let Some(mut cached) = self.cache.get(student_id) {
            cached.data_freshness = DataFreshness::Cached;
            return cached;
        }

        match self.build_student_report(student_id).await {
            Ok(report) => {
                info!(
                    "Generated report for {} with {} weeks ({} trend)",
                    student_id,
                    report.weekly_reports.len(),
                    report.trend.direction
                );
                self.cache.set(student_id, report.clone());
                report
            }
            Err(e) => {
                warn!("Falling back to empty report for {}: {}", student_id, e);
                StudentReport::fallback(student_id, self.clock.now())
            }
        }
    }

    async fn build_student_report(&self, student_id: &str) -> Result<StudentReport, SourceError> {
        let since = Duration::try_days(self.settings.lookback_days)
            .and_then(|window| self.clock.today().checked_sub_signed(window))
            .ok_or_else(|| {
                SourceError::Unavailable(format!(
                    "lookback of {} days is outside the supported date range",
                    self.settings.lookback_days
                ))
            })?;

        let (profile, records) = tokio::try_join!(
            self.source.fetch_student_profile(student_id),
            self.source
                .fetch_recent_activity_records(student_id, since, self.settings.max_records),
        )?;

        let buckets = analysis::group_by_week(&records);
        debug!(
            "Student {} has {} records in {} weeks since {}",
            student_id,
            records.len(),
            buckets.len(),
            since
        );

        let recent = analysis::most_recent_weeks(buckets, self.settings.max_weeks);
        let mut weekly_reports = join_all(recent.into_iter().map(|(week_key, week_records)| async move {
            analysis::generate_weekly_report(week_key, &week_records)
        }))
        .await;
        analysis::sort_weekly_reports(&mut weekly_reports);

        let overall = analysis::overall_metrics(
            &profile,
            &records,
            &weekly_reports,
            self.settings.overall_weeks,
        );
        let trend = determine_trend(&weekly_reports, self.settings.trend_window);

        Ok(StudentReport {
            student_id: student_id.to_string(),
            student_name: profile.name,
            school: profile.school,
            grade: profile.grade,
            overall,
            weekly_reports,
            trend,
            data_freshness: DataFreshness::Realtime,
            generated_at: self.clock.now(),
        })
    }

    /// Compare several students over a period.
    ///
    /// Students are processed concurrently. A student whose profile or
    /// report cannot be loaded is listed in `failed_students` and left out
    /// of every aggregate.
    pub async fn generate_comparative_report(
        &self,
        student_ids: &[String],
        period: ComparisonPeriod,
    ) -> ComparativeReport {
        let unique = unique_ids(student_ids);

        let outcomes = join_all(unique.iter().map(|id| self.compare_student(id, period))).await;

        let mut students = Vec::new();
        let mut failed_students = Vec::new();
        for outcome in outcomes {
            match outcome {
                StudentOutcome::Included(comparison) => students.push(comparison),
                StudentOutcome::Failed { student_id, reason } => {
                    warn!("Excluding {} from comparison: {}", student_id, reason);
                    failed_students.push(student_id);
                }
            }
        }

        students.sort_by(|a, b| {
            b.completion_rate
                .partial_cmp(&a.completion_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.student_id.cmp(&b.student_id))
        });
        let averages = group_averages(&students);

        info!(
            "Compared {} students over a {} ({} failed)",
            students.len(),
            period,
            failed_students.len()
        );

        ComparativeReport {
            period,
            student_count: students.len(),
            students,
            averages,
            failed_students,
            generated_at: self.clock.now(),
        }
    }

    async fn compare_student(&self, student_id: &str, period: ComparisonPeriod) -> StudentOutcome {
        let (profile, report) = tokio::join!(
            self.source.fetch_student_profile(student_id),
            self.generate_student_report(student_id),
        );

        let profile = match profile {
            Ok(profile) => profile,
            Err(e) => {
                return StudentOutcome::Failed {
                    student_id: student_id.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        if report.data_freshness == DataFreshness::Stale {
            return StudentOutcome::Failed {
                student_id: student_id.to_string(),
                reason: "activity data unavailable".to_string(),
            };
        }

        StudentOutcome::Included(student_comparison(&profile, &report, period))
    }

    /// Drop every cached report.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Report cache cleared");
    }
}

/// Student ids in first-seen order with duplicates removed.
pub fn unique_ids(student_ids: &[String]) -> Vec<&str> {
    let mut unique: Vec<&str> = Vec::new();
    for id in student_ids {
        if !unique.contains(&id.as_str()) {
            unique.push(id.as_str());
        }
    }
    unique
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Summarize one student's report over the period's most recent weeks.
fn student_comparison(
    profile: &StudentProfile,
    report: &StudentReport,
    period: ComparisonPeriod,
) -> StudentComparison {
    let weeks = || report.weekly_reports.iter().take(period.weeks());

    StudentComparison {
        student_id: report.student_id.clone(),
        student_name: profile.name.clone(),
        school: profile.school.clone(),
        grade: profile.grade.clone(),
        completion_rate: mean(weeks().map(|w| w.summary.completion_rate)),
        average_score: mean(weeks().map(|w| w.summary.average_score)),
        consistency_score: mean(weeks().map(|w| w.summary.consistency_score)),
        streak: profile.streak,
        total_points: profile.total_points,
        trend: report.trend.direction,
        has_recent_data: report.latest_week().is_some(),
    }
}

/// Group averages over students whose most recent week has data.
fn group_averages(students: &[StudentComparison]) -> GroupAverages {
    let with_data: Vec<&StudentComparison> =
        students.iter().filter(|s| s.has_recent_data).collect();

    GroupAverages {
        completion_rate: mean(with_data.iter().map(|s| s.completion_rate)),
        average_score: mean(with_data.iter().map(|s| s.average_score)),
        consistency_score: mean(with_data.iter().map(|s| s.consistency_score)),
        streak: mean(with_data.iter().map(|s| s.streak as f64)),
        students_with_data: with_data.len(),
    }
}
