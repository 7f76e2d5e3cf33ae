//! Weekly aggregation of activity progress.
//!
//! Records are grouped into calendar weeks and each week is reduced to a
//! [`WeeklyReportData`] with summary counters and breakdowns.

use super::insights::derive_insights;
use crate::models::{
    ActivityProgressRecord, BreakdownStats, OverallMetrics, StudentProfile, WeekKey,
    WeeklyReportData, WeeklySummary,
};
use std::collections::{BTreeMap, HashSet};

/// Percentage helper, 0 when the denominator is 0.
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Group records by the calendar week of their scheduled date.
pub fn group_by_week(
    records: &[ActivityProgressRecord],
) -> BTreeMap<WeekKey, Vec<ActivityProgressRecord>> {
    let mut grouped: BTreeMap<WeekKey, Vec<ActivityProgressRecord>> = BTreeMap::new();

    for record in records {
        grouped
            .entry(WeekKey::containing(record.scheduled_date))
            .or_default()
            .push(record.clone());
    }

    grouped
}

/// Take the `n` most recent week buckets, newest first.
pub fn most_recent_weeks(
    buckets: BTreeMap<WeekKey, Vec<ActivityProgressRecord>>,
    n: usize,
) -> Vec<(WeekKey, Vec<ActivityProgressRecord>)> {
    buckets
        .into_iter()
        .rev()
        .filter(|(_, records)| !records.is_empty())
        .take(n)
        .collect()
}

/// Reduce a set of records to breakdown counters.
fn breakdown<'a>(records: impl Iterator<Item = &'a ActivityProgressRecord>) -> BreakdownStats {
    let mut stats = BreakdownStats::default();
    let mut points = 0.0;
    let mut minutes = 0.0;

    for record in records {
        stats.total += 1;
        if record.is_completed() {
            stats.completed += 1;
            points += record.points_earned;
            minutes += record.time_spent_minutes;
        } else if record.is_skipped() {
            stats.skipped += 1;
        }
    }

    if stats.completed > 0 {
        stats.average_score = points / stats.completed as f64;
        stats.average_time = minutes / stats.completed as f64;
    }

    stats
}

/// Build the report for one week bucket.
pub fn generate_weekly_report(
    week_key: WeekKey,
    records: &[ActivityProgressRecord],
) -> WeeklyReportData {
    let completed: Vec<&ActivityProgressRecord> =
        records.iter().filter(|r| r.is_completed()).collect();
    let skipped = records.iter().filter(|r| r.is_skipped()).count();

    let total_points: f64 = completed.iter().map(|r| r.points_earned).sum();
    let total_time: f64 = completed.iter().map(|r| r.time_spent_minutes).sum();
    let active_days: HashSet<u8> = completed.iter().map(|r| r.day_of_week).collect();
    let on_schedule = completed.iter().filter(|r| r.completed_on_schedule()).count();

    let (average_score, average_time) = if completed.is_empty() {
        (0.0, 0.0)
    } else {
        (
            total_points / completed.len() as f64,
            total_time / completed.len() as f64,
        )
    };

    let summary = WeeklySummary {
        total_activities: records.len(),
        completed_activities: completed.len(),
        skipped_activities: skipped,
        completion_rate: percentage(completed.len(), records.len()),
        total_points,
        average_score,
        average_time,
        consistency_score: percentage(active_days.len(), 7),
        adherence_score: percentage(on_schedule, completed.len()),
    };

    let by_day: Vec<BreakdownStats> = (0..7u8)
        .map(|day| breakdown(records.iter().filter(|r| r.day_of_week == day)))
        .collect();

    let mut types: BTreeMap<&str, Vec<&ActivityProgressRecord>> = BTreeMap::new();
    for record in records {
        types
            .entry(record.activity.activity_type.as_str())
            .or_default()
            .push(record);
    }
    let by_activity_type: BTreeMap<String, BreakdownStats> = types
        .into_iter()
        .map(|(activity_type, group)| (activity_type.to_string(), breakdown(group.into_iter())))
        .collect();

    let insights = derive_insights(&summary, &by_day, &by_activity_type);

    WeeklyReportData {
        week_key,
        week_number: week_key.week_number(),
        iso_year: week_key.iso_year(),
        summary,
        by_day,
        by_activity_type,
        insights,
    }
}

/// Sort weekly reports most recent first.
pub fn sort_weekly_reports(reports: &mut [WeeklyReportData]) {
    reports.sort_by(|a, b| {
        b.iso_year
            .cmp(&a.iso_year)
            .then_with(|| b.week_number.cmp(&a.week_number))
    });
}

/// Mean completion rate of the first `n` weekly reports.
pub fn average_completion_rate(reports: &[WeeklyReportData], n: usize) -> f64 {
    let recent: Vec<f64> = reports
        .iter()
        .take(n)
        .map(|r| r.summary.completion_rate)
        .collect();

    if recent.is_empty() {
        0.0
    } else {
        recent.iter().sum::<f64>() / recent.len() as f64
    }
}

/// Merge profile totals with metrics computed from the activity window.
///
/// Points, level and streak always come from the profile, even when the
/// activity records tell a different story.
pub fn overall_metrics(
    profile: &StudentProfile,
    records: &[ActivityProgressRecord],
    weekly_reports: &[WeeklyReportData],
    overall_weeks: usize,
) -> OverallMetrics {
    let completed = records.iter().filter(|r| r.is_completed());

    OverallMetrics {
        total_points: profile.total_points,
        level: profile.level,
        streak: profile.streak,
        total_activities_completed: completed.clone().count(),
        average_completion_rate: average_completion_rate(weekly_reports, overall_weeks),
        total_time_spent: completed.clone().map(|r| r.time_spent_minutes).sum(),
        last_activity_date: completed.filter_map(|r| r.completed_at).max(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivitySnapshot, ActivityStatus};
    use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc};

    fn create_test_record(
        date: NaiveDate,
        status: ActivityStatus,
        points: f64,
        activity_type: &str,
    ) -> ActivityProgressRecord {
        let completed_at = (status == ActivityStatus::Completed).then(|| {
            Utc.from_utc_datetime(&date.and_hms_opt(15, 0, 0).unwrap())
        });
        ActivityProgressRecord {
            id: format!("{}-{}", date, points),
            student_id: "s1".to_string(),
            scheduled_date: date,
            day_of_week: date.weekday().num_days_from_sunday() as u8,
            status,
            points_earned: points,
            time_spent_minutes: 10.0,
            completed_at,
            activity: ActivitySnapshot {
                activity_type: activity_type.to_string(),
                title: "Test activity".to_string(),
            },
            is_active: true,
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
    }

    #[test]
    fn test_group_by_week() {
        let records = vec![
            create_test_record(monday(), ActivityStatus::Completed, 8.0, "reading"),
            create_test_record(monday() + Duration::days(6), ActivityStatus::Skipped, 0.0, "reading"),
            create_test_record(monday() + Duration::days(7), ActivityStatus::Pending, 0.0, "reading"),
        ];

        let grouped = group_by_week(&records);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&WeekKey::containing(monday())].len(), 2);
    }

    #[test]
    fn test_most_recent_weeks_newest_first() {
        let records: Vec<ActivityProgressRecord> = (0..10)
            .map(|w| {
                create_test_record(
                    monday() - Duration::weeks(w),
                    ActivityStatus::Completed,
                    7.0,
                    "reading",
                )
            })
            .collect();

        let recent = most_recent_weeks(group_by_week(&records), 8);
        assert_eq!(recent.len(), 8);
        assert_eq!(recent[0].0.week_start, monday());
        assert!(recent.windows(2).all(|w| w[0].0 > w[1].0));
    }

    #[test]
    fn test_ten_records_eight_completed() {
        let mut records = Vec::new();
        for i in 0..8 {
            let date = monday() + Duration::days(i % 7);
            records.push(create_test_record(date, ActivityStatus::Completed, 9.0, "reading"));
        }
        records.push(create_test_record(monday(), ActivityStatus::Skipped, 0.0, "reading"));
        records.push(create_test_record(monday() + Duration::days(1), ActivityStatus::Skipped, 0.0, "motor"));

        let report = generate_weekly_report(WeekKey::containing(monday()), &records);
        let summary = &report.summary;

        assert_eq!(summary.total_activities, 10);
        assert_eq!(summary.completed_activities, 8);
        assert_eq!(summary.skipped_activities, 2);
        assert_eq!(summary.completion_rate, 80.0);
        assert_eq!(summary.adherence_score, 100.0);
        assert_eq!(summary.consistency_score, 100.0);
        assert_eq!(summary.average_score, 9.0);
        assert_eq!(summary.average_time, 10.0);
        assert_eq!(report.week_number, 42);
    }

    #[test]
    fn test_adherence_counts_late_completions() {
        let mut late = create_test_record(monday(), ActivityStatus::Completed, 6.0, "reading");
        late.completed_at = Some(Utc.with_ymd_and_hms(2026, 10, 13, 9, 0, 0).unwrap());
        let on_time = create_test_record(monday(), ActivityStatus::Completed, 6.0, "reading");

        let report = generate_weekly_report(WeekKey::containing(monday()), &[late, on_time]);
        assert_eq!(report.summary.adherence_score, 50.0);
        // Both completions were scheduled on Monday
        assert!((report.summary.consistency_score - 100.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_breakdowns_by_day_and_type() {
        let records = vec![
            create_test_record(monday(), ActivityStatus::Completed, 8.0, "reading"),
            create_test_record(monday(), ActivityStatus::Completed, 4.0, "motor"),
            create_test_record(monday(), ActivityStatus::Skipped, 0.0, "motor"),
            create_test_record(monday() + Duration::days(2), ActivityStatus::Pending, 0.0, "reading"),
        ];

        let report = generate_weekly_report(WeekKey::containing(monday()), &records);

        assert_eq!(report.by_day.len(), 7);
        let mon = &report.by_day[1];
        assert_eq!(mon.total, 3);
        assert_eq!(mon.completed, 2);
        assert_eq!(mon.skipped, 1);
        assert_eq!(mon.average_score, 6.0);
        assert_eq!(report.by_day[3].total, 1);
        assert_eq!(report.by_day[0].total, 0);

        let motor = &report.by_activity_type["motor"];
        assert_eq!(motor.total, 2);
        assert_eq!(motor.completed, 1);
        assert_eq!(motor.average_score, 4.0);
        assert_eq!(report.by_activity_type["reading"].total, 2);
    }

    #[test]
    fn test_scores_stay_within_bounds() {
        let statuses = [
            ActivityStatus::Completed,
            ActivityStatus::Skipped,
            ActivityStatus::Pending,
            ActivityStatus::InProgress,
        ];
        let records: Vec<ActivityProgressRecord> = (0..20)
            .map(|i| {
                create_test_record(
                    monday() + Duration::days(i % 7),
                    statuses[(i % 4) as usize],
                    (i % 11) as f64,
                    "reading",
                )
            })
            .collect();

        let report = generate_weekly_report(WeekKey::containing(monday()), &records);
        let s = &report.summary;
        for value in [s.completion_rate, s.consistency_score, s.adherence_score] {
            assert!((0.0..=100.0).contains(&value));
        }
        assert!(s.completed_activities + s.skipped_activities <= s.total_activities);
    }

    #[test]
    fn test_sort_weekly_reports_across_year_boundary() {
        let last_week_of_year = NaiveDate::from_ymd_opt(2026, 12, 28).unwrap();
        let first_week = NaiveDate::from_ymd_opt(2027, 1, 4).unwrap();
        let records_a = [create_test_record(last_week_of_year, ActivityStatus::Completed, 5.0, "x")];
        let records_b = [create_test_record(first_week, ActivityStatus::Completed, 5.0, "x")];

        let mut reports = vec![
            generate_weekly_report(WeekKey::containing(last_week_of_year), &records_a),
            generate_weekly_report(WeekKey::containing(first_week), &records_b),
        ];
        sort_weekly_reports(&mut reports);

        assert_eq!(reports[0].week_number, 1);
        assert_eq!(reports[1].week_number, 53);
    }

    #[test]
    fn test_overall_metrics_trust_profile_totals() {
        let profile = StudentProfile {
            id: "s1".to_string(),
            name: "Ana".to_string(),
            school: "Escola".to_string(),
            grade: "2".to_string(),
            total_points: 999,
            level: 7,
            streak: 12,
        };
        let records = vec![
            create_test_record(monday(), ActivityStatus::Completed, 8.0, "reading"),
            create_test_record(monday() + Duration::days(1), ActivityStatus::Completed, 6.0, "reading"),
            create_test_record(monday() + Duration::days(2), ActivityStatus::Skipped, 0.0, "reading"),
        ];
        let weekly = vec![generate_weekly_report(WeekKey::containing(monday()), &records)];

        let overall = overall_metrics(&profile, &records, &weekly, 4);

        assert_eq!(overall.total_points, 999);
        assert_eq!(overall.level, 7);
        assert_eq!(overall.streak, 12);
        assert_eq!(overall.total_activities_completed, 2);
        assert_eq!(overall.total_time_spent, 20.0);
        assert!((overall.average_completion_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            overall.last_activity_date,
            Some(Utc.with_ymd_and_hms(2026, 10, 13, 15, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_average_completion_rate_uses_recent_weeks() {
        assert_eq!(average_completion_rate(&[], 4), 0.0);
    }
}
