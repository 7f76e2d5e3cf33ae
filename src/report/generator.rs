//! Markdown report generation.
//!
//! This module renders student and comparative reports as Markdown
//! documents, and serializes them to JSON.

use crate::config::ReportConfig;
use crate::models::{
    weekday_name, ComparativeReport, DataFreshness, OverallMetrics, StudentReport,
    WeeklyInsights, WeeklyReportData,
};
use anyhow::Result;
use serde::Serialize;

/// Generate a Markdown document covering one or more student reports.
pub fn generate_markdown_report(reports: &[StudentReport], options: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Student Progress Report\n\n");

    // Table of contents
    if reports.len() > 1 {
        output.push_str(&generate_table_of_contents(reports));
    }

    for report in reports {
        output.push_str(&generate_student_section(report, options));
    }

    // Footer
    output.push_str(&generate_footer());

    output
}

fn student_anchor(report: &StudentReport) -> String {
    report
        .student_name
        .replace(['/', '.', ' '], "-")
        .to_lowercase()
}

/// Generate the table of contents.
fn generate_table_of_contents(reports: &[StudentReport]) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    for report in reports {
        toc.push_str(&format!(
            "- [{}](#{})\n",
            report.student_name,
            student_anchor(report)
        ));
    }
    toc.push('\n');

    toc
}

/// Generate the section for one student.
fn generate_student_section(report: &StudentReport, options: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", report.student_name));

    if report.data_freshness == DataFreshness::Stale {
        section.push_str(
            "> ⚠️ Data for this student could not be loaded. Figures below are placeholders.\n\n",
        );
    }

    section.push_str(&format!("- **Student ID:** {}\n", report.student_id));
    if !report.school.is_empty() {
        section.push_str(&format!("- **School:** {}\n", report.school));
    }
    if !report.grade.is_empty() {
        section.push_str(&format!("- **Grade:** {}\n", report.grade));
    }
    section.push_str(&format!(
        "- **Generated:** {} ({})\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.data_freshness
    ));

    section.push_str(&generate_overall_section(&report.overall));

    section.push_str(&format!(
        "**Trend:** {} {} ({} confidence, {:+.2} points/week over {} weeks)\n\n",
        report.trend.direction.arrow(),
        report.trend.direction,
        report.trend.confidence,
        report.trend.average_change,
        report.trend.scores_used
    ));

    if report.weekly_reports.is_empty() {
        section.push_str("No activity recorded in the reporting window.\n\n");
        return section;
    }

    for week in &report.weekly_reports {
        section.push_str(&generate_weekly_section(week, options));
    }

    section
}

/// Generate the overall metrics table.
fn generate_overall_section(overall: &OverallMetrics) -> String {
    let mut section = String::new();

    section.push_str("### Overall\n\n");
    section.push_str("| Points | Level | Streak | Completed | Completion Rate | Time Spent | Last Activity |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");

    let last_activity = overall
        .last_activity_date
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());

    section.push_str(&format!(
        "| {} | {} | {} | {} | {:.1}% | {:.0} min | {} |\n\n",
        overall.total_points,
        overall.level,
        overall.streak,
        overall.total_activities_completed,
        overall.average_completion_rate,
        overall.total_time_spent,
        last_activity
    ));

    section
}

/// Generate the section for one week.
fn generate_weekly_section(week: &WeeklyReportData, options: &ReportConfig) -> String {
    let mut section = String::new();
    let summary = &week.summary;

    section.push_str(&format!(
        "### Week {} ({})\n\n",
        week.week_number, week.week_key
    ));

    section.push_str("| Activities | Completed | Skipped | Completion | Avg Score | Avg Time | Consistency | Adherence |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {:.1}% | {:.1} | {:.0} min | {:.1}% | {:.1}% |\n\n",
        summary.total_activities,
        summary.completed_activities,
        summary.skipped_activities,
        summary.completion_rate,
        summary.average_score,
        summary.average_time,
        summary.consistency_score,
        summary.adherence_score
    ));

    if options.include_breakdowns {
        section.push_str("#### By Day\n\n");
        section.push_str("| Day | Total | Completed | Skipped | Avg Score |\n");
        section.push_str("|:---|:---:|:---:|:---:|:---:|\n");
        for (day, stats) in week.by_day.iter().enumerate() {
            if stats.total == 0 {
                continue;
            }
            section.push_str(&format!(
                "| {} | {} | {} | {} | {:.1} |\n",
                weekday_name(day as u8),
                stats.total,
                stats.completed,
                stats.skipped,
                stats.average_score
            ));
        }
        section.push('\n');

        section.push_str("#### By Activity Type\n\n");
        section.push_str("| Type | Total | Completed | Skipped | Avg Score | Avg Time |\n");
        section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|\n");
        for (activity_type, stats) in &week.by_activity_type {
            section.push_str(&format!(
                "| {} | {} | {} | {} | {:.1} | {:.0} min |\n",
                activity_type,
                stats.total,
                stats.completed,
                stats.skipped,
                stats.average_score,
                stats.average_time
            ));
        }
        section.push('\n');
    }

    if options.include_insights {
        section.push_str(&generate_insights_block(&week.insights));
    }

    section
}

/// Generate the strengths/challenges/recommendations lists.
fn generate_insights_block(insights: &WeeklyInsights) -> String {
    if insights.is_empty() {
        return String::new();
    }

    let mut block = String::new();
    let lists = [
        ("✅ Strengths", &insights.strengths),
        ("⚠️ Challenges", &insights.challenges),
        ("💡 Recommendations", &insights.recommendations),
    ];

    for (heading, items) in lists {
        if items.is_empty() {
            continue;
        }
        block.push_str(&format!("**{}**\n\n", heading));
        for item in items {
            block.push_str(&format!("- {}\n", item));
        }
        block.push('\n');
    }

    block
}

/// Generate a Markdown comparative report.
pub fn generate_comparative_markdown(report: &ComparativeReport) -> String {
    let mut output = String::new();

    output.push_str("# Student Comparison Report\n\n");
    output.push_str(&format!("- **Period:** {}\n", report.period));
    output.push_str(&format!("- **Students:** {}\n", report.student_count));
    output.push_str(&format!(
        "- **Generated:** {}\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output.push_str("## Group Averages\n\n");
    output.push_str("| Completion Rate | Avg Score | Consistency | Streak | Students with Data |\n");
    output.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    output.push_str(&format!(
        "| {:.1}% | {:.1} | {:.1}% | {:.1} | {} |\n\n",
        report.averages.completion_rate,
        report.averages.average_score,
        report.averages.consistency_score,
        report.averages.streak,
        report.averages.students_with_data
    ));

    output.push_str("## Students\n\n");
    if report.students.is_empty() {
        output.push_str("No student reports could be generated.\n\n");
    } else {
        output.push_str("| # | Student | School | Grade | Completion | Avg Score | Consistency | Streak | Trend |\n");
        output.push_str("|:---:|:---|:---|:---:|:---:|:---:|:---:|:---:|:---:|\n");
        for (i, student) in report.students.iter().enumerate() {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {:.1}% | {:.1} | {:.1}% | {} | {} {} |\n",
                i + 1,
                student.student_name,
                student.school,
                student.grade,
                student.completion_rate,
                student.average_score,
                student.consistency_score,
                student.streak,
                student.trend.arrow(),
                student.trend
            ));
        }
        output.push('\n');
    }

    if !report.failed_students.is_empty() {
        output.push_str("## Excluded Students\n\n");
        output.push_str("Reports for these students could not be generated:\n\n");
        for id in &report.failed_students {
            output.push_str(&format!("- `{}`\n", id));
        }
        output.push('\n');
    }

    output.push_str(&generate_footer());
    output
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by progress-reporter*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report<T: Serialize + ?Sized>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::generate_weekly_report;
    use crate::models::{
        ActivityProgressRecord, ActivitySnapshot, ActivityStatus, ComparisonPeriod,
        GroupAverages, StudentComparison, TrendAnalysis, TrendDirection, WeekKey,
    };
    use chrono::{NaiveDate, TimeZone, Utc};

    fn create_test_report() -> StudentReport {
        let date = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        let records: Vec<ActivityProgressRecord> = (0..4)
            .map(|i| ActivityProgressRecord {
                id: format!("p{}", i),
                student_id: "s1".to_string(),
                scheduled_date: date,
                day_of_week: 1,
                status: ActivityStatus::Completed,
                points_earned: 9.0,
                time_spent_minutes: 15.0,
                completed_at: Some(Utc.with_ymd_and_hms(2026, 10, 12, 15, 0, 0).unwrap()),
                activity: ActivitySnapshot {
                    activity_type: "reading".to_string(),
                    title: "Story".to_string(),
                },
                is_active: true,
            })
            .collect();

        StudentReport {
            student_id: "s1".to_string(),
            student_name: "Ana Souza".to_string(),
            school: "Escola Azul".to_string(),
            grade: "3A".to_string(),
            overall: OverallMetrics {
                total_points: 340,
                level: 4,
                streak: 6,
                total_activities_completed: 4,
                average_completion_rate: 100.0,
                total_time_spent: 60.0,
                last_activity_date: Some(Utc.with_ymd_and_hms(2026, 10, 12, 15, 0, 0).unwrap()),
            },
            weekly_reports: vec![generate_weekly_report(WeekKey::containing(date), &records)],
            trend: TrendAnalysis::default(),
            data_freshness: DataFreshness::Realtime,
            generated_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&[report], &ReportConfig::default());

        assert!(markdown.contains("# Student Progress Report"));
        assert!(markdown.contains("## Ana Souza"));
        assert!(markdown.contains("### Overall"));
        assert!(markdown.contains("### Week 42 (2026-10-12 to 2026-10-18)"));
        assert!(markdown.contains("#### By Day"));
        assert!(markdown.contains("| Monday | 4 | 4 | 0 | 9.0 |"));
        assert!(markdown.contains("Strengths"));
        assert!(!markdown.contains("Table of Contents"));
    }

    #[test]
    fn test_options_hide_sections() {
        let report = create_test_report();
        let options = ReportConfig {
            include_insights: false,
            include_breakdowns: false,
        };
        let markdown = generate_markdown_report(&[report], &options);

        assert!(!markdown.contains("#### By Day"));
        assert!(!markdown.contains("Strengths"));
    }

    #[test]
    fn test_stale_and_empty_reports() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let reports = vec![create_test_report(), StudentReport::fallback("ghost", now)];
        let markdown = generate_markdown_report(&reports, &ReportConfig::default());

        assert!(markdown.contains("Table of Contents"));
        assert!(markdown.contains("could not be loaded"));
        assert!(markdown.contains("No activity recorded"));
    }

    #[test]
    fn test_generate_comparative_markdown() {
        let report = ComparativeReport {
            period: ComparisonPeriod::Month,
            student_count: 1,
            students: vec![StudentComparison {
                student_id: "s1".to_string(),
                student_name: "Ana Souza".to_string(),
                school: "Escola Azul".to_string(),
                grade: "3A".to_string(),
                completion_rate: 87.5,
                average_score: 8.2,
                consistency_score: 57.1,
                streak: 6,
                total_points: 340,
                trend: TrendDirection::Improving,
                has_recent_data: true,
            }],
            averages: GroupAverages {
                completion_rate: 87.5,
                average_score: 8.2,
                consistency_score: 57.1,
                streak: 6.0,
                students_with_data: 1,
            },
            failed_students: vec!["s9".to_string()],
            generated_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
        };

        let markdown = generate_comparative_markdown(&report);
        assert!(markdown.contains("- **Period:** month"));
        assert!(markdown.contains("| 1 | Ana Souza | Escola Azul | 3A | 87.5% |"));
        assert!(markdown.contains("## Excluded Students"));
        assert!(markdown.contains("`s9`"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&[report][..]).unwrap();

        assert!(json.contains("\"student_id\""));
        assert!(json.contains("\"weekly_reports\""));
        assert!(json.contains("\"data_freshness\": \"realtime\""));
    }
}
