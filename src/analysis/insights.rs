//! Threshold-based weekly insights.

use crate::models::{weekday_name, BreakdownStats, WeeklyInsights, WeeklySummary};
use std::collections::BTreeMap;

pub const MAX_STRENGTHS: usize = 3;
pub const MAX_CHALLENGES: usize = 2;
pub const MAX_RECOMMENDATIONS: usize = 3;

const HIGH_COMPLETION: f64 = 80.0;
const LOW_COMPLETION: f64 = 40.0;
const HIGH_CONSISTENCY: f64 = 70.0;
const LOW_CONSISTENCY: f64 = 30.0;
const HIGH_SCORE: f64 = 8.0;
const LOW_SCORE: f64 = 5.0;
const HIGH_ADHERENCE: f64 = 80.0;
const STRONG_DAY_RATE: f64 = 90.0;
const WEAK_DAY_RATE: f64 = 20.0;
/// A weekday needs more than this many records to be judged.
const MIN_DAY_RECORDS: usize = 2;
const MIN_TYPE_RECORDS: usize = 3;

/// Derive strengths, challenges and recommendations from a week's metrics.
///
/// Every rule fires independently; results keep rule order and are capped
/// per list.
pub fn derive_insights(
    summary: &WeeklySummary,
    by_day: &[BreakdownStats],
    by_activity_type: &BTreeMap<String, BreakdownStats>,
) -> WeeklyInsights {
    let mut insights = WeeklyInsights::default();

    if summary.completion_rate >= HIGH_COMPLETION {
        insights.strengths.push(format!(
            "High engagement: {:.0}% of scheduled activities completed",
            summary.completion_rate
        ));
    } else if summary.completion_rate <= LOW_COMPLETION {
        insights.challenges.push(format!(
            "Low completion rate ({:.0}%)",
            summary.completion_rate
        ));
        insights
            .recommendations
            .push("Consider adjusting activity difficulty or weekly volume".to_string());
    }

    if summary.consistency_score >= HIGH_CONSISTENCY {
        insights
            .strengths
            .push("Established routine with activity on most days".to_string());
    } else if summary.consistency_score <= LOW_CONSISTENCY {
        insights
            .challenges
            .push("Inconsistent activity across the week".to_string());
        insights
            .recommendations
            .push("A fixed daily schedule can help build a routine".to_string());
    }

    if summary.average_score >= HIGH_SCORE {
        insights.strengths.push(format!(
            "Good performance with an average score of {:.1}",
            summary.average_score
        ));
    } else if summary.average_score <= LOW_SCORE {
        insights.challenges.push(format!(
            "Content may be too difficult (average score {:.1})",
            summary.average_score
        ));
        insights
            .recommendations
            .push("Review fundamentals before introducing new content".to_string());
    }

    if summary.adherence_score >= HIGH_ADHERENCE {
        insights
            .strengths
            .push("Completes activities on the scheduled day".to_string());
    }

    for (day, stats) in by_day.iter().enumerate() {
        if stats.total <= MIN_DAY_RECORDS {
            continue;
        }
        let rate = stats.completion_rate();
        let name = weekday_name(day as u8);
        if rate >= STRONG_DAY_RATE {
            insights
                .strengths
                .push(format!("Excellent engagement on {}s", name));
        } else if rate <= WEAK_DAY_RATE {
            insights
                .challenges
                .push(format!("Low engagement on {}s", name));
        }
    }

    for (activity_type, stats) in by_activity_type {
        if stats.total < MIN_TYPE_RECORDS || stats.completed == 0 {
            continue;
        }
        if stats.average_score >= HIGH_SCORE {
            insights
                .strengths
                .push(format!("Strong results in {} activities", activity_type));
        } else if stats.average_score <= LOW_SCORE {
            insights
                .challenges
                .push(format!("Difficulty with {} activities", activity_type));
            insights.recommendations.push(format!(
                "Reinforce {} activities with extra guidance",
                activity_type
            ));
        }
    }

    insights.strengths.truncate(MAX_STRENGTHS);
    insights.challenges.truncate(MAX_CHALLENGES);
    insights.recommendations.truncate(MAX_RECOMMENDATIONS);
    insights
}
