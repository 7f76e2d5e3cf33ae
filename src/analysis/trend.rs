//! Score trend detection over the most recent weeks.

use crate::models::{TrendAnalysis, TrendConfidence, TrendDirection, WeeklyReportData};

/// Mean weekly change needed to call a trend.
pub const TREND_THRESHOLD: f64 = 0.8;

/// Scores needed for a high-confidence trend.
const HIGH_CONFIDENCE_SCORES: usize = 3;

/// Classify the trend of the `window` most recent weekly reports.
///
/// `weekly_reports` must be sorted most recent first. Weeks without a
/// positive average score are ignored.
pub fn determine_trend(weekly_reports: &[WeeklyReportData], window: usize) -> TrendAnalysis {
    let mut scores: Vec<f64> = weekly_reports
        .iter()
        .take(window)
        .map(|w| w.summary.average_score)
        .filter(|score| *score > 0.0)
        .collect();
    scores.reverse();

    classify_scores(&scores)
}

/// Classify a chronological sequence of average scores.
pub fn classify_scores(scores: &[f64]) -> TrendAnalysis {
    if scores.len() < 2 {
        return TrendAnalysis {
            scores_used: scores.len(),
            ..TrendAnalysis::default()
        };
    }

    let deltas: Vec<f64> = scores.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let average_change = deltas.iter().sum::<f64>() / deltas.len() as f64;

    let direction = if average_change > TREND_THRESHOLD {
        TrendDirection::Improving
    } else if average_change < -TREND_THRESHOLD {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };

    let confidence = if scores.len() >= HIGH_CONFIDENCE_SCORES {
        TrendConfidence::High
    } else {
        TrendConfidence::Medium
    };

    TrendAnalysis {
        direction,
        confidence,
        average_change,
        scores_used: scores.len(),
    }
}
