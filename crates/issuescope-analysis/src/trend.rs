//! Rule-based statistical trend analysis.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use futures::future::BoxFuture;
use tracing::debug;

use issuescope_core::error::Result;
use issuescope_core::traits::TrendAnalyzer;
use issuescope_core::types::{
    Anomaly, Forecast, ForecastPoint, Issue, SeasonalPatterns, TrendDirection, TrendSummary,
};

/// Slope (issues/day difference) below which the trend counts as stable.
const STABLE_SLOPE_THRESHOLD: f64 = 0.1;
const FORECAST_HORIZON_DAYS: i64 = 7;

/// Statistical analyzer over the issue creation series.
///
/// Compares the most recent 30 days against the prior window to derive a
/// direction, builds a weekday histogram, flags days beyond two standard
/// deviations, and extends the fitted rate into a short linear forecast.
pub struct StatTrendAnalyzer;

impl StatTrendAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn daily_counts(issues: &[Issue]) -> BTreeMap<NaiveDate, u32> {
        let mut counts: BTreeMap<NaiveDate, u32> = BTreeMap::new();
        for issue in issues {
            *counts.entry(issue.created_at.date_naive()).or_insert(0) += 1;
        }
        counts
    }

    /// Issues/day in the last 30 days minus issues/day in the rest of the
    /// window. Positive slope means activity is accelerating.
    fn rate_slope(issues: &[Issue], window_days: u32) -> f64 {
        let cutoff = Utc::now() - Duration::days(30);
        let recent = issues.iter().filter(|i| i.created_at >= cutoff).count();
        let prior = issues.len() - recent;

        let recent_span = (window_days.min(30)).max(1) as f64;
        let prior_span = window_days.saturating_sub(30).max(1) as f64;

        recent as f64 / recent_span - prior as f64 / prior_span
    }

    fn direction(slope: f64) -> TrendDirection {
        if slope > STABLE_SLOPE_THRESHOLD {
            TrendDirection::Increasing
        } else if slope < -STABLE_SLOPE_THRESHOLD {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }

    fn weekday_histogram(issues: &[Issue]) -> SeasonalPatterns {
        let mut weekday = BTreeMap::new();
        for day in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ] {
            weekday.insert(weekday_name(day).to_string(), 0);
        }
        for issue in issues {
            let name = weekday_name(issue.created_at.weekday());
            *weekday.entry(name.to_string()).or_insert(0) += 1;
        }
        SeasonalPatterns { weekday }
    }

    /// Days whose volume exceeds mean + 2σ of the daily series.
    fn detect_anomalies(counts: &BTreeMap<NaiveDate, u32>) -> Vec<Anomaly> {
        if counts.len() < 7 {
            return Vec::new();
        }

        let values: Vec<f64> = counts.values().map(|&v| v as f64).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        let std_dev = variance.sqrt();

        if std_dev == 0.0 {
            return Vec::new();
        }

        counts
            .iter()
            .filter(|(_, &count)| count as f64 > mean + 2.0 * std_dev)
            .map(|(date, &count)| {
                let severity = if count as f64 > mean + 3.0 * std_dev {
                    "high"
                } else {
                    "medium"
                };
                Anomaly {
                    date: date.format("%Y-%m-%d").to_string(),
                    kind: "volume_spike".into(),
                    observed: count,
                    expected: mean.round() as u32,
                    severity: severity.into(),
                }
            })
            .collect()
    }

    /// Extends the current daily rate plus the fitted slope over a short
    /// horizon. Forecast values never go negative.
    fn forecast(counts: &BTreeMap<NaiveDate, u32>, slope: f64, window_days: u32) -> Forecast {
        let total: u32 = counts.values().sum();
        let daily_average = total as f64 / window_days.max(1) as f64;

        let today = Utc::now().date_naive();
        let points = (1..=FORECAST_HORIZON_DAYS)
            .map(|offset| {
                let value = (daily_average + slope * offset as f64).max(0.0);
                ForecastPoint {
                    date: (today + Duration::days(offset))
                        .format("%Y-%m-%d")
                        .to_string(),
                    value: (value * 100.0).round() / 100.0,
                }
            })
            .collect();

        Forecast {
            method: "linear_rate_extrapolation".into(),
            points,
            historical_daily_average: (daily_average * 100.0).round() / 100.0,
        }
    }

    fn confidence(issue_count: usize) -> f64 {
        if issue_count > 50 {
            0.8
        } else if issue_count > 20 {
            0.6
        } else {
            0.4
        }
    }
}

impl Default for StatTrendAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendAnalyzer for StatTrendAnalyzer {
    fn analyze<'a>(
        &'a self,
        issues: &'a [Issue],
        window_days: u32,
    ) -> BoxFuture<'a, Result<TrendSummary>> {
        Box::pin(async move {
            let counts = Self::daily_counts(issues);
            let slope = Self::rate_slope(issues, window_days);
            let direction = Self::direction(slope);
            let anomalies = Self::detect_anomalies(&counts);
            let forecast = Self::forecast(&counts, slope, window_days);

            debug!(
                issues = issues.len(),
                slope,
                direction = direction.as_str(),
                anomalies = anomalies.len(),
                "Trend analysis complete"
            );

            Ok(TrendSummary {
                direction,
                slope: (slope * 1000.0).round() / 1000.0,
                seasonal: Self::weekday_histogram(issues),
                anomalies,
                forecast,
                confidence: Self::confidence(issues.len()),
                period: format!("{} days", window_days),
            })
        })
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use issuescope_core::types::IssueState;

    fn issue_at(days_ago: i64, number: u64) -> Issue {
        let created: DateTime<Utc> = Utc::now() - Duration::days(days_ago);
        Issue {
            id: number,
            number,
            title: format!("Issue {}", number),
            body: None,
            state: IssueState::Open,
            created_at: created,
            updated_at: created,
            closed_at: None,
            labels: Vec::new(),
            assignees: Vec::new(),
            author: "dev".into(),
            comments_count: 0,
            reactions_count: 0,
        }
    }

    #[tokio::test]
    async fn recent_burst_reads_as_increasing() {
        // 60 issues in the last 10 days, 5 in the prior 80.
        let mut issues: Vec<Issue> = (0..60u64).map(|i| issue_at((i % 10) as i64, i)).collect();
        issues.extend((60..65u64).map(|i| issue_at(40 + (i as i64 % 40), i)));

        let analyzer = StatTrendAnalyzer::new();
        let trend = analyzer.analyze(&issues, 90).await.unwrap();
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert!(trend.slope > 0.0);
        assert_eq!(trend.confidence, 0.8);
    }

    #[tokio::test]
    async fn uniform_series_reads_as_stable() {
        // One issue per day across the window.
        let issues: Vec<Issue> = (0..90).map(|i| issue_at(i, i as u64)).collect();
        let analyzer = StatTrendAnalyzer::new();
        let trend = analyzer.analyze(&issues, 90).await.unwrap();
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[tokio::test]
    async fn spike_day_flagged_as_anomaly() {
        // Baseline one per day, then one day with a burst.
        let mut issues: Vec<Issue> = (0..60).map(|i| issue_at(i, i as u64)).collect();
        issues.extend((100..130).map(|i| issue_at(15, i)));

        let analyzer = StatTrendAnalyzer::new();
        let trend = analyzer.analyze(&issues, 90).await.unwrap();
        assert!(!trend.anomalies.is_empty());
        assert_eq!(trend.anomalies[0].kind, "volume_spike");
    }

    #[tokio::test]
    async fn forecast_covers_horizon() {
        let issues: Vec<Issue> = (0..30).map(|i| issue_at(i, i as u64)).collect();
        let analyzer = StatTrendAnalyzer::new();
        let trend = analyzer.analyze(&issues, 90).await.unwrap();
        assert_eq!(trend.forecast.points.len(), 7);
        assert!(trend.forecast.points.iter().all(|p| p.value >= 0.0));
    }

    #[tokio::test]
    async fn small_sample_lowers_confidence() {
        let issues: Vec<Issue> = (0..10).map(|i| issue_at(i, i as u64)).collect();
        let analyzer = StatTrendAnalyzer::new();
        let trend = analyzer.analyze(&issues, 90).await.unwrap();
        assert_eq!(trend.confidence, 0.4);
        assert_eq!(trend.period, "90 days");
    }
}
