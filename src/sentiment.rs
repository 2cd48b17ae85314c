//! Fear & Greed index analysis: classification, a contrarian trading
//! recommendation and a short historical trend read.

use std::fmt;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::utils::{round_dp, timestamp};

pub const DEFAULT_TREND_DAYS: usize = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FearGreedData {
    pub current_index: i64,
    #[serde(default)]
    pub classification: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub historical: Vec<HistoryPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: String,
    pub value: i64,
    #[serde(default)]
    pub classification: String,
}

/// Bundled dataset used when neither a file nor a URL is given.
pub fn sample_data() -> FearGreedData {
    FearGreedData {
        current_index: 45,
        classification: "Fear".to_string(),
        timestamp: timestamp(),
        historical: vec![
            HistoryPoint {
                date: "2025-10-01".to_string(),
                value: 42,
                classification: "Fear".to_string(),
            },
            HistoryPoint {
                date: "2025-10-02".to_string(),
                value: 38,
                classification: "Fear".to_string(),
            },
            HistoryPoint {
                date: "2025-10-03".to_string(),
                value: 45,
                classification: "Fear".to_string(),
            },
        ],
    }
}

pub fn load_from_file(path: &str) -> anyhow::Result<FearGreedData> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let data = serde_json::from_str(&content).with_context(|| format!("parsing {path}"))?;
    info!("fear & greed data loaded from file: {path}");
    Ok(data)
}

pub fn load_from_url(url: &str) -> anyhow::Result<FearGreedData> {
    let data = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("fetching {url}"))?
        .json()
        .with_context(|| format!("parsing response from {url}"))?;
    info!("fear & greed data loaded from url: {url}");
    Ok(data)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sentiment {
    #[serde(rename = "Extreme Fear")]
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    #[serde(rename = "Extreme Greed")]
    ExtremeGreed,
}

impl Sentiment {
    pub fn classify(index: i64) -> Self {
        if index >= 75 {
            Sentiment::ExtremeGreed
        } else if index >= 55 {
            Sentiment::Greed
        } else if index >= 45 {
            Sentiment::Neutral
        } else if index >= 25 {
            Sentiment::Fear
        } else {
            Sentiment::ExtremeFear
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::ExtremeFear => "Extreme Fear",
            Sentiment::Fear => "Fear",
            Sentiment::Neutral => "Neutral",
            Sentiment::Greed => "Greed",
            Sentiment::ExtremeGreed => "Extreme Greed",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        })
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        })
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentSentiment {
    pub index: i64,
    pub classification: Sentiment,
    pub timestamp: String,
}

pub fn current_sentiment(data: &FearGreedData) -> CurrentSentiment {
    let classification = Sentiment::classify(data.current_index);
    info!(
        "current sentiment: {} (index: {})",
        classification, data.current_index
    );
    CurrentSentiment {
        index: data.current_index,
        classification,
        timestamp: timestamp(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub action: Action,
    pub reason: &'static str,
    pub confidence: Confidence,
    pub risk_level: RiskLevel,
}

/// Contrarian read of the index: buy into fear, sell into greed.
pub fn recommendation(index: i64) -> Recommendation {
    let rec = if index <= 20 {
        Recommendation {
            action: Action::Buy,
            reason: "Extreme fear indicates potential buying opportunity",
            confidence: Confidence::High,
            risk_level: RiskLevel::Medium,
        }
    } else if index <= 35 {
        Recommendation {
            action: Action::Buy,
            reason: "Fear sentiment suggests market may be oversold",
            confidence: Confidence::Medium,
            risk_level: RiskLevel::Medium,
        }
    } else if index >= 80 {
        Recommendation {
            action: Action::Sell,
            reason: "Extreme greed indicates potential market top",
            confidence: Confidence::High,
            risk_level: RiskLevel::Medium,
        }
    } else if index >= 65 {
        Recommendation {
            action: Action::Sell,
            reason: "Greed sentiment suggests market may be overbought",
            confidence: Confidence::Medium,
            risk_level: RiskLevel::Medium,
        }
    } else {
        Recommendation {
            action: Action::Hold,
            reason: "Neutral sentiment - no clear directional bias",
            confidence: Confidence::Low,
            risk_level: RiskLevel::Low,
        }
    };
    info!("trading recommendation: {} - {}", rec.action, rec.reason);
    rec
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Improving => "IMPROVING",
            Trend::Declining => "DECLINING",
            Trend::Stable => "STABLE",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendAnalysis {
    pub period_days: usize,
    pub start_value: i64,
    pub end_value: i64,
    pub change: i64,
    pub change_percent: f64,
    pub trend: Trend,
}

/// Looks at the last `days` historical points. Needs at least two points;
/// the trend is driven by the absolute index change, not the percentage.
pub fn historical_trend(data: &FearGreedData, days: usize) -> Option<TrendAnalysis> {
    let historical = &data.historical;
    let window = &historical[historical.len().saturating_sub(days)..];
    if window.len() < 2 {
        warn!("not enough historical data for a trend");
        return None;
    }
    let start_value = window[0].value;
    let end_value = window[window.len() - 1].value;
    let change = end_value - start_value;
    let change_percent = round_dp(change as f64 / start_value as f64 * 100.0, 2);
    let trend = if change > 5 {
        Trend::Improving
    } else if change < -5 {
        Trend::Declining
    } else {
        Trend::Stable
    };
    info!("sentiment trend analysis: {trend} ({change_percent:.1}%)");
    Some(TrendAnalysis {
        period_days: window.len(),
        start_value,
        end_value,
        change,
        change_percent,
        trend,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub sentiment_score: i64,
    pub primary_action: Action,
    pub confidence_level: Confidence,
    pub key_insight: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentimentReport {
    pub timestamp: String,
    pub current_sentiment: CurrentSentiment,
    pub trading_recommendation: Recommendation,
    pub trend_analysis: Option<TrendAnalysis>,
    pub summary: Summary,
}

pub fn report(data: &FearGreedData) -> SentimentReport {
    let current = current_sentiment(data);
    let rec = recommendation(current.index);
    let trend = historical_trend(data, DEFAULT_TREND_DAYS);
    let report = SentimentReport {
        timestamp: timestamp(),
        summary: Summary {
            sentiment_score: current.index,
            primary_action: rec.action,
            confidence_level: rec.confidence,
            key_insight: rec.reason,
        },
        current_sentiment: current,
        trading_recommendation: rec,
        trend_analysis: trend,
    };
    info!("generated sentiment report");
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_boundaries() {
        assert_eq!(Sentiment::classify(75), Sentiment::ExtremeGreed);
        assert_eq!(Sentiment::classify(74), Sentiment::Greed);
        assert_eq!(Sentiment::classify(55), Sentiment::Greed);
        assert_eq!(Sentiment::classify(54), Sentiment::Neutral);
        assert_eq!(Sentiment::classify(45), Sentiment::Neutral);
        assert_eq!(Sentiment::classify(44), Sentiment::Fear);
        assert_eq!(Sentiment::classify(25), Sentiment::Fear);
        assert_eq!(Sentiment::classify(24), Sentiment::ExtremeFear);
        assert_eq!(Sentiment::classify(0), Sentiment::ExtremeFear);
    }

    #[test]
    fn recommendation_is_contrarian() {
        assert_eq!(recommendation(15).action, Action::Buy);
        assert_eq!(recommendation(15).confidence, Confidence::High);
        assert_eq!(recommendation(30).action, Action::Buy);
        assert_eq!(recommendation(30).confidence, Confidence::Medium);
        assert_eq!(recommendation(50).action, Action::Hold);
        assert_eq!(recommendation(50).risk_level, RiskLevel::Low);
        assert_eq!(recommendation(70).action, Action::Sell);
        assert_eq!(recommendation(70).confidence, Confidence::Medium);
        assert_eq!(recommendation(85).action, Action::Sell);
        assert_eq!(recommendation(85).confidence, Confidence::High);
    }

    #[test]
    fn recommendation_thresholds_are_sharp() {
        assert_eq!(recommendation(20).action, Action::Buy);
        assert_eq!(recommendation(20).confidence, Confidence::High);
        assert_eq!(recommendation(21).confidence, Confidence::Medium);
        assert_eq!(recommendation(35).action, Action::Buy);
        assert_eq!(recommendation(36).action, Action::Hold);
        assert_eq!(recommendation(64).action, Action::Hold);
        assert_eq!(recommendation(65).action, Action::Sell);
        assert_eq!(recommendation(79).confidence, Confidence::Medium);
        assert_eq!(recommendation(80).confidence, Confidence::High);
    }

    fn history(values: &[i64]) -> FearGreedData {
        FearGreedData {
            current_index: 50,
            classification: String::new(),
            timestamp: String::new(),
            historical: values
                .iter()
                .enumerate()
                .map(|(i, &value)| HistoryPoint {
                    date: format!("2025-10-{:02}", i + 1),
                    value,
                    classification: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn trend_follows_absolute_change() {
        let up = historical_trend(&history(&[40, 42, 48]), 7).unwrap();
        assert_eq!(up.trend, Trend::Improving);
        assert_eq!(up.change, 8);
        assert_eq!(up.change_percent, 20.0);

        let down = historical_trend(&history(&[48, 45, 40]), 7).unwrap();
        assert_eq!(down.trend, Trend::Declining);

        let flat = historical_trend(&history(&[40, 42, 44]), 7).unwrap();
        assert_eq!(flat.trend, Trend::Stable);
    }

    #[test]
    fn trend_window_takes_the_tail() {
        let data = history(&[10, 20, 30, 40, 50]);
        let analysis = historical_trend(&data, 2).unwrap();
        assert_eq!(analysis.period_days, 2);
        assert_eq!(analysis.start_value, 40);
        assert_eq!(analysis.end_value, 50);
    }

    #[test]
    fn trend_needs_two_points() {
        assert!(historical_trend(&history(&[40]), 7).is_none());
        assert!(historical_trend(&history(&[]), 7).is_none());
    }

    #[test]
    fn sample_report_holds_together() {
        let data = sample_data();
        let report = report(&data);
        assert_eq!(report.current_sentiment.index, 45);
        assert_eq!(report.current_sentiment.classification, Sentiment::Neutral);
        assert_eq!(report.trading_recommendation.action, Action::Hold);
        assert_eq!(report.summary.primary_action, Action::Hold);
        let trend = report.trend_analysis.unwrap();
        assert_eq!(trend.trend, Trend::Stable);
        assert_eq!(trend.change, 3);
    }

    #[test]
    fn dataset_round_trips_through_json() {
        let path = std::env::temp_dir().join(format!("futbot_fg_{}.json", fastrand::u64(..)));
        let json = r#"{
            "current_index": 18,
            "classification": "Extreme Fear",
            "timestamp": "2025-10-04T10:30:00",
            "historical": [
                {"date": "2025-10-01", "value": 30, "classification": "Fear"},
                {"date": "2025-10-02", "value": 22, "classification": "Extreme Fear"}
            ]
        }"#;
        std::fs::write(&path, json).unwrap();
        let data = load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(data.current_index, 18);
        assert_eq!(data.historical.len(), 2);
        assert_eq!(recommendation(data.current_index).action, Action::Buy);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn report_serializes_with_wire_labels() {
        let json = serde_json::to_string(&report(&sample_data())).unwrap();
        assert!(json.contains("\"classification\":\"Neutral\""));
        assert!(json.contains("\"primary_action\":\"HOLD\""));
        assert!(json.contains("\"confidence_level\":\"LOW\""));
        let greedy = serde_json::to_string(&Sentiment::ExtremeGreed).unwrap();
        assert_eq!(greedy, "\"Extreme Greed\"");
    }
}
