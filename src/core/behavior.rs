//! Behavior scoring over a sliding window of motion levels.
//!
//! The analyzer keeps the last N motion levels and the time of the last
//! observed motion. Every update recomputes a 0-100 activity score, a coarse
//! status, and at most one alert. Nothing is carried between updates except
//! the window and the last-motion timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Thresholds and window size for behavior scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Number of samples kept in the rolling window
    pub window_size: usize,
    /// Per-sample ceiling; a window full of this value scores 100
    pub level_ceiling: f64,
    /// Idle time after which a low score counts as resting (seconds)
    pub resting_idle_secs: f64,
    /// Resting requires a score strictly below this
    pub resting_max_score: u8,
    /// Scores strictly above this are highly active
    pub active_min_score: u8,
    /// Highly active scores strictly above this raise the activity alert
    pub excessive_min_score: u8,
    /// Idle time after which the inactivity alert fires (seconds)
    pub inactivity_alert_secs: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            level_ceiling: 2.0,
            resting_idle_secs: 30.0,
            resting_max_score: 20,
            active_min_score: 70,
            excessive_min_score: 85,
            inactivity_alert_secs: 120.0,
        }
    }
}

/// Qualitative activity status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorStatus {
    #[default]
    Normal,
    Resting,
    HighlyActive,
}

impl BehaviorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorStatus::Normal => "normal",
            BehaviorStatus::Resting => "resting",
            BehaviorStatus::HighlyActive => "highly_active",
        }
    }
}

impl std::fmt::Display for BehaviorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert raised alongside a behavior report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorAlert {
    /// No motion for longer than the inactivity limit
    LongInactivity,
    /// Score above the excessive threshold while highly active
    ExcessiveActivity,
}

impl BehaviorAlert {
    /// Human-readable alert text for logs and the dashboard.
    pub fn message(&self) -> &'static str {
        match self {
            BehaviorAlert::LongInactivity => "No motion detected for over 2 minutes",
            BehaviorAlert::ExcessiveActivity => "Pet is unusually active",
        }
    }
}

impl std::fmt::Display for BehaviorAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of one analyzer update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorReport {
    /// Activity score, 0-100
    pub score: u8,
    pub status: BehaviorStatus,
    pub alert: Option<BehaviorAlert>,
    /// Whole seconds since the last motion
    pub idle_seconds: u64,
}

/// Rolling behavior analyzer for a single monitored subject.
pub struct BehaviorAnalyzer {
    config: BehaviorConfig,
    history: VecDeque<f64>,
    last_motion: Option<DateTime<Utc>>,
    score: u8,
    status: BehaviorStatus,
}

impl BehaviorAnalyzer {
    pub fn new(config: BehaviorConfig) -> Self {
        let capacity = config.window_size.max(1);
        Self {
            config,
            history: VecDeque::with_capacity(capacity + 1),
            last_motion: None,
            score: 0,
            status: BehaviorStatus::Normal,
        }
    }

    pub fn config(&self) -> &BehaviorConfig {
        &self.config
    }

    /// Record one motion level observed at `now` and recompute the report.
    ///
    /// Levels are clamped into `[0, level_ceiling]`; non-finite levels count
    /// as no motion. Until motion is first seen, idle time is measured from
    /// the first update.
    pub fn update(&mut self, level: f64, now: DateTime<Utc>) -> BehaviorReport {
        let level = self.sanitize(level);

        self.history.push_back(level);
        while self.history.len() > self.config.window_size.max(1) {
            self.history.pop_front();
        }

        if level > 0.0 {
            self.last_motion = Some(now);
        }
        let last_motion = *self.last_motion.get_or_insert(now);

        self.score = self.compute_score();

        let idle_secs = ((now - last_motion).num_milliseconds() as f64 / 1000.0).max(0.0);
        self.status = self.derive_status(idle_secs);
        let alert = self.derive_alert(idle_secs);

        BehaviorReport {
            score: self.score,
            status: self.status,
            alert,
            idle_seconds: idle_secs as u64,
        }
    }

    /// Latest computed score.
    pub fn score(&self) -> u8 {
        self.score
    }

    /// Latest computed status.
    pub fn status(&self) -> BehaviorStatus {
        self.status
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn last_motion(&self) -> Option<DateTime<Utc>> {
        self.last_motion
    }

    fn sanitize(&self, level: f64) -> f64 {
        if !level.is_finite() || level <= 0.0 {
            return 0.0;
        }
        let ceiling = self.config.level_ceiling;
        if ceiling.is_finite() && ceiling > 0.0 {
            level.min(ceiling)
        } else {
            level
        }
    }

    /// round(100 * sum / (len * ceiling))
    fn compute_score(&self) -> u8 {
        let ceiling = self.config.level_ceiling;
        if self.history.is_empty() || !ceiling.is_finite() || ceiling <= 0.0 {
            return 0;
        }
        let sum: f64 = self.history.iter().sum();
        let ratio = sum / (self.history.len() as f64 * ceiling);
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }

    fn derive_status(&self, idle_secs: f64) -> BehaviorStatus {
        let mut status = BehaviorStatus::Normal;
        if idle_secs > self.config.resting_idle_secs && self.score < self.config.resting_max_score {
            status = BehaviorStatus::Resting;
        }
        if self.score > self.config.active_min_score {
            status = BehaviorStatus::HighlyActive;
        }
        status
    }

    fn derive_alert(&self, idle_secs: f64) -> Option<BehaviorAlert> {
        let mut alert = None;
        if idle_secs > self.config.inactivity_alert_secs {
            alert = Some(BehaviorAlert::LongInactivity);
        }
        if self.status == BehaviorStatus::HighlyActive && self.score > self.config.excessive_min_score {
            alert = Some(BehaviorAlert::ExcessiveActivity);
        }
        alert
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_all_still_window_scores_zero() {
        let mut analyzer = BehaviorAnalyzer::new(BehaviorConfig::default());
        let mut report = BehaviorReport::default();
        for i in 0..20 {
            report = analyzer.update(0.0, t0() + Duration::seconds(i));
        }
        assert_eq!(report.score, 0);
        assert_ne!(report.status, BehaviorStatus::HighlyActive);
    }

    #[test]
    fn test_all_strong_window_scores_hundred() {
        let mut analyzer = BehaviorAnalyzer::new(BehaviorConfig::default());
        let mut report = BehaviorReport::default();
        for i in 0..20 {
            report = analyzer.update(2.0, t0() + Duration::seconds(i));
        }
        assert_eq!(report.score, 100);
        assert_eq!(report.status, BehaviorStatus::HighlyActive);
        assert_eq!(report.alert, Some(BehaviorAlert::ExcessiveActivity));
        assert_eq!(report.idle_seconds, 0);
    }

    #[test]
    fn test_score_rounds() {
        let mut analyzer = BehaviorAnalyzer::new(BehaviorConfig::default());
        analyzer.update(1.0, t0());
        analyzer.update(0.0, t0());
        let report = analyzer.update(0.0, t0());
        // 1 / (3 * 2) = 16.67%
        assert_eq!(report.score, 17);
    }

    #[test]
    fn test_window_evicts_oldest_sample() {
        let mut analyzer = BehaviorAnalyzer::new(BehaviorConfig::default());
        analyzer.update(2.0, t0());
        let mut report = BehaviorReport::default();
        for i in 1..=20 {
            report = analyzer.update(0.0, t0() + Duration::seconds(i));
        }
        assert_eq!(analyzer.history_len(), 20);
        assert_eq!(report.score, 0);
    }

    #[test]
    fn test_resting_after_idle() {
        let mut analyzer = BehaviorAnalyzer::new(BehaviorConfig::default());
        analyzer.update(1.0, t0());
        let report = analyzer.update(0.0, t0() + Duration::seconds(30));
        assert_eq!(report.status, BehaviorStatus::Normal);

        for i in 2..22 {
            analyzer.update(0.0, t0() + Duration::seconds(i));
        }
        let report = analyzer.update(0.0, t0() + Duration::seconds(31));
        assert_eq!(report.status, BehaviorStatus::Resting);
        assert_eq!(report.alert, None);
        assert_eq!(report.idle_seconds, 31);
    }

    #[test]
    fn test_inactivity_alert() {
        let mut analyzer = BehaviorAnalyzer::new(BehaviorConfig::default());
        analyzer.update(0.0, t0());
        let report = analyzer.update(0.0, t0() + Duration::seconds(120));
        assert_eq!(report.alert, None);

        let report = analyzer.update(0.0, t0() + Duration::seconds(121));
        assert_eq!(report.alert, Some(BehaviorAlert::LongInactivity));
        assert_eq!(report.status, BehaviorStatus::Resting);
    }

    #[test]
    fn test_activity_alert_overrides_inactivity() {
        // A window full of strong motion with an old timestamp cannot happen
        // through levels alone, so shrink the inactivity limit to force both.
        let config = BehaviorConfig {
            inactivity_alert_secs: -1.0,
            ..BehaviorConfig::default()
        };
        let mut analyzer = BehaviorAnalyzer::new(config);
        let report = analyzer.update(2.0, t0());
        assert_eq!(report.status, BehaviorStatus::HighlyActive);
        assert_eq!(report.alert, Some(BehaviorAlert::ExcessiveActivity));
    }

    #[test]
    fn test_highly_active_without_alert() {
        let mut analyzer = BehaviorAnalyzer::new(BehaviorConfig::default());
        // 6 strong + 4 light: 16 / 20 = 80
        for _ in 0..6 {
            analyzer.update(2.0, t0());
        }
        let mut report = BehaviorReport::default();
        for _ in 0..4 {
            report = analyzer.update(1.0, t0());
        }
        assert_eq!(report.score, 80);
        assert_eq!(report.status, BehaviorStatus::HighlyActive);
        assert_eq!(report.alert, None);
    }

    #[test]
    fn test_out_of_range_levels_are_clamped() {
        let mut analyzer = BehaviorAnalyzer::new(BehaviorConfig::default());
        let report = analyzer.update(1e9, t0());
        assert_eq!(report.score, 100);

        let report = analyzer.update(f64::NAN, t0());
        assert_eq!(report.score, 50);

        let report = analyzer.update(-4.0, t0());
        assert!(report.score <= 100);
        assert_eq!(analyzer.history_len(), 3);
    }

    #[test]
    fn test_clock_going_backwards_is_not_negative_idle() {
        let mut analyzer = BehaviorAnalyzer::new(BehaviorConfig::default());
        analyzer.update(1.0, t0());
        let report = analyzer.update(0.0, t0() - Duration::seconds(10));
        assert_eq!(report.idle_seconds, 0);
    }

    #[test]
    fn test_score_stays_in_range_for_mixed_sequence() {
        let mut analyzer = BehaviorAnalyzer::new(BehaviorConfig::default());
        let levels = [0.0, 2.0, 1.0, 5.0, -1.0, 0.5, 2.0, f64::INFINITY, 1.5];
        for (i, level) in levels.iter().cycle().take(100).enumerate() {
            let report = analyzer.update(*level, t0() + Duration::seconds(i as i64));
            assert!(report.score <= 100);
        }
    }
}
