//! Progress and status computation for OKR entities.
//!
//! Everything in this module is a pure function over caller-supplied values:
//! no I/O, no shared state, safe to call from any number of request handlers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Numeric,
    Percentage,
    Binary,
    Currency,
}

impl MetricType {
    pub fn from_str(s: &str) -> Self {
        match s {
            "numeric" => Self::Numeric,
            "binary" => Self::Binary,
            "currency" => Self::Currency,
            _ => Self::Percentage,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Percentage => "percentage",
            Self::Binary => "binary",
            Self::Currency => "currency",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyResultStatus {
    NotStarted,
    OnTrack,
    AtRisk,
    Behind,
    Completed,
}

impl KeyResultStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "on_track" => Self::OnTrack,
            "at_risk" => Self::AtRisk,
            "behind" => Self::Behind,
            "completed" => Self::Completed,
            _ => Self::NotStarted,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::OnTrack => "on_track",
            Self::AtRisk => "at_risk",
            Self::Behind => "behind",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveStatus {
    Draft,
    Active,
    Completed,
    Archived,
    OnHold,
}

impl ObjectiveStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "completed" => Self::Completed,
            "archived" => Self::Archived,
            "on_hold" => Self::OnHold,
            _ => Self::Draft,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
            Self::OnHold => "on_hold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveType {
    Company,
    Team,
}

impl ObjectiveType {
    pub fn from_str(s: &str) -> Self {
        match s {
            "company" => Self::Company,
            _ => Self::Team,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Team => "team",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeType {
    Individual,
    Team,
}

impl AssigneeType {
    pub fn from_str(s: &str) -> Self {
        match s {
            "individual" => Self::Individual,
            _ => Self::Team,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Team => "team",
        }
    }
}

/// A metric value outside its type's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MetricValueError {
    #[error("current value cannot be negative")]
    NegativeCurrentValue,
    #[error("percentage target must be between 0 and 100")]
    PercentageTargetOutOfRange,
    #[error("percentage current value must be between 0 and 100")]
    PercentageCurrentOutOfRange,
    #[error("boolean target must be 0 or 1")]
    BinaryTargetNotBoolean,
    #[error("boolean current value must be 0 or 1")]
    BinaryCurrentNotBoolean,
}

/// Checks raw current/target values against the metric type's domain.
/// Runs before normalization on every create and update.
pub fn validate_metric_values(
    metric_type: MetricType,
    current_value: f64,
    target_value: f64,
) -> Result<(), MetricValueError> {
    match metric_type {
        MetricType::Numeric | MetricType::Currency => {
            if current_value < 0.0 {
                return Err(MetricValueError::NegativeCurrentValue);
            }
        }
        MetricType::Percentage => {
            if target_value <= 0.0 || target_value > 100.0 {
                return Err(MetricValueError::PercentageTargetOutOfRange);
            }
            if !(0.0..=100.0).contains(&current_value) {
                return Err(MetricValueError::PercentageCurrentOutOfRange);
            }
        }
        MetricType::Binary => {
            if target_value != 0.0 && target_value != 1.0 {
                return Err(MetricValueError::BinaryTargetNotBoolean);
            }
            if current_value != 0.0 && current_value != 1.0 {
                return Err(MetricValueError::BinaryCurrentNotBoolean);
            }
        }
    }
    Ok(())
}

/// Result of normalizing a metric: the new progress percentage and the
/// (possibly rewritten) target value. Binary metrics force the target to 1
/// once achieved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricProgress {
    pub progress: f64,
    pub target_value: f64,
}

/// Normalizes raw metric values to a progress percentage.
///
/// Binary metrics never hold a partial value: current == 1 completes them at
/// 100 (and pins the target to 1); anything else leaves the prior progress
/// untouched. All other types divide current by target, times 100, with a
/// zero target short-circuiting to 0. Progress above 100 is carried through
/// as-is when current exceeds target.
pub fn compute_progress(
    metric_type: MetricType,
    current_value: f64,
    target_value: f64,
    current_progress: f64,
) -> MetricProgress {
    match metric_type {
        MetricType::Binary => {
            if current_value == 1.0 {
                MetricProgress {
                    progress: 100.0,
                    target_value: 1.0,
                }
            } else {
                MetricProgress {
                    progress: current_progress,
                    target_value,
                }
            }
        }
        MetricType::Numeric | MetricType::Percentage | MetricType::Currency => {
            if target_value == 0.0 {
                MetricProgress {
                    progress: 0.0,
                    target_value,
                }
            } else {
                MetricProgress {
                    progress: (current_value / target_value) * 100.0,
                    target_value,
                }
            }
        }
    }
}

/// Classifies a key result from its progress and temporal position.
///
/// First match wins: untouched before the start date, complete at 100, then
/// at-risk when past due or inside the final week with less than half done,
/// on-track otherwise. Everything else (zero progress after the start,
/// negative or overshot values) is behind. A fresh classification replaces
/// whatever status was there before; there is no transition table.
pub fn key_result_status(
    progress: f64,
    start_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> KeyResultStatus {
    if progress == 0.0 && now < start_date {
        KeyResultStatus::NotStarted
    } else if progress == 100.0 {
        KeyResultStatus::Completed
    } else if progress > 0.0 && progress < 100.0 {
        let closing_window = due_date - now < Duration::days(7);
        if now > due_date || (closing_window && progress < 50.0) {
            KeyResultStatus::AtRisk
        } else {
            KeyResultStatus::OnTrack
        }
    } else {
        KeyResultStatus::Behind
    }
}

/// Rolls child key result progress values up into an objective's progress:
/// the unweighted mean, 0 when there are no key results. Values above 100
/// propagate into the aggregate.
pub fn aggregate_progress(progress_values: &[f64]) -> f64 {
    if progress_values.is_empty() {
        return 0.0;
    }
    progress_values.iter().sum::<f64>() / progress_values.len() as f64
}

/// Classifies an objective from its aggregated progress and window.
///
/// First match wins: complete at 100, archived once the window has passed
/// unfinished, draft before the window opens, active with any progress.
/// When progress is 0 inside the window no arm matches and the current
/// status is returned unchanged.
pub fn objective_status(
    progress: f64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    now: DateTime<Utc>,
    current: ObjectiveStatus,
) -> ObjectiveStatus {
    if progress == 100.0 {
        ObjectiveStatus::Completed
    } else if now > end_date && progress < 100.0 {
        ObjectiveStatus::Archived
    } else if now < start_date {
        ObjectiveStatus::Draft
    } else if progress > 0.0 {
        ObjectiveStatus::Active
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(n: i64) -> Duration {
        Duration::days(n)
    }

    #[test]
    fn numeric_progress_is_ratio_times_hundred() {
        let p = compute_progress(MetricType::Numeric, 25.0, 100.0, 0.0);
        assert_eq!(p.progress, 25.0);
        assert_eq!(p.target_value, 100.0);

        let p = compute_progress(MetricType::Currency, 1500.0, 3000.0, 0.0);
        assert_eq!(p.progress, 50.0);
    }

    #[test]
    fn zero_target_yields_zero_progress() {
        for metric in [
            MetricType::Numeric,
            MetricType::Percentage,
            MetricType::Currency,
        ] {
            let p = compute_progress(metric, 40.0, 0.0, 70.0);
            assert_eq!(p.progress, 0.0, "{:?}", metric);
        }
    }

    #[test]
    fn progress_is_not_clamped_above_hundred() {
        let p = compute_progress(MetricType::Numeric, 130.0, 100.0, 0.0);
        assert_eq!(p.progress, 130.0);
    }

    #[test]
    fn binary_completion_forces_target() {
        let p = compute_progress(MetricType::Binary, 1.0, 0.0, 30.0);
        assert_eq!(p.progress, 100.0);
        assert_eq!(p.target_value, 1.0);
    }

    #[test]
    fn binary_incomplete_keeps_prior_progress() {
        let p = compute_progress(MetricType::Binary, 0.0, 1.0, 42.0);
        assert_eq!(p.progress, 42.0);
        assert_eq!(p.target_value, 1.0);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let first = compute_progress(MetricType::Numeric, 30.0, 60.0, 0.0);
        let second =
            compute_progress(MetricType::Numeric, 30.0, 60.0, first.progress);
        assert_eq!(first, second);

        let now = Utc::now();
        let start = now - days(10);
        let due = now + days(30);
        let a = key_result_status(first.progress, start, due, now);
        let b = key_result_status(second.progress, start, due, now);
        assert_eq!(a, b);
    }

    #[test]
    fn validate_rejects_negative_numeric_current() {
        assert_eq!(
            validate_metric_values(MetricType::Numeric, -1.0, 100.0),
            Err(MetricValueError::NegativeCurrentValue)
        );
        assert_eq!(
            validate_metric_values(MetricType::Currency, -0.01, 100.0),
            Err(MetricValueError::NegativeCurrentValue)
        );
        assert!(validate_metric_values(MetricType::Numeric, 0.0, -5.0).is_ok());
    }

    #[test]
    fn validate_percentage_bounds() {
        assert_eq!(
            validate_metric_values(MetricType::Percentage, 10.0, 150.0),
            Err(MetricValueError::PercentageTargetOutOfRange)
        );
        assert_eq!(
            validate_metric_values(MetricType::Percentage, 10.0, 0.0),
            Err(MetricValueError::PercentageTargetOutOfRange)
        );
        assert_eq!(
            validate_metric_values(MetricType::Percentage, 101.0, 80.0),
            Err(MetricValueError::PercentageCurrentOutOfRange)
        );
        assert!(validate_metric_values(MetricType::Percentage, 100.0, 100.0).is_ok());
    }

    #[test]
    fn validate_binary_values_must_be_flags() {
        assert_eq!(
            validate_metric_values(MetricType::Binary, 0.5, 1.0),
            Err(MetricValueError::BinaryCurrentNotBoolean)
        );
        assert_eq!(
            validate_metric_values(MetricType::Binary, 1.0, 2.0),
            Err(MetricValueError::BinaryTargetNotBoolean)
        );
        assert!(validate_metric_values(MetricType::Binary, 0.0, 1.0).is_ok());
    }

    #[test]
    fn key_result_not_started_before_window() {
        let now = Utc::now();
        let status = key_result_status(0.0, now + days(1), now + days(30), now);
        assert_eq!(status, KeyResultStatus::NotStarted);
    }

    #[test]
    fn key_result_completed_regardless_of_dates() {
        let now = Utc::now();
        let status = key_result_status(100.0, now - days(90), now - days(30), now);
        assert_eq!(status, KeyResultStatus::Completed);
    }

    #[test]
    fn key_result_overdue_is_at_risk() {
        let now = Utc::now();
        let status = key_result_status(60.0, now - days(30), now - days(1), now);
        assert_eq!(status, KeyResultStatus::AtRisk);
    }

    #[test]
    fn key_result_closing_window_under_half_is_at_risk() {
        let now = Utc::now();
        let status = key_result_status(30.0, now - days(30), now + days(3), now);
        assert_eq!(status, KeyResultStatus::AtRisk);
    }

    #[test]
    fn key_result_closing_window_over_half_is_on_track() {
        let now = Utc::now();
        let status = key_result_status(55.0, now - days(30), now + days(3), now);
        assert_eq!(status, KeyResultStatus::OnTrack);
    }

    #[test]
    fn key_result_comfortable_window_is_on_track() {
        let now = Utc::now();
        let status = key_result_status(80.0, now - days(30), now + days(30), now);
        assert_eq!(status, KeyResultStatus::OnTrack);
    }

    #[test]
    fn key_result_zero_progress_after_start_is_behind() {
        let now = Utc::now();
        let status = key_result_status(0.0, now - days(1), now + days(30), now);
        assert_eq!(status, KeyResultStatus::Behind);
    }

    #[test]
    fn key_result_pathological_progress_is_behind() {
        let now = Utc::now();
        let start = now - days(10);
        let due = now + days(30);
        assert_eq!(
            key_result_status(-5.0, start, due, now),
            KeyResultStatus::Behind
        );
        // Overshot values fall outside every positive arm as well.
        assert_eq!(
            key_result_status(150.0, start, due, now),
            KeyResultStatus::Behind
        );
    }

    #[test]
    fn aggregate_of_nothing_is_zero() {
        assert_eq!(aggregate_progress(&[]), 0.0);
    }

    #[test]
    fn aggregate_is_the_mean_and_order_independent() {
        assert_eq!(aggregate_progress(&[100.0]), 100.0);
        assert_eq!(aggregate_progress(&[20.0, 40.0, 90.0]), 50.0);
        assert_eq!(aggregate_progress(&[90.0, 20.0, 40.0]), 50.0);
    }

    #[test]
    fn aggregate_propagates_overshoot() {
        assert_eq!(aggregate_progress(&[150.0, 50.0]), 100.0);
        assert!(aggregate_progress(&[150.0, 130.0]) > 100.0);
    }

    #[test]
    fn objective_completed_at_hundred() {
        let now = Utc::now();
        let status = objective_status(
            100.0,
            now - days(30),
            now - days(1),
            now,
            ObjectiveStatus::Active,
        );
        assert_eq!(status, ObjectiveStatus::Completed);
    }

    #[test]
    fn objective_archived_after_window_unfinished() {
        let now = Utc::now();
        let status = objective_status(
            50.0,
            now - days(60),
            now - days(1),
            now,
            ObjectiveStatus::Active,
        );
        assert_eq!(status, ObjectiveStatus::Archived);
    }

    #[test]
    fn objective_draft_before_window() {
        let now = Utc::now();
        let status = objective_status(
            0.0,
            now + days(1),
            now + days(90),
            now,
            ObjectiveStatus::OnHold,
        );
        assert_eq!(status, ObjectiveStatus::Draft);
    }

    #[test]
    fn objective_active_with_progress_in_window() {
        let now = Utc::now();
        let status = objective_status(
            40.0,
            now - days(10),
            now + days(80),
            now,
            ObjectiveStatus::Draft,
        );
        assert_eq!(status, ObjectiveStatus::Active);
    }

    #[test]
    fn objective_zero_progress_in_window_keeps_current_status() {
        let now = Utc::now();
        let start = now - days(10);
        let end = now + days(80);
        assert_eq!(
            objective_status(0.0, start, end, now, ObjectiveStatus::Draft),
            ObjectiveStatus::Draft
        );
        assert_eq!(
            objective_status(0.0, start, end, now, ObjectiveStatus::OnHold),
            ObjectiveStatus::OnHold
        );
    }

    #[test]
    fn enum_round_trips_match_column_values() {
        assert_eq!(MetricType::from_str("currency"), MetricType::Currency);
        assert_eq!(MetricType::Currency.to_str(), "currency");
        assert_eq!(KeyResultStatus::from_str("at_risk"), KeyResultStatus::AtRisk);
        assert_eq!(KeyResultStatus::AtRisk.to_str(), "at_risk");
        assert_eq!(ObjectiveStatus::from_str("on_hold"), ObjectiveStatus::OnHold);
        assert_eq!(ObjectiveStatus::OnHold.to_str(), "on_hold");
        assert_eq!(AssigneeType::from_str("individual"), AssigneeType::Individual);
        assert_eq!(ObjectiveType::from_str("company"), ObjectiveType::Company);
    }
}
