//! Plan domain types
//!
//! A Plan is a proposed schedule for one day: ordered time blocks, the day's
//! top priorities, and free-form notes. Schedule order is display order and is
//! not required to be sorted by the time string.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution status of a schedule item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Skipped,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Which timestamp field a manual edit touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditField {
    ActualStart,
    ActualEnd,
}

impl std::fmt::Display for EditField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ActualStart => write!(f, "actual_start"),
            Self::ActualEnd => write!(f, "actual_end"),
        }
    }
}

/// One entry in the audit trail of manual timestamp corrections
///
/// Edits are append-only; history is never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEdit {
    pub field: EditField,
    pub old_value: Option<DateTime<Utc>>,
    pub new_value: DateTime<Utc>,
    pub edited_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// One task/time-block in the schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleItem {
    /// Display time, "HH:MM-HH:MM" or similar free form
    pub time: String,

    /// Task description
    pub task: String,

    /// Estimated duration in minutes, from the plan source or backfilled
    /// by parsing `time`
    #[serde(default)]
    pub estimated_minutes: Option<u32>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub actual_start: Option<DateTime<Utc>>,

    #[serde(default)]
    pub actual_end: Option<DateTime<Utc>>,

    #[serde(default)]
    pub skip_reason: Option<String>,

    /// Audit trail of manual timestamp corrections
    #[serde(default)]
    pub edits: Vec<TimeEdit>,
}

impl ScheduleItem {
    /// Create a fresh item with no tracking state
    pub fn new(time: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            task: task.into(),
            estimated_minutes: None,
            status: TaskStatus::default(),
            actual_start: None,
            actual_end: None,
            skip_reason: None,
            edits: Vec::new(),
        }
    }

    /// Actual duration in minutes, when both timestamps are present
    pub fn actual_minutes(&self) -> Option<i64> {
        match (self.actual_start, self.actual_end) {
            (Some(start), Some(end)) => Some((end - start).num_minutes()),
            _ => None,
        }
    }

    /// Difference between actual and estimated minutes
    ///
    /// Positive means the task ran over its estimate. `None` when either side
    /// is unavailable; callers must report "not available" rather than 0.
    pub fn time_variance(&self) -> Option<i64> {
        match (self.estimated_minutes, self.actual_minutes()) {
            (Some(estimated), Some(actual)) => Some(actual - i64::from(estimated)),
            _ => None,
        }
    }

    /// Backfill the estimate from the display time if it parses
    pub fn backfill_estimate(&mut self) {
        if self.estimated_minutes.is_none()
            && let Some((start, end)) = parse_time_range(&self.time)
        {
            let minutes = (end - start).num_minutes();
            if minutes > 0 {
                self.estimated_minutes = Some(minutes as u32);
            }
        }
    }

    /// Check whether the display-time window contains `at`
    pub fn window_contains(&self, at: NaiveTime) -> bool {
        match parse_time_range(&self.time) {
            Some((start, end)) => start <= at && at < end,
            None => false,
        }
    }

    /// Start of the display-time window, when parseable
    pub fn window_start(&self) -> Option<NaiveTime> {
        parse_time_range(&self.time).map(|(start, _)| start)
    }
}

/// A proposed schedule for one day
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Ordered time blocks (order = display order)
    pub schedule: Vec<ScheduleItem>,

    /// The day's top priorities
    #[serde(default)]
    pub priorities: Vec<String>,

    /// Free-form notes
    #[serde(default)]
    pub notes: String,
}

impl Plan {
    /// Fraction of items completed, 0.0 when the schedule is empty
    ///
    /// Recomputed on demand; never stored, so it cannot go stale across a
    /// schedule mutation.
    pub fn completion_rate(&self) -> f64 {
        if self.schedule.is_empty() {
            return 0.0;
        }
        let completed = self
            .schedule
            .iter()
            .filter(|item| item.status == TaskStatus::Completed)
            .count();
        completed as f64 / self.schedule.len() as f64
    }

    /// Total actual minutes over items with both timestamps
    pub fn actual_duration_minutes(&self) -> i64 {
        self.schedule.iter().filter_map(ScheduleItem::actual_minutes).sum()
    }

    /// Backfill estimates on every item that lacks one
    pub fn backfill_estimates(&mut self) {
        for item in &mut self.schedule {
            item.backfill_estimate();
        }
    }
}

/// Parse a "HH:MM-HH:MM" display string into a time window
///
/// Tolerates surrounding whitespace around either side. Returns None for any
/// other shape; display times are presentation-first and may be free form.
pub fn parse_time_range(time: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (start, end) = time.split_once('-')?;
    let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
    let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, h, m, 0).unwrap()
    }

    #[test]
    fn test_actual_minutes_requires_both_timestamps() {
        let mut item = ScheduleItem::new("09:00-10:00", "Write report");
        assert_eq!(item.actual_minutes(), None);

        item.actual_start = Some(utc(9, 0));
        assert_eq!(item.actual_minutes(), None);

        item.actual_end = Some(utc(9, 45));
        assert_eq!(item.actual_minutes(), Some(45));
    }

    #[test]
    fn test_time_variance_unavailable_without_estimate() {
        let mut item = ScheduleItem::new("whenever", "Flexible task");
        item.actual_start = Some(utc(9, 0));
        item.actual_end = Some(utc(9, 30));

        // No estimate: variance must be None, never defaulted to 0
        assert_eq!(item.time_variance(), None);

        item.estimated_minutes = Some(45);
        assert_eq!(item.time_variance(), Some(-15));
    }

    #[test]
    fn test_backfill_estimate_from_time_string() {
        let mut item = ScheduleItem::new("09:00-10:30", "Deep work");
        item.backfill_estimate();
        assert_eq!(item.estimated_minutes, Some(90));
    }

    #[test]
    fn test_backfill_estimate_keeps_existing() {
        let mut item = ScheduleItem::new("09:00-10:30", "Deep work");
        item.estimated_minutes = Some(60);
        item.backfill_estimate();
        assert_eq!(item.estimated_minutes, Some(60));
    }

    #[test]
    fn test_backfill_estimate_ignores_freeform_time() {
        let mut item = ScheduleItem::new("morning", "Stretch");
        item.backfill_estimate();
        assert_eq!(item.estimated_minutes, None);
    }

    #[test]
    fn test_window_contains() {
        let item = ScheduleItem::new("09:00-10:00", "Standup");
        assert!(item.window_contains(NaiveTime::from_hms_opt(9, 30, 0).unwrap()));
        assert!(item.window_contains(NaiveTime::from_hms_opt(9, 0, 0).unwrap()));
        // End is exclusive
        assert!(!item.window_contains(NaiveTime::from_hms_opt(10, 0, 0).unwrap()));
    }

    #[test]
    fn test_completion_rate() {
        let mut plan = Plan::default();
        assert_eq!(plan.completion_rate(), 0.0);

        plan.schedule = vec![
            ScheduleItem::new("09:00-10:00", "a"),
            ScheduleItem::new("10:00-11:00", "b"),
            ScheduleItem::new("11:00-12:00", "c"),
            ScheduleItem::new("12:00-13:00", "d"),
        ];
        plan.schedule[0].status = TaskStatus::Completed;
        plan.schedule[1].status = TaskStatus::Skipped;

        assert!((plan.completion_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_time_range_tolerates_whitespace() {
        assert!(parse_time_range("09:00 - 10:00").is_some());
        assert!(parse_time_range("later").is_none());
    }

    #[test]
    fn test_schedule_item_serde_defaults() {
        // Items written by an older plan source may lack tracking fields
        let json = r#"{ "time": "09:00-10:00", "task": "Review PRs" }"#;
        let item: ScheduleItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.status, TaskStatus::NotStarted);
        assert!(item.edits.is_empty());
        assert!(item.actual_start.is_none());
    }
}
