//! Time-tracking service
//!
//! Check-in operations over a loaded plan: task lifecycle (start, complete,
//! skip), manual timestamp corrections with an audit trail, and pure
//! statistics. Execution continues after planning ends, so these operations
//! remain valid on a `done` session.
//!
//! Task references resolve by index or by name; name resolution is
//! case-insensitive, preferring an exact match over a substring match, with
//! ties broken by schedule order.

use chrono::{DateTime, NaiveTime, Utc};

use crate::domain::{EditField, Plan, ScheduleItem, TaskStatus, TimeEdit};
use crate::error::{CoreError, CoreResult};
use tracing::{debug, info, warn};

/// Variance beyond this many minutes is reported as a consistency anomaly
const VARIANCE_SANITY_MINUTES: i64 = 480;

/// Reference to one schedule item
#[derive(Debug, Clone)]
pub enum TaskRef {
    /// Zero-based position in the schedule
    Index(usize),
    /// Case-insensitive name (exact preferred, then substring)
    Name(String),
}

impl std::fmt::Display for TaskRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// Completion statistics over one plan; pure computation, never mutates
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub skipped: usize,
    pub not_started: usize,
    pub in_progress: usize,
    /// completed / total, 0.0 for an empty schedule
    pub completion_rate: f64,
    pub estimated_total: u64,
    pub actual_total: i64,
    /// Mean variance over completed items that have one; `None` when no item
    /// has both an estimate and actuals
    pub avg_variance: Option<f64>,
}

/// One advisory consistency anomaly
///
/// Advisory only: issues never block a save.
#[derive(Debug, Clone)]
pub struct Issue {
    pub task: String,
    pub detail: String,
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.task, self.detail)
    }
}

/// Resolve a task reference to a schedule index
pub fn find_task(plan: &Plan, reference: &TaskRef) -> CoreResult<usize> {
    match reference {
        TaskRef::Index(i) => {
            if *i < plan.schedule.len() {
                Ok(*i)
            } else {
                Err(CoreError::NotFound(format!("no task at index {i}")))
            }
        }
        TaskRef::Name(name) => {
            let needle = name.trim().to_lowercase();

            let exact = plan
                .schedule
                .iter()
                .position(|item| item.task.trim().to_lowercase() == needle);
            if let Some(i) = exact {
                return Ok(i);
            }

            plan.schedule
                .iter()
                .position(|item| item.task.to_lowercase().contains(&needle))
                .ok_or_else(|| CoreError::NotFound(format!("no task matching '{name}'")))
        }
    }
}

/// Mark a task started at `at`
///
/// Re-starting an already-started task is idempotent; a differing `at` is
/// recorded as a timestamp edit rather than silently overwritten.
pub fn start_task(plan: &mut Plan, reference: &TaskRef, at: DateTime<Utc>) -> CoreResult<()> {
    let idx = find_task(plan, reference)?;
    let item = &mut plan.schedule[idx];

    match item.actual_start {
        None => {
            item.actual_start = Some(at);
            item.status = TaskStatus::InProgress;
            info!(task = %item.task, %at, "started task");
        }
        Some(existing) if existing == at => {
            debug!(task = %item.task, "task already started at this time, no-op");
            item.status = TaskStatus::InProgress;
        }
        Some(existing) => {
            item.edits.push(TimeEdit {
                field: EditField::ActualStart,
                old_value: Some(existing),
                new_value: at,
                edited_at: Utc::now(),
                reason: Some("re-start with a different time".to_string()),
            });
            item.actual_start = Some(at);
            item.status = TaskStatus::InProgress;
            info!(task = %item.task, old = %existing, new = %at, "re-started task at a different time");
        }
    }
    Ok(())
}

/// Mark a task completed at `at`
///
/// A never-started task gets `actual_start = at` backfilled: instant tasks
/// are valid.
pub fn complete_task(plan: &mut Plan, reference: &TaskRef, at: DateTime<Utc>) -> CoreResult<()> {
    let idx = find_task(plan, reference)?;
    let item = &mut plan.schedule[idx];

    if item.actual_start.is_none() {
        debug!(task = %item.task, "completing a never-started task, backfilling start");
        item.actual_start = Some(at);
    }
    item.actual_end = Some(at);
    item.status = TaskStatus::Completed;
    info!(task = %item.task, minutes = ?item.actual_minutes(), "completed task");
    Ok(())
}

/// Mark a task skipped, with an optional reason
///
/// Timestamps are not required for a skip.
pub fn skip_task(plan: &mut Plan, reference: &TaskRef, reason: Option<String>) -> CoreResult<()> {
    let idx = find_task(plan, reference)?;
    let item = &mut plan.schedule[idx];

    item.status = TaskStatus::Skipped;
    item.skip_reason = reason;
    info!(task = %item.task, reason = ?item.skip_reason, "skipped task");
    Ok(())
}

/// Manually correct a timestamp, appending to the audit trail
///
/// Rejected with a validation error when the new value would order
/// `actual_end` before `actual_start`; the item is left unchanged.
pub fn edit_timestamp(
    plan: &mut Plan,
    reference: &TaskRef,
    field: EditField,
    new_value: DateTime<Utc>,
    reason: Option<String>,
) -> CoreResult<()> {
    let idx = find_task(plan, reference)?;
    let item = &mut plan.schedule[idx];

    let (start, end) = match field {
        EditField::ActualStart => (Some(new_value), item.actual_end),
        EditField::ActualEnd => (item.actual_start, Some(new_value)),
    };
    if let (Some(start), Some(end)) = (start, end)
        && end < start
    {
        return Err(CoreError::Validation(format!(
            "edit would put end ({end}) before start ({start}) for '{}'",
            item.task
        )));
    }

    let old_value = match field {
        EditField::ActualStart => item.actual_start,
        EditField::ActualEnd => item.actual_end,
    };
    item.edits.push(TimeEdit {
        field,
        old_value,
        new_value,
        edited_at: Utc::now(),
        reason: reason.clone(),
    });
    match field {
        EditField::ActualStart => item.actual_start = Some(new_value),
        EditField::ActualEnd => item.actual_end = Some(new_value),
    }

    info!(task = %item.task, %field, old = ?old_value, new = %new_value, reason = ?reason, "edited timestamp");
    Ok(())
}

/// Compute completion statistics for a plan
pub fn completion_stats(plan: &Plan) -> Stats {
    let mut stats = Stats {
        total: plan.schedule.len(),
        completed: 0,
        skipped: 0,
        not_started: 0,
        in_progress: 0,
        completion_rate: 0.0,
        estimated_total: 0,
        actual_total: 0,
        avg_variance: None,
    };

    let mut variances = Vec::new();
    for item in &plan.schedule {
        match item.status {
            TaskStatus::Completed => stats.completed += 1,
            TaskStatus::Skipped => stats.skipped += 1,
            TaskStatus::NotStarted => stats.not_started += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
        }
        if let Some(estimate) = item.estimated_minutes {
            stats.estimated_total += u64::from(estimate);
        }
        if let Some(actual) = item.actual_minutes() {
            stats.actual_total += actual;
        }
        if item.status == TaskStatus::Completed
            && let Some(variance) = item.time_variance()
        {
            variances.push(variance);
        }
    }

    stats.completion_rate = plan.completion_rate();
    if !variances.is_empty() {
        stats.avg_variance = Some(variances.iter().sum::<i64>() as f64 / variances.len() as f64);
    }
    stats
}

/// The item whose display-time window contains `now`
pub fn current_task(plan: &Plan, now: NaiveTime) -> Option<&ScheduleItem> {
    plan.schedule.iter().find(|item| item.window_contains(now))
}

/// The task the user should pick up next
///
/// An in-progress item wins; otherwise the earliest not-started item whose
/// window starts at or after `now`, falling back to the first not-started
/// item when none is scheduled later (or times are free form).
pub fn next_task(plan: &Plan, now: NaiveTime) -> Option<&ScheduleItem> {
    if let Some(item) = plan
        .schedule
        .iter()
        .find(|item| item.status == TaskStatus::InProgress)
    {
        return Some(item);
    }

    let upcoming = plan.schedule.iter().find(|item| {
        item.status == TaskStatus::NotStarted
            && item.window_start().map(|start| start >= now).unwrap_or(false)
    });
    if upcoming.is_some() {
        return upcoming;
    }

    plan.schedule
        .iter()
        .find(|item| item.status == TaskStatus::NotStarted)
}

/// Report tracking anomalies; advisory only, never blocks saves
pub fn validate_consistency(plan: &Plan) -> Vec<Issue> {
    let mut issues = Vec::new();

    for item in &plan.schedule {
        if let (Some(start), Some(end)) = (item.actual_start, item.actual_end)
            && end < start
        {
            issues.push(Issue {
                task: item.task.clone(),
                detail: format!("end ({end}) precedes start ({start})"),
            });
        }
        if item.status == TaskStatus::Completed && item.actual_end.is_none() {
            issues.push(Issue {
                task: item.task.clone(),
                detail: "completed but has no end timestamp".to_string(),
            });
        }
        if item.status == TaskStatus::InProgress && item.actual_end.is_some() {
            issues.push(Issue {
                task: item.task.clone(),
                detail: "in progress but has an end timestamp".to_string(),
            });
        }
        if let Some(variance) = item.time_variance()
            && variance.abs() > VARIANCE_SANITY_MINUTES
        {
            issues.push(Issue {
                task: item.task.clone(),
                detail: format!("variance of {variance} minutes exceeds sanity threshold"),
            });
        }
    }

    if !issues.is_empty() {
        warn!(count = issues.len(), "plan has tracking inconsistencies");
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Plan;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, h, m, 0).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn plan() -> Plan {
        Plan {
            schedule: vec![
                ScheduleItem::new("09:00-10:00", "Write report"),
                ScheduleItem::new("10:00-11:00", "Review PRs"),
                ScheduleItem::new("11:00-12:00", "Team sync"),
                ScheduleItem::new("13:00-14:00", "Deep work"),
            ],
            priorities: vec![],
            notes: String::new(),
        }
    }

    #[test]
    fn test_find_task_prefers_exact_match() {
        let mut p = plan();
        p.schedule.push(ScheduleItem::new("14:00-15:00", "Review"));

        // "review" matches "Review PRs" as a substring but "Review" exactly
        let idx = find_task(&p, &TaskRef::Name("review".to_string())).unwrap();
        assert_eq!(p.schedule[idx].task, "Review");
    }

    #[test]
    fn test_find_task_substring_first_wins() {
        let p = plan();
        let idx = find_task(&p, &TaskRef::Name("re".to_string())).unwrap();
        // Schedule order breaks the tie
        assert_eq!(idx, 0);
    }

    #[test]
    fn test_find_task_not_found() {
        let p = plan();
        assert!(matches!(
            find_task(&p, &TaskRef::Name("yoga".to_string())),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            find_task(&p, &TaskRef::Index(9)),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_start_task_sets_status_and_timestamp() {
        let mut p = plan();
        start_task(&mut p, &TaskRef::Index(0), utc(9, 5)).unwrap();

        let item = &p.schedule[0];
        assert_eq!(item.status, TaskStatus::InProgress);
        assert_eq!(item.actual_start, Some(utc(9, 5)));
        assert!(item.edits.is_empty());
    }

    #[test]
    fn test_restart_same_time_is_idempotent() {
        let mut p = plan();
        start_task(&mut p, &TaskRef::Index(0), utc(9, 5)).unwrap();
        start_task(&mut p, &TaskRef::Index(0), utc(9, 5)).unwrap();

        assert!(p.schedule[0].edits.is_empty());
    }

    #[test]
    fn test_restart_different_time_records_edit() {
        let mut p = plan();
        start_task(&mut p, &TaskRef::Index(0), utc(9, 5)).unwrap();
        start_task(&mut p, &TaskRef::Index(0), utc(9, 20)).unwrap();

        let item = &p.schedule[0];
        assert_eq!(item.actual_start, Some(utc(9, 20)));
        assert_eq!(item.edits.len(), 1);
        assert_eq!(item.edits[0].old_value, Some(utc(9, 5)));
    }

    #[test]
    fn test_complete_never_started_backfills_start() {
        let mut p = plan();
        complete_task(&mut p, &TaskRef::Name("team sync".to_string()), utc(11, 45)).unwrap();

        let item = &p.schedule[2];
        assert_eq!(item.status, TaskStatus::Completed);
        assert_eq!(item.actual_start, Some(utc(11, 45)));
        assert_eq!(item.actual_end, Some(utc(11, 45)));
        assert_eq!(item.actual_minutes(), Some(0));
    }

    #[test]
    fn test_skip_task_stores_reason_without_timestamps() {
        let mut p = plan();
        skip_task(&mut p, &TaskRef::Index(3), Some("ran out of day".to_string())).unwrap();

        let item = &p.schedule[3];
        assert_eq!(item.status, TaskStatus::Skipped);
        assert_eq!(item.skip_reason.as_deref(), Some("ran out of day"));
        assert!(item.actual_start.is_none());
        assert!(item.actual_end.is_none());
    }

    #[test]
    fn test_edit_timestamp_appends_audit_entry() {
        let mut p = plan();
        start_task(&mut p, &TaskRef::Index(0), utc(9, 0)).unwrap();
        complete_task(&mut p, &TaskRef::Index(0), utc(10, 0)).unwrap();

        edit_timestamp(
            &mut p,
            &TaskRef::Index(0),
            EditField::ActualEnd,
            utc(9, 50),
            Some("forgot to check in".to_string()),
        )
        .unwrap();

        let item = &p.schedule[0];
        assert_eq!(item.actual_end, Some(utc(9, 50)));
        assert_eq!(item.edits.len(), 1);
        assert_eq!(item.edits[0].field, EditField::ActualEnd);
        assert_eq!(item.edits[0].old_value, Some(utc(10, 0)));
        assert_eq!(item.edits[0].new_value, utc(9, 50));
    }

    #[test]
    fn test_edit_rejecting_end_before_start_leaves_item_unchanged() {
        let mut p = plan();
        start_task(&mut p, &TaskRef::Index(0), utc(9, 0)).unwrap();
        complete_task(&mut p, &TaskRef::Index(0), utc(10, 0)).unwrap();

        let result = edit_timestamp(&mut p, &TaskRef::Index(0), EditField::ActualEnd, utc(8, 0), None);
        assert!(matches!(result, Err(CoreError::Validation(_))));

        let item = &p.schedule[0];
        assert_eq!(item.actual_end, Some(utc(10, 0)));
        assert!(item.edits.is_empty());
    }

    #[test]
    fn test_edit_start_past_end_rejected_too() {
        let mut p = plan();
        start_task(&mut p, &TaskRef::Index(0), utc(9, 0)).unwrap();
        complete_task(&mut p, &TaskRef::Index(0), utc(10, 0)).unwrap();

        let result = edit_timestamp(&mut p, &TaskRef::Index(0), EditField::ActualStart, utc(10, 30), None);
        assert!(matches!(result, Err(CoreError::Validation(_))));
        assert_eq!(p.schedule[0].actual_start, Some(utc(9, 0)));
    }

    #[test]
    fn test_completion_stats_counts_and_rate() {
        let mut p = plan();
        complete_task(&mut p, &TaskRef::Index(0), utc(10, 0)).unwrap();
        skip_task(&mut p, &TaskRef::Index(1), None).unwrap();
        complete_task(&mut p, &TaskRef::Index(2), utc(12, 0)).unwrap();

        let stats = completion_stats(&p);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.not_started, 1);
        assert_eq!(stats.in_progress, 0);
        assert!((stats.completion_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_completion_rate_quarter() {
        let mut p = plan();
        complete_task(&mut p, &TaskRef::Index(0), utc(10, 0)).unwrap();
        skip_task(&mut p, &TaskRef::Index(1), None).unwrap();

        // 4 items: 1 completed, 1 skipped, 2 not started
        let stats = completion_stats(&p);
        assert!((stats.completion_rate - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_avg_variance_none_without_estimates_and_actuals() {
        let p = plan();
        assert_eq!(completion_stats(&p).avg_variance, None);

        let mut p = plan();
        p.schedule[0].estimated_minutes = Some(60);
        start_task(&mut p, &TaskRef::Index(0), utc(9, 0)).unwrap();
        complete_task(&mut p, &TaskRef::Index(0), utc(9, 45)).unwrap();

        let stats = completion_stats(&p);
        assert_eq!(stats.avg_variance, Some(-15.0));
    }

    #[test]
    fn test_current_task_by_window() {
        let p = plan();
        assert_eq!(current_task(&p, time(10, 30)).unwrap().task, "Review PRs");
        // Lunch gap has no scheduled item
        assert!(current_task(&p, time(12, 30)).is_none());
    }

    #[test]
    fn test_next_task_prefers_in_progress() {
        let mut p = plan();
        start_task(&mut p, &TaskRef::Index(2), utc(11, 0)).unwrap();

        assert_eq!(next_task(&p, time(9, 30)).unwrap().task, "Team sync");
    }

    #[test]
    fn test_next_task_earliest_not_started_after_now() {
        let mut p = plan();
        complete_task(&mut p, &TaskRef::Index(0), utc(10, 0)).unwrap();

        assert_eq!(next_task(&p, time(10, 30)).unwrap().task, "Team sync");
        // Past everything scheduled: falls back to first not-started
        assert_eq!(next_task(&p, time(18, 0)).unwrap().task, "Review PRs");
    }

    #[test]
    fn test_validate_consistency_flags_anomalies() {
        let mut p = plan();
        // Completed without an end timestamp
        p.schedule[0].status = TaskStatus::Completed;
        p.schedule[0].actual_start = Some(utc(9, 0));
        // In progress with an end timestamp
        p.schedule[1].status = TaskStatus::InProgress;
        p.schedule[1].actual_start = Some(utc(10, 0));
        p.schedule[1].actual_end = Some(utc(10, 30));

        let issues = validate_consistency(&p);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].detail.contains("no end timestamp"));
        assert!(issues[1].detail.contains("in progress but has an end"));
    }

    #[test]
    fn test_validate_consistency_flags_insane_variance() {
        let mut p = plan();
        p.schedule[0].estimated_minutes = Some(30);
        p.schedule[0].actual_start = Some(utc(0, 0));
        p.schedule[0].actual_end = Some(utc(0, 0) + chrono::Duration::minutes(600));
        p.schedule[0].status = TaskStatus::Completed;

        let issues = validate_consistency(&p);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].detail.contains("sanity threshold"));
    }
}
