//! Markdown export
//!
//! Renders one session as a standalone Markdown document: schedule with
//! execution status, priorities, notes, completion statistics, and the audit
//! trail of manual time corrections.

use crate::domain::{Session, TaskStatus};
use crate::tracking;

/// Render a session as Markdown
pub fn session_markdown(session: &Session) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Daily plan: {}\n\n", session.date));

    if !session.goal.is_empty() {
        md.push_str(&format!("**Goal:** {}\n\n", session.goal));
    }
    md.push_str(&format!("**State:** {}\n\n", session.state));

    let Some(plan) = &session.plan else {
        md.push_str("_No plan yet._\n");
        return md;
    };

    md.push_str("## Schedule\n\n");
    md.push_str("| | Time | Task | Est. | Act. |\n");
    md.push_str("|---|---|---|---|---|\n");
    for item in &plan.schedule {
        let mark = match item.status {
            TaskStatus::Completed => "x",
            TaskStatus::InProgress => ">",
            TaskStatus::Skipped => "-",
            TaskStatus::NotStarted => " ",
        };
        let estimate = item
            .estimated_minutes
            .map(|m| format!("{m}m"))
            .unwrap_or_else(|| "—".to_string());
        let actual = item
            .actual_minutes()
            .map(|m| format!("{m}m"))
            .unwrap_or_else(|| "—".to_string());
        md.push_str(&format!(
            "| [{mark}] | {} | {} | {estimate} | {actual} |\n",
            item.time, item.task
        ));
    }
    md.push('\n');

    if !plan.priorities.is_empty() {
        md.push_str("## Priorities\n\n");
        for priority in &plan.priorities {
            md.push_str(&format!("- {priority}\n"));
        }
        md.push('\n');
    }

    if !plan.notes.is_empty() {
        md.push_str("## Notes\n\n");
        md.push_str(&plan.notes);
        md.push_str("\n\n");
    }

    let stats = tracking::completion_stats(plan);
    md.push_str("## Progress\n\n");
    md.push_str(&format!(
        "{} of {} tasks completed ({:.0}%), {} skipped, {} in progress\n\n",
        stats.completed,
        stats.total,
        stats.completion_rate * 100.0,
        stats.skipped,
        stats.in_progress
    ));
    md.push_str(&format!(
        "Estimated {}m, actual {}m",
        stats.estimated_total, stats.actual_total
    ));
    match stats.avg_variance {
        Some(variance) => md.push_str(&format!(", average variance {variance:+.1}m per task\n")),
        None => md.push_str(", variance not available\n"),
    }

    let edits: Vec<String> = plan
        .schedule
        .iter()
        .flat_map(|item| {
            item.edits.iter().map(move |edit| {
                let old = edit
                    .old_value
                    .map(|v| v.format("%H:%M").to_string())
                    .unwrap_or_else(|| "unset".to_string());
                let reason = edit.reason.as_deref().unwrap_or("no reason given");
                format!(
                    "- {}: {} {} → {} ({reason})",
                    item.task,
                    edit.field,
                    old,
                    edit.new_value.format("%H:%M")
                )
            })
        })
        .collect();
    if !edits.is_empty() {
        md.push_str("\n## Time corrections\n\n");
        for line in edits {
            md.push_str(&line);
            md.push('\n');
        }
    }

    md
}
