//! dayplan - conversational daily planning with time tracking
//!
//! CLI entry point: `day plan` runs the interactive planning loop, `day
//! checkin` tracks execution against the plan, `day profile` manages the
//! longitudinal profile.

use std::fs;
use std::path::PathBuf;

use chrono::{Local, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{CommandFactory, Parser};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::info;

use dayplan::cli::{CheckinAction, Cli, Command};
use dayplan::config::Config;
use dayplan::domain::{EditField, Session, TaskStatus};
use dayplan::export::session_markdown;
use dayplan::learner::score_completeness;
use dayplan::runner;
use dayplan::store::{ProfileStore, SessionStore};
use dayplan::tracking::{self, TaskRef};

fn setup_logging(config: &Config, verbose: bool) -> Result<()> {
    let log_dir = config.storage.logs_dir();
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to the log file, not stdout: the terminal belongs to the session
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("dayplan.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config, cli.verbose)?;

    match cli.command {
        Some(Command::Plan { date, new }) => {
            let date = parse_date_or_today(date.as_deref())?;
            runner::run_planning(&config, date, new).await
        }
        Some(Command::List) => cmd_list(&config),
        Some(Command::Checkin { date, action }) => {
            let date = parse_date_or_today(date.as_deref())?;
            cmd_checkin(&config, date, action)
        }
        Some(Command::Profile {
            job_role,
            wake_time,
            peak,
            add_priority,
            add_goal,
            meeting_day,
            block,
            block_reason,
        }) => cmd_profile(
            &config,
            ProfileUpdates {
                job_role,
                wake_time,
                peak,
                add_priority,
                add_goal,
                meeting_day,
                block,
                block_reason,
            },
        ),
        Some(Command::Export { date, output }) => {
            let date = parse_date_or_today(date.as_deref())?;
            cmd_export(&config, date, output)
        }
        Some(Command::Delete { date }) => {
            let date = parse_date(&date)?;
            cmd_delete(&config, date)
        }
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

fn parse_date_or_today(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(raw) => parse_date(raw),
        None => Ok(Local::now().date_naive()),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| eyre::eyre!("Invalid date '{}'. Use YYYY-MM-DD.", raw))
}

fn cmd_list(config: &Config) -> Result<()> {
    let sessions = SessionStore::open(config.storage.sessions_dir())?;
    let summaries = sessions.list()?;

    if summaries.is_empty() {
        println!("No saved sessions.");
        return Ok(());
    }

    let today = Local::now().date_naive();
    for summary in summaries {
        let plan_marker = if summary.has_plan { "[x]" } else { "[ ]" };
        let today_marker = if summary.date == today { " (today)".cyan().to_string() } else { String::new() };
        let rate = if summary.has_plan {
            format!("  {:.0}% done", summary.completion_rate * 100.0)
        } else {
            String::new()
        };
        println!(
            "{plan_marker} {} {}{}{}",
            summary.date,
            summary.state.to_string().dimmed(),
            rate.dimmed(),
            today_marker
        );
    }
    Ok(())
}

/// Resolve the CLI's name/index pair into a task reference
fn task_ref(task: Option<String>, index: Option<usize>) -> Result<TaskRef> {
    match (task, index) {
        (_, Some(0)) => Err(eyre::eyre!("Task positions are 1-based.")),
        (_, Some(i)) => Ok(TaskRef::Index(i - 1)),
        (Some(name), None) => Ok(TaskRef::Name(name)),
        (None, None) => Err(eyre::eyre!("Name a task or pass --index.")),
    }
}

/// Interpret an HH:MM wall-clock time on the session's date
fn local_time_on(date: NaiveDate, raw: &str) -> Result<chrono::DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| eyre::eyre!("Invalid time '{}'. Use HH:MM.", raw))?;
    let naive = date.and_time(time);
    Ok(Local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive)))
}

fn cmd_checkin(config: &Config, date: NaiveDate, action: CheckinAction) -> Result<()> {
    let sessions = SessionStore::open(config.storage.sessions_dir())?;
    let Some(outcome) = sessions.load(date)? else {
        return Err(eyre::eyre!("No session found for {date}. Create one with `day plan`."));
    };
    if let Some(event) = &outcome.recovered {
        println!("{} {}", "recovered:".yellow().bold(), event);
    }
    let mut session = outcome.session;
    if session.plan.is_none() {
        return Err(eyre::eyre!("Session {date} has no plan yet. Finish planning first."));
    }

    match action {
        CheckinAction::Start { task, index } => {
            let reference = task_ref(task, index)?;
            let plan = session.plan.as_mut().unwrap();
            let idx = tracking::find_task(plan, &reference)?;
            tracking::start_task(plan, &TaskRef::Index(idx), Utc::now())?;
            println!("{} {}", "started:".green().bold(), plan.schedule[idx].task);
            sessions.save(&mut session)?;
        }
        CheckinAction::Complete { task, index } => {
            let reference = task_ref(task, index)?;
            let plan = session.plan.as_mut().unwrap();
            let idx = tracking::find_task(plan, &reference)?;
            tracking::complete_task(plan, &TaskRef::Index(idx), Utc::now())?;

            let item = &plan.schedule[idx];
            println!("{} {}", "completed:".green().bold(), item.task);
            let actual = item
                .actual_minutes()
                .map(|m| format!("{m}m"))
                .unwrap_or_else(|| "n/a".to_string());
            let variance = item
                .time_variance()
                .map(|v| format!("{v:+}m"))
                .unwrap_or_else(|| "not available".to_string());
            println!("  {} {actual} · {} {variance}", "actual:".dimmed(), "variance:".dimmed());
            sessions.save(&mut session)?;
        }
        CheckinAction::Skip { task, index, reason } => {
            let reference = task_ref(task, index)?;
            let plan = session.plan.as_mut().unwrap();
            let idx = tracking::find_task(plan, &reference)?;
            tracking::skip_task(plan, &TaskRef::Index(idx), reason)?;
            println!("{} {}", "skipped:".yellow().bold(), plan.schedule[idx].task);
            sessions.save(&mut session)?;
        }
        CheckinAction::Edit {
            task,
            index,
            field,
            time,
            reason,
        } => {
            let reference = task_ref(task, index)?;
            let field = match field.as_str() {
                "start" => EditField::ActualStart,
                "end" => EditField::ActualEnd,
                other => return Err(eyre::eyre!("Unknown field '{}'. Use: start or end", other)),
            };
            let at = local_time_on(date, &time)?;

            let plan = session.plan.as_mut().unwrap();
            let idx = tracking::find_task(plan, &reference)?;
            tracking::edit_timestamp(plan, &TaskRef::Index(idx), field, at, reason)?;
            println!("{} {} for {}", "corrected:".green().bold(), field, plan.schedule[idx].task);
            sessions.save(&mut session)?;
        }
        CheckinAction::Status => print_status(&session),
        CheckinAction::Next => print_next(&session),
    }

    Ok(())
}

fn status_glyph(status: TaskStatus) -> String {
    match status {
        TaskStatus::Completed => "✓".green().to_string(),
        TaskStatus::InProgress => "►".yellow().to_string(),
        TaskStatus::Skipped => "⊗".dimmed().to_string(),
        TaskStatus::NotStarted => " ".to_string(),
    }
}

fn print_status(session: &Session) {
    let plan = session.plan.as_ref().unwrap();

    println!("{}", format!("Plan for {}", session.date).bold());
    for (i, item) in plan.schedule.iter().enumerate() {
        let estimate = item
            .estimated_minutes
            .map(|m| format!("{m}m"))
            .unwrap_or_else(|| "—".to_string());
        let actual = item
            .actual_minutes()
            .map(|m| format!("{m}m"))
            .unwrap_or_else(|| "—".to_string());
        println!(
            " {} {:>2}. {} {}  {} {}",
            status_glyph(item.status),
            i + 1,
            item.time.blue(),
            item.task,
            format!("est {estimate}").dimmed(),
            format!("act {actual}").dimmed(),
        );
    }

    let stats = tracking::completion_stats(plan);
    println!(
        "\n{} {}/{} completed ({:.0}%), {} in progress, {} skipped, {} not started",
        "Progress:".bold(),
        stats.completed,
        stats.total,
        stats.completion_rate * 100.0,
        stats.in_progress,
        stats.skipped,
        stats.not_started
    );
    let variance = stats
        .avg_variance
        .map(|v| format!("{v:+.1}m per task"))
        .unwrap_or_else(|| "not available".to_string());
    println!(
        "{} estimated {}m, actual {}m, average variance {}",
        "Time:".bold(),
        stats.estimated_total,
        stats.actual_total,
        variance
    );

    let issues = tracking::validate_consistency(plan);
    if !issues.is_empty() {
        println!("\n{}", "Inconsistencies (advisory):".yellow().bold());
        for issue in issues {
            println!("  - {issue}");
        }
    }
}

fn print_next(session: &Session) {
    let plan = session.plan.as_ref().unwrap();
    let now = Local::now().time();

    match tracking::current_task(plan, now) {
        Some(item) => println!("{} {} ({})", "now:".bold(), item.task, item.time.blue()),
        None => println!("{} nothing scheduled for this time", "now:".bold()),
    }
    match tracking::next_task(plan, now) {
        Some(item) => println!("{} {} ({})", "next:".bold(), item.task, item.time.blue()),
        None => println!("{} all tasks are done or skipped", "next:".bold()),
    }
}

struct ProfileUpdates {
    job_role: Option<String>,
    wake_time: Option<String>,
    peak: Option<String>,
    add_priority: Option<String>,
    add_goal: Option<String>,
    meeting_day: Option<String>,
    block: Option<String>,
    block_reason: Option<String>,
}

impl ProfileUpdates {
    fn is_empty(&self) -> bool {
        self.job_role.is_none()
            && self.wake_time.is_none()
            && self.peak.is_none()
            && self.add_priority.is_none()
            && self.add_goal.is_none()
            && self.meeting_day.is_none()
            && self.block.is_none()
    }
}

fn cmd_profile(config: &Config, updates: ProfileUpdates) -> Result<()> {
    let profiles = ProfileStore::open(config.storage.profiles_dir())?;
    let mut profile = profiles.load(&config.planning.user_id)?;

    if !updates.is_empty() {
        if let Some(role) = updates.job_role {
            profile.job_role = Some(role);
        }
        if let Some(wake) = updates.wake_time {
            profile.wake_time = Some(wake);
        }
        if let Some(peak) = updates.peak {
            profile.peak_productivity_time = Some(peak);
        }
        if let Some(priority) = updates.add_priority {
            profile.top_priorities.push(priority);
        }
        if let Some(goal) = updates.add_goal {
            profile.long_term_goals.push(goal);
        }
        if let Some(day) = updates.meeting_day {
            profile.meeting_heavy_days.push(day);
        }
        if let Some(block) = updates.block {
            let Some((start, end)) = block.split_once('-') else {
                return Err(eyre::eyre!("Invalid blocked window '{}'. Use HH:MM-HH:MM.", block));
            };
            profile.blocked_times.push(dayplan::domain::BlockedTime {
                start: start.trim().to_string(),
                end: end.trim().to_string(),
                reason: updates.block_reason,
            });
        }
        profiles.save(&mut profile)?;
        println!("{}", "Profile updated.".green());
    }

    let score = score_completeness(&profile);
    println!("\n{} ({score}/10 complete)", "Profile".bold());
    println!("  work hours:  {} - {}", profile.work_hours.start, profile.work_hours.end);
    if let Some(wake) = &profile.wake_time {
        println!("  wake time:   {wake}");
    }
    if let Some(peak) = &profile.peak_productivity_time {
        println!("  peak time:   {peak}");
    }
    if let Some(role) = &profile.job_role {
        println!("  role:        {role}");
    }
    if !profile.meeting_heavy_days.is_empty() {
        println!("  meetings on: {}", profile.meeting_heavy_days.join(", "));
    }
    if !profile.blocked_times.is_empty() {
        let blocks: Vec<String> = profile
            .blocked_times
            .iter()
            .map(|b| {
                let reason = b.reason.as_deref().unwrap_or("blocked");
                format!("{}-{} ({reason})", b.start, b.end)
            })
            .collect();
        println!("  blocked:     {}", blocks.join(", "));
    }
    if !profile.top_priorities.is_empty() {
        println!("  priorities:  {}", profile.top_priorities.join(", "));
    }
    if !profile.long_term_goals.is_empty() {
        println!("  goals:       {}", profile.long_term_goals.join(", "));
    }

    let history = &profile.history;
    println!(
        "\n{} {} sessions completed{}",
        "History:".bold(),
        history.sessions_completed,
        history
            .last_session_date
            .map(|d| format!(", last on {d}"))
            .unwrap_or_default()
    );
    if !history.successful_patterns.is_empty() {
        println!("  {}", "what worked:".dimmed());
        for pattern in history.successful_patterns.iter().rev().take(3) {
            println!("    - {pattern}");
        }
    }
    if !history.common_adjustments.is_empty() {
        println!("  {}", "common adjustments:".dimmed());
        for adjustment in history.common_adjustments.iter().rev().take(3) {
            println!("    - {adjustment}");
        }
    }

    Ok(())
}

fn cmd_export(config: &Config, date: NaiveDate, output: Option<PathBuf>) -> Result<()> {
    let sessions = SessionStore::open(config.storage.sessions_dir())?;
    let Some(outcome) = sessions.load(date)? else {
        return Err(eyre::eyre!("No session found for {date}."));
    };

    let markdown = session_markdown(&outcome.session);
    let path = output.unwrap_or_else(|| PathBuf::from(format!("dayplan-{date}.md")));
    fs::write(&path, markdown).context("Failed to write export file")?;

    println!("{} {}", "exported:".green().bold(), path.display());
    Ok(())
}

fn cmd_delete(config: &Config, date: NaiveDate) -> Result<()> {
    let sessions = SessionStore::open(config.storage.sessions_dir())?;
    if sessions.delete(date)? {
        println!("{} session for {date}", "deleted:".green().bold());
    } else {
        println!("No session found for {date}.");
    }
    Ok(())
}
