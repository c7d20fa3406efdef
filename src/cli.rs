//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dayplan - conversational daily planning with time tracking
#[derive(Parser)]
#[command(
    name = "day",
    about = "Plan your day in conversation with an LLM, then track how it actually went",
    version,
    after_help = "Logs are written to: <data-dir>/logs/dayplan.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Create or resume the planning session for a date
    Plan {
        /// Session date (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Start fresh, ignoring an existing session for the date
        #[arg(long)]
        new: bool,
    },

    /// List saved sessions
    List,

    /// Check in on today's plan: start, complete, skip, or correct tasks
    Checkin {
        /// Session date (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        #[command(subcommand)]
        action: CheckinAction,
    },

    /// Show or update the user profile
    Profile {
        /// Set your job role
        #[arg(long)]
        job_role: Option<String>,

        /// Set your typical wake time (HH:MM)
        #[arg(long)]
        wake_time: Option<String>,

        /// Set your peak productivity time (morning/afternoon/evening)
        #[arg(long)]
        peak: Option<String>,

        /// Add a top priority
        #[arg(long)]
        add_priority: Option<String>,

        /// Add a long-term goal
        #[arg(long)]
        add_goal: Option<String>,

        /// Add a meeting-heavy day (e.g. Tuesday)
        #[arg(long)]
        meeting_day: Option<String>,

        /// Add a blocked time window (HH:MM-HH:MM)
        #[arg(long)]
        block: Option<String>,

        /// Reason for the blocked window
        #[arg(long, requires = "block")]
        block_reason: Option<String>,
    },

    /// Export a session as Markdown
    Export {
        /// Session date (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Output path (defaults to dayplan-<date>.md)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a session
    Delete {
        /// Session date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
    },
}

/// Check-in actions over the day's schedule
#[derive(Subcommand)]
pub enum CheckinAction {
    /// Start a task now
    Start {
        /// Task name (case-insensitive, substring ok)
        task: Option<String>,

        /// Reference the task by schedule position instead (1-based)
        #[arg(short, long)]
        index: Option<usize>,
    },

    /// Complete a task now
    Complete {
        /// Task name (case-insensitive, substring ok)
        task: Option<String>,

        /// Reference the task by schedule position instead (1-based)
        #[arg(short, long)]
        index: Option<usize>,
    },

    /// Skip a task
    Skip {
        /// Task name (case-insensitive, substring ok)
        task: Option<String>,

        /// Reference the task by schedule position instead (1-based)
        #[arg(short, long)]
        index: Option<usize>,

        /// Why the task was skipped
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Correct a recorded timestamp (audited)
    Edit {
        /// Task name (case-insensitive, substring ok)
        task: Option<String>,

        /// Reference the task by schedule position instead (1-based)
        #[arg(short, long)]
        index: Option<usize>,

        /// Which timestamp to edit: start or end
        #[arg(short, long)]
        field: String,

        /// New time (HH:MM)
        #[arg(short, long)]
        time: String,

        /// Why the correction is needed
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Show the schedule with progress and statistics
    Status,

    /// Show what you should be doing now and next
    Next,
}
