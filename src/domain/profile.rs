//! User profile and planning history
//!
//! The profile is the long-lived cross-session document: scheduling
//! preferences the prompt layer feeds to the model, plus the planning history
//! the learner appends to as sessions complete.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Typical working hours
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkHours {
    /// Start time in HH:MM format
    pub start: String,
    /// End time in HH:MM format
    pub end: String,
}

impl Default for WorkHours {
    fn default() -> Self {
        Self {
            start: "09:00".to_string(),
            end: "17:00".to_string(),
        }
    }
}

/// A recurring unavailable window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedTime {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Patterns learned from completed planning sessions
///
/// The learner only appends and caps; entries are never edited in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningHistory {
    /// Planning approaches that worked (first plan accepted)
    #[serde(default)]
    pub successful_patterns: Vec<String>,

    /// Planning approaches that did not work
    #[serde(default)]
    pub avoided_patterns: Vec<String>,

    /// Frequent plan modifications requested by the user
    #[serde(default)]
    pub common_adjustments: Vec<String>,

    /// Total completed sessions; monotonically increasing
    #[serde(default)]
    pub sessions_completed: u64,

    /// Most recent date folded in; strictly advancing
    #[serde(default)]
    pub last_session_date: Option<NaiveDate>,
}

/// Complete user profile for personalized planning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default = "default_user_id")]
    pub user_id: String,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub work_hours: WorkHours,

    /// Typical wake time in HH:MM format
    #[serde(default)]
    pub wake_time: Option<String>,

    /// Best time for focused work: morning, afternoon, evening
    #[serde(default)]
    pub peak_productivity_time: Option<String>,

    #[serde(default)]
    pub job_role: Option<String>,

    /// Days with many meetings, e.g. Tuesday, Thursday
    #[serde(default)]
    pub meeting_heavy_days: Vec<String>,

    #[serde(default)]
    pub blocked_times: Vec<BlockedTime>,

    #[serde(default)]
    pub top_priorities: Vec<String>,

    #[serde(default)]
    pub long_term_goals: Vec<String>,

    #[serde(default)]
    pub history: PlanningHistory,

    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

fn default_user_id() -> String {
    "default".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for Profile {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            user_id: default_user_id(),
            timezone: default_timezone(),
            work_hours: WorkHours::default(),
            wake_time: None,
            peak_productivity_time: None,
            job_role: None,
            meeting_heavy_days: Vec::new(),
            blocked_times: Vec::new(),
            top_priorities: Vec::new(),
            long_term_goals: Vec::new(),
            history: PlanningHistory::default(),
            created_at: now,
            last_updated: now,
        }
    }
}

impl Profile {
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

/// Append an entry and evict the oldest beyond `cap` (FIFO)
pub fn push_capped(list: &mut Vec<String>, entry: String, cap: usize) {
    list.push(entry);
    if list.len() > cap {
        let excess = list.len() - cap;
        list.drain(..excess);
    }
}
