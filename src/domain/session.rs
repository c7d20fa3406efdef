//! Session domain type
//!
//! A Session is one planning/execution cycle for a calendar date. The date is
//! its identity: one session per date, created on first interaction, mutated
//! on every state transition and check-in, never deleted automatically.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::conversation::ConversationLog;
use super::plan::Plan;

/// Planning state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No goal yet
    #[default]
    Idle,
    /// Collecting clarifying answers
    Questions,
    /// A plan exists, awaiting acceptance or revision
    Feedback,
    /// Terminal; only the time-tracking service still mutates the schedule
    Done,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Questions => write!(f, "questions"),
            Self::Feedback => write!(f, "feedback"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// One clarifying question and the answer the user gave
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub question: String,
    pub answer: String,
}

/// One planning/execution cycle for a calendar date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Calendar day key; unique identity
    pub date: NaiveDate,

    pub state: SessionState,

    /// Free-text objective; set once, immutable after the first non-empty write
    #[serde(default)]
    pub goal: String,

    /// Question→answer pairs gathered during the questions state
    #[serde(default)]
    pub constraints: Vec<Constraint>,

    /// Clarifying questions proposed by the planner, not yet answered
    #[serde(default)]
    pub open_questions: Vec<String>,

    #[serde(default)]
    pub plan: Option<Plan>,

    #[serde(default)]
    pub conversation: ConversationLog,

    /// One short phrase per revision round, consumed by the history learner
    #[serde(default)]
    pub revision_feedback: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session for a date
    pub fn new(date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            date,
            state: SessionState::default(),
            goal: String::new(),
            constraints: Vec::new(),
            open_questions: Vec::new(),
            plan: None,
            conversation: ConversationLog::default(),
            revision_feedback: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Bump `last_updated`, clamping so it never precedes `created_at`
    pub fn touch(&mut self) {
        let now = Utc::now();
        if now < self.created_at {
            warn!(
                date = %self.date,
                "clock anomaly: current time precedes created_at, clamping last_updated"
            );
            self.last_updated = self.created_at;
        } else {
            self.last_updated = now;
        }
    }

    /// Enforce `last_updated >= created_at`, repairing in place
    ///
    /// Returns false when a repair was needed (corrupted clock on disk).
    pub fn repair_timestamps(&mut self) -> bool {
        if self.last_updated < self.created_at {
            warn!(
                date = %self.date,
                last_updated = %self.last_updated,
                created_at = %self.created_at,
                "corrupted timestamps: last_updated precedes created_at, repairing"
            );
            self.last_updated = self.created_at;
            return false;
        }
        true
    }

    /// Set the goal if it has not been set yet
    ///
    /// Returns true when the write took effect. Later writes are ignored:
    /// the goal is immutable after the first non-empty value.
    pub fn set_goal(&mut self, goal: &str) -> bool {
        let goal = goal.trim();
        if goal.is_empty() {
            return false;
        }
        if !self.goal.is_empty() {
            warn!(date = %self.date, "goal already set, ignoring overwrite attempt");
            return false;
        }
        self.goal = goal.to_string();
        true
    }

    /// Whether the session reached its terminal state
    pub fn is_done(&self) -> bool {
        self.state == SessionState::Done
    }

    /// Whether the first offered plan was accepted without a revision round
    pub fn accepted_first_plan(&self) -> bool {
        self.is_done() && self.revision_feedback.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session() -> Session {
        Session::new(NaiveDate::from_ymd_opt(2026, 8, 7).unwrap())
    }

    #[test]
    fn test_new_session_timestamps_consistent() {
        let s = session();
        assert!(s.last_updated >= s.created_at);
        assert_eq!(s.state, SessionState::Idle);
    }

    #[test]
    fn test_touch_maintains_invariant() {
        let mut s = session();
        s.touch();
        assert!(s.last_updated >= s.created_at);
    }

    #[test]
    fn test_repair_timestamps() {
        let mut s = session();
        s.last_updated = s.created_at - Duration::hours(3);

        assert!(!s.repair_timestamps());
        assert_eq!(s.last_updated, s.created_at);

        // Already consistent: no repair
        assert!(s.repair_timestamps());
    }

    #[test]
    fn test_goal_set_once() {
        let mut s = session();
        assert!(!s.set_goal("   "));
        assert!(s.goal.is_empty());

        assert!(s.set_goal("Ship the release"));
        assert_eq!(s.goal, "Ship the release");

        assert!(!s.set_goal("Something else"));
        assert_eq!(s.goal, "Ship the release");
    }

    #[test]
    fn test_accepted_first_plan() {
        let mut s = session();
        assert!(!s.accepted_first_plan());

        s.state = SessionState::Done;
        assert!(s.accepted_first_plan());

        s.revision_feedback.push("add a lunch break".to_string());
        assert!(!s.accepted_first_plan());
    }

    #[test]
    fn test_session_serde_roundtrip() {
        let mut s = session();
        s.set_goal("Plan my day");
        s.conversation.add_user("Plan my day");

        let json = serde_json::to_string(&s).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();

        assert_eq!(back.date, s.date);
        assert_eq!(back.goal, "Plan my day");
        assert_eq!(back.conversation.len(), 1);
    }
}
