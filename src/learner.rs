//! History learner
//!
//! Folds completed sessions into the longitudinal planning history and scores
//! how complete the profile is. Each session folds exactly once: the profile's
//! `last_session_date` advances strictly, so replaying a fold is a no-op.

use tracing::{debug, info};

use crate::domain::{Profile, Session, push_capped};

/// Pattern lists are capped at this size; oldest entries evicted first
pub const PATTERN_CAP: usize = 20;

/// How many clarifying questions the prompt layer should request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionDepth {
    /// Sparse profile: ask several questions
    Many,
    /// Some context known: ask a few
    Some,
    /// Rich profile: ask only what the goal leaves open
    Minimal,
}

/// Fold a completed session into the profile
///
/// Only a `done` session whose date is newer than the last folded one is
/// accepted; everything else returns false without touching the profile.
/// Pattern lists append and cap, never edit in place.
pub fn fold_session(profile: &mut Profile, session: &Session) -> bool {
    if !session.is_done() {
        debug!(date = %session.date, state = %session.state, "not folding: session is not done");
        return false;
    }
    if let Some(last) = profile.history.last_session_date
        && session.date <= last
    {
        debug!(date = %session.date, %last, "not folding: date already folded");
        return false;
    }

    let history = &mut profile.history;

    if session.accepted_first_plan() {
        let items = session
            .plan
            .as_ref()
            .map(|plan| plan.schedule.len())
            .unwrap_or(0);
        push_capped(
            &mut history.successful_patterns,
            format!("{}: first plan accepted for \"{}\" ({} tasks)", session.date, session.goal, items),
            PATTERN_CAP,
        );
    }

    for feedback in &session.revision_feedback {
        push_capped(&mut history.common_adjustments, feedback.clone(), PATTERN_CAP);
    }

    history.sessions_completed += 1;
    history.last_session_date = Some(session.date);

    info!(
        date = %session.date,
        sessions_completed = history.sessions_completed,
        "folded session into planning history"
    );
    true
}

/// Score how much is already known about the user, 0–10
///
/// Weighted presence check: 2 points each for top priorities and long-term
/// goals, 1 point each for job role, meeting pattern, wake time, blocked
/// times, peak productivity time, and any completed session. Pure function,
/// recomputed on every call.
pub fn score_completeness(profile: &Profile) -> u8 {
    let mut score = 0u8;

    if !profile.top_priorities.is_empty() {
        score += 2;
    }
    if !profile.long_term_goals.is_empty() {
        score += 2;
    }
    if profile.job_role.is_some() {
        score += 1;
    }
    if !profile.meeting_heavy_days.is_empty() {
        score += 1;
    }
    if profile.wake_time.is_some() {
        score += 1;
    }
    if !profile.blocked_times.is_empty() {
        score += 1;
    }
    if profile.peak_productivity_time.is_some() {
        score += 1;
    }
    if profile.history.sessions_completed > 0 {
        score += 1;
    }

    score
}

/// Map a completeness score to question depth
pub fn question_depth(score: u8) -> QuestionDepth {
    match score {
        0..=2 => QuestionDepth::Many,
        3..=5 => QuestionDepth::Some,
        _ => QuestionDepth::Minimal,
    }
}
