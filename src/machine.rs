//! Session state machine
//!
//! Drives a session through `idle → questions → feedback → done` from two
//! untrusted inputs: user utterances and planner replies. Every transition is
//! total; out-of-order external calls map to the nearest sensible transition
//! with a warning instead of failing.

use tracing::{debug, warn};

use crate::domain::{Constraint, Plan, ScheduleItem, Session, SessionState, TaskStatus};

/// Revision feedback phrases are truncated to this length before they are
/// recorded for the history learner.
const ADJUSTMENT_PHRASE_LEN: usize = 80;

/// What the caller should execute next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Ask the user the next open clarifying question
    AskQuestion,
    /// Call the plan generator with the current session as context
    GeneratePlan,
    /// Show the plan and wait for user feedback
    AwaitFeedback,
    /// The session just reached its terminal state
    Completed,
    /// Nothing to do; input was rejected or the session is already done
    Noop,
}

/// A candidate reply from the plan generator, already parsed leniently
///
/// Any field may be missing: the generator is untrusted and partial replies
/// are applied for whatever they do carry.
#[derive(Debug, Clone, Default)]
pub struct PlannerReply {
    pub plan: Option<Plan>,
    pub questions: Vec<String>,
    pub state_hint: Option<SessionState>,
    /// Human-readable summary recorded as the assistant turn
    pub summary: Option<String>,
}

impl PlannerReply {
    pub fn is_empty(&self) -> bool {
        self.plan.is_none() && self.questions.is_empty() && self.summary.is_none()
    }
}

/// The session state machine
///
/// Holds the acceptance vocabulary and the minimum number of clarifying
/// answers to collect before a plan is generated. The threshold may be zero
/// when a rich profile makes questions redundant.
pub struct StateMachine {
    affirmations: Vec<String>,
    min_answers: usize,
    priority_cap: usize,
}

impl StateMachine {
    pub fn new(affirmations: Vec<String>, min_answers: usize) -> Self {
        Self {
            affirmations,
            min_answers,
            priority_cap: 5,
        }
    }

    /// Override how many priorities a plan may carry
    pub fn with_priority_cap(mut self, cap: usize) -> Self {
        self.priority_cap = cap;
        self
    }

    /// Advance the session with one user input
    ///
    /// Returns the action the caller should execute next. Empty input never
    /// advances any state.
    pub fn advance(&self, session: &mut Session, input: &str) -> Action {
        let input = input.trim();

        match session.state {
            SessionState::Idle => {
                if !session.set_goal(input) {
                    debug!(date = %session.date, "empty input in idle, re-prompting");
                    return Action::Noop;
                }
                session.conversation.add_user(input);
                session.state = SessionState::Questions;
                if self.answers_satisfied(session) {
                    session.state = SessionState::Feedback;
                }
                Action::GeneratePlan
            }

            SessionState::Questions => {
                if input.is_empty() {
                    return Action::AskQuestion;
                }

                let question = if session.open_questions.is_empty() {
                    "Additional context".to_string()
                } else {
                    session.open_questions.remove(0)
                };
                session.conversation.add_user(format!("{question}: {input}"));
                session.constraints.push(Constraint {
                    question,
                    answer: input.to_string(),
                });

                if !session.open_questions.is_empty() {
                    return Action::AskQuestion;
                }
                if self.answers_satisfied(session) {
                    session.state = SessionState::Feedback;
                }
                // Below threshold with no open questions left: the generator
                // is asked again and may pose more questions.
                Action::GeneratePlan
            }

            SessionState::Feedback => {
                if session.plan.is_none() {
                    // Plan generation previously failed or was interrupted
                    debug!(date = %session.date, "feedback state without a plan, regenerating");
                    return Action::GeneratePlan;
                }
                if input.is_empty() {
                    return Action::AwaitFeedback;
                }

                if self.is_acceptance(input) {
                    session.conversation.add_user(input);
                    session.state = SessionState::Done;
                    return Action::Completed;
                }

                // Anything else non-empty is a revision request
                session.conversation.add_user(input);
                session
                    .revision_feedback
                    .push(truncate_phrase(input, ADJUSTMENT_PHRASE_LEN));
                Action::GeneratePlan
            }

            SessionState::Done => {
                if !input.is_empty() {
                    warn!(date = %session.date, "input on a finalized session, ignoring");
                }
                Action::Noop
            }
        }
    }

    /// Apply a planner reply to the session
    ///
    /// New questions replace the open set; a new plan goes through the
    /// revision merge so in-flight task progress survives. A reply arriving
    /// after `done` is ignored: nothing mutates a finalized plan through this
    /// machine.
    pub fn apply_reply(&self, session: &mut Session, reply: PlannerReply) {
        if session.is_done() {
            warn!(date = %session.date, "planner reply for a finalized session, dropping");
            return;
        }

        if let Some(summary) = &reply.summary {
            session.conversation.add_assistant(summary.clone());
        }

        if !reply.questions.is_empty() {
            session.open_questions = reply.questions;
            if session.state == SessionState::Idle {
                warn!(date = %session.date, "questions proposed before a goal was set");
                session.state = SessionState::Questions;
            } else if session.state == SessionState::Feedback && session.plan.is_none() && reply.plan.is_none() {
                // Threshold was met but the generator wants answers before it
                // will plan; gathering them is the nearest sensible move.
                warn!(date = %session.date, "generator asked questions instead of planning");
                session.state = SessionState::Questions;
            }
        }

        if let Some(mut plan) = reply.plan {
            plan.backfill_estimates();
            plan.priorities.truncate(self.priority_cap);

            if let Some(previous) = &session.plan {
                plan.schedule = merge_schedule(&previous.schedule, plan.schedule);
            }
            session.plan = Some(plan);

            if session.state != SessionState::Feedback {
                debug!(
                    date = %session.date,
                    state = %session.state,
                    "plan arrived outside feedback, advancing"
                );
                session.state = SessionState::Feedback;
            }
        }

        if let Some(hint) = reply.state_hint
            && hint != session.state
        {
            // The generator's opinion of the next state is advisory only; the
            // machine owns transitions. Recorded for diagnosis.
            debug!(date = %session.date, ?hint, state = %session.state, "ignoring planner state hint");
        }
    }

    fn answers_satisfied(&self, session: &Session) -> bool {
        session.constraints.len() >= self.min_answers
    }

    fn is_acceptance(&self, input: &str) -> bool {
        let normalized = input.trim().trim_end_matches(['.', '!']).to_lowercase();
        self.affirmations.iter().any(|a| a.to_lowercase() == normalized)
    }
}

/// Merge a newly proposed schedule with the previous one
///
/// Any incoming item whose task name matches a previous item by exact
/// case-insensitive comparison (trimmed) keeps that item's status, actual
/// timestamps, skip reason, and audit trail, so revision never loses
/// execution progress. Time and estimate always come from the new proposal.
/// Fuzzy task matching is a possible future extension; only exact matching is
/// implemented.
pub fn merge_schedule(previous: &[ScheduleItem], incoming: Vec<ScheduleItem>) -> Vec<ScheduleItem> {
    incoming
        .into_iter()
        .map(|mut item| {
            let matched = previous.iter().find(|prev| {
                prev.status != TaskStatus::NotStarted && same_task(&prev.task, &item.task)
            });
            if let Some(prev) = matched {
                debug!(task = %item.task, status = %prev.status, "preserving progress across revision");
                item.status = prev.status;
                item.actual_start = prev.actual_start;
                item.actual_end = prev.actual_end;
                item.skip_reason = prev.skip_reason.clone();
                item.edits = prev.edits.clone();
            }
            item
        })
        .collect()
}

fn same_task(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn truncate_phrase(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        input.to_string()
    } else {
        let mut phrase: String = input.chars().take(max_chars).collect();
        phrase.push('…');
        phrase
    }
}
