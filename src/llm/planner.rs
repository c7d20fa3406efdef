//! Plan generator
//!
//! The narrow collaborator between the session core and the model: builds one
//! completion request from the session and profile, and parses the reply into
//! a [`PlannerReply`] without ever failing on malformed output. A reply the
//! parser cannot use at all comes back empty, which the caller treats as "no
//! action available this turn".

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::client::LlmClient;
use super::error::LlmError;
use super::types::{ChatMessage, CompletionRequest};
use crate::domain::{Plan, Profile, Session, SessionState};
use crate::learner::{question_depth, score_completeness};
use crate::machine::PlannerReply;
use crate::prompts;

/// How many recent conversation turns are sent as context
const CONTEXT_TURNS: usize = 40;

/// Response token limit per generation
const REPLY_MAX_TOKENS: u32 = 4096;

/// Generates candidate plans from the current session
pub struct Planner {
    client: Arc<dyn LlmClient>,
}

impl Planner {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Generate a candidate reply for the session
    ///
    /// Transport-level retry lives in the client; an error here means this
    /// turn produced nothing and the session state is left untouched.
    pub async fn generate(&self, session: &Session, profile: &Profile) -> Result<PlannerReply, LlmError> {
        let request = build_request(session, profile);
        let response = self.client.complete(request).await?;

        let content = response.content.unwrap_or_default();
        let mut reply = parse_reply(&content);
        if reply.summary.is_none() {
            reply.summary = summarize(&reply);
        }
        Ok(reply)
    }
}

/// Build the completion request for a session
pub fn build_request(session: &Session, profile: &Profile) -> CompletionRequest {
    let mut system_prompt = prompts::SYSTEM_PROMPT.to_string();

    let depth = question_depth(score_completeness(profile));
    system_prompt.push_str("\n\n");
    system_prompt.push_str(prompts::question_guidance(depth));

    if let Some(context) = prompts::profile_context(profile) {
        system_prompt.push_str("\n\n");
        system_prompt.push_str(&context);
    }

    let messages: Vec<ChatMessage> = session
        .conversation
        .recent(CONTEXT_TURNS)
        .iter()
        .map(ChatMessage::from)
        .collect();

    CompletionRequest {
        system_prompt,
        messages,
        max_tokens: REPLY_MAX_TOKENS,
    }
}

/// Typed shape of a well-formed reply
#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(default)]
    plan: Option<Plan>,
    #[serde(default)]
    questions: Vec<String>,
    #[serde(default)]
    state: Option<String>,
}

/// Parse model output into a reply, tolerating malformed or partial JSON
///
/// Tries, in order: the whole text as JSON, the outermost brace-delimited
/// block (fences and prose stripped), then field-by-field salvage from a
/// generic value. Anything unusable yields an empty reply.
pub fn parse_reply(text: &str) -> PlannerReply {
    let candidate = extract_json(text);
    let Some(candidate) = candidate else {
        if !text.trim().is_empty() {
            warn!("planner reply contained no JSON object, treating as empty");
        }
        return PlannerReply::default();
    };

    if let Ok(raw) = serde_json::from_str::<RawReply>(candidate) {
        return PlannerReply {
            plan: raw.plan,
            questions: raw.questions,
            state_hint: raw.state.as_deref().and_then(parse_state),
            summary: None,
        };
    }

    // Typed parse failed: salvage what individual fields still parse
    debug!("typed reply parse failed, salvaging fields");
    let Ok(value) = serde_json::from_str::<serde_json::Value>(candidate) else {
        warn!("planner reply was not valid JSON, treating as empty");
        return PlannerReply::default();
    };

    let plan = value
        .get("plan")
        .and_then(|v| serde_json::from_value::<Option<Plan>>(v.clone()).ok())
        .flatten();
    let questions = value
        .get("questions")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|q| q.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();
    let state_hint = value
        .get("state")
        .and_then(|v| v.as_str())
        .and_then(parse_state);

    PlannerReply {
        plan,
        questions,
        state_hint,
        summary: None,
    }
}

/// Pull the outermost JSON object out of possibly-fenced, possibly-chatty text
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

fn parse_state(s: &str) -> Option<SessionState> {
    match s {
        "idle" => Some(SessionState::Idle),
        "questions" => Some(SessionState::Questions),
        "feedback" => Some(SessionState::Feedback),
        "done" => Some(SessionState::Done),
        _ => None,
    }
}

/// Human-readable summary of a reply, recorded as the assistant turn
pub fn summarize(reply: &PlannerReply) -> Option<String> {
    if let Some(plan) = &reply.plan {
        let schedule: Vec<String> = plan
            .schedule
            .iter()
            .map(|item| format!("  {}: {}", item.time, item.task))
            .collect();
        let priorities: Vec<String> = plan.priorities.iter().map(|p| format!("  - {p}")).collect();

        let mut summary = format!("Here's your plan:\n\nSchedule:\n{}", schedule.join("\n"));
        if !priorities.is_empty() {
            summary.push_str(&format!("\n\nTop priorities:\n{}", priorities.join("\n")));
        }
        if !plan.notes.is_empty() {
            summary.push_str(&format!("\n\nNotes: {}", plan.notes));
        }
        return Some(summary);
    }

    if !reply.questions.is_empty() {
        let questions: Vec<String> = reply
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| format!("  {}. {q}", i + 1))
            .collect();
        return Some(format!(
            "I have {} clarifying question(s):\n{}",
            reply.questions.len(),
            questions.join("\n")
        ));
    }

    None
}
