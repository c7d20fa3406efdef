//! Embedded prompts and context formatting

use crate::domain::Profile;
use crate::learner::QuestionDepth;

/// System prompt for the planning agent
///
/// The reply contract matches what the planner parser expects: one JSON
/// object, nothing else.
pub const SYSTEM_PROMPT: &str = r#"You are a daily planning assistant helping one user plan a productive day.

Your job is to:
1. Understand the user's goal for the day
2. Ask clarifying questions when needed
3. Produce a realistic schedule with time blocks, priorities, and notes
4. Revise the plan based on feedback until the user accepts it

Reply with ONLY a single JSON object, no prose before or after:

{
  "plan": {
    "schedule": [
      { "time": "09:00-10:00", "task": "Write the report", "estimated_minutes": 60 }
    ],
    "priorities": ["Most important outcome first"],
    "notes": "Anything the user should keep in mind"
  },
  "questions": ["One clarifying question per entry"],
  "state": "questions"
}

Rules:
- When you need answers before planning, set "plan" to null, list your
  questions, and set "state" to "questions".
- When you propose or revise a plan, fill "plan", leave "questions" empty, and
  set "state" to "feedback".
- Use "HH:MM-HH:MM" time blocks in chronological order.
- Respect the user's stated constraints and the profile context.
- Keep the schedule realistic: include breaks, don't overpack.
"#;

/// Format the profile as context for the model
///
/// Returns None when the profile carries nothing worth sending.
pub fn profile_context(profile: &Profile) -> Option<String> {
    let mut parts = Vec::new();

    parts.push(format!(
        "Work hours: {} - {}",
        profile.work_hours.start, profile.work_hours.end
    ));

    if let Some(wake) = &profile.wake_time {
        parts.push(format!("Wakes at: {wake}"));
    }
    if let Some(peak) = &profile.peak_productivity_time {
        parts.push(format!("Peak productivity: {peak}"));
    }
    if let Some(role) = &profile.job_role {
        parts.push(format!("Role: {role}"));
    }
    if !profile.meeting_heavy_days.is_empty() {
        parts.push(format!("Meeting-heavy days: {}", profile.meeting_heavy_days.join(", ")));
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
        parts.push(format!("Blocked times: {}", blocks.join(", ")));
    }
    if !profile.top_priorities.is_empty() {
        parts.push(format!("Top priorities: {}", profile.top_priorities.join(", ")));
    }
    if !profile.long_term_goals.is_empty() {
        parts.push(format!("Long-term goals: {}", profile.long_term_goals.join(", ")));
    }
    if !profile.history.common_adjustments.is_empty() {
        // The most recent adjustments are the most predictive
        let recent: Vec<&str> = profile
            .history
            .common_adjustments
            .iter()
            .rev()
            .take(5)
            .map(String::as_str)
            .collect();
        parts.push(format!("Adjustments the user often asks for: {}", recent.join("; ")));
    }
    if !profile.history.successful_patterns.is_empty() {
        let recent: Vec<&str> = profile
            .history
            .successful_patterns
            .iter()
            .rev()
            .take(3)
            .map(String::as_str)
            .collect();
        parts.push(format!("Plans that worked before: {}", recent.join("; ")));
    }

    // Work hours alone are the default profile: not worth a context block
    if parts.len() <= 1 && profile.wake_time.is_none() {
        return None;
    }
    Some(format!("USER PROFILE:\n{}", parts.join("\n")))
}

/// Question-count guidance derived from profile completeness
pub fn question_guidance(depth: QuestionDepth) -> &'static str {
    match depth {
        QuestionDepth::Many => {
            "Little is known about this user. Ask 3-5 clarifying questions before planning."
        }
        QuestionDepth::Some => {
            "Some context is known about this user. Ask 1-2 clarifying questions, then plan."
        }
        QuestionDepth::Minimal => {
            "This user's profile is rich. Only ask a question if the goal truly requires it; otherwise plan directly."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_has_no_context() {
        assert!(profile_context(&Profile::default()).is_none());
    }

    #[test]
    fn test_profile_context_includes_set_fields() {
        let mut profile = Profile::default();
        profile.top_priorities.push("ship v1".to_string());
        profile.peak_productivity_time = Some("morning".to_string());

        let context = profile_context(&profile).unwrap();
        assert!(context.contains("Top priorities: ship v1"));
        assert!(context.contains("Peak productivity: morning"));
    }

    #[test]
    fn test_question_guidance_varies_by_depth() {
        assert!(question_guidance(QuestionDepth::Many).contains("3-5"));
        assert!(question_guidance(QuestionDepth::Minimal).contains("plan directly"));
    }
}
