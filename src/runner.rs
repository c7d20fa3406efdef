//! Interactive planning session
//!
//! Drives one session through the state machine in conversation with the
//! user: state-dependent prompts, plan generation on demand, one atomic save
//! per turn, and a history fold when the plan is accepted.

use chrono::NaiveDate;
use colored::Colorize;
use eyre::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{Profile, Session, SessionState};
use crate::learner::{QuestionDepth, fold_session, question_depth, score_completeness};
use crate::llm::{Planner, create_client};
use crate::machine::{Action, StateMachine};
use crate::store::{ProfileStore, SessionStore};

/// Run the interactive planning loop for a date
///
/// This is the main entry point for `day plan`.
pub async fn run_planning(config: &Config, date: NaiveDate, force_new: bool) -> Result<()> {
    // Validate API key early, before any prompt
    config.validate()?;

    let sessions = SessionStore::open(config.storage.sessions_dir()).context("Failed to open session store")?;
    let profiles = ProfileStore::open(config.storage.profiles_dir()).context("Failed to open profile store")?;

    let mut profile = profiles
        .load(&config.planning.user_id)
        .context("Failed to load profile")?;

    let (mut session, resuming) = load_or_create(&sessions, date, force_new)?;

    // A rich profile makes clarifying questions redundant
    let depth = question_depth(score_completeness(&profile));
    let min_answers = if depth == QuestionDepth::Minimal {
        0
    } else {
        config.planning.min_answers
    };
    let machine = StateMachine::new(config.planning.affirmations.clone(), min_answers)
        .with_priority_cap(config.planning.max_priorities);

    let client = create_client(&config.llm).map_err(|e| eyre::eyre!("Failed to create LLM client: {}", e))?;
    let planner = Planner::new(client);

    if resuming {
        print_resume_banner(&session);
    }
    if session.is_done() {
        print_plan(&session);
        println!("{}", "This session is already finalized.".green());
        return Ok(());
    }

    let mut rl = DefaultEditor::new()?;

    loop {
        match session.state {
            SessionState::Done => break,

            SessionState::Idle => {
                let Some(input) = prompt(&mut rl, "Goal for the day> ")? else {
                    return cancelled(&sessions, &mut session);
                };
                let action = machine.advance(&mut session, &input);
                sessions.save(&mut session)?;
                if action == Action::GeneratePlan {
                    try_generate(&machine, &planner, &sessions, &mut session, &profile).await?;
                }
            }

            SessionState::Questions => {
                let question = session
                    .open_questions
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "Anything else I should know?".to_string());
                let Some(input) = prompt(&mut rl, &format!("{question} > "))? else {
                    return cancelled(&sessions, &mut session);
                };
                let action = machine.advance(&mut session, &input);
                sessions.save(&mut session)?;
                if action == Action::GeneratePlan {
                    try_generate(&machine, &planner, &sessions, &mut session, &profile).await?;
                }
            }

            SessionState::Feedback => {
                if session.plan.is_none() {
                    // The last generation produced nothing; retry on confirmation
                    let Some(_) = prompt(&mut rl, "No plan yet. Press enter to retry> ")? else {
                        return cancelled(&sessions, &mut session);
                    };
                    try_generate(&machine, &planner, &sessions, &mut session, &profile).await?;
                    continue;
                }

                print_plan(&session);
                let Some(input) = prompt(&mut rl, "Feedback (or 'done' to accept)> ")? else {
                    return cancelled(&sessions, &mut session);
                };
                let action = machine.advance(&mut session, &input);
                sessions.save(&mut session)?;
                match action {
                    Action::GeneratePlan => {
                        try_generate(&machine, &planner, &sessions, &mut session, &profile).await?;
                    }
                    Action::Completed => {
                        if fold_session(&mut profile, &session) {
                            profiles.save(&mut profile)?;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    print_plan(&session);
    println!("{}", "Plan finalized. Have a productive day!".green().bold());
    Ok(())
}

/// Load the session for a date, surfacing any recovery that happened
fn load_or_create(sessions: &SessionStore, date: NaiveDate, force_new: bool) -> Result<(Session, bool)> {
    if force_new {
        info!(%date, "starting fresh session");
        return Ok((Session::new(date), false));
    }

    match sessions.load(date)? {
        Some(outcome) => {
            if let Some(event) = &outcome.recovered {
                println!("{} {}", "recovered:".yellow().bold(), event);
            }
            Ok((outcome.session, true))
        }
        None => Ok((Session::new(date), false)),
    }
}

/// Generate a plan (or more questions) and apply whatever came back
///
/// A generator failure is "no action available this turn": the user is told,
/// the state stays put, and the loop continues.
async fn try_generate(
    machine: &StateMachine,
    planner: &Planner,
    sessions: &SessionStore,
    session: &mut Session,
    profile: &Profile,
) -> Result<()> {
    println!("{}", "Thinking...".dimmed());

    match planner.generate(session, profile).await {
        Ok(reply) => {
            if reply.is_empty() {
                println!("{}", "The planner returned nothing usable; let's keep going.".yellow());
                return Ok(());
            }
            if let Some(summary) = &reply.summary {
                println!("\n{summary}\n");
            }
            machine.apply_reply(session, reply);
            sessions.save(session)?;
        }
        Err(e) => {
            warn!(error = %e, "plan generation failed");
            println!(
                "{} {}",
                "Plan generation is unavailable right now:".yellow(),
                e
            );
            println!("{}", "Your progress is saved; try again in a moment.".dimmed());
        }
    }
    Ok(())
}

fn cancelled(sessions: &SessionStore, session: &mut Session) -> Result<()> {
    sessions.save(session)?;
    println!("\n{}", "Session paused. Progress saved; resume with `day plan`.".dimmed());
    Ok(())
}

fn print_resume_banner(session: &Session) {
    println!("{}", format!("Resuming session for {}", session.date).bold());
    match session.state {
        SessionState::Questions => println!("{}", "Continuing with clarifying questions...".dimmed()),
        SessionState::Feedback => println!("{}", "Continuing with plan feedback...".dimmed()),
        _ => {}
    }
}

/// Show the current plan
fn print_plan(session: &Session) {
    let Some(plan) = &session.plan else {
        return;
    };

    println!("\n{}", "Schedule:".bold());
    for item in &plan.schedule {
        let estimate = item
            .estimated_minutes
            .map(|m| format!(" (~{m}m)"))
            .unwrap_or_default();
        println!("  {} {}{}", item.time.blue(), item.task, estimate.dimmed());
    }

    if !plan.priorities.is_empty() {
        println!("\n{}", "Top priorities:".bold());
        for priority in &plan.priorities {
            println!("  • {priority}");
        }
    }

    if !plan.notes.is_empty() {
        println!("\n{} {}", "Notes:".bold(), plan.notes);
    }
    println!();
}

/// Read one line of input; None means the user is leaving the session
fn prompt(rl: &mut DefaultEditor, text: &str) -> Result<Option<String>> {
    match rl.readline(text) {
        Ok(line) => {
            let trimmed = line.trim();
            if matches!(trimmed.to_lowercase().as_str(), "quit" | "exit" | "/quit" | "/exit") {
                return Ok(None);
            }
            let _ = rl.add_history_entry(trimmed);
            Ok(Some(line))
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
