//! dayplan - conversational daily planning with time tracking
//!
//! dayplan drives a recurring loop with a language model to plan one day at a
//! time: gather a goal, clarify it, propose a schedule, revise until accepted,
//! then track how the day actually went. Every mutation persists as one JSON
//! document per date, and completed sessions fold into a longitudinal profile
//! that makes future planning less chatty.
//!
//! # Core concepts
//!
//! - **One session per date**: the calendar day is the identity; resume picks
//!   up exactly where the conversation stopped.
//! - **State in files**: sessions and the profile are whole-document JSON with
//!   atomic replace semantics; a crash mid-write never corrupts the canonical
//!   file.
//! - **Untrusted inputs everywhere**: user text, model output, and the
//!   filesystem all get defensive handling - lenient reply parsing, corruption
//!   salvage, timestamp repair.
//!
//! # Modules
//!
//! - [`machine`] - session state machine (idle → questions → feedback → done)
//! - [`store`] - durable session/profile persistence with recovery
//! - [`tracking`] - task lifecycle, audit trail, statistics
//! - [`learner`] - history folding and profile completeness scoring
//! - [`llm`] - LLM client and the plan generator collaborator
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod learner;
pub mod llm;
pub mod machine;
pub mod prompts;
pub mod runner;
pub mod store;
pub mod tracking;

// Re-export commonly used types
pub use config::{Config, LlmConfig, PlanningConfig, StorageConfig};
pub use domain::{
    ConversationLog, Message, Plan, PlanningHistory, Profile, Role, ScheduleItem, Session, SessionState, TaskStatus,
    TimeEdit,
};
pub use error::{CoreError, CoreResult};
pub use learner::{QuestionDepth, fold_session, question_depth, score_completeness};
pub use llm::{LlmClient, LlmError, OpenAiClient, Planner};
pub use machine::{Action, PlannerReply, StateMachine, merge_schedule};
pub use store::{LoadOutcome, ProfileStore, RecoveryEvent, SessionStore, SessionSummary};
pub use tracking::{Issue, Stats, TaskRef};
