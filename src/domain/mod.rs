//! Domain types for daily planning sessions
//!
//! These are the documents the store persists and the services mutate:
//! [`Session`] (one date's planning/execution cycle), [`Plan`] and its
//! [`ScheduleItem`]s, the [`ConversationLog`], and the cross-session
//! [`Profile`].

mod conversation;
mod plan;
mod profile;
mod session;

pub use conversation::{ConversationLog, Message, Role};
pub use plan::{EditField, Plan, ScheduleItem, TaskStatus, TimeEdit, parse_time_range};
pub use profile::{BlockedTime, PlanningHistory, Profile, WorkHours, push_capped};
pub use session::{Constraint, Session, SessionState};
