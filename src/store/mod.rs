//! Durable persistence for sessions and profiles
//!
//! Both stores write whole JSON documents with temp-file-and-rename atomicity
//! and are the only components that touch the backing files. Session loads
//! recover from corruption (quarantine + partial salvage) instead of failing.

mod profiles;
mod sessions;

pub use profiles::ProfileStore;
pub use sessions::{LoadOutcome, RecoveryEvent, SessionStore, SessionSummary};
