//! Durable session store
//!
//! One JSON document per calendar date under the sessions directory. Writes
//! are atomic (temp file + rename in the same directory), loads recover from
//! corruption instead of failing, and listing reads a trimmed document so it
//! stays cheap as session count grows.
//!
//! Two processes racing on the same date resolve last-writer-wins at the
//! rename boundary. That hazard is accepted for the single-user design; the
//! store does not lock.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::{ConversationLog, Plan, Session, SessionState, TaskStatus};
use crate::error::CoreResult;

/// Stale temp files older than this are purged at startup; younger ones may
/// belong to a concurrently running process and are left alone.
const STALE_TMP_AGE: Duration = Duration::from_secs(60 * 60);

/// How a session was recovered during load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryEvent {
    /// `last_updated` preceded `created_at` on disk and was repaired
    ClockRepaired,
    /// The document was corrupt; conversation and/or plan were salvaged into
    /// a fresh session
    Salvaged { corrupt_path: PathBuf },
    /// The document was corrupt beyond salvage; a fresh session replaced it
    Reset { corrupt_path: PathBuf },
}

impl std::fmt::Display for RecoveryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClockRepaired => write!(f, "repaired inconsistent timestamps"),
            Self::Salvaged { corrupt_path } => {
                write!(f, "salvaged partial session (corrupt file kept at {})", corrupt_path.display())
            }
            Self::Reset { corrupt_path } => {
                write!(f, "started fresh session (corrupt file kept at {})", corrupt_path.display())
            }
        }
    }
}

/// Result of loading a session: the document plus any recovery that happened
#[derive(Debug)]
pub struct LoadOutcome {
    pub session: Session,
    pub recovered: Option<RecoveryEvent>,
}

/// Lightweight listing entry; built without deserializing conversation history
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub date: NaiveDate,
    pub state: SessionState,
    pub has_plan: bool,
    pub completion_rate: f64,
}

/// Trimmed document shape for listing. Unknown fields (conversation,
/// constraints, ...) are skipped by serde.
#[derive(Deserialize)]
struct SummaryDoc {
    date: NaiveDate,
    #[serde(default)]
    state: SessionState,
    #[serde(default)]
    plan: Option<SummaryPlan>,
}

#[derive(Deserialize)]
struct SummaryPlan {
    #[serde(default)]
    schedule: Vec<SummaryItem>,
}

#[derive(Deserialize)]
struct SummaryItem {
    #[serde(default)]
    status: TaskStatus,
}

/// File-backed store for per-date session documents
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Open or create the store, purging stale temp files from prior crashes
    pub fn open(dir: impl AsRef<Path>) -> CoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let store = Self { dir };
        store.purge_stale_tmp();
        debug!(dir = %store.dir.display(), "opened session store");
        Ok(store)
    }

    fn session_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{date}.json"))
    }

    fn tmp_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{date}.json.tmp"))
    }

    /// Persist a session atomically
    ///
    /// The whole document is written to a temp file in the same directory and
    /// renamed over the canonical path, so a crash mid-write never leaves a
    /// half-written file where `load` will find it. The timestamp invariant is
    /// enforced before serialization.
    pub fn save(&self, session: &mut Session) -> CoreResult<()> {
        session.touch();
        session.repair_timestamps();

        let tmp = self.tmp_path(session.date);
        let path = self.session_path(session.date);

        let json = serde_json::to_string_pretty(session)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;

        debug!(date = %session.date, state = %session.state, "saved session");
        Ok(())
    }

    /// Load the session for a date
    ///
    /// Returns `Ok(None)` when no session exists. A corrupt document is moved
    /// aside with a timestamp suffix for forensic recovery, then `conversation`
    /// and `plan` are salvaged if those sub-documents parse independently;
    /// otherwise the caller gets a fresh session. Either way the outcome
    /// carries a [`RecoveryEvent`] instead of an error.
    pub fn load(&self, date: NaiveDate) -> CoreResult<Option<LoadOutcome>> {
        let path = self.session_path(date);
        if !path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&path)?;

        match serde_json::from_str::<Session>(&raw) {
            Ok(mut session) => {
                let recovered = if session.repair_timestamps() {
                    None
                } else {
                    // Write the repair through so the next load is clean
                    self.save(&mut session)?;
                    Some(RecoveryEvent::ClockRepaired)
                };
                Ok(Some(LoadOutcome { session, recovered }))
            }
            Err(e) => {
                warn!(date = %date, error = %e, "session document failed to parse, recovering");
                let corrupt_path = self.quarantine(&path, date)?;
                let outcome = self.salvage(date, &raw, corrupt_path);
                Ok(Some(outcome))
            }
        }
    }

    /// Move a corrupt file aside with a timestamp suffix
    fn quarantine(&self, path: &Path, date: NaiveDate) -> CoreResult<PathBuf> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let corrupt_path = self.dir.join(format!("{date}.corrupted.{stamp}.json"));
        fs::rename(path, &corrupt_path)?;
        warn!(corrupt_path = %corrupt_path.display(), "quarantined corrupt session file");
        Ok(corrupt_path)
    }

    /// Best-effort salvage of conversation and plan sub-documents
    fn salvage(&self, date: NaiveDate, raw: &str, corrupt_path: PathBuf) -> LoadOutcome {
        let mut session = Session::new(date);
        let mut salvaged = false;

        if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
            if let Some(conversation) = value
                .get("conversation")
                .and_then(|v| serde_json::from_value::<ConversationLog>(v.clone()).ok())
                && !conversation.is_empty()
            {
                info!(date = %date, messages = conversation.len(), "salvaged conversation log");
                session.conversation = conversation;
                salvaged = true;
            }

            if let Some(plan) = value
                .get("plan")
                .and_then(|v| serde_json::from_value::<Option<Plan>>(v.clone()).ok())
                .flatten()
            {
                info!(date = %date, items = plan.schedule.len(), "salvaged plan");
                // A salvaged plan puts the session back into the feedback
                // state so the user can accept or revise it.
                session.plan = Some(plan);
                session.state = SessionState::Feedback;
                salvaged = true;
            }

            if let Some(goal) = value.get("goal").and_then(|v| v.as_str()) {
                session.set_goal(goal);
            }
        }

        let recovered = if salvaged {
            Some(RecoveryEvent::Salvaged { corrupt_path })
        } else {
            Some(RecoveryEvent::Reset { corrupt_path })
        };

        LoadOutcome { session, recovered }
    }

    /// List sessions as lightweight metadata, most recent date first
    pub fn list(&self) -> CoreResult<Vec<SessionSummary>> {
        let mut summaries = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            if !name.ends_with(".json") || name.contains(".corrupted.") || name.ends_with(".tmp") {
                continue;
            }

            let raw = match fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable session file");
                    continue;
                }
            };

            match serde_json::from_str::<SummaryDoc>(&raw) {
                Ok(doc) => {
                    let (has_plan, completion_rate) = match &doc.plan {
                        Some(plan) if !plan.schedule.is_empty() => {
                            let completed = plan
                                .schedule
                                .iter()
                                .filter(|item| item.status == TaskStatus::Completed)
                                .count();
                            (true, completed as f64 / plan.schedule.len() as f64)
                        }
                        Some(_) => (true, 0.0),
                        None => (false, 0.0),
                    };
                    summaries.push(SessionSummary {
                        date: doc.date,
                        state: doc.state,
                        has_plan,
                        completion_rate,
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unparseable session file in listing");
                }
            }
        }

        summaries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(summaries)
    }

    /// Delete a session document; returns whether one existed
    pub fn delete(&self, date: NaiveDate) -> CoreResult<bool> {
        let path = self.session_path(date);
        if path.exists() {
            fs::remove_file(&path)?;
            info!(date = %date, "deleted session");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Remove temp files left behind by an abnormal termination
    fn purge_stale_tmp(&self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "could not scan for stale temp files");
                return;
            }
        };

        let mut purged = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|ext| ext == "tmp").unwrap_or(false) {
                let stale = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|mtime| mtime.elapsed().ok())
                    .map(|age| age > STALE_TMP_AGE)
                    .unwrap_or(false);

                if stale && fs::remove_file(&path).is_ok() {
                    purged += 1;
                }
            }
        }

        if purged > 0 {
            info!(purged, "purged stale temp files from previous run");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScheduleItem;
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()
    }

    fn store() -> (TempDir, SessionStore) {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::open(temp.path()).unwrap();
        (temp, store)
    }

    #[test]
    fn test_save_load_roundtrip() {
        let (_temp, store) = store();

        let mut session = Session::new(date());
        session.set_goal("Ship the release");
        store.save(&mut session).unwrap();

        let outcome = store.load(date()).unwrap().unwrap();
        assert_eq!(outcome.session.goal, "Ship the release");
        assert!(outcome.recovered.is_none());
        assert!(outcome.session.last_updated >= outcome.session.created_at);
    }

    #[test]
    fn test_load_missing_returns_none() {
        let (_temp, store) = store();
        assert!(store.load(date()).unwrap().is_none());
    }

    #[test]
    fn test_save_leaves_no_tmp_behind() {
        let (temp, store) = store();

        let mut session = Session::new(date());
        store.save(&mut session).unwrap();

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .flatten()
            .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_crash_between_tmp_write_and_rename() {
        // Simulate a process killed after writing the temp file: the canonical
        // file from the previous save must load intact.
        let (temp, store) = store();

        let mut session = Session::new(date());
        session.set_goal("First save");
        store.save(&mut session).unwrap();

        let tmp = temp.path().join(format!("{}.json.tmp", date()));
        fs::write(&tmp, "{ this is half-writ").unwrap();

        let outcome = store.load(date()).unwrap().unwrap();
        assert_eq!(outcome.session.goal, "First save");
        assert!(outcome.recovered.is_none());
    }

    #[test]
    fn test_corrupt_file_quarantined_and_reset() {
        let (temp, store) = store();

        let path = temp.path().join(format!("{}.json", date()));
        fs::write(&path, "not json at all").unwrap();

        let outcome = store.load(date()).unwrap().unwrap();
        assert!(matches!(outcome.recovered, Some(RecoveryEvent::Reset { .. })));
        assert_eq!(outcome.session.state, SessionState::Idle);

        // Original file moved aside for forensics
        let corrupted: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupted."))
            .collect();
        assert_eq!(corrupted.len(), 1);
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_salvages_conversation_and_plan() {
        let (temp, store) = store();

        // Structurally broken session (state is garbage) whose conversation
        // and plan sub-documents still parse on their own
        let doc = serde_json::json!({
            "date": "2026-08-07",
            "state": "definitely-not-a-state",
            "goal": "Ship it",
            "conversation": {
                "messages": [
                    { "role": "user", "content": "Plan my day", "timestamp": "2026-08-07T08:00:00Z" }
                ]
            },
            "plan": {
                "schedule": [ { "time": "09:00-10:00", "task": "Write report" } ],
                "priorities": ["report"],
                "notes": ""
            }
        });
        let path = temp.path().join(format!("{}.json", date()));
        fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

        let outcome = store.load(date()).unwrap().unwrap();
        assert!(matches!(outcome.recovered, Some(RecoveryEvent::Salvaged { .. })));

        let session = outcome.session;
        assert_eq!(session.conversation.len(), 1);
        assert_eq!(session.goal, "Ship it");
        assert_eq!(session.state, SessionState::Feedback);
        assert_eq!(session.plan.unwrap().schedule.len(), 1);
    }

    #[test]
    fn test_clock_corruption_repaired_on_load() {
        let (temp, store) = store();

        let mut session = Session::new(date());
        session.last_updated = session.created_at - ChronoDuration::hours(2);
        // Write the inconsistent document directly, bypassing save()'s repair
        let path = temp.path().join(format!("{}.json", date()));
        fs::write(&path, serde_json::to_string_pretty(&session).unwrap()).unwrap();

        let outcome = store.load(date()).unwrap().unwrap();
        assert_eq!(outcome.recovered, Some(RecoveryEvent::ClockRepaired));
        assert!(outcome.session.last_updated >= outcome.session.created_at);

        // Repair was persisted: second load is clean
        let again = store.load(date()).unwrap().unwrap();
        assert!(again.recovered.is_none());
    }

    #[test]
    fn test_list_skips_corrupted_and_reports_completion() {
        let (temp, store) = store();

        let mut session = Session::new(date());
        let mut plan = Plan::default();
        plan.schedule = vec![
            ScheduleItem::new("09:00-10:00", "a"),
            ScheduleItem::new("10:00-11:00", "b"),
        ];
        plan.schedule[0].status = TaskStatus::Completed;
        session.plan = Some(plan);
        store.save(&mut session).unwrap();

        let other = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        let mut empty = Session::new(other);
        store.save(&mut empty).unwrap();

        fs::write(temp.path().join("2026-08-06.corrupted.20260806_120000.json"), "junk").unwrap();

        let summaries = store.list().unwrap();
        assert_eq!(summaries.len(), 2);
        // Most recent first
        assert_eq!(summaries[0].date, other);
        assert!(!summaries[0].has_plan);
        assert_eq!(summaries[1].date, date());
        assert!((summaries[1].completion_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stale_tmp_purged_on_open_fresh_kept() {
        let temp = TempDir::new().unwrap();

        let stale = temp.path().join("2026-08-01.json.tmp");
        fs::write(&stale, "{}").unwrap();
        let old = std::time::SystemTime::now() - Duration::from_secs(2 * 60 * 60);
        let file = fs::File::options().write(true).open(&stale).unwrap();
        file.set_modified(old).unwrap();
        drop(file);

        let fresh = temp.path().join("2026-08-07.json.tmp");
        fs::write(&fresh, "{}").unwrap();

        let _store = SessionStore::open(temp.path()).unwrap();

        assert!(!stale.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn test_delete() {
        let (_temp, store) = store();

        let mut session = Session::new(date());
        store.save(&mut session).unwrap();

        assert!(store.delete(date()).unwrap());
        assert!(!store.delete(date()).unwrap());
        assert!(store.load(date()).unwrap().is_none());
    }
}
