//! Profile store
//!
//! One JSON document per user key, separate from the per-date session files.
//! Writes use the same temp-file-and-rename discipline as the session store.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::domain::Profile;
use crate::error::CoreResult;

/// File-backed store for user profiles
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn open(dir: impl AsRef<Path>) -> CoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "opened profile store");
        Ok(Self { dir })
    }

    fn profile_path(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{user_id}.json"))
    }

    /// Load a profile, creating the default on first use
    ///
    /// An unreadable profile is replaced by the default with a warning; the
    /// profile is preference data, not precious state, and planning must not
    /// fail because of it.
    pub fn load(&self, user_id: &str) -> CoreResult<Profile> {
        let path = self.profile_path(user_id);

        if !path.exists() {
            info!(user_id, "creating default profile");
            let mut profile = Profile {
                user_id: user_id.to_string(),
                ..Profile::default()
            };
            self.save(&mut profile)?;
            return Ok(profile);
        }

        let raw = fs::read_to_string(&path)?;
        match serde_json::from_str::<Profile>(&raw) {
            Ok(profile) => Ok(profile),
            Err(e) => {
                warn!(user_id, error = %e, "profile failed to parse, using default");
                Ok(Profile {
                    user_id: user_id.to_string(),
                    ..Profile::default()
                })
            }
        }
    }

    /// Persist a profile atomically
    pub fn save(&self, profile: &mut Profile) -> CoreResult<()> {
        profile.touch();

        let path = self.profile_path(&profile.user_id);
        let tmp = self.dir.join(format!("{}.json.tmp", profile.user_id));

        let json = serde_json::to_string_pretty(profile)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;

        debug!(user_id = %profile.user_id, "saved profile");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_creates_default() {
        let temp = TempDir::new().unwrap();
        let store = ProfileStore::open(temp.path()).unwrap();

        let profile = store.load("default").unwrap();
        assert_eq!(profile.user_id, "default");
        assert!(temp.path().join("default.json").exists());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = ProfileStore::open(temp.path()).unwrap();

        let mut profile = store.load("default").unwrap();
        profile.top_priorities.push("ship v1".to_string());
        profile.job_role = Some("engineer".to_string());
        store.save(&mut profile).unwrap();

        let back = store.load("default").unwrap();
        assert_eq!(back.top_priorities, vec!["ship v1"]);
        assert_eq!(back.job_role.as_deref(), Some("engineer"));
    }

    #[test]
    fn test_unparseable_profile_falls_back_to_default() {
        let temp = TempDir::new().unwrap();
        let store = ProfileStore::open(temp.path()).unwrap();

        std::fs::write(temp.path().join("default.json"), "garbage").unwrap();

        let profile = store.load("default").unwrap();
        assert!(profile.top_priorities.is_empty());
    }
}
