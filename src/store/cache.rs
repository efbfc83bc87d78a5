use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::io::lock::{FileLock, LockError};
use crate::io::workspace_io::atomic_write;
use crate::model::mission::Mission;
use crate::model::profile::UserProfile;
use crate::model::project::Project;
use crate::model::task::Task;
use crate::ops::history::History;

pub const TASKS_FILE: &str = "tasks.json";
pub const MISSIONS_FILE: &str = "missions.json";
pub const PROJECTS_FILE: &str = "projects.json";
pub const PROFILE_FILE: &str = "profile.json";
pub const HISTORY_FILE: &str = "history.json";
pub const AI_KEY_FILE: &str = "ai_key";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not serialize cache record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Per-user JSON cache under `.nova/users/<id>/`.
///
/// Reads never fail: a missing file is an empty collection, matching how the
/// app treats a cold cache. A file that does not parse is renamed to
/// `<name>.corrupt` first, so the next write cannot destroy it. Writes go
/// through a temp file and rename while holding the directory lock.
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    pub fn open(dir: &Path) -> Result<Self, CacheError> {
        fs::create_dir_all(dir).map_err(|source| CacheError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(LocalCache {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load_tasks(&self) -> Vec<Task> {
        self.read_json(TASKS_FILE)
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), CacheError> {
        self.write_json(TASKS_FILE, &tasks)
    }

    /// Load, change and save the task list under one lock, so another
    /// process cannot write between the read and the write. The file is only
    /// rewritten when `f` changed something.
    pub fn update_tasks<T>(&self, f: impl FnOnce(&mut Vec<Task>) -> T) -> Result<T, CacheError> {
        let _lock = FileLock::acquire_default(&self.dir)?;
        let before: Vec<Task> = self.read_json(TASKS_FILE);
        let mut tasks = before.clone();
        let out = f(&mut tasks);
        if tasks != before {
            self.write_unlocked(TASKS_FILE, &serde_json::to_vec_pretty(&tasks)?)?;
        }
        Ok(out)
    }

    pub fn load_projects(&self) -> Vec<Project> {
        self.read_json(PROJECTS_FILE)
    }

    pub fn save_projects(&self, projects: &[Project]) -> Result<(), CacheError> {
        self.write_json(PROJECTS_FILE, &projects)
    }

    pub fn load_missions(&self) -> Vec<Mission> {
        self.read_json(MISSIONS_FILE)
    }

    pub fn save_missions(&self, missions: &[Mission]) -> Result<(), CacheError> {
        self.write_json(MISSIONS_FILE, &missions)
    }

    pub fn load_profile(&self) -> Option<UserProfile> {
        self.read_json(PROFILE_FILE)
    }

    pub fn save_profile(&self, profile: &UserProfile) -> Result<(), CacheError> {
        self.write_json(PROFILE_FILE, profile)
    }

    pub fn load_history(&self) -> History<Vec<Project>> {
        self.read_json(HISTORY_FILE)
    }

    pub fn save_history(&self, history: &History<Vec<Project>>) -> Result<(), CacheError> {
        self.write_json(HISTORY_FILE, history)
    }

    /// The stored model API key, if any
    pub fn ai_key(&self) -> Option<String> {
        let raw = fs::read_to_string(self.dir.join(AI_KEY_FILE)).ok()?;
        let key = raw.trim();
        (!key.is_empty()).then(|| key.to_string())
    }

    pub fn set_ai_key(&self, key: &str) -> Result<(), CacheError> {
        self.write_raw(AI_KEY_FILE, key.trim().as_bytes())
    }

    pub fn clear_ai_key(&self) -> Result<(), CacheError> {
        let path = self.dir.join(AI_KEY_FILE);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Write { path, source }),
        }
    }

    fn read_json<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let path = self.dir.join(name);
        let Ok(text) = fs::read_to_string(&path) else {
            return T::default();
        };
        match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                let aside = self.dir.join(format!("{}.corrupt", name));
                match fs::rename(&path, &aside) {
                    Ok(()) => tracing::warn!(
                        path = %path.display(),
                        moved_to = %aside.display(),
                        error = %e,
                        "unreadable cache file moved aside"
                    ),
                    Err(rename_err) => tracing::error!(
                        path = %path.display(),
                        error = %e,
                        rename_error = %rename_err,
                        "unreadable cache file could not be moved aside"
                    ),
                }
                T::default()
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_raw(name, &bytes)
    }

    fn write_raw(&self, name: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let _lock = FileLock::acquire_default(&self.dir)?;
        self.write_unlocked(name, bytes)
    }

    /// Caller holds the directory lock
    fn write_unlocked(&self, name: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let path = self.dir.join(name);
        atomic_write(&path, bytes).map_err(|source| CacheError::Write { path, source })?;
        tracing::debug!(file = name, bytes = bytes.len(), "cache write");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::Category;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn cache() -> (TempDir, LocalCache) {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::open(&tmp.path().join("users/u1")).unwrap();
        (tmp, cache)
    }

    #[test]
    fn cold_cache_is_empty() {
        let (_tmp, cache) = cache();
        assert!(cache.load_tasks().is_empty());
        assert!(cache.load_projects().is_empty());
        assert!(cache.load_profile().is_none());
        assert!(!cache.load_history().can_undo());
        assert!(cache.ai_key().is_none());
    }

    #[test]
    fn tasks_persist() {
        let (_tmp, cache) = cache();
        let tasks = vec![
            Task::new("t1".into(), "One".into(), Category::Home),
            Task::new("t2".into(), "Two".into(), Category::Custom("Garden".into())),
        ];
        cache.save_tasks(&tasks).unwrap();
        assert_eq!(cache.load_tasks(), tasks);
        assert!(!cache.dir().join(".lock").exists());
    }

    #[test]
    fn malformed_file_is_kept_aside() {
        let (_tmp, cache) = cache();
        let truncated = r#"[{"id":"t1","created_at":"2025-01-01T00:00:00Z","tit"#;
        fs::write(cache.dir().join(TASKS_FILE), truncated).unwrap();
        assert!(cache.load_tasks().is_empty());

        let tasks = vec![Task::new("t2".into(), "Two".into(), Category::Home)];
        cache.save_tasks(&tasks).unwrap();
        assert_eq!(
            fs::read_to_string(cache.dir().join("tasks.json.corrupt")).unwrap(),
            truncated
        );
        assert_eq!(cache.load_tasks(), tasks);
    }

    #[test]
    fn update_tasks_writes_only_changes() {
        let (_tmp, cache) = cache();
        cache
            .save_tasks(&[Task::new("t1".into(), "One".into(), Category::Home)])
            .unwrap();
        let path = cache.dir().join(TASKS_FILE);
        let stamp = fs::metadata(&path).unwrap().modified().unwrap();

        let count = cache.update_tasks(|tasks| tasks.len()).unwrap();
        assert_eq!(count, 1);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), stamp);

        cache
            .update_tasks(|tasks| tasks.push(Task::new("t2".into(), "Two".into(), Category::Home)))
            .unwrap();
        assert_eq!(cache.load_tasks().len(), 2);
        assert!(!cache.dir().join(".lock").exists());
    }

    #[test]
    fn ai_key_is_trimmed_and_clearable() {
        let (_tmp, cache) = cache();
        cache.set_ai_key("  abc123\n").unwrap();
        assert_eq!(cache.ai_key().as_deref(), Some("abc123"));
        cache.clear_ai_key().unwrap();
        cache.clear_ai_key().unwrap();
        assert!(cache.ai_key().is_none());
    }
}
