use crate::model::profile::UserProfile;
use crate::model::task::{Task, new_local_id};
use crate::ops::merge::merge_records;

use super::cache::{CacheError, LocalCache};
use super::remote::RemoteStore;

/// Where a write ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Synced,
    /// The remote was unreachable; the record lives in the local cache
    /// until `sync_pending` pushes it.
    StoredLocally,
}

impl SaveOutcome {
    pub fn label(self) -> &'static str {
        match self {
            SaveOutcome::Synced => "synced",
            SaveOutcome::StoredLocally => "stored locally",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("a task cannot link to itself")]
    SelfLink,
    #[error("record store unavailable: {0}")]
    RemoteRequired(String),
}

/// Task records for one user, backed by the remote store with the local
/// cache as fallback. Every write lands in the cache; remote failures are
/// logged and reported as `SaveOutcome::StoredLocally`.
pub struct TaskRepository<R: RemoteStore> {
    remote: R,
    cache: LocalCache,
    user_id: String,
}

impl<R: RemoteStore> TaskRepository<R> {
    pub fn new(remote: R, cache: LocalCache, user_id: impl Into<String>) -> Self {
        TaskRepository {
            remote,
            cache,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Cached tasks without touching the network
    pub fn cached(&self) -> Vec<Task> {
        self.cache.load_tasks()
    }

    /// Remote rows merged with the cache, newest first. The merged list
    /// becomes the new cache content.
    pub async fn fetch_all(&self) -> Result<Vec<Task>, RepoError> {
        let remote = match self.remote.fetch_tasks(&self.user_id).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "remote fetch failed, using cache only");
                Vec::new()
            }
        };
        let merged = self.cache.update_tasks(|tasks| {
            *tasks = merge_records(remote, std::mem::take(tasks));
            tasks.clone()
        })?;
        Ok(merged)
    }

    /// Insert a new task. Offline inserts get a `local-` id.
    pub async fn create(&self, mut task: Task) -> Result<(Task, SaveOutcome), RepoError> {
        task.user_id = self.user_id.clone();
        let (stored, outcome) = match self.remote.insert_task(&task).await {
            Ok(stored) => (stored, SaveOutcome::Synced),
            Err(e) => {
                tracing::warn!(error = %e, title = %task.title, "insert failed, keeping task locally");
                if !task.is_local() {
                    task.id = new_local_id();
                }
                (task, SaveOutcome::StoredLocally)
            }
        };
        self.cache.update_tasks(|tasks| {
            tasks.retain(|t| t.id != stored.id);
            tasks.insert(0, stored.clone());
        })?;
        Ok((stored, outcome))
    }

    /// Write a changed task. Bumps its revision so the edit survives a merge
    /// with an older remote copy.
    pub async fn update(&self, mut task: Task) -> Result<(Task, SaveOutcome), RepoError> {
        task.touch();
        self.upsert_cached(&task)?;
        let outcome = self.push(&task).await;
        Ok((task, outcome))
    }

    pub async fn delete(&self, id: &str) -> Result<SaveOutcome, RepoError> {
        let found = self.cache.update_tasks(|tasks| {
            let before = tasks.len();
            tasks.retain(|t| t.id != id);
            for task in tasks.iter_mut() {
                task.connections.shift_remove(id);
            }
            tasks.len() != before
        })?;
        if !found {
            return Err(RepoError::NotFound(id.to_string()));
        }

        if id.starts_with(crate::model::task::LOCAL_ID_PREFIX) {
            return Ok(SaveOutcome::StoredLocally);
        }
        match self.remote.delete_task(id).await {
            Ok(()) => Ok(SaveOutcome::Synced),
            Err(e) => {
                tracing::warn!(error = %e, id, "remote delete failed");
                Ok(SaveOutcome::StoredLocally)
            }
        }
    }

    /// Persist a canvas position (called once per drag)
    pub async fn save_position(
        &self,
        id: &str,
        x: f64,
        y: f64,
    ) -> Result<(Task, SaveOutcome), RepoError> {
        let mut task = self.get(id)?;
        task.set_position(x, y);
        self.update(task).await
    }

    /// Add a directed link `source → target`. Returns `None` when the link
    /// already existed.
    pub async fn connect(
        &self,
        source: &str,
        target: &str,
    ) -> Result<Option<SaveOutcome>, RepoError> {
        if source == target {
            return Err(RepoError::SelfLink);
        }
        let mut task = self.get(source)?;
        if !task.connections.insert(target.to_string()) {
            return Ok(None);
        }
        let (_, outcome) = self.update(task).await?;
        Ok(Some(outcome))
    }

    pub async fn disconnect(&self, source: &str, target: &str) -> Result<Option<SaveOutcome>, RepoError> {
        let mut task = self.get(source)?;
        if !task.connections.shift_remove(target) {
            return Ok(None);
        }
        let (_, outcome) = self.update(task).await?;
        Ok(Some(outcome))
    }

    /// Push every `local-` task to the remote. Links pointing at a pushed
    /// task are rewritten to its new id. Returns how many were pushed.
    pub async fn sync_pending(&self) -> Result<usize, RepoError> {
        let pending: Vec<Task> = self
            .cache
            .load_tasks()
            .into_iter()
            .filter(|t| t.is_local())
            .collect();
        // (old id, stored row)
        let mut renamed: Vec<(String, Task)> = Vec::new();

        for task in &pending {
            match self.remote.insert_task(task).await {
                Ok(stored) => renamed.push((task.id.clone(), stored)),
                Err(e) => {
                    tracing::warn!(error = %e, "sync stopped, remote unavailable");
                    break;
                }
            }
        }
        if renamed.is_empty() {
            return Ok(0);
        }

        // Relink against the file as it is now, not the pre-insert snapshot
        let relinked = self.cache.update_tasks(|tasks| {
            for (old, stored) in &renamed {
                if let Some(slot) = tasks.iter_mut().find(|t| &t.id == old) {
                    *slot = stored.clone();
                }
            }
            let mut relinked = Vec::new();
            for task in tasks.iter_mut() {
                let mut changed = false;
                for (old, stored) in &renamed {
                    if let Some(idx) = task.connections.get_index_of(old.as_str()) {
                        task.connections.shift_remove_index(idx);
                        task.connections.shift_insert(idx, stored.id.clone());
                        changed = true;
                    }
                }
                if changed {
                    task.touch();
                    relinked.push(task.clone());
                }
            }
            relinked
        })?;
        for task in &relinked {
            self.push(task).await;
        }
        tracing::info!(count = renamed.len(), "pushed local tasks");
        Ok(renamed.len())
    }

    /// Cached profile, refreshed from the remote when reachable
    pub async fn load_profile(&self) -> Result<UserProfile, RepoError> {
        match self.remote.fetch_profile(&self.user_id).await {
            Ok(Some(profile)) => {
                self.cache.save_profile(&profile)?;
                Ok(profile)
            }
            Ok(None) => Ok(self.local_profile()),
            Err(e) => {
                tracing::warn!(error = %e, "profile fetch failed, using cache");
                Ok(self.local_profile())
            }
        }
    }

    pub async fn save_profile(&self, profile: &UserProfile) -> Result<SaveOutcome, RepoError> {
        self.cache.save_profile(profile)?;
        match self.remote.upsert_profile(profile).await {
            Ok(()) => Ok(SaveOutcome::Synced),
            Err(e) => {
                tracing::warn!(error = %e, "profile upsert failed");
                Ok(SaveOutcome::StoredLocally)
            }
        }
    }

    /// Upload an avatar image and point the profile at it. Needs the remote.
    pub async fn upload_avatar(&self, bytes: Vec<u8>, extension: &str) -> Result<String, RepoError> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        let path = format!("{}/{}.{}", self.user_id, uuid::Uuid::new_v4().simple(), ext);
        let content_type = match ext.as_str() {
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "image/jpeg",
        };
        let url = self
            .remote
            .upload_blob("avatars", &path, bytes, content_type)
            .await
            .map_err(|e| RepoError::RemoteRequired(e.to_string()))?;

        let mut profile = self.local_profile();
        profile.avatar_url = Some(url.clone());
        self.save_profile(&profile).await?;
        Ok(url)
    }

    fn local_profile(&self) -> UserProfile {
        self.cache
            .load_profile()
            .unwrap_or_else(|| UserProfile::new(self.user_id.clone()))
    }

    fn get(&self, id: &str) -> Result<Task, RepoError> {
        self.cache
            .load_tasks()
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    fn upsert_cached(&self, task: &Task) -> Result<(), RepoError> {
        self.cache
            .update_tasks(|tasks| match tasks.iter_mut().find(|t| t.id == task.id) {
                Some(slot) => *slot = task.clone(),
                None => tasks.insert(0, task.clone()),
            })?;
        Ok(())
    }

    async fn push(&self, task: &Task) -> SaveOutcome {
        if task.is_local() {
            return SaveOutcome::StoredLocally;
        }
        match self.remote.update_task(task).await {
            Ok(()) => SaveOutcome::Synced,
            Err(e) => {
                tracing::warn!(error = %e, id = %task.id, "remote update failed");
                SaveOutcome::StoredLocally
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::Category;
    use crate::store::remote::MemoryRemote;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn repo(remote: Arc<MemoryRemote>) -> (TempDir, TaskRepository<Arc<MemoryRemote>>) {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::open(tmp.path()).unwrap();
        (tmp, TaskRepository::new(remote, cache, "u1"))
    }

    fn task(title: &str) -> Task {
        Task::new(String::new(), title.into(), Category::Roadmap)
    }

    #[tokio::test]
    async fn create_online_is_synced() {
        let remote = Arc::new(MemoryRemote::new());
        let (_tmp, repo) = repo(remote.clone());
        let (stored, outcome) = repo.create(task("Build")).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Synced);
        assert!(!stored.is_local());
        assert_eq!(stored.user_id, "u1");
        assert_eq!(remote.tasks().len(), 1);
        assert_eq!(repo.cached().len(), 1);
    }

    #[tokio::test]
    async fn create_offline_falls_back_to_local_id() {
        let remote = Arc::new(MemoryRemote::new());
        remote.set_available(false);
        let (_tmp, repo) = repo(remote.clone());
        let (stored, outcome) = repo.create(task("Build")).await.unwrap();
        assert_eq!(outcome, SaveOutcome::StoredLocally);
        assert!(stored.is_local());
        assert_eq!(repo.cached()[0].id, stored.id);

        // fetch still returns the cached record
        let all = repo.fetch_all().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn fetch_all_merges_remote_and_local() {
        let mut existing = task("Remote");
        existing.id = "r1".into();
        existing.user_id = "u1".into();
        let remote = Arc::new(MemoryRemote::with_tasks(vec![existing]));
        remote.set_available(false);
        let (_tmp, repo) = repo(remote.clone());
        repo.create(task("Local")).await.unwrap();

        remote.set_available(true);
        let all = repo.fetch_all().await.unwrap();
        let titles: Vec<&str> = all.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles.len(), 2);
        assert!(titles.contains(&"Remote"));
        assert!(titles.contains(&"Local"));
    }

    #[tokio::test]
    async fn offline_edit_survives_fetch() {
        let remote = Arc::new(MemoryRemote::new());
        let (_tmp, repo) = repo(remote.clone());
        let (stored, _) = repo.create(task("Old")).await.unwrap();

        remote.set_available(false);
        let mut edited = stored.clone();
        edited.title = "New".into();
        let (_, outcome) = repo.update(edited).await.unwrap();
        assert_eq!(outcome, SaveOutcome::StoredLocally);

        remote.set_available(true);
        let all = repo.fetch_all().await.unwrap();
        assert_eq!(all[0].title, "New");
    }

    #[tokio::test]
    async fn connect_is_idempotent_and_rejects_self() {
        let remote = Arc::new(MemoryRemote::new());
        let (_tmp, repo) = repo(remote.clone());
        let (a, _) = repo.create(task("A")).await.unwrap();
        let (b, _) = repo.create(task("B")).await.unwrap();

        assert_eq!(repo.connect(&a.id, &b.id).await.unwrap(), Some(SaveOutcome::Synced));
        assert_eq!(repo.connect(&a.id, &b.id).await.unwrap(), None);
        assert!(matches!(repo.connect(&a.id, &a.id).await, Err(RepoError::SelfLink)));

        let remote_a = remote.tasks().into_iter().find(|t| t.id == a.id).unwrap();
        assert_eq!(remote_a.connections.len(), 1);
        // links stay directed
        let cached_b = repo.cached().into_iter().find(|t| t.id == b.id).unwrap();
        assert!(cached_b.connections.is_empty());
    }

    #[tokio::test]
    async fn delete_prunes_links() {
        let remote = Arc::new(MemoryRemote::new());
        let (_tmp, repo) = repo(remote.clone());
        let (a, _) = repo.create(task("A")).await.unwrap();
        let (b, _) = repo.create(task("B")).await.unwrap();
        repo.connect(&a.id, &b.id).await.unwrap();

        assert_eq!(repo.delete(&b.id).await.unwrap(), SaveOutcome::Synced);
        let cached = repo.cached();
        assert_eq!(cached.len(), 1);
        assert!(cached[0].connections.is_empty());
        assert!(matches!(repo.delete("nope").await, Err(RepoError::NotFound(_))));
    }

    #[tokio::test]
    async fn save_position_persists_once() {
        let remote = Arc::new(MemoryRemote::new());
        let (_tmp, repo) = repo(remote.clone());
        let (a, _) = repo.create(task("A")).await.unwrap();
        let (moved, _) = repo.save_position(&a.id, 320.0, 140.0).await.unwrap();
        assert_eq!(moved.position(), Some((320.0, 140.0)));
        assert_eq!(moved.revision, a.revision + 1);
        assert_eq!(remote.tasks()[0].position(), Some((320.0, 140.0)));
    }

    #[tokio::test]
    async fn sync_pending_pushes_and_relinks() {
        let remote = Arc::new(MemoryRemote::new());
        remote.set_available(false);
        let (_tmp, repo) = repo(remote.clone());
        let (a, _) = repo.create(task("A")).await.unwrap();
        let (b, _) = repo.create(task("B")).await.unwrap();
        repo.connect(&a.id, &b.id).await.unwrap();

        remote.set_available(true);
        assert_eq!(repo.sync_pending().await.unwrap(), 2);
        let cached = repo.cached();
        assert!(cached.iter().all(|t| !t.is_local()));
        let new_a = cached.iter().find(|t| t.title == "A").unwrap();
        let new_b = cached.iter().find(|t| t.title == "B").unwrap();
        assert!(new_a.connections.contains(&new_b.id));
        assert_eq!(repo.sync_pending().await.unwrap(), 0);

        // The store minted the ids; nothing was inserted twice
        let stored = remote.tasks();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|t| t.id.starts_with("srv-")));
        assert!(new_a.id.starts_with("srv-"));
    }

    #[tokio::test]
    async fn profile_falls_back_to_cache() {
        let remote = Arc::new(MemoryRemote::new());
        let (_tmp, repo) = repo(remote.clone());
        let mut profile = repo.load_profile().await.unwrap();
        assert_eq!(profile.id, "u1");
        profile.username = "rin".into();
        assert_eq!(repo.save_profile(&profile).await.unwrap(), SaveOutcome::Synced);

        remote.set_available(false);
        assert_eq!(repo.load_profile().await.unwrap().username, "rin");
        assert!(matches!(
            repo.upload_avatar(vec![1, 2, 3], "png").await,
            Err(RepoError::RemoteRequired(_))
        ));

        remote.set_available(true);
        let url = repo.upload_avatar(vec![1, 2, 3], ".PNG").await.unwrap();
        assert!(url.starts_with("memory://avatars/u1/"));
        assert!(url.ends_with(".png"));
        assert_eq!(repo.load_profile().await.unwrap().avatar_url, Some(url));
    }
}
