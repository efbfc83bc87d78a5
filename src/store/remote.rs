use std::sync::Mutex;

use serde::de::DeserializeOwned;

use crate::model::config::RemoteConfig;
use crate::model::profile::UserProfile;
use crate::model::task::Task;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("record store is not configured")]
    Offline,
    #[error("record store returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("record store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("record store returned no row")]
    EmptyResponse,
    #[error("could not encode row: {0}")]
    Encode(#[from] serde_json::Error),
}

/// JSON body for a task row. `revision` stays on this client, and inserts
/// carry no id so the store assigns one.
pub fn row_body(task: &Task, insert: bool) -> Result<serde_json::Value, RemoteError> {
    let mut body = serde_json::to_value(task)?;
    if let Some(fields) = body.as_object_mut() {
        fields.remove("revision");
        if insert {
            fields.remove("id");
        }
    }
    Ok(body)
}

/// The hosted record and blob store.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// All task rows owned by `user_id`, newest first
    async fn fetch_tasks(&self, user_id: &str) -> Result<Vec<Task>, RemoteError>;

    /// Insert a row and return it as stored
    async fn insert_task(&self, task: &Task) -> Result<Task, RemoteError>;

    /// Replace the row with `task.id`
    async fn update_task(&self, task: &Task) -> Result<(), RemoteError>;

    async fn delete_task(&self, id: &str) -> Result<(), RemoteError>;

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, RemoteError>;

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), RemoteError>;

    /// Store a blob and return its public URL
    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, RemoteError>;
}

#[async_trait::async_trait]
impl<T: RemoteStore + ?Sized> RemoteStore for std::sync::Arc<T> {
    async fn fetch_tasks(&self, user_id: &str) -> Result<Vec<Task>, RemoteError> {
        (**self).fetch_tasks(user_id).await
    }

    async fn insert_task(&self, task: &Task) -> Result<Task, RemoteError> {
        (**self).insert_task(task).await
    }

    async fn update_task(&self, task: &Task) -> Result<(), RemoteError> {
        (**self).update_task(task).await
    }

    async fn delete_task(&self, id: &str) -> Result<(), RemoteError> {
        (**self).delete_task(id).await
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, RemoteError> {
        (**self).fetch_profile(user_id).await
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), RemoteError> {
        (**self).upsert_profile(profile).await
    }

    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, RemoteError> {
        (**self).upload_blob(bucket, path, bytes, content_type).await
    }
}

/// PostgREST + storage client for a Supabase project
pub struct SupabaseStore {
    base_url: String,
    api_key: String,
    bearer: String,
    http: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: &str, access_token: Option<&str>) -> Self {
        SupabaseStore {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bearer: access_token.unwrap_or(api_key).to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn rest(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(RemoteError::Http {
        status: status.as_u16(),
        body,
    })
}

async fn rows<T: DeserializeOwned>(response: reqwest::Response) -> Result<Vec<T>, RemoteError> {
    Ok(check(response).await?.json::<Vec<T>>().await?)
}

#[async_trait::async_trait]
impl RemoteStore for SupabaseStore {
    async fn fetch_tasks(&self, user_id: &str) -> Result<Vec<Task>, RemoteError> {
        let response = self
            .rest(reqwest::Method::GET, "tasks")
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;
        rows(response).await
    }

    async fn insert_task(&self, task: &Task) -> Result<Task, RemoteError> {
        let response = self
            .rest(reqwest::Method::POST, "tasks")
            .header("Prefer", "return=representation")
            .json(&row_body(task, true)?)
            .send()
            .await?;
        rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(RemoteError::EmptyResponse)
    }

    async fn update_task(&self, task: &Task) -> Result<(), RemoteError> {
        let response = self
            .rest(reqwest::Method::PATCH, "tasks")
            .query(&[("id", format!("eq.{}", task.id))])
            .json(&row_body(task, false)?)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<(), RemoteError> {
        let response = self
            .rest(reqwest::Method::DELETE, "tasks")
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, RemoteError> {
        let response = self
            .rest(reqwest::Method::GET, "profiles")
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", user_id))])
            .send()
            .await?;
        Ok(rows(response).await?.into_iter().next())
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), RemoteError> {
        let response = self
            .rest(reqwest::Method::POST, "profiles")
            .header("Prefer", "resolution=merge-duplicates")
            .json(profile)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, RemoteError> {
        let response = self
            .http
            .post(format!(
                "{}/storage/v1/object/{}/{}",
                self.base_url, bucket, path
            ))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        check(response).await?;
        Ok(self.public_url(bucket, path))
    }
}

/// The configured remote, or none at all
pub enum Remote {
    Supabase(SupabaseStore),
    Offline,
}

impl Remote {
    pub fn from_config(config: &RemoteConfig) -> Remote {
        match (&config.url, &config.anon_key) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Remote::Supabase(
                SupabaseStore::new(url, key, config.access_token.as_deref()),
            ),
            _ => Remote::Offline,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, Remote::Offline)
    }
}

#[async_trait::async_trait]
impl RemoteStore for Remote {
    async fn fetch_tasks(&self, user_id: &str) -> Result<Vec<Task>, RemoteError> {
        match self {
            Remote::Supabase(s) => s.fetch_tasks(user_id).await,
            Remote::Offline => Err(RemoteError::Offline),
        }
    }

    async fn insert_task(&self, task: &Task) -> Result<Task, RemoteError> {
        match self {
            Remote::Supabase(s) => s.insert_task(task).await,
            Remote::Offline => Err(RemoteError::Offline),
        }
    }

    async fn update_task(&self, task: &Task) -> Result<(), RemoteError> {
        match self {
            Remote::Supabase(s) => s.update_task(task).await,
            Remote::Offline => Err(RemoteError::Offline),
        }
    }

    async fn delete_task(&self, id: &str) -> Result<(), RemoteError> {
        match self {
            Remote::Supabase(s) => s.delete_task(id).await,
            Remote::Offline => Err(RemoteError::Offline),
        }
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, RemoteError> {
        match self {
            Remote::Supabase(s) => s.fetch_profile(user_id).await,
            Remote::Offline => Err(RemoteError::Offline),
        }
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), RemoteError> {
        match self {
            Remote::Supabase(s) => s.upsert_profile(profile).await,
            Remote::Offline => Err(RemoteError::Offline),
        }
    }

    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, RemoteError> {
        match self {
            Remote::Supabase(s) => s.upload_blob(bucket, path, bytes, content_type).await,
            Remote::Offline => Err(RemoteError::Offline),
        }
    }
}

/// In-process store for tests. Rows go through the same JSON body as
/// `SupabaseStore`, and inserts get store-assigned `srv-` ids.
/// `set_available(false)` makes every call fail like a dropped connection.
#[derive(Default)]
pub struct MemoryRemote {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    tasks: Vec<Task>,
    profiles: Vec<UserProfile>,
    blobs: Vec<(String, Vec<u8>)>,
    unavailable: bool,
    next_id: u64,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let remote = Self::new();
        remote.lock().tasks = tasks;
        remote
    }

    pub fn set_available(&self, available: bool) {
        self.lock().unavailable = !available;
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    /// Apply a change as if another client made it
    pub fn edit(&self, f: impl FnOnce(&mut Vec<Task>)) {
        f(&mut self.lock().tasks);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn available(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, RemoteError> {
        let state = self.lock();
        if state.unavailable {
            return Err(RemoteError::Http {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(state)
    }
}

#[async_trait::async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch_tasks(&self, user_id: &str) -> Result<Vec<Task>, RemoteError> {
        let state = self.available()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn insert_task(&self, task: &Task) -> Result<Task, RemoteError> {
        let mut body = row_body(task, true)?;
        let mut state = self.available()?;
        state.next_id += 1;
        body["id"] = serde_json::Value::String(format!("srv-{}", state.next_id));
        let stored: Task = serde_json::from_value(body)?;
        state.tasks.push(stored.clone());
        Ok(stored)
    }

    async fn update_task(&self, task: &Task) -> Result<(), RemoteError> {
        let stored: Task = serde_json::from_value(row_body(task, false)?)?;
        let mut state = self.available()?;
        if let Some(existing) = state.tasks.iter_mut().find(|t| t.id == task.id) {
            *existing = stored;
        }
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<(), RemoteError> {
        self.available()?.tasks.retain(|t| t.id != id);
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, RemoteError> {
        let state = self.available()?;
        Ok(state.profiles.iter().find(|p| p.id == user_id).cloned())
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), RemoteError> {
        let mut state = self.available()?;
        state.profiles.retain(|p| p.id != profile.id);
        state.profiles.push(profile.clone());
        Ok(())
    }

    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, RemoteError> {
        let key = format!("{}/{}", bucket, path);
        self.available()?.blobs.push((key.clone(), bytes));
        Ok(format!("memory://{}", key))
    }
}
