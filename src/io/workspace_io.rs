use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::model::config::NovaConfig;

pub const NOVA_DIR: &str = ".nova";
pub const CONFIG_FILE: &str = "nova.toml";

pub const ENV_SUPABASE_URL: &str = "NOVA_SUPABASE_URL";
pub const ENV_SUPABASE_KEY: &str = "NOVA_SUPABASE_KEY";
pub const ENV_GEMINI_KEY: &str = "NOVA_GEMINI_API_KEY";

/// Error type for workspace I/O
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("not a nova workspace: no .nova/ directory found (run `nova init`)")]
    NotAWorkspace,
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse nova.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("could not edit nova.toml: {0}")]
    ConfigEditError(#[from] toml_edit::TomlError),
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
}

/// Filesystem locations of one workspace
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub nova_dir: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: &Path) -> Self {
        WorkspacePaths {
            root: root.to_path_buf(),
            nova_dir: root.join(NOVA_DIR),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.nova_dir.join(CONFIG_FILE)
    }

    /// Per-user cache directory
    pub fn user_dir(&self, user_id: &str) -> PathBuf {
        self.nova_dir.join("users").join(sanitize_user_id(user_id))
    }

    pub fn log_path(&self) -> PathBuf {
        self.nova_dir.join("nova.log")
    }
}

/// Keep user ids usable as a single path component
fn sanitize_user_id(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '@' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "_".to_string(),
        s => s.to_string(),
    }
}

/// Walk up from `start` looking for `.nova/nova.toml`.
pub fn discover_workspace(start: &Path) -> Result<WorkspacePaths, WorkspaceError> {
    let mut current = start.to_path_buf();
    loop {
        let nova_dir = current.join(NOVA_DIR);
        if nova_dir.is_dir() && nova_dir.join(CONFIG_FILE).exists() {
            return Ok(WorkspacePaths::new(&current));
        }
        if !current.pop() {
            return Err(WorkspaceError::NotAWorkspace);
        }
    }
}

/// Load `nova.toml` and apply environment overrides.
pub fn load_config(paths: &WorkspacePaths) -> Result<NovaConfig, WorkspaceError> {
    let (mut config, _) = read_config(paths)?;
    apply_env_overrides(&mut config, |k| std::env::var(k).ok());
    Ok(config)
}

/// Read the config, returning both the parsed value and the raw
/// toml_edit document for round-trip-safe editing.
pub fn read_config(
    paths: &WorkspacePaths,
) -> Result<(NovaConfig, toml_edit::DocumentMut), WorkspaceError> {
    let config_path = paths.config_path();
    let text = fs::read_to_string(&config_path).map_err(|source| WorkspaceError::ReadError {
        path: config_path.clone(),
        source,
    })?;
    let config: NovaConfig = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

/// Write the config document back, preserving comments and layout.
pub fn write_config(paths: &WorkspacePaths, doc: &toml_edit::DocumentMut) -> Result<(), WorkspaceError> {
    atomic_write(&paths.config_path(), doc.to_string().as_bytes())?;
    Ok(())
}

/// Environment variables win over the file for remote credentials.
pub fn apply_env_overrides(config: &mut NovaConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(url) = env(ENV_SUPABASE_URL).filter(|v| !v.trim().is_empty()) {
        config.remote.url = Some(url);
    }
    if let Some(key) = env(ENV_SUPABASE_KEY).filter(|v| !v.trim().is_empty()) {
        config.remote.anon_key = Some(key);
    }
}

/// Set `[remote] url` and `anon_key`
pub fn set_remote(doc: &mut toml_edit::DocumentMut, url: &str, anon_key: Option<&str>) {
    ensure_table(doc, "remote");
    doc["remote"]["url"] = toml_edit::value(url);
    if let Some(key) = anon_key {
        doc["remote"]["anon_key"] = toml_edit::value(key);
    }
}

/// Drop the remote connection, leaving poll settings alone
pub fn clear_remote(doc: &mut toml_edit::DocumentMut) {
    if let Some(table) = doc.get_mut("remote").and_then(|t| t.as_table_mut()) {
        table.remove("url");
        table.remove("anon_key");
        table.remove("access_token");
    }
}

/// Set `[user] id` and optionally `email`
pub fn set_user(doc: &mut toml_edit::DocumentMut, id: &str, email: Option<&str>) {
    ensure_table(doc, "user");
    doc["user"]["id"] = toml_edit::value(id);
    if let Some(email) = email {
        doc["user"]["email"] = toml_edit::value(email);
    }
}

fn ensure_table(doc: &mut toml_edit::DocumentMut, key: &str) {
    if !doc.contains_key(key) {
        doc[key] = toml_edit::Item::Table(toml_edit::Table::new());
    }
}

/// Write via a temp file in the same directory, then rename over `path`.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"# my workspace
[user]
id = "u-1"

[remote]
# polled every few seconds
poll_secs = 5
"#;

    fn workspace(config: &str) -> (TempDir, WorkspacePaths) {
        let tmp = TempDir::new().unwrap();
        let paths = WorkspacePaths::new(tmp.path());
        fs::create_dir_all(&paths.nova_dir).unwrap();
        fs::write(paths.config_path(), config).unwrap();
        (tmp, paths)
    }

    #[test]
    fn discover_walks_up() {
        let (tmp, _) = workspace(SAMPLE);
        let nested = tmp.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        let found = discover_workspace(&nested).unwrap();
        assert_eq!(found.root, tmp.path());
    }

    #[test]
    fn discover_fails_outside_workspace() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            discover_workspace(tmp.path()),
            Err(WorkspaceError::NotAWorkspace)
        ));
    }

    #[test]
    fn config_round_trips_untouched() {
        let (_tmp, paths) = workspace(SAMPLE);
        let (config, doc) = read_config(&paths).unwrap();
        assert_eq!(config.user.id, "u-1");
        assert_eq!(config.remote.poll_secs, 5);
        write_config(&paths, &doc).unwrap();
        assert_eq!(fs::read_to_string(paths.config_path()).unwrap(), SAMPLE);
    }

    #[test]
    fn set_remote_keeps_comments() {
        let mut doc: toml_edit::DocumentMut = SAMPLE.parse().unwrap();
        set_remote(&mut doc, "https://x.supabase.co", Some("anon"));
        let text = doc.to_string();
        assert!(text.contains("# polled every few seconds"));
        assert!(text.contains("url = \"https://x.supabase.co\""));
        assert!(text.contains("anon_key = \"anon\""));

        clear_remote(&mut doc);
        let config: NovaConfig = toml::from_str(&doc.to_string()).unwrap();
        assert!(config.remote.url.is_none());
        assert_eq!(config.remote.poll_secs, 5);
    }

    #[test]
    fn set_user_creates_table() {
        let mut doc = toml_edit::DocumentMut::new();
        set_user(&mut doc, "u-9", Some("a@b.c"));
        let config: NovaConfig = toml::from_str(&doc.to_string()).unwrap();
        assert_eq!(config.user.id, "u-9");
        assert_eq!(config.user.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn env_overrides_remote() {
        let mut config = NovaConfig::default();
        apply_env_overrides(&mut config, |k| match k {
            ENV_SUPABASE_URL => Some("https://env.supabase.co".into()),
            ENV_SUPABASE_KEY => Some("  ".into()),
            _ => None,
        });
        assert_eq!(config.remote.url.as_deref(), Some("https://env.supabase.co"));
        assert!(config.remote.anon_key.is_none());
    }

    #[test]
    fn user_dir_is_one_component() {
        let paths = WorkspacePaths::new(Path::new("/w"));
        assert_eq!(paths.user_dir("abc-123"), Path::new("/w/.nova/users/abc-123"));
        assert_eq!(paths.user_dir("../evil"), Path::new("/w/.nova/users/_evil"));
    }

    #[test]
    fn atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f.json");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }
}
