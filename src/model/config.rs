use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration from `.nova/nova.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NovaConfig {
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub progression: ProgressionConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Owner of every record in this workspace
    #[serde(default = "default_user_id")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Default for UserConfig {
    fn default() -> Self {
        UserConfig {
            id: default_user_id(),
            email: None,
        }
    }
}

fn default_user_id() -> String {
    "local".to_string()
}

/// Record store connection. Absent url means offline mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub anon_key: Option<String>,
    /// Session token; falls back to the anon key when absent
    #[serde(default)]
    pub access_token: Option<String>,
    /// Seconds between change-feed polls
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            url: None,
            anon_key: None,
            access_token: None,
            poll_secs: default_poll_secs(),
        }
    }
}

fn default_poll_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig {
            endpoint: default_ai_endpoint(),
            model: default_ai_model(),
        }
    }
}

fn default_ai_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_ai_model() -> String {
    "gemini-2.5-flash".to_string()
}

/// Level curve: the first level costs `base_xp`, each next one
/// `growth_num / growth_den` times the previous (floored).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressionConfig {
    #[serde(default = "default_base_xp")]
    pub base_xp: u64,
    #[serde(default = "default_growth_num")]
    pub growth_num: u64,
    #[serde(default = "default_growth_den")]
    pub growth_den: u64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        ProgressionConfig {
            base_xp: default_base_xp(),
            growth_num: default_growth_num(),
            growth_den: default_growth_den(),
        }
    }
}

fn default_base_xp() -> u64 {
    1000
}

fn default_growth_num() -> u64 {
    3
}

fn default_growth_den() -> u64 {
    2
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Use the tighter project-graph spacing
    #[serde(default)]
    pub compact: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UiConfig {
    #[serde(default)]
    pub show_key_hints: bool,
    #[serde(default)]
    pub colors: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: NovaConfig = toml::from_str("").unwrap();
        assert_eq!(config.user.id, "local");
        assert!(config.remote.url.is_none());
        assert_eq!(config.progression, ProgressionConfig::default());
        assert_eq!(config.ai.model, "gemini-2.5-flash");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let src = r#"
[user]
id = "abc"

[progression]
base_xp = 500

[canvas]
compact = true
"#;
        let config: NovaConfig = toml::from_str(src).unwrap();
        assert_eq!(config.user.id, "abc");
        assert_eq!(config.progression.base_xp, 500);
        assert_eq!(config.progression.growth_num, 3);
        assert!(config.canvas.compact);
        assert_eq!(config.remote.poll_secs, 15);
    }
}
