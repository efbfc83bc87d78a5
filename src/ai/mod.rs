pub mod client;
pub mod parse;
pub mod tools;

pub use client::{AiError, AiProvider, AiRequest, GeminiClient, InlineImage, ScriptedProvider};

use crate::io::workspace_io::ENV_GEMINI_KEY;
use crate::model::config::AiConfig;
use crate::store::cache::LocalCache;

/// The model API key: environment first, then the per-user key file
pub fn resolve_key(cache: &LocalCache, env: impl Fn(&str) -> Option<String>) -> Option<String> {
    env(ENV_GEMINI_KEY)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .or_else(|| cache.ai_key())
}

/// Build a client for the configured model, failing fast without a key
pub fn connect(config: &AiConfig, cache: &LocalCache) -> Result<GeminiClient, AiError> {
    let key = resolve_key(cache, |k| std::env::var(k).ok()).ok_or(AiError::MissingKey)?;
    GeminiClient::new(config, &key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn env_key_wins_over_file() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::open(tmp.path()).unwrap();
        assert!(resolve_key(&cache, |_| None).is_none());

        cache.set_ai_key("from-file").unwrap();
        assert_eq!(resolve_key(&cache, |_| None).as_deref(), Some("from-file"));
        assert_eq!(
            resolve_key(&cache, |_| Some(" from-env ".into())).as_deref(),
            Some("from-env")
        );
        assert_eq!(
            resolve_key(&cache, |_| Some("".into())).as_deref(),
            Some("from-file")
        );
    }
}
