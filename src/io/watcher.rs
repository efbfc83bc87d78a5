use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Events sent from the cache watcher to the TUI event loop.
#[derive(Debug)]
pub enum CacheEvent {
    /// One or more cached record files changed on disk.
    Changed(Vec<PathBuf>),
}

/// Watches a user's cache directory so edits made by another `nova`
/// process (usually the CLI) show up in a running TUI.
pub struct CacheWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<CacheEvent>,
}

/// Whether a changed path should trigger a reload
pub fn is_relevant(dir: &Path, path: &Path) -> bool {
    if !path.starts_with(dir) {
        return false;
    }
    if let Some(name) = path.file_name().and_then(|n| n.to_str())
        && (name == ".lock" || name == ".state.json" || name.starts_with(".tmp"))
    {
        return false;
    }
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

impl CacheWatcher {
    /// Start watching `dir` (normally `.nova/users/<id>/`).
    /// Call `poll()` once per tick.
    pub fn start(dir: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let dir_owned = dir.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let Ok(event) = result else {
                    return;
                };
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }

                let relevant: Vec<PathBuf> = event
                    .paths
                    .into_iter()
                    .filter(|p| is_relevant(&dir_owned, p))
                    .collect();

                if !relevant.is_empty() {
                    let _ = tx.send(CacheEvent::Changed(relevant));
                }
            },
            Config::default(),
        )?;

        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        tracing::debug!(dir = %dir.display(), "watching cache directory");
        Ok(CacheWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Drain pending events without blocking.
    pub fn poll(&self) -> Vec<CacheEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.rx.try_recv() {
            events.push(evt);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_record_files_are_relevant() {
        let dir = Path::new("/w/.nova/users/u1");
        assert!(is_relevant(dir, &dir.join("tasks.json")));
        assert!(is_relevant(dir, &dir.join("projects.json")));
        assert!(!is_relevant(dir, &dir.join(".lock")));
        assert!(!is_relevant(dir, &dir.join(".state.json")));
        assert!(!is_relevant(dir, &dir.join(".tmpA1b2C3.json")));
        assert!(!is_relevant(dir, &dir.join("ai_key")));
        assert!(!is_relevant(dir, Path::new("/elsewhere/tasks.json")));
    }
}
