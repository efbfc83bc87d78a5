use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Persisted TUI state (written to `.nova/.state.json`)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UiState {
    /// Which view is showing ("roadmap", "project", "habits")
    pub view: String,
    /// Project shown in the project view
    #[serde(default)]
    pub active_project: Option<String>,
    /// Task whose subtasks are laid out beneath it
    #[serde(default)]
    pub expanded_task: Option<String>,
    /// Per-canvas viewport, keyed by "roadmap" or a project id
    #[serde(default)]
    pub viewports: HashMap<String, ViewportState>,
    /// Week offset in the habit view
    #[serde(default)]
    pub habit_week_offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    #[serde(default)]
    pub pan_x: f64,
    #[serde(default)]
    pub pan_y: f64,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

fn default_zoom() -> f64 {
    1.0
}

impl Default for ViewportState {
    fn default() -> Self {
        ViewportState {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: default_zoom(),
        }
    }
}

/// Read .state.json from the `.nova` directory
pub fn read_ui_state(nova_dir: &Path) -> Option<UiState> {
    let path = nova_dir.join(".state.json");
    let content = fs::read_to_string(&path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Write .state.json to the `.nova` directory
pub fn write_ui_state(nova_dir: &Path, state: &UiState) -> Result<(), std::io::Error> {
    let path = nova_dir.join(".state.json");
    let content = serde_json::to_string_pretty(state)?;
    fs::write(&path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut state = UiState {
            view: "project".into(),
            active_project: Some("prj-1".into()),
            expanded_task: Some("t-9".into()),
            habit_week_offset: -1,
            ..Default::default()
        };
        state.viewports.insert(
            "prj-1".into(),
            ViewportState {
                pan_x: -120.0,
                pan_y: 40.0,
                zoom: 0.6,
            },
        );

        write_ui_state(dir.path(), &state).unwrap();
        let loaded = read_ui_state(dir.path()).unwrap();

        assert_eq!(loaded.view, "project");
        assert_eq!(loaded.active_project.as_deref(), Some("prj-1"));
        assert_eq!(loaded.expanded_task.as_deref(), Some("t-9"));
        assert_eq!(loaded.habit_week_offset, -1);
        assert_eq!(loaded.viewports["prj-1"].zoom, 0.6);
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_ui_state(dir.path()).is_none());
    }

    #[test]
    fn read_malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".state.json"), "not json {{{").unwrap();
        assert!(read_ui_state(dir.path()).is_none());
    }

    #[test]
    fn serde_defaults_on_minimal_object() {
        let state: UiState = serde_json::from_str(r#"{"view":"roadmap"}"#).unwrap();
        assert_eq!(state.view, "roadmap");
        assert!(state.active_project.is_none());
        assert!(state.viewports.is_empty());

        let vp: ViewportState = serde_json::from_str("{}").unwrap();
        assert_eq!(vp, ViewportState::default());
    }
}
