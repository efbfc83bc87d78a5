use serde::{Deserialize, Serialize};

use super::category::{ExecutionStyle, ProjectField};
use super::task::Task;

/// Gate state of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhaseStatus {
    Locked,
    #[default]
    Unlocked,
    Completed,
}

impl PhaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseStatus::Locked => "LOCKED",
            PhaseStatus::Unlocked => "UNLOCKED",
            PhaseStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered stage of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,
    pub title: String,
    /// Dense, 1-based
    pub order: u32,
    #[serde(default)]
    pub status: PhaseStatus,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Phase {
    pub fn is_locked(&self) -> bool {
        self.status == PhaseStatus::Locked
    }

    /// A phase with at least one task, all of them completed
    pub fn is_fully_done(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|t| t.completed)
    }
}

/// A multi-phase undertaking, optionally attached to a mission.
///
/// The project and everything nested under it form one aggregate: mutations
/// go through `ops::tree_ops` and `progress` is derived from the tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub field: ProjectField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission_id: Option<String>,
    #[serde(rename = "steps", default)]
    pub phases: Vec<Phase>,
    /// 0..=100
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub execution_style: ExecutionStyle,
    #[serde(default)]
    pub user_id: String,
}

impl Project {
    pub fn find_phase_mut(&mut self, phase_id: &str) -> Option<&mut Phase> {
        self.phases.iter_mut().find(|p| p.id == phase_id)
    }

    /// Find a task anywhere in the project, returning the owning phase index
    pub fn locate_task(&self, task_id: &str) -> Option<(usize, usize)> {
        self.phases.iter().enumerate().find_map(|(pi, phase)| {
            phase
                .tasks
                .iter()
                .position(|t| t.id == task_id)
                .map(|ti| (pi, ti))
        })
    }

    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        self.locate_task(task_id)
            .map(|(pi, ti)| &self.phases[pi].tasks[ti])
    }

    /// Whether any task or subtask in the project carries this id
    pub fn contains_node(&self, node_id: &str) -> bool {
        self.all_tasks()
            .any(|t| t.id == node_id || t.subtasks.iter().any(|s| s.id == node_id))
    }

    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.phases.iter().flat_map(|p| p.tasks.iter())
    }

    pub fn task_count(&self) -> usize {
        self.phases.iter().map(|p| p.tasks.len()).sum()
    }
}
