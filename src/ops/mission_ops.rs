use indexmap::IndexSet;
use serde::Deserialize;

use crate::model::category::{Category, ExecutionStyle, ProjectField};
use crate::model::mission::Mission;
use crate::model::project::{Phase, PhaseStatus, Project};
use crate::model::task::{Subtask, Task, new_id};

use super::tree_ops;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum MissionError {
    #[error("quest name required")]
    MissingVision,
    #[error("select at least one field")]
    NoFields,
    #[error("project name required")]
    MissingTitle,
    #[error("mission not found: {0}")]
    MissionNotFound(String),
}

/// How hard a generated quest should push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intensity {
    Casual,
    #[default]
    Standard,
    Hardcore,
}

impl Intensity {
    pub fn parse(s: &str) -> Option<Intensity> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASUAL" => Some(Intensity::Casual),
            "STANDARD" => Some(Intensity::Standard),
            "HARDCORE" => Some(Intensity::Hardcore),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Intensity::Casual => "CASUAL",
            Intensity::Standard => "STANDARD",
            Intensity::Hardcore => "HARDCORE",
        }
    }
}

/// Inputs collected by the quest wizard
#[derive(Debug, Clone, Default)]
pub struct MissionDraft {
    pub vision: String,
    pub fields: Vec<ProjectField>,
    pub intensity: Intensity,
}

impl MissionDraft {
    pub fn validate(&self) -> Result<(), MissionError> {
        if self.vision.trim().is_empty() {
            return Err(MissionError::MissingVision);
        }
        if self.fields.is_empty() {
            return Err(MissionError::NoFields);
        }
        Ok(())
    }
}

/// Objectives and KPIs suggested by the model for a quest
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuestStructure {
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub kpis: Vec<String>,
}

/// Create a mission from the wizard, optionally seeded with a generated
/// structure
pub fn create_mission(
    draft: &MissionDraft,
    structure: Option<QuestStructure>,
    user_id: &str,
) -> Result<Mission, MissionError> {
    draft.validate()?;
    let structure = structure.unwrap_or_default();
    Ok(Mission {
        id: new_id("mis"),
        vision: draft.vision.trim().to_uppercase(),
        objectives: structure.objectives,
        kpis: structure.kpis,
        project_ids: IndexSet::new(),
        user_id: user_id.to_string(),
    })
}

/// Append a project id to a mission. Returns false if it was already there.
pub fn attach_project(mission: &mut Mission, project_id: &str) -> bool {
    mission.project_ids.insert(project_id.to_string())
}

/// Inputs collected by the project wizard
#[derive(Debug, Clone, Default)]
pub struct ProjectDraft {
    pub name: String,
    pub field: ProjectField,
    pub style: ExecutionStyle,
    pub mission_id: Option<String>,
}

// Generated plans are parsed leniently: every field may be missing.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlannedPhase {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<PlannedTask>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlannedTask {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub xp_value: Option<u32>,
    #[serde(default)]
    pub temple_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<PlannedSubtask>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlannedSubtask {
    #[serde(default)]
    pub title: String,
}

/// Create a project from the wizard.
///
/// Without a generated plan (or with an empty one) the project starts with a
/// single unlocked foundation phase. A generated plan is normalised: fresh
/// ids, dense order from 1, only the first phase unlocked, nothing
/// completed.
pub fn create_project(
    draft: &ProjectDraft,
    plan: Option<Vec<PlannedPhase>>,
    user_id: &str,
) -> Result<Project, MissionError> {
    if draft.name.trim().is_empty() {
        return Err(MissionError::MissingTitle);
    }
    let phases = match plan {
        Some(plan) if !plan.is_empty() => normalise_plan(plan, user_id),
        _ => vec![foundation_phase()],
    };
    let mut project = Project {
        id: new_id("proj"),
        title: draft.name.trim().to_uppercase(),
        field: draft.field,
        mission_id: draft.mission_id.clone(),
        phases,
        progress: 0,
        execution_style: draft.style,
        user_id: user_id.to_string(),
    };
    tree_ops::recompute_progress(&mut project);
    Ok(project)
}

fn foundation_phase() -> Phase {
    Phase {
        id: new_id("phase"),
        title: "PHASE 1: FOUNDATION".to_string(),
        order: 1,
        status: PhaseStatus::Unlocked,
        tasks: Vec::new(),
    }
}

fn normalise_plan(plan: Vec<PlannedPhase>, user_id: &str) -> Vec<Phase> {
    plan.into_iter()
        .enumerate()
        .map(|(i, planned)| {
            let order = i as u32 + 1;
            let title = if planned.title.trim().is_empty() {
                format!("PHASE {}", order)
            } else {
                planned.title.trim().to_uppercase()
            };
            Phase {
                id: new_id("phase"),
                title,
                order,
                status: if i == 0 {
                    PhaseStatus::Unlocked
                } else {
                    PhaseStatus::Locked
                },
                tasks: planned
                    .tasks
                    .into_iter()
                    .filter(|t| !t.title.trim().is_empty())
                    .map(|t| planned_task(t, user_id))
                    .collect(),
            }
        })
        .collect()
}

fn planned_task(planned: PlannedTask, user_id: &str) -> Task {
    let category = planned
        .temple_id
        .as_deref()
        .map(Category::parse)
        .unwrap_or(Category::Projects);
    let mut task = Task::new(new_id("task"), planned.title.trim().to_string(), category);
    task.user_id = user_id.to_string();
    if let Some(xp) = planned.xp_value {
        task.xp_value = xp;
    }
    task.description = planned.description.filter(|d| !d.trim().is_empty());
    task.subtasks = planned
        .subtasks
        .into_iter()
        .filter(|s| !s.title.trim().is_empty())
        .map(|s| Subtask::new(new_id("sub"), s.title.trim().to_string()))
        .collect();
    task
}
