use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::canvas::layout::{EdgeKind, Graph, NodeKind};
use crate::model::mission::Mission;
use crate::model::project::{Phase, Project};
use crate::model::task::{Subtask, Task, Weekday};
use crate::ops::habit_ops;
use crate::ops::progression::{self, Level};
use crate::ops::search::{Scope, SearchHit};
use crate::util::unicode::pad_to_width;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: String,
    pub title: String,
    pub category: String,
    pub complexity: String,
    pub xp: u32,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<SubtaskJson>,
    /// Only stored in the local cache
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub local: bool,
}

#[derive(Serialize)]
pub struct SubtaskJson {
    pub id: String,
    pub title: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub blocker: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<String>,
}

#[derive(Serialize)]
pub struct HabitJson {
    pub id: String,
    pub title: String,
    pub days: Vec<&'static str>,
    pub streak_current: u32,
    pub streak_best: u32,
    /// Marks for the listed week, Monday first
    pub week: Vec<bool>,
}

#[derive(Serialize)]
pub struct HabitStatsJson {
    pub habits: usize,
    pub completion_rate: u8,
    pub top_streak: u32,
    /// Monday first, busiest day = 100
    pub consistency: [u8; 7],
}

#[derive(Serialize)]
pub struct ProjectJson {
    pub id: String,
    pub title: String,
    pub field: String,
    pub style: String,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<PhaseJson>,
}

#[derive(Serialize)]
pub struct PhaseJson {
    pub id: String,
    pub title: String,
    pub order: u32,
    pub status: String,
    pub tasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct MissionJson {
    pub id: String,
    pub vision: String,
    pub objectives: Vec<String>,
    pub kpis: Vec<String>,
    pub projects: Vec<String>,
}

#[derive(Serialize)]
pub struct LevelJson {
    pub level: u32,
    pub rank: String,
    pub title: &'static str,
    pub total_xp: u64,
    pub xp_into_level: u64,
    pub xp_required: u64,
    pub percent: u8,
}

#[derive(Serialize)]
pub struct GraphJson {
    pub nodes: Vec<NodeJson>,
    pub edges: Vec<EdgeJson>,
}

#[derive(Serialize)]
pub struct NodeJson {
    pub id: String,
    pub kind: &'static str,
    pub title: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub completed: bool,
    pub locked: bool,
}

#[derive(Serialize)]
pub struct EdgeJson {
    pub source: String,
    pub target: String,
    pub kind: &'static str,
    /// SVG path data
    pub path: String,
}

#[derive(Serialize)]
pub struct SearchHitJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtask: Option<String>,
    pub field: &'static str,
    pub spans: Vec<[usize; 2]>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(task: &Task) -> TaskJson {
    TaskJson {
        id: task.id.clone(),
        title: task.title.clone(),
        category: task.category.to_string(),
        complexity: task.complexity.to_string(),
        xp: task.effective_xp(),
        completed: task.completed,
        description: task.description.clone(),
        due_date: task.due_date.clone(),
        connections: task.connections.iter().cloned().collect(),
        position: task.position().map(|(x, y)| [x, y]),
        subtasks: task.subtasks.iter().map(subtask_to_json).collect(),
        local: task.is_local(),
    }
}

fn subtask_to_json(sub: &Subtask) -> SubtaskJson {
    SubtaskJson {
        id: sub.id.clone(),
        title: sub.title.clone(),
        completed: sub.completed,
        xp: sub.xp,
        blocker: sub.is_blocker,
        connections: sub.connections.iter().cloned().collect(),
    }
}

pub fn habit_to_json(task: &Task, week: &[NaiveDate; 7]) -> Option<HabitJson> {
    let habit = task.habit.as_ref()?;
    Some(HabitJson {
        id: task.id.clone(),
        title: task.title.clone(),
        days: habit.habit_frequency.iter().map(|d| d.as_str()).collect(),
        streak_current: habit.streak_current,
        streak_best: habit.streak_best,
        week: week.iter().map(|d| is_marked(task, *d)).collect(),
    })
}

/// Project summary; phases only when `detail`
pub fn project_to_json(project: &Project, detail: bool) -> ProjectJson {
    ProjectJson {
        id: project.id.clone(),
        title: project.title.clone(),
        field: project.field.to_string(),
        style: project.execution_style.as_str().to_string(),
        progress: project.progress,
        mission_id: project.mission_id.clone(),
        phases: if detail {
            project.phases.iter().map(phase_to_json).collect()
        } else {
            Vec::new()
        },
    }
}

fn phase_to_json(phase: &Phase) -> PhaseJson {
    PhaseJson {
        id: phase.id.clone(),
        title: phase.title.clone(),
        order: phase.order,
        status: phase.status.to_string(),
        tasks: phase.tasks.iter().map(task_to_json).collect(),
    }
}

pub fn mission_to_json(mission: &Mission) -> MissionJson {
    MissionJson {
        id: mission.id.clone(),
        vision: mission.vision.clone(),
        objectives: mission.objectives.clone(),
        kpis: mission.kpis.clone(),
        projects: mission.project_ids.iter().cloned().collect(),
    }
}

pub fn level_to_json(level: &Level, total_xp: u64) -> LevelJson {
    LevelJson {
        level: level.level,
        rank: progression::rank(level.level).to_string(),
        title: progression::title(level.level),
        total_xp,
        xp_into_level: level.xp_into_level,
        xp_required: level.xp_required,
        percent: level.percent(),
    }
}

pub fn graph_to_json(graph: &Graph) -> GraphJson {
    GraphJson {
        nodes: graph
            .nodes
            .iter()
            .map(|n| NodeJson {
                id: n.id.clone(),
                kind: match n.kind {
                    NodeKind::Task => "task",
                    NodeKind::Subtask => "subtask",
                },
                title: n.title.clone(),
                x: n.pos.x,
                y: n.pos.y,
                width: n.width,
                height: n.height,
                completed: n.completed,
                locked: n.locked,
            })
            .collect(),
        edges: graph
            .edges
            .iter()
            .filter_map(|e| {
                Some(EdgeJson {
                    source: e.source.clone(),
                    target: e.target.clone(),
                    kind: match e.kind {
                        EdgeKind::Tree => "tree",
                        EdgeKind::Link => "link",
                    },
                    path: graph.edge_path(e)?.to_svg(),
                })
            })
            .collect(),
    }
}

pub fn search_hit_to_json(hit: &SearchHit) -> SearchHitJson {
    SearchHitJson {
        project: match &hit.scope {
            Scope::Standalone => None,
            Scope::Project { project_id, .. } => Some(project_id.clone()),
        },
        task: hit.task_id.clone(),
        subtask: hit.subtask_id.clone(),
        field: hit.field.as_str(),
        spans: hit.spans.iter().map(|r| [r.start, r.end]).collect(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn check_char(done: bool) -> char {
    if done { 'x' } else { ' ' }
}

fn is_marked(task: &Task, date: NaiveDate) -> bool {
    task.habit
        .as_ref()
        .and_then(|h| h.habit_history.get(&habit_ops::date_key(date)).copied())
        .unwrap_or(false)
}

/// Format a quest as a one-line summary
pub fn format_task_line(task: &Task) -> String {
    let local = if task.is_local() { " (local)" } else { "" };
    let due = task
        .due_date
        .as_ref()
        .map(|d| format!(" due:{}", d))
        .unwrap_or_default();
    format!(
        "[{}] {} {} <{}> {}xp {}{}{}",
        check_char(task.completed),
        task.id,
        task.title,
        task.category,
        task.effective_xp(),
        task.complexity,
        due,
        local
    )
}

/// One habit row: title, a mark per day of `week`, streaks
pub fn format_habit_row(task: &Task, week: &[NaiveDate; 7]) -> Option<String> {
    let habit = task.habit.as_ref()?;
    let cells: String = week
        .iter()
        .map(|d| {
            if is_marked(task, *d) {
                '#'
            } else if habit_ops::is_scheduled(habit, Weekday::from_chrono(d.weekday())) {
                '.'
            } else {
                ' '
            }
        })
        .collect();
    Some(format!(
        "{} [{}] streak {} (best {})  {}",
        pad_to_width(&task.title, 24),
        cells,
        habit.streak_current,
        habit.streak_best,
        task.id
    ))
}

pub fn format_week_header(week: &[NaiveDate; 7]) -> String {
    format!(
        "{} {} .. {}  (M T W T F S S)",
        pad_to_width("HABIT", 24),
        week[0].format("%Y-%m-%d"),
        week[6].format("%Y-%m-%d")
    )
}

pub fn format_project_line(project: &Project) -> String {
    format!(
        "{} {} [{}] {}% ({} steps)",
        project.id,
        project.title,
        project.field,
        project.progress,
        project.task_count()
    )
}

/// A project with its phases, steps and subtasks, indented
pub fn format_project_tree(project: &Project) -> Vec<String> {
    let mut lines = vec![format!(
        "== {} ({}) {}% ==",
        project.title, project.id, project.progress
    )];
    for phase in &project.phases {
        lines.push(String::new());
        lines.push(format!(
            "{}. {} [{}] {}",
            phase.order, phase.title, phase.status, phase.id
        ));
        for task in &phase.tasks {
            lines.push(format!(
                "  [{}] {} {} {}xp",
                check_char(task.completed),
                task.id,
                task.title,
                task.effective_xp()
            ));
            for sub in &task.subtasks {
                let blocker = if sub.is_blocker { " !" } else { "" };
                lines.push(format!(
                    "    [{}] {} {}{}",
                    check_char(sub.completed),
                    sub.id,
                    sub.title,
                    blocker
                ));
            }
        }
    }
    lines
}

pub fn format_mission(mission: &Mission, projects: &[Project]) -> Vec<String> {
    let mut lines = vec![format!("{} {}", mission.id, mission.vision)];
    for o in &mission.objectives {
        lines.push(format!("  objective: {}", o));
    }
    for k in &mission.kpis {
        lines.push(format!("  kpi: {}", k));
    }
    for pid in &mission.project_ids {
        match projects.iter().find(|p| &p.id == pid) {
            Some(p) => lines.push(format!("  project: {} {}%", p.title, p.progress)),
            None => lines.push(format!("  project: {} (missing)", pid)),
        }
    }
    lines
}

/// `LVL 3 E INITIATE [#####.....] 450/2250 XP`
pub fn format_level(level: &Level, total_xp: u64) -> String {
    const BAR: usize = 20;
    let filled = (level.percent() as usize * BAR) / 100;
    format!(
        "LVL {} {} {} [{}{}] {}/{} XP (total {})",
        level.level,
        progression::rank(level.level),
        progression::title(level.level),
        "#".repeat(filled),
        ".".repeat(BAR - filled),
        level.xp_into_level,
        level.xp_required,
        total_xp
    )
}

/// Percent bars for weekday consistency, Monday first
pub fn format_consistency(consistency: &[u8; 7]) -> Vec<String> {
    const BAR: usize = 20;
    Weekday::ALL
        .iter()
        .zip(consistency)
        .map(|(day, pct)| {
            let filled = (*pct as usize * BAR) / 100;
            format!("{} {:<20} {:>3}%", day.as_str(), "#".repeat(filled), pct)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::layout::{LayoutProfile, project_graph};
    use crate::model::category::{Category, ExecutionStyle, ProjectField};
    use crate::ops::mission_ops::{ProjectDraft, create_project};
    use crate::ops::progression::compute_level;
    use crate::ops::tree_ops;
    use pretty_assertions::assert_eq;

    #[test]
    fn level_line_shows_bar() {
        let level = compute_level(1450);
        insta::assert_snapshot!(
            format_level(&level, 1450),
            @"LVL 2 E INITIATE [######..............] 450/1500 XP (total 1450)"
        );
    }

    #[test]
    fn task_line_marks_local_records() {
        let mut t = Task::new("local-abc".into(), "Stretch".into(), Category::Fitness);
        t.xp_value = 20;
        t.completed = true;
        assert_eq!(
            format_task_line(&t),
            "[x] local-abc Stretch <FITNESS> 20xp E (local)"
        );
    }

    #[test]
    fn habit_row_distinguishes_marked_and_scheduled() {
        let mut habit = habit_ops::new_habit("read", &[Weekday::Mon, Weekday::Wed], "u1");
        habit.id = "habit-1".into();
        let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        habit_ops::toggle_day(&mut habit, monday, monday).unwrap();
        let week = habit_ops::week_dates(monday, 0);
        let row = format_habit_row(&habit, &week).unwrap();
        assert!(row.contains("[# .    ]"), "{}", row);
        assert!(row.ends_with("habit-1"));
        let json = habit_to_json(&habit, &week).unwrap();
        assert_eq!(json.week, vec![true, false, false, false, false, false, false]);
        assert_eq!(json.days, vec!["MON", "WED"]);
    }

    #[test]
    fn graph_json_carries_svg_paths() {
        let draft = ProjectDraft {
            name: "Launch".into(),
            field: ProjectField::Tech,
            style: ExecutionStyle::Structured,
            mission_id: None,
        };
        let mut project = create_project(&draft, None, "u1").unwrap();
        let phase = project.phases[0].id.clone();
        let a = tree_ops::add_task(&mut project, &phase, "A").unwrap();
        let b = tree_ops::add_task(&mut project, &phase, "B").unwrap();
        tree_ops::link(&mut project, &a, &b).unwrap();

        let graph = project_graph(&project, None, &LayoutProfile::STANDARD);
        let json = graph_to_json(&graph);
        assert_eq!(json.nodes.len(), 2);
        assert_eq!(json.edges.len(), 1);
        assert_eq!(json.edges[0].kind, "link");
        assert!(json.edges[0].path.starts_with("M "));
    }

    #[test]
    fn project_tree_lists_phases() {
        let draft = ProjectDraft {
            name: "Gym".into(),
            ..Default::default()
        };
        let mut project = create_project(&draft, None, "u1").unwrap();
        let phase = project.phases[0].id.clone();
        tree_ops::add_task(&mut project, &phase, "Squat").unwrap();
        let lines = format_project_tree(&project);
        assert!(lines[0].starts_with("== GYM ("));
        assert!(lines[2].contains("[UNLOCKED]"));
        assert!(lines[3].contains("Squat"));
    }
}
