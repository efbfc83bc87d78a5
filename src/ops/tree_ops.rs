use indexmap::IndexSet;

use crate::model::category::Category;
use crate::model::project::{Phase, PhaseStatus, Project};
use crate::model::task::{Complexity, Subtask, Task, new_id};

/// Error type for project tree mutations
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum TreeError {
    #[error("phase not found: {0}")]
    PhaseNotFound(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("subtask not found: {0}")]
    SubtaskNotFound(String),
    #[error("node not found: {0}")]
    NodeNotFound(String),
    #[error("phase locked: complete the previous phase first ({0})")]
    PhaseLocked(String),
    #[error("cannot link a node to itself: {0}")]
    SelfLink(String),
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Append a phase. The first phase of a project starts unlocked, every later
/// one starts locked. Returns the new phase id.
pub fn add_phase(project: &mut Project, title: Option<&str>) -> String {
    let order = project.phases.len() as u32 + 1;
    let title = match title {
        Some(t) if !t.trim().is_empty() => t.trim().to_uppercase(),
        _ => format!("PHASE {}: EXPANSION", order),
    };
    let status = if project.phases.is_empty() {
        PhaseStatus::Unlocked
    } else {
        PhaseStatus::Locked
    };
    let id = new_id("phase");
    project.phases.push(Phase {
        id: id.clone(),
        title,
        order,
        status,
        tasks: Vec::new(),
    });
    id
}

pub fn rename_phase(project: &mut Project, phase_id: &str, title: &str) -> Result<(), TreeError> {
    let phase = project
        .find_phase_mut(phase_id)
        .ok_or_else(|| TreeError::PhaseNotFound(phase_id.to_string()))?;
    phase.title = title.trim().to_uppercase();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Field changes for a task; `None` leaves the field as is
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link_url: Option<String>,
    pub link_label: Option<String>,
    pub complexity: Option<Complexity>,
    pub xp_value: Option<u32>,
    pub due_date: Option<String>,
}

impl TaskEdit {
    fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(desc) = self.description {
            task.description = non_empty(desc);
        }
        if let Some(url) = self.link_url {
            task.link_url = non_empty(url);
        }
        if let Some(label) = self.link_label {
            task.link_label = non_empty(label);
        }
        if let Some(c) = self.complexity {
            task.complexity = c;
        }
        if let Some(xp) = self.xp_value {
            task.xp_value = xp;
        }
        if let Some(due) = self.due_date {
            task.due_date = non_empty(due);
        }
    }
}

/// Add a task to the end of a phase. Locked phases accept new tasks; only
/// completing them is gated. Returns the new task id.
pub fn add_task(project: &mut Project, phase_id: &str, title: &str) -> Result<String, TreeError> {
    let user_id = project.user_id.clone();
    let phase = project
        .find_phase_mut(phase_id)
        .ok_or_else(|| TreeError::PhaseNotFound(phase_id.to_string()))?;
    let id = new_id("task");
    let mut task = Task::new(id.clone(), title.trim().to_string(), Category::Projects);
    task.user_id = user_id;
    phase.tasks.push(task);
    recompute_progress(project);
    Ok(id)
}

pub fn edit_task(project: &mut Project, task_id: &str, edit: TaskEdit) -> Result<(), TreeError> {
    let task = task_mut(project, task_id)?;
    edit.apply(task);
    task.touch();
    Ok(())
}

/// Remove a task and every link that pointed at it or its subtasks
pub fn delete_task(project: &mut Project, task_id: &str) -> Result<Task, TreeError> {
    let (pi, ti) = project
        .locate_task(task_id)
        .ok_or_else(|| TreeError::TaskNotFound(task_id.to_string()))?;
    let removed = project.phases[pi].tasks.remove(ti);

    let mut gone: Vec<&str> = vec![removed.id.as_str()];
    gone.extend(removed.subtasks.iter().map(|s| s.id.as_str()));
    prune_links(project, &gone);

    recompute_progress(project);
    Ok(removed)
}

/// Flip a task's completion. Rejected in a locked phase.
pub fn toggle_task(project: &mut Project, task_id: &str) -> Result<bool, TreeError> {
    let (pi, ti) = project
        .locate_task(task_id)
        .ok_or_else(|| TreeError::TaskNotFound(task_id.to_string()))?;
    let phase = &mut project.phases[pi];
    if phase.is_locked() {
        return Err(TreeError::PhaseLocked(phase.title.clone()));
    }
    let task = &mut phase.tasks[ti];
    task.completed = !task.completed;
    task.touch();
    let now = task.completed;
    recompute_progress(project);
    Ok(now)
}

// ---------------------------------------------------------------------------
// Subtasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct SubtaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link_url: Option<String>,
    pub link_label: Option<String>,
    pub xp: Option<u32>,
    pub is_blocker: Option<bool>,
}

impl SubtaskEdit {
    fn apply(self, sub: &mut Subtask) {
        if let Some(title) = self.title {
            sub.title = title;
        }
        if let Some(desc) = self.description {
            sub.description = non_empty(desc);
        }
        if let Some(url) = self.link_url {
            sub.link_url = non_empty(url);
        }
        if let Some(label) = self.link_label {
            sub.link_label = non_empty(label);
        }
        if let Some(xp) = self.xp {
            sub.xp = Some(xp);
        }
        if let Some(b) = self.is_blocker {
            sub.is_blocker = b;
        }
    }
}

pub fn add_subtask(project: &mut Project, task_id: &str, title: &str) -> Result<String, TreeError> {
    let task = task_mut(project, task_id)?;
    let id = new_id("sub");
    task.subtasks
        .push(Subtask::new(id.clone(), title.trim().to_string()));
    task.touch();
    Ok(id)
}

pub fn edit_subtask(
    project: &mut Project,
    subtask_id: &str,
    edit: SubtaskEdit,
) -> Result<(), TreeError> {
    let (pi, ti, si) = locate_subtask(project, subtask_id)?;
    let task = &mut project.phases[pi].tasks[ti];
    edit.apply(&mut task.subtasks[si]);
    task.touch();
    Ok(())
}

pub fn delete_subtask(project: &mut Project, subtask_id: &str) -> Result<Subtask, TreeError> {
    let (pi, ti, si) = locate_subtask(project, subtask_id)?;
    let task = &mut project.phases[pi].tasks[ti];
    let removed = task.subtasks.remove(si);
    task.touch();
    prune_links(project, &[removed.id.as_str()]);
    recompute_progress(project);
    Ok(removed)
}

/// Flip a subtask's completion. Rejected in a locked phase.
pub fn toggle_subtask(project: &mut Project, subtask_id: &str) -> Result<bool, TreeError> {
    let (pi, ti, si) = locate_subtask(project, subtask_id)?;
    let phase = &mut project.phases[pi];
    if phase.is_locked() {
        return Err(TreeError::PhaseLocked(phase.title.clone()));
    }
    let task = &mut phase.tasks[ti];
    let sub = &mut task.subtasks[si];
    sub.completed = !sub.completed;
    let now = sub.completed;
    task.touch();
    recompute_progress(project);
    Ok(now)
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Add a directed link `source → target` between two nodes of the project.
/// Returns false if the link already existed.
pub fn link(project: &mut Project, source: &str, target: &str) -> Result<bool, TreeError> {
    if source == target {
        return Err(TreeError::SelfLink(source.to_string()));
    }
    if !project.contains_node(target) {
        return Err(TreeError::NodeNotFound(target.to_string()));
    }
    let (task, sub) = owner_mut(project, source)?;
    let added = connections_of(task, sub).insert(target.to_string());
    if added {
        task.touch();
    }
    Ok(added)
}

/// Remove a directed link. Returns false if it did not exist.
pub fn unlink(project: &mut Project, source: &str, target: &str) -> Result<bool, TreeError> {
    let (task, sub) = owner_mut(project, source)?;
    let removed = connections_of(task, sub).shift_remove(target);
    if removed {
        task.touch();
    }
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Derived state
// ---------------------------------------------------------------------------

/// Recompute `progress` and phase gates from task completion.
///
/// A locked phase opens once its predecessor has at least one task and all of
/// them are done. An open phase whose tasks are all done is completed; a
/// completed phase that no longer qualifies drops back to unlocked.
pub fn recompute_progress(project: &mut Project) {
    let total: usize = project.phases.iter().map(|p| p.tasks.len()).sum();
    let done: usize = project
        .phases
        .iter()
        .map(|p| p.tasks.iter().filter(|t| t.completed).count())
        .sum();
    project.progress = if total == 0 {
        0
    } else {
        // round half up
        ((200 * done + total) / (2 * total)) as u8
    };

    let predecessor_done: Vec<bool> = project.phases.iter().map(Phase::is_fully_done).collect();
    for (i, phase) in project.phases.iter_mut().enumerate() {
        if phase.status == PhaseStatus::Locked && i > 0 && predecessor_done[i - 1] {
            phase.status = PhaseStatus::Unlocked;
        }
        if phase.status != PhaseStatus::Locked {
            phase.status = if phase.is_fully_done() {
                PhaseStatus::Completed
            } else {
                PhaseStatus::Unlocked
            };
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

fn task_mut<'a>(project: &'a mut Project, task_id: &str) -> Result<&'a mut Task, TreeError> {
    let (pi, ti) = project
        .locate_task(task_id)
        .ok_or_else(|| TreeError::TaskNotFound(task_id.to_string()))?;
    Ok(&mut project.phases[pi].tasks[ti])
}

fn locate_subtask(project: &Project, subtask_id: &str) -> Result<(usize, usize, usize), TreeError> {
    for (pi, phase) in project.phases.iter().enumerate() {
        for (ti, task) in phase.tasks.iter().enumerate() {
            if let Some(si) = task.subtasks.iter().position(|s| s.id == subtask_id) {
                return Ok((pi, ti, si));
            }
        }
    }
    Err(TreeError::SubtaskNotFound(subtask_id.to_string()))
}

/// The task owning `node_id`, plus the subtask index when the node is a
/// subtask
fn owner_mut<'a>(
    project: &'a mut Project,
    node_id: &str,
) -> Result<(&'a mut Task, Option<usize>), TreeError> {
    if let Some((pi, ti)) = project.locate_task(node_id) {
        return Ok((&mut project.phases[pi].tasks[ti], None));
    }
    let (pi, ti, si) = locate_subtask(project, node_id)
        .map_err(|_| TreeError::NodeNotFound(node_id.to_string()))?;
    Ok((&mut project.phases[pi].tasks[ti], Some(si)))
}

fn connections_of(task: &mut Task, sub: Option<usize>) -> &mut IndexSet<String> {
    match sub {
        Some(si) => &mut task.subtasks[si].connections,
        None => &mut task.connections,
    }
}

fn prune_links(project: &mut Project, gone: &[&str]) {
    for task in project.phases.iter_mut().flat_map(|p| p.tasks.iter_mut()) {
        let before = task.connections.len()
            + task.subtasks.iter().map(|s| s.connections.len()).sum::<usize>();
        task.connections.retain(|c| !gone.contains(&c.as_str()));
        for sub in task.subtasks.iter_mut() {
            sub.connections.retain(|c| !gone.contains(&c.as_str()));
        }
        let after = task.connections.len()
            + task.subtasks.iter().map(|s| s.connections.len()).sum::<usize>();
        if after != before {
            task.touch();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::{ExecutionStyle, ProjectField};
    use pretty_assertions::assert_eq;

    fn empty_project() -> Project {
        Project {
            id: "proj-1".into(),
            title: "LAUNCH".into(),
            field: ProjectField::Tech,
            mission_id: None,
            phases: Vec::new(),
            progress: 0,
            execution_style: ExecutionStyle::Structured,
            user_id: "u1".into(),
        }
    }

    /// Two phases with two tasks each
    fn two_by_two() -> (Project, [String; 2], [String; 4]) {
        let mut p = empty_project();
        let a = add_phase(&mut p, None);
        let b = add_phase(&mut p, None);
        let t0 = add_task(&mut p, &a, "one").unwrap();
        let t1 = add_task(&mut p, &a, "two").unwrap();
        let t2 = add_task(&mut p, &b, "three").unwrap();
        let t3 = add_task(&mut p, &b, "four").unwrap();
        (p, [a, b], [t0, t1, t2, t3])
    }

    fn statuses(p: &Project) -> Vec<PhaseStatus> {
        p.phases.iter().map(|ph| ph.status).collect()
    }

    #[test]
    fn first_phase_unlocked_rest_locked() {
        let mut p = empty_project();
        add_phase(&mut p, None);
        add_phase(&mut p, Some("  build out "));
        assert_eq!(statuses(&p), vec![PhaseStatus::Unlocked, PhaseStatus::Locked]);
        assert_eq!(p.phases[0].title, "PHASE 1: EXPANSION");
        assert_eq!(p.phases[1].title, "BUILD OUT");
        assert_eq!(p.phases[1].order, 2);
    }

    #[test]
    fn rename_upper_cases() {
        let mut p = empty_project();
        let id = add_phase(&mut p, None);
        rename_phase(&mut p, &id, "recon").unwrap();
        assert_eq!(p.phases[0].title, "RECON");
        assert_eq!(
            rename_phase(&mut p, "nope", "x"),
            Err(TreeError::PhaseNotFound("nope".into()))
        );
    }

    #[test]
    fn progress_rounds_over_all_phases() {
        let (mut p, _, t) = two_by_two();
        assert_eq!(p.progress, 0);
        toggle_task(&mut p, &t[0]).unwrap();
        assert_eq!(p.progress, 25);
        assert_eq!(statuses(&p), vec![PhaseStatus::Unlocked, PhaseStatus::Locked]);
    }

    #[test]
    fn finishing_a_phase_completes_it_and_unlocks_the_next() {
        let (mut p, _, t) = two_by_two();
        toggle_task(&mut p, &t[0]).unwrap();
        toggle_task(&mut p, &t[1]).unwrap();
        assert_eq!(p.progress, 50);
        assert_eq!(statuses(&p), vec![PhaseStatus::Completed, PhaseStatus::Unlocked]);

        toggle_task(&mut p, &t[2]).unwrap();
        toggle_task(&mut p, &t[3]).unwrap();
        assert_eq!(p.progress, 100);
        assert_eq!(statuses(&p), vec![PhaseStatus::Completed, PhaseStatus::Completed]);
    }

    #[test]
    fn toggle_in_locked_phase_is_rejected_unchanged() {
        let (mut p, _, t) = two_by_two();
        let before = p.clone();
        let err = toggle_task(&mut p, &t[2]).unwrap_err();
        assert!(matches!(err, TreeError::PhaseLocked(_)));
        assert_eq!(p, before);

        let sub = add_subtask(&mut p, &t[3], "detail").unwrap();
        let before = p.clone();
        assert!(toggle_subtask(&mut p, &sub).is_err());
        assert_eq!(p, before);
    }

    #[test]
    fn empty_phase_never_completes_or_unlocks() {
        let mut p = empty_project();
        add_phase(&mut p, None);
        add_phase(&mut p, None);
        recompute_progress(&mut p);
        assert_eq!(statuses(&p), vec![PhaseStatus::Unlocked, PhaseStatus::Locked]);
        assert_eq!(p.progress, 0);
    }

    #[test]
    fn unticking_reopens_a_completed_phase() {
        let (mut p, _, t) = two_by_two();
        toggle_task(&mut p, &t[0]).unwrap();
        toggle_task(&mut p, &t[1]).unwrap();
        toggle_task(&mut p, &t[1]).unwrap();
        assert_eq!(p.phases[0].status, PhaseStatus::Unlocked);
        // the successor stays open once unlocked
        assert_eq!(p.phases[1].status, PhaseStatus::Unlocked);
    }

    #[test]
    fn adding_a_task_to_a_completed_phase_reopens_it() {
        let mut p = empty_project();
        let a = add_phase(&mut p, None);
        let t = add_task(&mut p, &a, "only").unwrap();
        toggle_task(&mut p, &t).unwrap();
        assert_eq!(p.phases[0].status, PhaseStatus::Completed);
        add_task(&mut p, &a, "more").unwrap();
        assert_eq!(p.phases[0].status, PhaseStatus::Unlocked);
        assert_eq!(p.progress, 50);
    }

    #[test]
    fn subtask_toggle_does_not_change_task_progress() {
        let (mut p, _, t) = two_by_two();
        let s = add_subtask(&mut p, &t[0], "step").unwrap();
        assert!(toggle_subtask(&mut p, &s).unwrap());
        assert_eq!(p.progress, 0);
        assert!(p.find_task(&t[0]).unwrap().subtasks[0].completed);
    }

    #[test]
    fn link_is_idempotent_and_directed() {
        let (mut p, _, t) = two_by_two();
        assert!(link(&mut p, &t[0], &t[2]).unwrap());
        assert!(!link(&mut p, &t[0], &t[2]).unwrap());
        let src = p.find_task(&t[0]).unwrap();
        assert_eq!(src.connections.len(), 1);
        assert!(p.find_task(&t[2]).unwrap().connections.is_empty());
    }

    #[test]
    fn link_rejects_self_and_unknown() {
        let (mut p, _, t) = two_by_two();
        assert_eq!(
            link(&mut p, &t[0], &t[0]),
            Err(TreeError::SelfLink(t[0].clone()))
        );
        assert_eq!(
            link(&mut p, &t[0], "ghost"),
            Err(TreeError::NodeNotFound("ghost".into()))
        );
        assert_eq!(
            link(&mut p, "ghost", &t[0]),
            Err(TreeError::NodeNotFound("ghost".into()))
        );
    }

    #[test]
    fn subtasks_link_and_unlink() {
        let (mut p, _, t) = two_by_two();
        let s = add_subtask(&mut p, &t[0], "step").unwrap();
        assert!(link(&mut p, &s, &t[3]).unwrap());
        assert!(p.find_task(&t[0]).unwrap().subtasks[0].connections.contains(&t[3]));
        assert!(unlink(&mut p, &s, &t[3]).unwrap());
        assert!(!unlink(&mut p, &s, &t[3]).unwrap());
    }

    #[test]
    fn deleting_a_task_prunes_links_to_it() {
        let (mut p, _, t) = two_by_two();
        let s = add_subtask(&mut p, &t[2], "inner").unwrap();
        link(&mut p, &t[0], &t[2]).unwrap();
        link(&mut p, &t[1], &s).unwrap();
        let removed = delete_task(&mut p, &t[2]).unwrap();
        assert_eq!(removed.subtasks.len(), 1);
        assert!(p.find_task(&t[0]).unwrap().connections.is_empty());
        assert!(p.find_task(&t[1]).unwrap().connections.is_empty());
        assert_eq!(p.task_count(), 3);
    }

    #[test]
    fn edits_apply_and_bump_revision() {
        let (mut p, _, t) = two_by_two();
        let rev = p.find_task(&t[0]).unwrap().revision;
        edit_task(
            &mut p,
            &t[0],
            TaskEdit {
                title: Some("renamed".into()),
                complexity: Some(Complexity::A),
                description: Some("".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let task = p.find_task(&t[0]).unwrap();
        assert_eq!(task.title, "renamed");
        assert_eq!(task.complexity, Complexity::A);
        assert_eq!(task.description, None);
        assert!(task.revision > rev);

        let s = add_subtask(&mut p, &t[0], "a").unwrap();
        edit_subtask(
            &mut p,
            &s,
            SubtaskEdit {
                is_blocker: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(p.find_task(&t[0]).unwrap().subtasks[0].is_blocker);
        delete_subtask(&mut p, &s).unwrap();
        assert!(p.find_task(&t[0]).unwrap().subtasks.is_empty());
        assert!(matches!(
            delete_subtask(&mut p, &s),
            Err(TreeError::SubtaskNotFound(_))
        ));
    }
}
