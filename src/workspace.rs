use std::sync::mpsc;

use chrono::NaiveDate;

use crate::io::workspace_io::{WorkspaceError, WorkspacePaths};
use crate::model::config::NovaConfig;
use crate::model::mission::Mission;
use crate::model::project::Project;
use crate::model::task::Task;
use crate::ops::habit_ops::{self, HabitError};
use crate::ops::history::History;
use crate::ops::mission_ops::{
    self, MissionDraft, MissionError, PlannedPhase, ProjectDraft, QuestStructure,
};
use crate::ops::progression::{Level, compute_level_with, level_up, total_xp};
use crate::ops::tree_ops::TreeError;
use crate::store::cache::{CacheError, LocalCache};
use crate::store::feed::{ChangeEvent, apply_change};
use crate::store::remote::RemoteStore;
use crate::store::repository::{RepoError, SaveOutcome, TaskRepository};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Habit(#[from] HabitError),
    #[error(transparent)]
    Mission(#[from] MissionError),
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("mission not found: {0}")]
    MissionNotFound(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
}

/// What observers hear about
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    TasksChanged,
    ProjectsChanged,
    MissionsChanged,
    /// A write could not reach the remote
    StoredLocally,
    /// A mutation was refused; nothing changed
    Rejected(String),
    LevelUp(u32),
}

/// Application state for one user: standalone tasks and habits, projects
/// with their undo history, and missions. Passed explicitly to the front
/// ends; observers subscribe through [`Workspace::subscribe`].
pub struct Workspace<R: RemoteStore> {
    pub paths: WorkspacePaths,
    pub config: NovaConfig,
    repo: TaskRepository<R>,
    tasks: Vec<Task>,
    projects: Vec<Project>,
    missions: Vec<Mission>,
    history: History<Vec<Project>>,
    observers: Vec<mpsc::Sender<Notice>>,
}

impl<R: RemoteStore> Workspace<R> {
    /// Open from the local cache only. Call [`Workspace::refresh`] to pull
    /// remote rows.
    pub fn open(paths: WorkspacePaths, config: NovaConfig, remote: R) -> Result<Self, AppError> {
        let cache = LocalCache::open(&paths.user_dir(&config.user.id))?;
        let tasks = cache.load_tasks();
        let projects = cache.load_projects();
        let missions = cache.load_missions();
        let history = cache.load_history();
        let repo = TaskRepository::new(remote, cache, config.user.id.clone());
        tracing::debug!(
            tasks = tasks.len(),
            projects = projects.len(),
            missions = missions.len(),
            "workspace opened"
        );
        Ok(Workspace {
            paths,
            config,
            repo,
            tasks,
            projects,
            missions,
            history,
            observers: Vec::new(),
        })
    }

    pub fn user_id(&self) -> &str {
        self.repo.user_id()
    }

    pub fn cache(&self) -> &LocalCache {
        self.repo.cache()
    }

    pub fn repository(&self) -> &TaskRepository<R> {
        &self.repo
    }

    /// Receive notices until the receiver is dropped
    pub fn subscribe(&mut self) -> mpsc::Receiver<Notice> {
        let (tx, rx) = mpsc::channel();
        self.observers.push(tx);
        rx
    }

    fn emit(&mut self, notice: Notice) {
        self.observers.retain(|tx| tx.send(notice.clone()).is_ok());
    }

    fn note_outcome(&mut self, outcome: SaveOutcome) {
        if outcome == SaveOutcome::StoredLocally {
            self.emit(Notice::StoredLocally);
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Standalone tasks that are not habits
    pub fn quests(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.habit.is_none())
    }

    pub fn habits(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.habit.is_some())
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn missions(&self) -> &[Mission] {
        &self.missions
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// XP from completed standalone tasks and completed project tasks
    pub fn total_xp(&self) -> u64 {
        total_xp(self.tasks.iter().chain(self.projects.iter().flat_map(|p| p.all_tasks())))
    }

    pub fn level(&self) -> Level {
        compute_level_with(self.total_xp(), &self.config.progression)
    }

    fn check_level_up(&mut self, before: Level) {
        if let Some(level) = level_up(&before, &self.level()) {
            tracing::info!(level, "level up");
            self.emit(Notice::LevelUp(level));
        }
    }

    // -----------------------------------------------------------------------
    // Standalone tasks
    // -----------------------------------------------------------------------

    /// Pull remote rows and merge them with the cache
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        self.tasks = self.repo.fetch_all().await?;
        self.emit(Notice::TasksChanged);
        Ok(())
    }

    pub async fn add_task(&mut self, task: Task) -> Result<Task, AppError> {
        let (stored, outcome) = self.repo.create(task).await?;
        self.reload_tasks(outcome);
        Ok(stored)
    }

    pub async fn update_task(&mut self, task: Task) -> Result<Task, AppError> {
        let before = self.level();
        let (stored, outcome) = self.repo.update(task).await?;
        self.reload_tasks(outcome);
        self.check_level_up(before);
        Ok(stored)
    }

    /// Flip completion of a standalone task. Returns the new state.
    pub async fn toggle_task(&mut self, id: &str) -> Result<bool, AppError> {
        let mut task = self.owned_task(id)?;
        task.completed = !task.completed;
        let done = task.completed;
        self.update_task(task).await?;
        Ok(done)
    }

    pub async fn delete_task(&mut self, id: &str) -> Result<(), AppError> {
        let outcome = self.repo.delete(id).await?;
        self.reload_tasks(outcome);
        Ok(())
    }

    /// Commit a roadmap drag
    pub async fn move_task(&mut self, id: &str, x: f64, y: f64) -> Result<(), AppError> {
        let (_, outcome) = self.repo.save_position(id, x, y).await?;
        self.reload_tasks(outcome);
        Ok(())
    }

    /// Link two roadmap tasks. Returns false if the link already existed.
    pub async fn connect_tasks(&mut self, source: &str, target: &str) -> Result<bool, AppError> {
        if self.task(target).is_none() {
            return Err(AppError::TaskNotFound(target.to_string()));
        }
        match self.repo.connect(source, target).await {
            Ok(Some(outcome)) => {
                self.reload_tasks(outcome);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                self.emit(Notice::Rejected(e.to_string()));
                Err(e.into())
            }
        }
    }

    pub async fn disconnect_tasks(&mut self, source: &str, target: &str) -> Result<bool, AppError> {
        match self.repo.disconnect(source, target).await? {
            Some(outcome) => {
                self.reload_tasks(outcome);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Mark or unmark a habit day. Returns the new mark.
    pub async fn toggle_habit_day(
        &mut self,
        id: &str,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<bool, AppError> {
        let mut task = self.owned_task(id)?;
        let marked = habit_ops::toggle_day(&mut task, date, today)?;
        let (_, outcome) = self.repo.update(task).await?;
        self.reload_tasks(outcome);
        Ok(marked)
    }

    /// Push `local-` records and re-fetch. Returns how many were pushed.
    pub async fn sync(&mut self) -> Result<usize, AppError> {
        let pushed = self.repo.sync_pending().await?;
        self.refresh().await?;
        Ok(pushed)
    }

    /// Fold change-feed events into the task list
    pub fn apply_remote(&mut self, events: Vec<ChangeEvent>) -> Result<bool, AppError> {
        let (changed, tasks) = self.cache().update_tasks(|tasks| {
            let mut changed = false;
            for event in events {
                changed |= apply_change(tasks, event);
            }
            (changed, tasks.clone())
        })?;
        if changed {
            self.tasks = tasks;
            self.emit(Notice::TasksChanged);
        }
        Ok(changed)
    }

    /// Re-read tasks after another process wrote the cache
    pub fn reload_from_disk(&mut self) {
        self.tasks = self.cache().load_tasks();
        self.projects = self.cache().load_projects();
        self.missions = self.cache().load_missions();
        self.history = self.cache().load_history();
        self.emit(Notice::TasksChanged);
        self.emit(Notice::ProjectsChanged);
    }

    fn owned_task(&self, id: &str) -> Result<Task, AppError> {
        self.task(id)
            .cloned()
            .ok_or_else(|| AppError::TaskNotFound(id.to_string()))
    }

    fn reload_tasks(&mut self, outcome: SaveOutcome) {
        self.tasks = self.repo.cached();
        self.note_outcome(outcome);
        self.emit(Notice::TasksChanged);
    }

    // -----------------------------------------------------------------------
    // Projects (undoable)
    // -----------------------------------------------------------------------

    /// Apply a tree mutation to one project as a single undo step.
    ///
    /// The mutation runs on a copy; on error nothing changes, the refusal is
    /// broadcast as `Notice::Rejected` and returned.
    pub fn mutate_project<T>(
        &mut self,
        project_id: &str,
        f: impl FnOnce(&mut Project) -> Result<T, TreeError>,
    ) -> Result<T, AppError> {
        let idx = self
            .projects
            .iter()
            .position(|p| p.id == project_id)
            .ok_or_else(|| AppError::ProjectNotFound(project_id.to_string()))?;

        let mut draft = self.projects[idx].clone();
        let value = match f(&mut draft) {
            Ok(v) => v,
            Err(e) => {
                self.emit(Notice::Rejected(e.to_string()));
                return Err(e.into());
            }
        };
        // No-ops leave history (and the redo stack) alone
        if draft == self.projects[idx] {
            return Ok(value);
        }

        let before_level = self.level();
        let before = std::mem::take(&mut self.projects);
        self.projects = before.clone();
        self.projects[idx] = draft;
        self.history.record(before);
        self.persist_projects()?;
        self.check_level_up(before_level);
        Ok(value)
    }

    pub fn create_project(
        &mut self,
        draft: &ProjectDraft,
        plan: Option<Vec<PlannedPhase>>,
    ) -> Result<Project, AppError> {
        if let Some(mission_id) = &draft.mission_id
            && !self.missions.iter().any(|m| &m.id == mission_id)
        {
            return Err(AppError::MissionNotFound(mission_id.clone()));
        }
        let project = mission_ops::create_project(draft, plan, self.user_id())?;

        self.history.record(self.projects.clone());
        self.projects.push(project.clone());
        self.persist_projects()?;

        if let Some(mission) = draft
            .mission_id
            .as_deref()
            .and_then(|id| self.missions.iter_mut().find(|m| m.id == id))
            && mission_ops::attach_project(mission, &project.id)
        {
            self.persist_missions()?;
        }
        Ok(project)
    }

    pub fn delete_project(&mut self, id: &str) -> Result<Project, AppError> {
        let idx = self
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| AppError::ProjectNotFound(id.to_string()))?;
        self.history.record(self.projects.clone());
        let removed = self.projects.remove(idx);
        self.persist_projects()?;
        Ok(removed)
    }

    pub fn undo(&mut self) -> Result<bool, AppError> {
        if !self.history.undo(&mut self.projects) {
            return Ok(false);
        }
        self.persist_projects()?;
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, AppError> {
        if !self.history.redo(&mut self.projects) {
            return Ok(false);
        }
        self.persist_projects()?;
        Ok(true)
    }

    fn persist_projects(&mut self) -> Result<(), AppError> {
        self.cache().save_projects(&self.projects)?;
        self.cache().save_history(&self.history)?;
        self.emit(Notice::ProjectsChanged);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Missions
    // -----------------------------------------------------------------------

    pub fn create_mission(
        &mut self,
        draft: &MissionDraft,
        structure: Option<QuestStructure>,
    ) -> Result<Mission, AppError> {
        let mission = mission_ops::create_mission(draft, structure, self.user_id())?;
        self.missions.push(mission.clone());
        self.persist_missions()?;
        Ok(mission)
    }

    fn persist_missions(&mut self) -> Result<(), AppError> {
        self.cache().save_missions(&self.missions)?;
        self.emit(Notice::MissionsChanged);
        Ok(())
    }
}
