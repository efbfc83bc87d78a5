use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;

use crate::canvas::{
    Graph, Interaction, LayoutProfile, Viewport, ZoomRange, project_graph, roadmap_graph,
};
use crate::cli::logging;
use crate::io::state::{UiState, ViewportState, read_ui_state, write_ui_state};
use crate::io::watcher::CacheWatcher;
use crate::io::workspace_io;
use crate::model::project::Project;
use crate::store::feed::{RemoteFeed, Subscription};
use crate::store::remote::Remote;
use crate::workspace::{Notice, Workspace};

use super::input;
use super::render;
use super::theme::Theme;

/// How long a status message stays up
const STATUS_TTL: Duration = Duration::from_secs(4);
/// Viewport key for the roadmap canvas
pub const ROADMAP_KEY: &str = "roadmap";

/// Which view is currently displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Free-form canvas of standalone quests
    Roadmap,
    /// Phase columns of the active project
    Project,
    /// Weekly habit grid
    Habits,
}

impl View {
    fn as_str(self) -> &'static str {
        match self {
            View::Roadmap => "roadmap",
            View::Project => "project",
            View::Habits => "habits",
        }
    }

    fn parse(s: &str) -> Option<View> {
        match s {
            "roadmap" => Some(View::Roadmap),
            "project" => Some(View::Project),
            "habits" => Some(View::Habits),
            _ => None,
        }
    }
}

/// What a text prompt will create on Enter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    AddQuest,
    AddHabit,
    AddProject,
    AddStep,
    AddSubtask,
}

impl PromptKind {
    pub fn label(self) -> &'static str {
        match self {
            PromptKind::AddQuest => "new quest",
            PromptKind::AddHabit => "new habit",
            PromptKind::AddProject => "new project",
            PromptKind::AddStep => "new step",
            PromptKind::AddSubtask => "new subtask",
        }
    }
}

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Navigate,
    Prompt(PromptKind),
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    pub at: Instant,
}

/// Main application state
pub struct App {
    pub ws: Workspace<Arc<Remote>>,
    pub rt: tokio::runtime::Runtime,
    pub theme: Theme,
    pub view: View,
    pub mode: Mode,
    pub should_quit: bool,
    pub show_help: bool,
    /// Project shown in the project view
    pub active_project: Option<String>,
    /// Task whose subtasks are laid out in the project view
    pub expanded_task: Option<String>,
    /// Selected canvas node
    pub selected: Option<String>,
    /// First end of a keyboard link gesture
    pub link_source: Option<String>,
    /// Per-canvas viewports, keyed by `ROADMAP_KEY` or a project id
    pub viewports: HashMap<String, Viewport>,
    pub interaction: Interaction,
    pub habit_week_offset: i64,
    /// Row and day column of the habit grid cursor
    pub habit_cursor: (usize, usize),
    /// Prompt text and byte cursor
    pub input: String,
    pub input_cursor: usize,
    pub status: Option<StatusMessage>,
    /// Where the canvas was last drawn; mouse events are mapped against it
    pub canvas_area: Rect,
    notices: mpsc::Receiver<Notice>,
}

impl App {
    pub fn new(mut ws: Workspace<Arc<Remote>>, rt: tokio::runtime::Runtime) -> Self {
        let theme = Theme::from_config(&ws.config.ui);
        let notices = ws.subscribe();
        let active_project = ws.projects().first().map(|p| p.id.clone());
        App {
            ws,
            rt,
            theme,
            view: View::Roadmap,
            mode: Mode::Navigate,
            should_quit: false,
            show_help: false,
            active_project,
            expanded_task: None,
            selected: None,
            link_source: None,
            viewports: HashMap::new(),
            interaction: Interaction::new(),
            habit_week_offset: 0,
            habit_cursor: (0, 0),
            input: String::new(),
            input_cursor: 0,
            status: None,
            canvas_area: Rect::default(),
            notices,
        }
    }

    pub fn project(&self) -> Option<&Project> {
        self.ws.project(self.active_project.as_deref()?)
    }

    /// Key of the viewport for the current canvas view
    pub fn viewport_key(&self) -> Option<String> {
        match self.view {
            View::Roadmap => Some(ROADMAP_KEY.to_string()),
            View::Project => self.active_project.clone(),
            View::Habits => None,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport_key()
            .and_then(|k| self.viewports.get(&k).copied())
            .unwrap_or_else(|| Viewport::new(self.zoom_range()))
    }

    pub fn viewport_mut(&mut self) -> Option<&mut Viewport> {
        let key = self.viewport_key()?;
        let range = self.zoom_range();
        Some(
            self.viewports
                .entry(key)
                .or_insert_with(|| Viewport::new(range)),
        )
    }

    fn zoom_range(&self) -> ZoomRange {
        match self.view {
            View::Project => ZoomRange::WORKSPACE,
            _ => ZoomRange::ROADMAP,
        }
    }

    pub fn layout_profile(&self) -> &'static LayoutProfile {
        if self.ws.config.canvas.compact {
            &LayoutProfile::COMPACT
        } else {
            &LayoutProfile::STANDARD
        }
    }

    /// The node graph for the current view; empty outside canvas views
    pub fn graph(&self) -> Graph {
        match self.view {
            View::Roadmap => roadmap_graph(self.ws.quests()),
            View::Project => match self.project() {
                Some(p) => project_graph(p, self.expanded_task.as_deref(), self.layout_profile()),
                None => Graph::default(),
            },
            View::Habits => Graph::default(),
        }
    }

    pub fn switch_view(&mut self, view: View) {
        if self.view != view {
            self.interaction.cancel();
            self.selected = None;
            self.link_source = None;
            self.view = view;
        }
    }

    /// Step through projects in the project view
    pub fn cycle_project(&mut self, forward: bool) {
        let ids: Vec<String> = self.ws.projects().iter().map(|p| p.id.clone()).collect();
        if ids.is_empty() {
            self.active_project = None;
            return;
        }
        let current = self
            .active_project
            .as_ref()
            .and_then(|id| ids.iter().position(|p| p == id));
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % ids.len(),
            (Some(i), false) => (i + ids.len() - 1) % ids.len(),
        };
        self.active_project = Some(ids[next].clone());
        self.expanded_task = None;
        self.selected = None;
        self.link_source = None;
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
            at: Instant::now(),
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!(message = %text, "action failed");
        self.status = Some(StatusMessage {
            text,
            is_error: true,
            at: Instant::now(),
        });
    }

    /// Turn workspace notices into status messages and drop stale ones
    pub fn drain_notices(&mut self) {
        while let Ok(notice) = self.notices.try_recv() {
            match notice {
                Notice::StoredLocally => self.set_status("stored locally (remote unreachable)"),
                Notice::Rejected(reason) => self.set_error(reason),
                Notice::LevelUp(level) => self.set_status(format!("LEVEL UP! now level {}", level)),
                Notice::TasksChanged | Notice::ProjectsChanged | Notice::MissionsChanged => {}
            }
        }
        if self.status.as_ref().is_some_and(|s| s.at.elapsed() > STATUS_TTL) {
            self.status = None;
        }
        // Forget a project that was deleted elsewhere
        if self.active_project.as_deref().is_some_and(|id| self.ws.project(id).is_none()) {
            self.active_project = self.ws.projects().first().map(|p| p.id.clone());
            self.expanded_task = None;
        }
    }
}

/// Restore UI state from .state.json
pub fn restore_ui_state(app: &mut App) {
    let Some(ui_state) = read_ui_state(&app.ws.paths.nova_dir) else {
        return;
    };

    if let Some(view) = View::parse(&ui_state.view) {
        app.view = view;
    }
    if let Some(id) = ui_state.active_project
        && app.ws.project(&id).is_some()
    {
        app.active_project = Some(id);
    }
    app.expanded_task = ui_state.expanded_task;
    app.habit_week_offset = ui_state.habit_week_offset;

    for (key, vp) in ui_state.viewports {
        let range = if key == ROADMAP_KEY {
            ZoomRange::ROADMAP
        } else {
            ZoomRange::WORKSPACE
        };
        let mut viewport = Viewport::new(range);
        viewport.pan_by(vp.pan_x, vp.pan_y);
        viewport.zoom = vp.zoom.clamp(range.min, range.max);
        app.viewports.insert(key, viewport);
    }
}

/// Save UI state to .state.json
pub fn save_ui_state(app: &App) {
    let viewports = app
        .viewports
        .iter()
        .map(|(key, vp)| {
            (
                key.clone(),
                ViewportState {
                    pan_x: vp.pan.x,
                    pan_y: vp.pan.y,
                    zoom: vp.zoom,
                },
            )
        })
        .collect();
    let ui_state = UiState {
        view: app.view.as_str().to_string(),
        active_project: app.active_project.clone(),
        expanded_task: app.expanded_task.clone(),
        viewports,
        habit_week_offset: app.habit_week_offset,
    };
    if let Err(e) = write_ui_state(&app.ws.paths.nova_dir, &ui_state) {
        tracing::warn!(error = %e, "could not save UI state");
    }
}

/// Run the TUI application
pub fn run(dir: Option<&str>, verbose: u8, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let start = match dir {
        Some(d) => std::fs::canonicalize(d)?,
        None => std::env::current_dir()?,
    };
    let paths = workspace_io::discover_workspace(&start)?;
    logging::init_file(&paths.log_path(), verbose, quiet);

    let config = workspace_io::load_config(&paths)?;
    let remote = Arc::new(Remote::from_config(&config.remote));
    let poll = Duration::from_secs(config.remote.poll_secs.max(1));
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let mut ws = Workspace::open(paths, config, remote.clone())?;
    if !remote.is_offline()
        && let Err(e) = rt.block_on(ws.refresh())
    {
        tracing::warn!(error = %e, "initial fetch failed, showing cached data");
    }

    // Live updates: other processes writing the cache, and remote changes
    let watcher = match CacheWatcher::start(&ws.paths.user_dir(ws.user_id())) {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, "cache watcher unavailable");
            None
        }
    };
    let feed = if remote.is_offline() {
        None
    } else {
        match RemoteFeed::spawn(remote, ws.user_id().to_string(), ws.tasks().to_vec(), poll) {
            Ok(sub) => Some(sub),
            Err(e) => {
                tracing::warn!(error = %e, "remote feed unavailable");
                None
            }
        }
    };

    let mut app = App::new(ws, rt);
    restore_ui_state(&mut app);
    tracing::info!(user = %app.ws.user_id(), "tui started");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_event_loop(&mut terminal, &mut app, watcher.as_ref(), feed.as_ref());

    save_ui_state(&app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    watcher: Option<&CacheWatcher>,
    feed: Option<&Subscription>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut save_counter = 0u32;
    loop {
        terminal.draw(|frame| render::render(frame, app))?;

        if event::poll(Duration::from_millis(250))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    input::handle_key(app, key);
                    // Debounced state save: every ~5 key presses
                    save_counter += 1;
                    if save_counter >= 5 {
                        save_ui_state(app);
                        save_counter = 0;
                    }
                }
                Event::Mouse(mouse) => input::handle_mouse(app, mouse),
                _ => {}
            }
        }

        if let Some(w) = watcher
            && !w.poll().is_empty()
        {
            tracing::debug!("cache changed on disk, reloading");
            app.ws.reload_from_disk();
        }
        if let Some(f) = feed {
            let events = f.poll();
            if !events.is_empty()
                && let Err(e) = app.ws.apply_remote(events)
            {
                app.set_error(e.to_string());
            }
        }
        app.drain_notices();

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Open an app over an offline workspace in `root` for tests
#[cfg(test)]
pub fn test_app(root: &std::path::Path) -> App {
    let paths = workspace_io::WorkspacePaths::new(root);
    let mut config = crate::model::config::NovaConfig::default();
    config.user.id = "u1".into();
    let remote = Arc::new(Remote::from_config(&config.remote));
    let ws = Workspace::open(paths, config, remote).unwrap();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    App::new(ws, rt)
}
