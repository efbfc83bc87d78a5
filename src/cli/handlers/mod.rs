mod account;
mod ai;
mod init;
mod projects;
mod tasks;
pub use init::cmd_init;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::workspace_io;
use crate::model::category::{ExecutionStyle, ProjectField};
use crate::model::project::Project;
use crate::model::task::Complexity;
use crate::ops::search;
use crate::store::remote::Remote;
use crate::workspace::Workspace;

pub type HandlerResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> HandlerResult {
    let json = cli.json;

    let dir = match &cli.workspace_dir {
        Some(d) => Some(
            std::fs::canonicalize(d)
                .map_err(|e| format!("cannot resolve -C path '{}': {}", d, e))?,
        ),
        None => None,
    };
    let dir = dir.as_deref();

    match cli.command {
        None => Err("no command given (run `nova` without arguments for the TUI)".into()),
        Some(cmd) => match cmd {
            // Init is handled in main.rs before workspace discovery
            Commands::Init(args) => cmd_init(args, cli.workspace_dir.as_deref()),
            Commands::Remote(args) => init::cmd_remote(args, dir, json),

            // Standalone tasks and habits
            Commands::Task(args) => tasks::cmd_task(args, &mut Session::open(dir)?, json),
            Commands::Habit(args) => tasks::cmd_habit(args, &mut Session::open(dir)?, json),

            // Missions and projects
            Commands::Mission(args) => projects::cmd_mission(args, &mut Session::open(dir)?, json),
            Commands::Project(args) => projects::cmd_project(args, &mut Session::open(dir)?, json),
            Commands::Phase(args) => projects::cmd_phase(args, &mut Session::open(dir)?),
            Commands::Step(args) => projects::cmd_step(args, &mut Session::open(dir)?),
            Commands::Sub(args) => projects::cmd_sub(args, &mut Session::open(dir)?),
            Commands::Link(args) => projects::cmd_link(args, &mut Session::open(dir)?, true),
            Commands::Unlink(args) => projects::cmd_link(args, &mut Session::open(dir)?, false),
            Commands::Undo => cmd_undo(&mut Session::open(dir)?, true),
            Commands::Redo => cmd_undo(&mut Session::open(dir)?, false),

            // Progress and sync
            Commands::Level => cmd_level(&Session::open(dir)?, json),
            Commands::Sync => cmd_sync(&mut Session::open(dir)?, json),
            Commands::Search(args) => cmd_search(args, &Session::open(dir)?, json),

            // Account and assistants
            Commands::Profile(args) => account::cmd_profile(args, &mut Session::open(dir)?, json),
            Commands::Ai(args) => ai::cmd_ai(args, &mut Session::open(dir)?, json),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// An opened workspace plus the runtime its remote calls run on
pub(crate) struct Session {
    pub ws: Workspace<Remote>,
    pub rt: tokio::runtime::Runtime,
}

impl Session {
    /// Discover, load config, open the cache, and pull remote rows when a
    /// remote is configured.
    pub fn open(dir: Option<&Path>) -> Result<Session, Box<dyn std::error::Error>> {
        let paths = workspace_io::discover_workspace(&workspace_start(dir)?)?;
        let config = workspace_io::load_config(&paths)?;
        let remote = Remote::from_config(&config.remote);
        let online = !remote.is_offline();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let mut ws = Workspace::open(paths, config, remote)?;
        if online {
            rt.block_on(ws.refresh())?;
        }
        Ok(Session { ws, rt })
    }
}

pub(super) fn workspace_start(dir: Option<&Path>) -> std::io::Result<PathBuf> {
    match dir {
        Some(d) => Ok(d.to_path_buf()),
        None => std::env::current_dir(),
    }
}

pub(super) fn print_json<T: Serialize + ?Sized>(value: &T) -> HandlerResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Resolve `query` against `ids`: an exact id wins, otherwise a unique prefix.
pub(super) fn resolve_id<'a>(
    kind: &str,
    query: &str,
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<String, String> {
    let mut matches = Vec::new();
    for id in ids {
        if id == query {
            return Ok(id.to_string());
        }
        if id.starts_with(query) {
            matches.push(id);
        }
    }
    match matches.as_slice() {
        [] => Err(format!("{} not found: {}", kind, query)),
        [one] => Ok(one.to_string()),
        many => Err(format!(
            "ambiguous {} id '{}': matches {}",
            kind,
            query,
            many.join(", ")
        )),
    }
}

pub(super) fn find_project<'a>(ws: &'a Workspace<Remote>, query: &str) -> Result<&'a Project, String> {
    let id = resolve_id("project", query, ws.projects().iter().map(|p| p.id.as_str()))?;
    ws.project(&id)
        .ok_or_else(|| format!("project not found: {}", query))
}

pub(super) fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}

pub(super) fn parse_complexity(s: &str) -> Result<Complexity, String> {
    Complexity::parse(s).ok_or_else(|| format!("unknown complexity '{}' (expected E, D, C, B, A or S)", s))
}

pub(super) fn parse_field(s: &str) -> Result<ProjectField, String> {
    ProjectField::parse(s).ok_or_else(|| {
        format!(
            "unknown field '{}' (expected BUSINESS, TECH, FITNESS, SKILLS, PERSONAL, ART or OTHER)",
            s
        )
    })
}

pub(super) fn parse_style(s: &str) -> Result<ExecutionStyle, String> {
    ExecutionStyle::parse(s)
        .ok_or_else(|| format!("unknown style '{}' (expected STRUCTURED, PARALLEL or SPRINT)", s))
}

pub(super) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

// ---------------------------------------------------------------------------
// History, level, sync, search
// ---------------------------------------------------------------------------

fn cmd_undo(s: &mut Session, undo: bool) -> HandlerResult {
    let changed = if undo { s.ws.undo()? } else { s.ws.redo()? };
    match (changed, undo) {
        (true, true) => println!("undone"),
        (true, false) => println!("redone"),
        (false, true) => println!("nothing to undo"),
        (false, false) => println!("nothing to redo"),
    }
    Ok(())
}

fn cmd_level(s: &Session, json: bool) -> HandlerResult {
    let level = s.ws.level();
    let total = s.ws.total_xp();
    if json {
        print_json(&level_to_json(&level, total))?;
    } else {
        println!("{}", format_level(&level, total));
    }
    Ok(())
}

fn cmd_sync(s: &mut Session, json: bool) -> HandlerResult {
    if s.ws.repository().remote().is_offline() {
        return Err("no remote configured (run `nova remote set <URL> --key <KEY>`)".into());
    }
    let pushed = s.rt.block_on(s.ws.sync())?;
    let pending = s.ws.tasks().iter().filter(|t| t.is_local()).count();
    if json {
        print_json(&serde_json::json!({
            "pushed": pushed,
            "pending": pending,
            "tasks": s.ws.tasks().len(),
        }))?;
    } else {
        println!("pushed {} local task(s), {} still pending", pushed, pending);
    }
    Ok(())
}

fn cmd_search(args: SearchArgs, s: &Session, json: bool) -> HandlerResult {
    let re = Regex::new(&args.pattern)?;
    let hits = match &args.project {
        Some(q) => search::search_project(find_project(&s.ws, q)?, &re),
        None => search::search_all(s.ws.tasks(), s.ws.projects(), &re),
    };

    if json {
        let out: Vec<SearchHitJson> = hits.iter().map(search_hit_to_json).collect();
        return print_json(&out);
    }

    // One line per task, even when several fields matched
    for task_id in search::matched_task_ids(&hits) {
        if let Some(task) = s.ws.task(task_id) {
            println!("[quest] {}", format_task_line(task));
            continue;
        }
        for project in s.ws.projects() {
            if let Some(task) = project.find_task(task_id) {
                println!("[{}] {}", project.title, format_task_line(task));
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_exact_then_unique_prefix() {
        let ids = ["task-abc", "task-abd", "task-x"];
        assert_eq!(resolve_id("task", "task-x", ids).unwrap(), "task-x");
        assert_eq!(resolve_id("task", "task-abc", ids).unwrap(), "task-abc");
        assert_eq!(resolve_id("task", "task-abd", ids).unwrap(), "task-abd");
        let err = resolve_id("task", "task-ab", ids).unwrap_err();
        assert!(err.starts_with("ambiguous task id"));
        assert_eq!(
            resolve_id("task", "nope", ids).unwrap_err(),
            "task not found: nope"
        );
    }

    #[test]
    fn exact_match_beats_longer_prefix_match() {
        let ids = ["ab", "abc"];
        assert_eq!(resolve_id("task", "ab", ids).unwrap(), "ab");
    }

    #[test]
    fn parse_helpers_reject_garbage() {
        assert!(parse_date("2025-03-10").is_ok());
        assert!(parse_date("10/03/2025").is_err());
        assert_eq!(parse_complexity("s").unwrap(), Complexity::S);
        assert!(parse_field("cooking").is_err());
        assert!(parse_style("sprint").is_ok());
    }
}
