use crate::ai::{self, tools};
use crate::canvas::layout::{LayoutProfile, project_graph};
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::model::project::Project;
use crate::ops::habit_ops;
use crate::ops::mission_ops::{Intensity, MissionDraft, ProjectDraft};
use crate::ops::tree_ops::{self, SubtaskEdit, TaskEdit};

use super::{
    HandlerResult, Session, find_project, parse_complexity, parse_date, parse_field, parse_style,
    print_json, resolve_id,
};

// ---------------------------------------------------------------------------
// Missions
// ---------------------------------------------------------------------------

pub(super) fn cmd_mission(args: MissionCmd, s: &mut Session, json: bool) -> HandlerResult {
    match args.action {
        MissionAction::Add(a) => {
            let fields = a
                .fields
                .iter()
                .map(|f| parse_field(f))
                .collect::<Result<Vec<_>, _>>()?;
            let intensity = Intensity::parse(&a.intensity).ok_or_else(|| {
                format!(
                    "unknown intensity '{}' (expected CASUAL, STANDARD or HARDCORE)",
                    a.intensity
                )
            })?;
            let draft = MissionDraft {
                vision: a.vision,
                fields,
                intensity,
            };
            draft.validate()?;

            let structure = if a.ai {
                let client = ai::connect(&s.ws.config.ai, s.ws.cache())?;
                let structure = s.rt.block_on(tools::generate_quest_structure(
                    &client,
                    &draft.vision,
                    &draft.fields,
                    draft.intensity,
                ));
                if structure.is_none() {
                    eprintln!("warning: no structure generated, mission created empty");
                }
                structure
            } else {
                None
            };

            let mission = s.ws.create_mission(&draft, structure)?;
            if json {
                return print_json(&mission_to_json(&mission));
            }
            for line in format_mission(&mission, s.ws.projects()) {
                println!("{}", line);
            }
            Ok(())
        }
        MissionAction::List => {
            if json {
                let out: Vec<MissionJson> = s.ws.missions().iter().map(mission_to_json).collect();
                return print_json(&out);
            }
            for mission in s.ws.missions() {
                for line in format_mission(mission, s.ws.projects()) {
                    println!("{}", line);
                }
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

pub(super) fn cmd_project(args: ProjectCmd, s: &mut Session, json: bool) -> HandlerResult {
    match args.action {
        ProjectAction::Add(a) => {
            let mission_id = match &a.mission {
                Some(q) => Some(resolve_id(
                    "mission",
                    q,
                    s.ws.missions().iter().map(|m| m.id.as_str()),
                )?),
                None => None,
            };
            let draft = ProjectDraft {
                name: a.name,
                field: parse_field(&a.field)?,
                style: parse_style(&a.style)?,
                mission_id,
            };

            let plan = if a.ai {
                let client = ai::connect(&s.ws.config.ai, s.ws.cache())?;
                Some(s.rt.block_on(tools::generate_project_phases(
                    &client,
                    &draft.name,
                    draft.field,
                    draft.style,
                )))
            } else {
                None
            };

            let project = s.ws.create_project(&draft, plan)?;
            if json {
                return print_json(&project_to_json(&project, true));
            }
            println!("{}", project.id);
            Ok(())
        }
        ProjectAction::List => {
            if json {
                let out: Vec<ProjectJson> = s
                    .ws
                    .projects()
                    .iter()
                    .map(|p| project_to_json(p, false))
                    .collect();
                return print_json(&out);
            }
            for project in s.ws.projects() {
                println!("{}", format_project_line(project));
            }
            Ok(())
        }
        ProjectAction::Show(a) => {
            let project = find_project(&s.ws, &a.id)?;
            if json {
                return print_json(&project_to_json(project, true));
            }
            for line in format_project_tree(project) {
                println!("{}", line);
            }
            Ok(())
        }
        ProjectAction::Graph(a) => {
            let project = find_project(&s.ws, &a.id)?;
            let expanded = match &a.expand {
                Some(q) => Some(resolve_id("step", q, step_ids(project))?),
                None => None,
            };
            let profile = if a.compact || s.ws.config.canvas.compact {
                &LayoutProfile::COMPACT
            } else {
                &LayoutProfile::STANDARD
            };
            let graph = graph_to_json(&project_graph(project, expanded.as_deref(), profile));
            if json {
                return print_json(&graph);
            }
            for n in &graph.nodes {
                let lock = if n.locked { " (locked)" } else { "" };
                println!(
                    "{:<7} {} at ({:.0}, {:.0}) {}{}",
                    n.kind, n.id, n.x, n.y, n.title, lock
                );
            }
            for e in &graph.edges {
                println!("{} -> {} [{}] {}", e.source, e.target, e.kind, e.path);
            }
            Ok(())
        }
        ProjectAction::Rm(a) => {
            let id = find_project(&s.ws, &a.id)?.id.clone();
            let removed = s.ws.delete_project(&id)?;
            println!("deleted {} ({})", removed.title, removed.id);
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Phases, steps, subtasks, links
// ---------------------------------------------------------------------------

fn phase_ids(project: &Project) -> impl Iterator<Item = &str> {
    project.phases.iter().map(|p| p.id.as_str())
}

fn step_ids(project: &Project) -> impl Iterator<Item = &str> {
    project.all_tasks().map(|t| t.id.as_str())
}

fn subtask_ids(project: &Project) -> impl Iterator<Item = &str> {
    project
        .all_tasks()
        .flat_map(|t| t.subtasks.iter().map(|s| s.id.as_str()))
}

#[derive(Clone, Copy)]
enum Lookup {
    Phase,
    Step,
    Subtask,
}

/// Project id plus a node id resolved inside it
fn locate(s: &Session, project: &str, lookup: Lookup, node: &str) -> Result<(String, String), String> {
    let p = find_project(&s.ws, project)?;
    let id = match lookup {
        Lookup::Phase => resolve_id("phase", node, phase_ids(p))?,
        Lookup::Step => resolve_id("step", node, step_ids(p))?,
        Lookup::Subtask => resolve_id("subtask", node, subtask_ids(p))?,
    };
    Ok((p.id.clone(), id))
}

pub(super) fn cmd_phase(args: PhaseCmd, s: &mut Session) -> HandlerResult {
    match args.action {
        PhaseAction::Add(a) => {
            let pid = find_project(&s.ws, &a.project)?.id.clone();
            let title = a.title.filter(|t| !t.trim().is_empty());
            let id = s
                .ws
                .mutate_project(&pid, |p| Ok(tree_ops::add_phase(p, title.as_deref())))?;
            println!("{}", id);
        }
        PhaseAction::Rename(a) => {
            let (pid, phase) = locate(s, &a.project, Lookup::Phase, &a.phase)?;
            s.ws
                .mutate_project(&pid, |p| tree_ops::rename_phase(p, &phase, &a.title))?;
            println!("renamed {}", phase);
        }
    }
    Ok(())
}

pub(super) fn cmd_step(args: StepCmd, s: &mut Session) -> HandlerResult {
    match args.action {
        StepAction::Add(a) => {
            let (pid, phase) = locate(s, &a.project, Lookup::Phase, &a.phase)?;
            let title = a.title.trim().to_string();
            if title.is_empty() {
                return Err("step title cannot be empty".into());
            }
            let id = s
                .ws
                .mutate_project(&pid, |p| tree_ops::add_task(p, &phase, &title))?;
            println!("{}", id);
        }
        StepAction::Edit(a) => {
            let (pid, id) = locate(s, &a.project, Lookup::Step, &a.id)?;
            let complexity = a.complexity.as_deref().map(parse_complexity).transpose()?;
            let due_date = match a.due {
                Some(d) if d.trim().is_empty() => Some(String::new()),
                Some(d) => Some(habit_ops::date_key(parse_date(&d)?)),
                None => None,
            };
            let edit = TaskEdit {
                title: a.title.filter(|t| !t.trim().is_empty()),
                description: a.desc,
                link_url: a.link,
                link_label: a.label,
                complexity,
                xp_value: a.xp,
                due_date,
            };
            s.ws.mutate_project(&pid, |p| tree_ops::edit_task(p, &id, edit))?;
            println!("updated {}", id);
        }
        StepAction::Done(a) => {
            let (pid, id) = locate(s, &a.project, Lookup::Step, &a.id)?;
            let done = s.ws.mutate_project(&pid, |p| tree_ops::toggle_task(p, &id))?;
            println!("{} {}", id, if done { "complete" } else { "reopened" });
        }
        StepAction::Rm(a) => {
            let (pid, id) = locate(s, &a.project, Lookup::Step, &a.id)?;
            let removed = s.ws.mutate_project(&pid, |p| tree_ops::delete_task(p, &id))?;
            println!("deleted {} ({} subtasks)", removed.id, removed.subtasks.len());
        }
    }
    Ok(())
}

pub(super) fn cmd_sub(args: SubCmd, s: &mut Session) -> HandlerResult {
    match args.action {
        SubAction::Add(a) => {
            let (pid, step) = locate(s, &a.project, Lookup::Step, &a.step)?;
            let title = a.title.trim().to_string();
            if title.is_empty() {
                return Err("subtask title cannot be empty".into());
            }
            let edit = SubtaskEdit {
                xp: a.xp,
                is_blocker: a.blocker.then_some(true),
                ..Default::default()
            };
            let id = s.ws.mutate_project(&pid, |p| {
                let id = tree_ops::add_subtask(p, &step, &title)?;
                tree_ops::edit_subtask(p, &id, edit)?;
                Ok(id)
            })?;
            println!("{}", id);
        }
        SubAction::Done(a) => {
            let (pid, id) = locate(s, &a.project, Lookup::Subtask, &a.id)?;
            let done = s.ws.mutate_project(&pid, |p| tree_ops::toggle_subtask(p, &id))?;
            println!("{} {}", id, if done { "complete" } else { "reopened" });
        }
        SubAction::Rm(a) => {
            let (pid, id) = locate(s, &a.project, Lookup::Subtask, &a.id)?;
            s.ws.mutate_project(&pid, |p| tree_ops::delete_subtask(p, &id))?;
            println!("deleted {}", id);
        }
    }
    Ok(())
}

pub(super) fn cmd_link(args: NodeLinkArgs, s: &mut Session, link: bool) -> HandlerResult {
    let project = find_project(&s.ws, &args.project)?;
    let nodes = || step_ids(project).chain(subtask_ids(project));
    let source = resolve_id("node", &args.source, nodes())?;
    let target = resolve_id("node", &args.target, nodes())?;
    let pid = project.id.clone();

    if link {
        if s.ws.mutate_project(&pid, |p| tree_ops::link(p, &source, &target))? {
            println!("linked {} -> {}", source, target);
        } else {
            println!("already linked");
        }
    } else if s.ws.mutate_project(&pid, |p| tree_ops::unlink(p, &source, &target))? {
        println!("unlinked {} -> {}", source, target);
    } else {
        println!("no such link");
    }
    Ok(())
}
