use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::canvas::Point;
use crate::model::category::Category;
use crate::model::task::{Task, new_id};
use crate::ops::habit_ops;
use crate::ops::mission_ops::ProjectDraft;
use crate::ops::tree_ops;
use crate::tui::app::{App, Mode, PromptKind, View};
use crate::tui::render::canvas_view::canvas_center;
use crate::util::unicode::{next_char_boundary, prev_char_boundary};

pub(super) fn handle_prompt(app: &mut App, kind: PromptKind, key: KeyEvent) {
    match (key.modifiers, key.code) {
        (_, KeyCode::Esc) => close(app),
        (_, KeyCode::Enter) => {
            let text = app.input.trim().to_string();
            close(app);
            if !text.is_empty() {
                submit(app, kind, &text);
            }
        }
        (_, KeyCode::Backspace) => {
            if let Some(prev) = prev_char_boundary(&app.input, app.input_cursor) {
                app.input.replace_range(prev..app.input_cursor, "");
                app.input_cursor = prev;
            }
        }
        (_, KeyCode::Delete) => {
            if let Some(next) = next_char_boundary(&app.input, app.input_cursor) {
                app.input.replace_range(app.input_cursor..next, "");
            }
        }
        (_, KeyCode::Left) => {
            if let Some(prev) = prev_char_boundary(&app.input, app.input_cursor) {
                app.input_cursor = prev;
            }
        }
        (_, KeyCode::Right) => {
            if let Some(next) = next_char_boundary(&app.input, app.input_cursor) {
                app.input_cursor = next;
            }
        }
        (_, KeyCode::Home) | (KeyModifiers::CONTROL, KeyCode::Char('a')) => app.input_cursor = 0,
        (_, KeyCode::End) | (KeyModifiers::CONTROL, KeyCode::Char('e')) => {
            app.input_cursor = app.input.len();
        }
        (KeyModifiers::CONTROL, KeyCode::Char('u')) => {
            app.input.replace_range(..app.input_cursor, "");
            app.input_cursor = 0;
        }
        (m, KeyCode::Char(c)) if !m.contains(KeyModifiers::CONTROL) => {
            app.input.insert(app.input_cursor, c);
            app.input_cursor += c.len_utf8();
        }
        _ => {}
    }
}

fn close(app: &mut App) {
    app.mode = Mode::Navigate;
    app.input.clear();
    app.input_cursor = 0;
}

fn submit(app: &mut App, kind: PromptKind, text: &str) {
    let result = match kind {
        PromptKind::AddQuest => add_quest(app, text),
        PromptKind::AddHabit => {
            let habit = habit_ops::new_habit(text, &[], app.ws.user_id());
            app.rt
                .block_on(app.ws.add_task(habit))
                .map(|_| ())
                .map_err(|e| e.to_string())
        }
        PromptKind::AddProject => add_project(app, text),
        PromptKind::AddStep => add_step(app, text),
        PromptKind::AddSubtask => add_subtask(app, text),
    };
    match result {
        Ok(()) => app.set_status(format!("{} added", kind.label().trim_start_matches("new "))),
        Err(e) => app.set_error(e),
    }
}

/// New roadmap quests land in the middle of the visible canvas
fn add_quest(app: &mut App, title: &str) -> Result<(), String> {
    let center = app.viewport().to_world(canvas_center(app.canvas_area));
    let mut task = Task::new(new_id("task"), title.to_string(), Category::Roadmap);
    task.user_id = app.ws.user_id().to_string();
    let corner = center - Point::new(crate::canvas::layout::ROADMAP_NODE_W / 2.0, 0.0);
    task.set_position(corner.x.round(), corner.y.round());
    let stored = app
        .rt
        .block_on(app.ws.add_task(task))
        .map_err(|e| e.to_string())?;
    app.selected = Some(stored.id);
    Ok(())
}

fn add_project(app: &mut App, name: &str) -> Result<(), String> {
    let draft = ProjectDraft {
        name: name.to_string(),
        ..Default::default()
    };
    let project = app
        .ws
        .create_project(&draft, None)
        .map_err(|e| e.to_string())?;
    app.active_project = Some(project.id);
    app.expanded_task = None;
    app.switch_view(View::Project);
    Ok(())
}

/// A step goes into the phase of the selected node, else the first open phase
fn add_step(app: &mut App, title: &str) -> Result<(), String> {
    let project = app.project().ok_or("no active project")?;
    let selected_phase = app.selected.as_deref().and_then(|id| {
        project.phases.iter().find(|ph| {
            ph.tasks
                .iter()
                .any(|t| t.id == id || t.find_subtask(id).is_some())
        })
    });
    let phase = selected_phase
        .or_else(|| project.phases.iter().find(|ph| !ph.is_locked()))
        .or_else(|| project.phases.first())
        .map(|ph| ph.id.clone())
        .ok_or("project has no phases")?;
    let pid = project.id.clone();

    let id = app
        .ws
        .mutate_project(&pid, |p| tree_ops::add_task(p, &phase, title))
        .map_err(|e| e.to_string())?;
    app.selected = Some(id);
    Ok(())
}

fn add_subtask(app: &mut App, title: &str) -> Result<(), String> {
    let pid = app.active_project.clone().ok_or("no active project")?;
    let task_id = app.selected.clone().ok_or("select a step first")?;
    app.ws
        .mutate_project(&pid, |p| tree_ops::add_subtask(p, &task_id, title))
        .map_err(|e| e.to_string())?;
    app.expanded_task = Some(task_id);
    Ok(())
}
