use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::canvas::layout::NodeKind;
use crate::ops::tree_ops;
use crate::tui::app::{App, Mode, PromptKind, View};
use crate::tui::render::canvas_view::canvas_center;

use super::canvas;

/// Screen pixels an arrow key pans the canvas
const PAN_STEP: f64 = 80.0;

/// Keys that work in every view. Returns true if the key was consumed.
pub(super) fn handle_global(app: &mut App, key: KeyEvent) -> bool {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) | (_, KeyCode::Char('q')) => {
            app.should_quit = true;
        }
        (KeyModifiers::CONTROL, KeyCode::Char('r')) | (_, KeyCode::Char('U')) => redo(app),
        (_, KeyCode::Char('?')) => app.show_help = true,
        (_, KeyCode::Char('1')) => app.switch_view(View::Roadmap),
        (_, KeyCode::Char('2')) => {
            app.switch_view(View::Project);
            if app.active_project.is_none() {
                app.cycle_project(true);
            }
        }
        (_, KeyCode::Char('3')) => app.switch_view(View::Habits),
        (_, KeyCode::Char(']')) if app.view == View::Project => app.cycle_project(true),
        (_, KeyCode::Char('[')) if app.view == View::Project => app.cycle_project(false),
        (_, KeyCode::Char('u')) => undo(app),
        (_, KeyCode::Char('P')) => open_prompt(app, PromptKind::AddProject),
        (_, KeyCode::Char('S')) => sync(app),
        _ => return false,
    }
    true
}

pub(super) fn open_prompt(app: &mut App, kind: PromptKind) {
    app.mode = Mode::Prompt(kind);
    app.input.clear();
    app.input_cursor = 0;
}

fn undo(app: &mut App) {
    match app.ws.undo() {
        Ok(true) => app.set_status("undone"),
        Ok(false) => app.set_status("nothing to undo"),
        Err(e) => app.set_error(e.to_string()),
    }
}

fn redo(app: &mut App) {
    match app.ws.redo() {
        Ok(true) => app.set_status("redone"),
        Ok(false) => app.set_status("nothing to redo"),
        Err(e) => app.set_error(e.to_string()),
    }
}

fn sync(app: &mut App) {
    if app.ws.repository().remote().is_offline() {
        app.set_error("offline: no remote configured");
        return;
    }
    match app.rt.block_on(app.ws.sync()) {
        Ok(0) => app.set_status("up to date"),
        Ok(n) => app.set_status(format!("pushed {} local record(s)", n)),
        Err(e) => app.set_error(e.to_string()),
    }
}

/// Keys for the roadmap and project canvases
pub(super) fn handle_canvas_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.interaction.cancel();
            if app.link_source.take().is_some() {
                app.set_status("link cancelled");
            } else {
                app.selected = None;
            }
        }
        KeyCode::Left => pan(app, PAN_STEP, 0.0),
        KeyCode::Right => pan(app, -PAN_STEP, 0.0),
        KeyCode::Up => pan(app, 0.0, PAN_STEP),
        KeyCode::Down => pan(app, 0.0, -PAN_STEP),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            if let Some(vp) = app.viewport_mut() {
                vp.zoom_in();
            }
        }
        KeyCode::Char('-') => {
            if let Some(vp) = app.viewport_mut() {
                vp.zoom_out();
            }
        }
        KeyCode::Char('0') => {
            if let Some(vp) = app.viewport_mut() {
                vp.reset();
            }
        }
        KeyCode::Tab => cycle_selection(app, true),
        KeyCode::BackTab => cycle_selection(app, false),
        KeyCode::Enter => expand_selected(app),
        KeyCode::Char(' ') | KeyCode::Char('x') => toggle_selected(app),
        KeyCode::Char('l') => keyboard_link(app),
        KeyCode::Char('d') | KeyCode::Delete => delete_selected(app),
        KeyCode::Char('a') => match app.view {
            View::Roadmap => open_prompt(app, PromptKind::AddQuest),
            _ if app.project().is_some() => open_prompt(app, PromptKind::AddStep),
            _ => app.set_error("no project: press P to create one"),
        },
        KeyCode::Char('s') if app.view == View::Project => {
            if selected_kind(app) == Some(NodeKind::Task) {
                open_prompt(app, PromptKind::AddSubtask);
            } else {
                app.set_error("select a step first");
            }
        }
        _ => {}
    }
}

fn pan(app: &mut App, dx: f64, dy: f64) {
    if let Some(vp) = app.viewport_mut() {
        vp.pan_by(dx, dy);
    }
}

fn selected_kind(app: &App) -> Option<NodeKind> {
    let id = app.selected.as_deref()?;
    app.graph().node(id).map(|n| n.kind)
}

/// Move the selection through the nodes in draw order and bring it into view
fn cycle_selection(app: &mut App, forward: bool) {
    let graph = app.graph();
    let n = graph.nodes.len();
    if n == 0 {
        return;
    }
    let current = app
        .selected
        .as_ref()
        .and_then(|id| graph.nodes.iter().position(|node| &node.id == id));
    let next = match (current, forward) {
        (None, true) => 0,
        (None, false) => n - 1,
        (Some(i), true) => (i + 1) % n,
        (Some(i), false) => (i + n - 1) % n,
    };
    let node = &graph.nodes[next];
    app.selected = Some(node.id.clone());
    let screen = canvas_center(app.canvas_area);
    if let Some(vp) = app.viewport_mut() {
        vp.center_on(node.center(), screen);
    }
}

fn expand_selected(app: &mut App) {
    if app.view != View::Project || selected_kind(app) != Some(NodeKind::Task) {
        return;
    }
    let selected = app.selected.clone();
    if app.expanded_task == selected {
        app.expanded_task = None;
    } else {
        app.expanded_task = selected;
    }
}

fn toggle_selected(app: &mut App) {
    let Some(id) = app.selected.clone() else {
        return;
    };
    match app.view {
        View::Roadmap => match app.rt.block_on(app.ws.toggle_task(&id)) {
            Ok(true) => {
                let xp = app.ws.task(&id).map(|t| t.effective_xp()).unwrap_or(0);
                app.set_status(format!("quest complete +{} XP", xp));
            }
            Ok(false) => app.set_status("quest reopened"),
            Err(e) => app.set_error(e.to_string()),
        },
        View::Project => {
            let Some(pid) = app.active_project.clone() else {
                return;
            };
            let kind = selected_kind(app);
            let result = app.ws.mutate_project(&pid, |p| match kind {
                Some(NodeKind::Subtask) => tree_ops::toggle_subtask(p, &id),
                _ => tree_ops::toggle_task(p, &id),
            });
            match result {
                Ok(true) => app.set_status("complete"),
                Ok(false) => app.set_status("reopened"),
                Err(e) => app.set_error(e.to_string()),
            }
        }
        View::Habits => {}
    }
}

/// `l` once marks the source, `l` again on another node links them
fn keyboard_link(app: &mut App) {
    let Some(selected) = app.selected.clone() else {
        app.set_error("select a node first");
        return;
    };
    match app.link_source.take() {
        None => {
            app.link_source = Some(selected);
            app.set_status("linking: select the target and press l");
        }
        Some(source) if source == selected => app.set_status("link cancelled"),
        Some(source) => canvas::link(app, &source, &selected),
    }
}

fn delete_selected(app: &mut App) {
    let Some(id) = app.selected.clone() else {
        return;
    };
    let result = match app.view {
        View::Roadmap => app
            .rt
            .block_on(app.ws.delete_task(&id))
            .map_err(|e| e.to_string()),
        View::Project => {
            let Some(pid) = app.active_project.clone() else {
                return;
            };
            let kind = selected_kind(app);
            app.ws
                .mutate_project(&pid, |p| match kind {
                    Some(NodeKind::Subtask) => tree_ops::delete_subtask(p, &id).map(|_| ()),
                    _ => tree_ops::delete_task(p, &id).map(|_| ()),
                })
                .map_err(|e| e.to_string())
        }
        View::Habits => return,
    };
    match result {
        Ok(()) => {
            if app.expanded_task.as_deref() == Some(id.as_str()) {
                app.expanded_task = None;
            }
            app.selected = None;
            app.set_status("deleted");
        }
        Err(e) => app.set_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::Category;
    use crate::model::task::Task;
    use crate::ops::mission_ops::ProjectDraft;
    use crate::tui::app::test_app;
    use crate::tui::input::handle_key;
    use ratatui::layout::Rect;
    use tempfile::TempDir;

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn project_app(tmp: &TempDir) -> (App, String) {
        let mut app = test_app(tmp.path());
        let project = app
            .ws
            .create_project(
                &ProjectDraft {
                    name: "Launch".into(),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        let phase = project.phases[0].id.clone();
        let step = app
            .ws
            .mutate_project(&project.id, |p| tree_ops::add_task(p, &phase, "Draft"))
            .unwrap();
        app.active_project = Some(project.id.clone());
        app.switch_view(View::Project);
        app.canvas_area = Rect::new(0, 2, 80, 20);
        (app, step)
    }

    #[test]
    fn number_keys_switch_views() {
        let tmp = TempDir::new().unwrap();
        let mut app = test_app(tmp.path());
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.view, View::Habits);
        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.view, View::Roadmap);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn space_completes_the_selected_step_and_u_undoes() {
        let tmp = TempDir::new().unwrap();
        let (mut app, step) = project_app(&tmp);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.selected.as_deref(), Some(step.as_str()));

        press(&mut app, KeyCode::Char(' '));
        let done = |app: &App| app.project().unwrap().find_task(&step).unwrap().completed;
        assert!(done(&app));

        press(&mut app, KeyCode::Char('u'));
        assert!(!done(&app));
        handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL),
        );
        assert!(done(&app));
    }

    #[test]
    fn enter_expands_the_selected_step() {
        let tmp = TempDir::new().unwrap();
        let (mut app, step) = project_app(&tmp);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.expanded_task.as_deref(), Some(step.as_str()));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.expanded_task, None);
    }

    #[test]
    fn l_twice_links_roadmap_quests() {
        let tmp = TempDir::new().unwrap();
        let mut app = test_app(tmp.path());
        for (title, x) in [("A", 0.0), ("B", 400.0)] {
            let mut t = Task::new(title.into(), title.into(), Category::Roadmap);
            t.set_position(x, 0.0);
            app.rt.block_on(app.ws.add_task(t)).unwrap();
        }
        press(&mut app, KeyCode::Tab);
        let source = app.selected.clone().unwrap();
        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.link_source.as_deref(), Some(source.as_str()));
        press(&mut app, KeyCode::Tab);
        let target = app.selected.clone().unwrap();
        press(&mut app, KeyCode::Char('l'));

        assert_eq!(app.link_source, None);
        assert!(app.ws.task(&source).unwrap().connections.contains(&target));
    }

    #[test]
    fn arrows_pan_and_zero_resets() {
        let tmp = TempDir::new().unwrap();
        let mut app = test_app(tmp.path());
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Down);
        let vp = app.viewport();
        assert_eq!((vp.pan.x, vp.pan.y), (PAN_STEP, -PAN_STEP));
        press(&mut app, KeyCode::Char('0'));
        assert_eq!(app.viewport().pan.x, 0.0);
    }

    #[test]
    fn deleting_the_selected_step_clears_selection() {
        let tmp = TempDir::new().unwrap();
        let (mut app, step) = project_app(&tmp);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.selected, None);
        assert!(app.project().unwrap().find_task(&step).is_none());
    }
}
