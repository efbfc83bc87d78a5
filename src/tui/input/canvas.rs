use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};

use crate::canvas::layout::NodeKind;
use crate::canvas::{Command, Graph, PointerEvent};
use crate::ops::tree_ops;
use crate::tui::app::{App, View};
use crate::tui::render::canvas_view::cell_to_screen;

/// Wheel delta reported per scroll notch
pub(super) const WHEEL_DELTA: f64 = 100.0;

pub(super) fn handle_pointer(app: &mut App, mouse: MouseEvent) {
    let area = app.canvas_area;
    let inside = mouse.column >= area.x
        && mouse.column < area.x + area.width
        && mouse.row >= area.y
        && mouse.row < area.y + area.height;
    let point = cell_to_screen(area, mouse.column, mouse.row);

    let event = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) if inside => PointerEvent::Down(point),
        MouseEventKind::Drag(MouseButton::Left) => PointerEvent::Move(point),
        MouseEventKind::Up(MouseButton::Left) => PointerEvent::Up(point),
        MouseEventKind::ScrollUp if inside => PointerEvent::Wheel(-WHEEL_DELTA),
        MouseEventKind::ScrollDown if inside => PointerEvent::Wheel(WHEEL_DELTA),
        _ => return,
    };

    let graph = app.graph();
    let Some(key) = app.viewport_key() else {
        return;
    };
    let mut viewport = app.viewport();
    let command = app.interaction.handle(event, &mut viewport, &graph);
    app.viewports.insert(key, viewport);
    apply_command(app, command, &graph);
}

/// Carry out what a finished gesture asked for
pub(super) fn apply_command(app: &mut App, command: Command, graph: &Graph) {
    match command {
        Command::None => {}
        Command::CancelLink => app.set_status("link cancelled"),
        Command::Select(id) => {
            let is_task = graph.node(&id).is_some_and(|n| n.kind == NodeKind::Task);
            if app.view == View::Project && is_task {
                // Clicking a step shows or hides its subtasks
                if app.expanded_task.as_deref() == Some(id.as_str()) {
                    app.expanded_task = None;
                } else {
                    app.expanded_task = Some(id.clone());
                }
            }
            app.selected = Some(id);
        }
        Command::Move { node, x, y } => {
            if app.view != View::Roadmap {
                return;
            }
            if let Err(e) = app.rt.block_on(app.ws.move_task(&node, x, y)) {
                app.set_error(e.to_string());
            }
        }
        Command::Link { source, target } => link(app, &source, &target),
    }
}

/// Connect two nodes of the current canvas
pub(super) fn link(app: &mut App, source: &str, target: &str) {
    let result = match app.view {
        View::Roadmap => app
            .rt
            .block_on(app.ws.connect_tasks(source, target))
            .map_err(|e| e.to_string()),
        View::Project => match app.active_project.clone() {
            Some(pid) => app
                .ws
                .mutate_project(&pid, |p| tree_ops::link(p, source, target))
                .map_err(|e| e.to_string()),
            None => return,
        },
        View::Habits => return,
    };
    match result {
        Ok(true) => app.set_status("linked"),
        Ok(false) => app.set_status("already linked"),
        Err(e) => app.set_error(e),
    }
}
