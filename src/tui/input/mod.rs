mod canvas;
mod habits;
mod navigate;
mod prompt;

use crossterm::event::{KeyCode, KeyEvent, MouseEvent};

use super::app::{App, Mode, View};

/// Handle a key event in the current mode
pub fn handle_key(app: &mut App, key: KeyEvent) {
    // Ignore bare modifier key presses (Shift, Ctrl, Alt, etc.)
    if matches!(key.code, KeyCode::Modifier(_)) {
        return;
    }

    // Help overlay swallows the next key
    if app.show_help {
        app.show_help = false;
        return;
    }

    match app.mode {
        Mode::Prompt(kind) => prompt::handle_prompt(app, kind, key),
        Mode::Navigate => {
            if navigate::handle_global(app, key) {
                return;
            }
            match app.view {
                View::Roadmap | View::Project => navigate::handle_canvas_key(app, key),
                View::Habits => habits::handle_habit_key(app, key),
            }
        }
    }
}

/// Handle a mouse event; only canvas views react
pub fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.mode != Mode::Navigate || app.show_help || app.view == View::Habits {
        return;
    }
    canvas::handle_pointer(app, mouse);
}
