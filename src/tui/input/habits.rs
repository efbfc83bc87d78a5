use crossterm::event::{KeyCode, KeyEvent};

use crate::ops::habit_ops;
use crate::tui::app::{App, PromptKind};

use super::navigate::open_prompt;

pub(super) fn handle_habit_key(app: &mut App, key: KeyEvent) {
    let rows = app.ws.habits().count();
    let (row, col) = app.habit_cursor;
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.habit_cursor.0 = row.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => {
            app.habit_cursor.0 = (row + 1).min(rows.saturating_sub(1));
        }
        KeyCode::Left | KeyCode::Char('h') => app.habit_cursor.1 = col.saturating_sub(1),
        KeyCode::Right | KeyCode::Char('l') => app.habit_cursor.1 = (col + 1).min(6),
        KeyCode::Char('<') | KeyCode::Char('[') => app.habit_week_offset -= 1,
        // Future weeks have nothing to mark
        KeyCode::Char('>') | KeyCode::Char(']') => {
            app.habit_week_offset = (app.habit_week_offset + 1).min(0);
        }
        KeyCode::Char('t') => app.habit_week_offset = 0,
        KeyCode::Char(' ') | KeyCode::Char('x') | KeyCode::Enter => toggle_cell(app),
        KeyCode::Char('a') => open_prompt(app, PromptKind::AddHabit),
        KeyCode::Char('d') | KeyCode::Delete => delete_habit(app),
        _ => {}
    }
}

fn cursor_habit(app: &App) -> Option<String> {
    app.ws.habits().nth(app.habit_cursor.0).map(|t| t.id.clone())
}

fn toggle_cell(app: &mut App) {
    let Some(id) = cursor_habit(app) else {
        return;
    };
    let today = chrono::Local::now().date_naive();
    let date = habit_ops::week_dates(today, app.habit_week_offset)[app.habit_cursor.1.min(6)];
    if date > today {
        app.set_error("cannot mark a day that has not happened");
        return;
    }
    match app.rt.block_on(app.ws.toggle_habit_day(&id, date, today)) {
        Ok(true) => app.set_status(format!("marked {}", habit_ops::date_key(date))),
        Ok(false) => app.set_status(format!("unmarked {}", habit_ops::date_key(date))),
        Err(e) => app.set_error(e.to_string()),
    }
}

fn delete_habit(app: &mut App) {
    let Some(id) = cursor_habit(app) else {
        return;
    };
    match app.rt.block_on(app.ws.delete_task(&id)) {
        Ok(()) => {
            let rows = app.ws.habits().count();
            app.habit_cursor.0 = app.habit_cursor.0.min(rows.saturating_sub(1));
            app.set_status("habit deleted");
        }
        Err(e) => app.set_error(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::app::{View, test_app};
    use crate::tui::input::handle_key;
    use chrono::Datelike;
    use crossterm::event::KeyModifiers;
    use tempfile::TempDir;

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn space_marks_the_cursor_day() {
        let tmp = TempDir::new().unwrap();
        let mut app = test_app(tmp.path());
        let habit = habit_ops::new_habit("Read", &[], "u1");
        app.rt.block_on(app.ws.add_task(habit)).unwrap();
        app.switch_view(View::Habits);

        let today = chrono::Local::now().date_naive();
        app.habit_cursor = (0, today.weekday().num_days_from_monday() as usize);
        press(&mut app, KeyCode::Char(' '));

        let stored = app.ws.habits().next().unwrap();
        let history = &stored.habit.as_ref().unwrap().habit_history;
        assert_eq!(history.get(&habit_ops::date_key(today)), Some(&true));
    }

    #[test]
    fn week_offset_never_moves_into_the_future() {
        let tmp = TempDir::new().unwrap();
        let mut app = test_app(tmp.path());
        app.switch_view(View::Habits);
        press(&mut app, KeyCode::Char('>'));
        assert_eq!(app.habit_week_offset, 0);
        press(&mut app, KeyCode::Char('<'));
        press(&mut app, KeyCode::Char('<'));
        assert_eq!(app.habit_week_offset, -2);
        press(&mut app, KeyCode::Char('t'));
        assert_eq!(app.habit_week_offset, 0);
    }

    #[test]
    fn cursor_stays_inside_the_grid() {
        let tmp = TempDir::new().unwrap();
        let mut app = test_app(tmp.path());
        app.switch_view(View::Habits);
        for _ in 0..10 {
            press(&mut app, KeyCode::Right);
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(app.habit_cursor, (0, 6));
    }
}
