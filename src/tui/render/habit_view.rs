use chrono::{Datelike, NaiveDate};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::model::task::{Task, Weekday};
use crate::ops::habit_ops;
use crate::tui::app::App;
use crate::util::unicode;

const NAME_W: usize = 24;
const DAY_W: usize = 5;
/// Eighths, for the consistency sparkline
const BARS: [&str; 9] = [
    " ", "\u{2581}", "\u{2582}", "\u{2583}", "\u{2584}", "\u{2585}", "\u{2586}", "\u{2587}",
    "\u{2588}",
];

/// Render the weekly habit grid
pub fn render_habit_view(frame: &mut Frame, app: &App, area: Rect) {
    render_habit_grid(frame, app, area, chrono::Local::now().date_naive());
}

pub(super) fn render_habit_grid(frame: &mut Frame, app: &App, area: Rect, today: NaiveDate) {
    let theme = &app.theme;
    let bg = theme.background;
    let dim = Style::default().fg(theme.dim).bg(bg);
    let text = Style::default().fg(theme.text).bg(bg);
    let header = Style::default()
        .fg(theme.text_bright)
        .bg(bg)
        .add_modifier(Modifier::BOLD);

    let week = habit_ops::week_dates(today, app.habit_week_offset);
    let habits: Vec<&Task> = app.ws.habits().collect();
    let mut lines: Vec<Line> = Vec::new();

    let when = if app.habit_week_offset == 0 {
        "this week".to_string()
    } else {
        format!("{} week(s) ago", -app.habit_week_offset)
    };
    lines.push(Line::from(vec![
        Span::styled(
            format!(" WEEK OF {}", week[0].format("%a %d %b %Y").to_string().to_uppercase()),
            header,
        ),
        Span::styled(format!("  ({})", when), dim),
    ]));
    lines.push(Line::from(""));

    if habits.is_empty() {
        lines.push(Line::from(Span::styled(
            " No habits yet. Press a to add one.",
            dim,
        )));
        frame.render_widget(Paragraph::new(lines).style(Style::default().bg(bg)), area);
        return;
    }

    // Column headings
    let mut spans = vec![Span::styled(
        format!(" {}", unicode::pad_to_width("HABIT", NAME_W)),
        header,
    )];
    for date in &week {
        let day = Weekday::from_chrono(date.weekday());
        let label = format!("{}{:02}", &day.as_str()[..2], date.day());
        let style = if *date == today {
            Style::default()
                .fg(theme.highlight)
                .bg(bg)
                .add_modifier(Modifier::BOLD)
        } else {
            header
        };
        spans.push(Span::styled(unicode::pad_to_width(&label, DAY_W), style));
    }
    spans.push(Span::styled(" STREAK  BEST", header));
    lines.push(Line::from(spans));

    for (row, task) in habits.iter().enumerate() {
        let Some(habit) = &task.habit else { continue };
        let mut spans = vec![Span::styled(
            format!(
                " {}",
                unicode::pad_to_width(&unicode::truncate_to_width(&task.title, NAME_W - 1), NAME_W)
            ),
            text,
        )];
        for (col, date) in week.iter().enumerate() {
            let marked = habit.habit_history.get(&habit_ops::date_key(*date)).copied() == Some(true);
            let scheduled =
                habit_ops::is_scheduled(habit, Weekday::from_chrono(date.weekday()));
            let (glyph, fg) = if marked {
                ("\u{25A0}", theme.green)
            } else if !scheduled {
                ("\u{00B7}", theme.dim)
            } else if *date > today {
                ("\u{25A1}", theme.dim)
            } else if *date == today {
                ("\u{25A1}", theme.text)
            } else {
                ("\u{25A1}", theme.red)
            };
            let cell_bg = if app.habit_cursor == (row, col) {
                theme.selection_bg
            } else {
                bg
            };
            spans.push(Span::styled(
                format!(" {}   ", glyph),
                Style::default().fg(fg).bg(cell_bg),
            ));
        }
        let streak = habit_ops::current_streak(habit, today);
        spans.push(Span::styled(
            format!(" {:>6}", streak),
            Style::default().fg(theme.xp).bg(bg),
        ));
        spans.push(Span::styled(format!("  {:>4}", habit.streak_best.max(streak)), dim));
        lines.push(Line::from(spans));
    }

    // Summary
    lines.push(Line::from(""));
    let rate = habit_ops::completion_rate(habits.iter().copied(), today);
    let top = habit_ops::top_streak(habits.iter().copied());
    lines.push(Line::from(vec![
        Span::styled(" completion ", dim),
        Span::styled(format!("{}%", rate), text),
        Span::styled("   top streak ", dim),
        Span::styled(top.to_string(), Style::default().fg(theme.xp).bg(bg)),
    ]));

    let consistency = habit_ops::consistency_by_weekday(habits.iter().copied());
    let mut spans = vec![Span::styled(" consistency ", dim)];
    for (day, pct) in Weekday::ALL.iter().zip(consistency) {
        spans.push(Span::styled(&day.as_str()[..1], dim));
        spans.push(Span::styled(
            BARS[usize::from(pct) * 8 / 100],
            Style::default().fg(theme.green).bg(bg),
        ));
        spans.push(Span::styled(" ", dim));
    }
    lines.push(Line::from(spans));

    frame.render_widget(Paragraph::new(lines).style(Style::default().bg(bg)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::app::test_app;
    use crate::tui::render::test_helpers::*;
    use tempfile::TempDir;

    // 2025-03-12 is a Wednesday
    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    #[test]
    fn empty_grid_shows_a_hint() {
        let tmp = TempDir::new().unwrap();
        let app = test_app(tmp.path());
        let output = render_to_string(TERM_W, TERM_H, |frame, area| {
            render_habit_grid(frame, &app, area, wednesday());
        });
        assert!(output.starts_with(" WEEK OF MON 10 MAR 2025  (this week)"));
        assert!(output.contains("No habits yet. Press a to add one."));
    }

    #[test]
    fn grid_marks_done_missed_and_unscheduled_days() {
        let tmp = TempDir::new().unwrap();
        let mut app = test_app(tmp.path());
        let mut habit = habit_ops::new_habit("Stretch", &[Weekday::Mon, Weekday::Tue], "u1");
        let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        habit_ops::toggle_day(&mut habit, monday, wednesday()).unwrap();
        app.rt.block_on(app.ws.add_task(habit)).unwrap();
        app.habit_cursor = (5, 5);

        let output = render_to_string(TERM_W, TERM_H, |frame, area| {
            render_habit_grid(frame, &app, area, wednesday());
        });
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines[2],
            " HABIT                   MO10 TU11 WE12 TH13 FR14 SA15 SU16  STREAK  BEST"
        );
        assert_eq!(
            lines[3],
            " STRETCH                  ■    □    ·    ·    ·    ·    ·         0     0"
        );
        assert!(lines[5].contains("completion"));
    }
}
