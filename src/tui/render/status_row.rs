use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::ops::progression;
use crate::tui::app::{App, Mode};
use crate::util::unicode;

/// Cells in the XP progress bar
const BAR_W: usize = 10;

/// Render the status row (bottom of screen)
pub fn render_status_row(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;

    let (mut spans, hint) = match app.mode {
        Mode::Navigate => (level_spans(app), right_hint(app)),
        Mode::Prompt(kind) => {
            let (before, after) = app.input.split_at(app.input_cursor.min(app.input.len()));
            let spans = vec![
                Span::styled(
                    format!(" {}: ", kind.label()),
                    Style::default().fg(app.theme.highlight).bg(bg),
                ),
                Span::styled(before.to_string(), Style::default().fg(app.theme.text_bright).bg(bg)),
                Span::styled("\u{258C}", Style::default().fg(app.theme.highlight).bg(bg)), // ▌ cursor
                Span::styled(after.to_string(), Style::default().fg(app.theme.text_bright).bg(bg)),
            ];
            let hint = Span::styled(
                "Enter add  Esc cancel ",
                Style::default().fg(app.theme.dim).bg(bg),
            );
            (spans, hint)
        }
    };

    let content_width: usize = spans.iter().map(|s| unicode::display_width(&s.content)).sum();
    let hint_width = unicode::display_width(&hint.content);
    if content_width + hint_width < width {
        let padding = width - content_width - hint_width;
        spans.push(Span::styled(" ".repeat(padding), Style::default().bg(bg)));
        spans.push(hint);
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}

/// ` LV 3 E INITIATE ████░░░░░░ 400/2250 XP`
fn level_spans(app: &App) -> Vec<Span<'static>> {
    let bg = app.theme.background;
    let level = app.ws.level();
    let filled = usize::from(level.percent()) * BAR_W / 100;
    vec![
        Span::styled(
            format!(" LV {} ", level.level),
            Style::default()
                .fg(app.theme.text_bright)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                "{} {} ",
                progression::rank(level.level),
                progression::title(level.level)
            ),
            Style::default().fg(app.theme.purple).bg(bg),
        ),
        Span::styled(
            "\u{2588}".repeat(filled),
            Style::default().fg(app.theme.xp).bg(bg),
        ),
        Span::styled(
            "\u{2591}".repeat(BAR_W - filled),
            Style::default().fg(app.theme.dim).bg(bg),
        ),
        Span::styled(
            format!(" {}/{} XP", level.xp_into_level, level.xp_required),
            Style::default().fg(app.theme.text).bg(bg),
        ),
    ]
}

/// Status message if one is up, else the link gesture or the help hint
fn right_hint(app: &App) -> Span<'static> {
    let bg = app.theme.background;
    if let Some(status) = &app.status {
        let fg = if status.is_error {
            app.theme.red
        } else {
            app.theme.highlight
        };
        return Span::styled(format!("{} ", status.text), Style::default().fg(fg).bg(bg));
    }
    if app.link_source.is_some() {
        return Span::styled(
            "linking: l on target, Esc cancel ",
            Style::default().fg(app.theme.purple).bg(bg),
        );
    }
    Span::styled("? help ", Style::default().fg(app.theme.dim).bg(bg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::app::{PromptKind, test_app};
    use crate::tui::render::test_helpers::*;
    use insta::assert_snapshot;
    use tempfile::TempDir;

    #[test]
    fn fresh_level_and_help_hint() {
        let tmp = TempDir::new().unwrap();
        let app = test_app(tmp.path());
        let output = render_to_string(60, 1, |frame, area| {
            render_status_row(frame, &app, area);
        });
        assert_snapshot!(output.trim_start(), @"LV 1 E INITIATE ░░░░░░░░░░ 0/1000 XP                ? help");
    }

    #[test]
    fn prompt_shows_input_and_cursor() {
        let tmp = TempDir::new().unwrap();
        let mut app = test_app(tmp.path());
        app.mode = Mode::Prompt(PromptKind::AddHabit);
        app.input = "Read".into();
        app.input_cursor = 2;
        let output = render_to_string(60, 1, |frame, area| {
            render_status_row(frame, &app, area);
        });
        assert_snapshot!(output.trim_start(), @"new habit: Re▌ad                     Enter add  Esc cancel");
    }

    #[test]
    fn errors_replace_the_hint() {
        let tmp = TempDir::new().unwrap();
        let mut app = test_app(tmp.path());
        app.set_error("phase is locked");
        let output = render_to_string(60, 1, |frame, area| {
            render_status_row(frame, &app, area);
        });
        assert!(output.ends_with("phase is locked"));
    }
}
