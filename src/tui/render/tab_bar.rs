use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::{App, View};
use crate::util::unicode;

/// Longest project title shown in its tab
const PROJECT_TAB_MAX: usize = 24;

/// Render the tab bar: one tab per view, with separator line below
pub fn render_tab_bar(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // tabs
            Constraint::Length(1), // separator
        ])
        .split(area);

    let sep_cols = render_tabs(frame, app, chunks[0]);
    render_separator(frame, app, chunks[1], &sep_cols);
}

/// Render tabs and return the column positions of each separator character.
fn render_tabs(frame: &mut Frame, app: &App, area: Rect) -> Vec<usize> {
    let bg = app.theme.background;
    let mut spans: Vec<Span> = Vec::new();
    let mut sep_cols: Vec<usize> = Vec::new();
    let sep = Span::styled("\u{2502}", Style::default().fg(app.theme.dim).bg(bg));

    // Leading icon
    spans.push(Span::styled(" ", Style::default().bg(bg)));
    spans.push(Span::styled(
        "\u{25C6}",
        Style::default().fg(app.theme.purple).bg(bg),
    ));
    spans.push(Span::styled(" ", Style::default().bg(bg)));

    let project_label = match app.project() {
        Some(p) => format!(
            "PROJECT: {}",
            unicode::truncate_to_width(&p.title, PROJECT_TAB_MAX)
        ),
        None => "PROJECT".to_string(),
    };
    let tabs = [
        (View::Roadmap, "ROADMAP".to_string()),
        (View::Project, project_label),
        (View::Habits, "HABITS".to_string()),
    ];
    for (view, label) in tabs {
        spans.push(Span::styled(
            format!(" {} ", label),
            tab_style(app, app.view == view),
        ));
        sep_cols.push(spans.iter().map(|s| unicode::display_width(&s.content)).sum());
        spans.push(sep.clone());
    }

    // Offline marker on the right
    if app.ws.repository().remote().is_offline() {
        let used: usize = spans.iter().map(|s| unicode::display_width(&s.content)).sum();
        let marker = "offline ";
        let width = area.width as usize;
        if used + marker.len() < width {
            spans.push(Span::styled(
                " ".repeat(width - used - marker.len()),
                Style::default().bg(bg),
            ));
            spans.push(Span::styled(marker, Style::default().fg(app.theme.dim).bg(bg)));
        }
    }

    let line = Line::from(spans);
    frame.render_widget(Paragraph::new(line).style(Style::default().bg(bg)), area);
    sep_cols
}

fn render_separator(frame: &mut Frame, app: &App, area: Rect, sep_cols: &[usize]) {
    let width = area.width as usize;
    let mut line = String::with_capacity(width * 3);
    for col in 0..width {
        if sep_cols.contains(&col) {
            line.push('\u{2534}');
        } else {
            line.push('\u{2500}');
        }
    }
    let sep = Paragraph::new(line).style(Style::default().fg(app.theme.dim).bg(app.theme.background));
    frame.render_widget(sep, area);
}

/// Style for a tab: highlighted if current, normal otherwise
fn tab_style(app: &App, is_current: bool) -> Style {
    if is_current {
        Style::default()
            .fg(app.theme.text_bright)
            .bg(app.theme.selection_bg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(app.theme.text).bg(app.theme.background)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::mission_ops::ProjectDraft;
    use crate::tui::app::test_app;
    use crate::tui::render::test_helpers::*;
    use tempfile::TempDir;

    #[test]
    fn tabs_without_a_project() {
        let tmp = TempDir::new().unwrap();
        let app = test_app(tmp.path());
        let output = render_to_string(60, 2, |frame, area| {
            render_tab_bar(frame, &app, area);
        });
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], " ◆  ROADMAP │ PROJECT │ HABITS │                    offline");
        assert_eq!(lines[1], "────────────┴─────────┴────────┴────────────────────────────");
    }

    #[test]
    fn project_tab_shows_the_active_title() {
        let tmp = TempDir::new().unwrap();
        let mut app = test_app(tmp.path());
        let project = app
            .ws
            .create_project(
                &ProjectDraft {
                    name: "Build a cabin".into(),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        app.active_project = Some(project.id);
        let output = render_to_string(80, 2, |frame, area| {
            render_tab_bar(frame, &app, area);
        });
        assert!(output.contains(" PROJECT: BUILD A CABIN │"));
    }
}
