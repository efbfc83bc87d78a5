use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::tui::app::{App, View};

/// Render the help overlay (toggled with ?)
pub fn render_help_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let overlay_area = centered_rect(60, 80, area);
    frame.render_widget(Clear, overlay_area);

    let bg = app.theme.background;
    let key_style = Style::default()
        .fg(app.theme.highlight)
        .bg(bg)
        .add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(app.theme.text).bg(bg);
    let header_style = Style::default()
        .fg(app.theme.text_bright)
        .bg(bg)
        .add_modifier(Modifier::BOLD);

    let mut lines: Vec<Line<'static>> = Vec::new();
    let section = |lines: &mut Vec<Line<'static>>,
                   title: &'static str,
                   bindings: &[(&'static str, &'static str)]| {
        lines.push(Line::from(Span::styled(title, header_style)));
        for &(key, desc) in bindings {
            add_binding(lines, key, desc, key_style, desc_style);
        }
        lines.push(Line::from(""));
    };

    match app.view {
        View::Roadmap | View::Project => {
            section(
                &mut lines,
                " Canvas",
                &[
                    (" \u{2190}\u{2191}\u{2192}\u{2193}", "Pan"),
                    (" +/-  0", "Zoom in/out, reset view"),
                    (" Tab/S-Tab", "Select next/previous node"),
                    (" mouse drag", "Pan, move a card, or link from its handle"),
                    (" wheel", "Zoom"),
                    (" Esc", "Clear selection / cancel link"),
                ],
            );
            let mut actions = vec![
                (" Space/x", "Complete or reopen"),
                (" l", "Link: mark source, then target"),
                (" d", "Delete"),
            ];
            if app.view == View::Roadmap {
                actions.push((" a", "New quest at the centre"));
            } else {
                actions.push((" Enter", "Show/hide subtasks"));
                actions.push((" a", "New step"));
                actions.push((" s", "New subtask of the selected step"));
                actions.push((" [ ]", "Previous/next project"));
            }
            section(&mut lines, " Actions", &actions);
        }
        View::Habits => {
            section(
                &mut lines,
                " Habits",
                &[
                    (" \u{2191}\u{2193}/jk", "Choose habit"),
                    (" \u{2190}\u{2192}/hl", "Choose day"),
                    (" Space/x", "Mark or unmark the day"),
                    (" < >", "Previous/next week"),
                    (" t", "This week"),
                    (" a", "New habit"),
                    (" d", "Delete habit"),
                ],
            );
        }
    }

    section(
        &mut lines,
        " Global",
        &[
            (" 1 2 3", "Roadmap, project, habits"),
            (" P", "New project"),
            (" u", "Undo project change"),
            (" U/Ctrl-r", "Redo"),
            (" S", "Sync local records"),
            (" ?", "Toggle help"),
            (" q", "Quit"),
        ],
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .border_style(Style::default().fg(app.theme.dim).bg(bg))
        .style(Style::default().bg(bg));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(bg));

    frame.render_widget(paragraph, overlay_area);
}

fn add_binding<'a>(
    lines: &mut Vec<Line<'a>>,
    key: &'a str,
    desc: &'a str,
    key_style: Style,
    desc_style: Style,
) {
    let key_width = 14;
    let padded_key = format!("{:<width$}", key, width = key_width);
    lines.push(Line::from(vec![
        Span::styled(padded_key, key_style),
        Span::styled(desc, desc_style),
    ]));
}

/// Create a centered rectangle of the given percentage of the parent
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
