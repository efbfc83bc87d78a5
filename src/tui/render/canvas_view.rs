use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::widgets::canvas::{Canvas, Line as Segment, Rectangle};

use crate::canvas::layout::{EdgeKind, Node, NodeKind};
use crate::canvas::{Graph, Point, Viewport};
use crate::model::project::PhaseStatus;
use crate::tui::app::{App, View};
use crate::util::unicode;

/// Screen pixels per terminal cell. Canvas geometry is in pixels; a cell is
/// about twice as tall as it is wide.
pub const CELL_W: f64 = 10.0;
pub const CELL_H: f64 = 20.0;
/// Points per sampled curve
const CURVE_SEGMENTS: usize = 16;
const ARROW_SIZE: f64 = 12.0;
/// How far above the first row the phase headers sit
const HEADER_RISE: f64 = 50.0;

/// Screen pixel under the centre of a terminal cell, relative to `area`
pub fn cell_to_screen(area: Rect, column: u16, row: u16) -> Point {
    Point::new(
        (f64::from(column) - f64::from(area.x) + 0.5) * CELL_W,
        (f64::from(row) - f64::from(area.y) + 0.5) * CELL_H,
    )
}

/// Screen pixel at the middle of `area`
pub fn canvas_center(area: Rect) -> Point {
    Point::new(
        f64::from(area.width) * CELL_W / 2.0,
        f64::from(area.height) * CELL_H / 2.0,
    )
}

struct Label {
    at: Point,
    line: Line<'static>,
}

/// Flattened drawing for one frame, in screen pixels
#[derive(Default)]
struct Scene {
    segments: Vec<(Point, Point, Color)>,
    boxes: Vec<(Point, Point, Color)>,
    labels: Vec<Label>,
}

impl Scene {
    fn polyline(&mut self, points: &[Point], color: Color) {
        for pair in points.windows(2) {
            self.segments.push((pair[0], pair[1], color));
        }
    }

    fn arrow(&mut self, tip: Point, from: Point, color: Color) {
        let (dx, dy) = (tip.x - from.x, tip.y - from.y);
        let len = (dx * dx + dy * dy).sqrt();
        if len == 0.0 {
            return;
        }
        let (ux, uy) = (dx / len, dy / len);
        let back = Point::new(tip.x - ux * ARROW_SIZE, tip.y - uy * ARROW_SIZE);
        let (px, py) = (-uy * ARROW_SIZE / 2.0, ux * ARROW_SIZE / 2.0);
        self.segments
            .push((tip, Point::new(back.x + px, back.y + py), color));
        self.segments
            .push((tip, Point::new(back.x - px, back.y - py), color));
    }

    fn label(&mut self, at: Point, text: String, style: Style) {
        self.labels.push(Label {
            at,
            line: Line::from(Span::styled(text, style)),
        });
    }
}

/// Render the roadmap or project canvas
pub fn render_canvas_view(frame: &mut Frame, app: &mut App, area: Rect) {
    app.canvas_area = area;
    let app: &App = app;
    let graph = app.graph();
    let project_open = app.view == View::Project && app.project().is_some();
    if graph.nodes.is_empty() && !project_open {
        render_empty(frame, app, area);
        return;
    }

    let vp = app.viewport();
    let mut scene = Scene::default();
    if project_open {
        phase_headers(app, &vp, &mut scene);
    }
    edges(app, &graph, &vp, &mut scene);
    for node in &graph.nodes {
        node_card(app, node, &vp, &mut scene);
    }
    gesture_overlay(app, &graph, &vp, &mut scene);

    let labels = std::mem::take(&mut scene.labels);
    let (w_px, h_px) = (f64::from(area.width) * CELL_W, f64::from(area.height) * CELL_H);
    // Canvas y grows upward; screen y grows downward
    let flip = move |p: Point| (p.x, h_px - p.y);
    let canvas = Canvas::default()
        .background_color(app.theme.background)
        .marker(Marker::Braille)
        .x_bounds([0.0, w_px])
        .y_bounds([0.0, h_px])
        .paint(move |ctx| {
            for &(a, b, color) in &scene.segments {
                let ((x1, y1), (x2, y2)) = (flip(a), flip(b));
                ctx.draw(&Segment {
                    x1,
                    y1,
                    x2,
                    y2,
                    color,
                });
            }
            for &(min, max, color) in &scene.boxes {
                let (x, y) = flip(Point::new(min.x, max.y));
                ctx.draw(&Rectangle {
                    x,
                    y,
                    width: max.x - min.x,
                    height: max.y - min.y,
                    color,
                });
            }
        });
    frame.render_widget(canvas, area);

    // Text goes straight into cells so it lines up with the pixel grid
    let buf = frame.buffer_mut();
    for label in &labels {
        if label.at.x < 0.0 || label.at.y < 0.0 {
            continue;
        }
        let col = (label.at.x / CELL_W) as u16;
        let row = (label.at.y / CELL_H) as u16;
        if col >= area.width || row >= area.height {
            continue;
        }
        let x = area.x + col;
        buf.set_line(x, area.y + row, &label.line, area.right() - x);
    }
}

fn render_empty(frame: &mut Frame, app: &App, area: Rect) {
    let message = match app.view {
        View::Roadmap => "No quests on the roadmap. Press a to add one.",
        _ => "No projects yet. Press P to create one.",
    };
    let mut lines: Vec<Line> = (0..area.height / 2).map(|_| Line::from("")).collect();
    lines.push(Line::from(Span::styled(
        message,
        Style::default().fg(app.theme.dim),
    )));
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(app.theme.background));
    frame.render_widget(paragraph, area);
}

/// Phase titles above each column
fn phase_headers(app: &App, vp: &Viewport, scene: &mut Scene) {
    let Some(project) = app.project() else {
        return;
    };
    let profile = app.layout_profile();
    for (i, phase) in project.phases.iter().enumerate() {
        let world = Point::new(
            profile.initial_x + i as f64 * profile.column_spacing,
            profile.top - HEADER_RISE,
        );
        let color = match phase.status {
            PhaseStatus::Locked => app.theme.dim,
            PhaseStatus::Unlocked => app.theme.highlight,
            PhaseStatus::Completed => app.theme.green,
        };
        let text = format!("{} [{}]", phase.title, phase.status);
        scene.label(
            vp.to_screen(world),
            text,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        );
    }
}

fn edges(app: &App, graph: &Graph, vp: &Viewport, scene: &mut Scene) {
    for edge in &graph.edges {
        let Some(path) = graph.edge_path(edge) else {
            continue;
        };
        let points: Vec<Point> = path
            .sample(CURVE_SEGMENTS)
            .into_iter()
            .map(|p| vp.to_screen(p))
            .collect();
        let color = match edge.kind {
            EdgeKind::Tree => app.theme.dim,
            EdgeKind::Link => app.theme.purple,
        };
        scene.polyline(&points, color);
        if edge.kind == EdgeKind::Link
            && let [.., from, tip] = points.as_slice()
        {
            scene.arrow(*tip, *from, color);
        }
    }
}

fn node_card(app: &App, node: &Node, vp: &Viewport, scene: &mut Scene) {
    let theme = &app.theme;
    let selected = app.selected.as_deref() == Some(node.id.as_str());
    let linking = app.link_source.as_deref() == Some(node.id.as_str());
    let border = if linking {
        theme.purple
    } else if selected {
        theme.highlight
    } else if node.completed {
        theme.green
    } else if node.locked {
        theme.dim
    } else {
        match node.kind {
            NodeKind::Task => theme.cyan,
            NodeKind::Subtask => theme.text,
        }
    };

    let min = vp.to_screen(node.pos);
    let size = Point::new(node.width * vp.zoom, node.height * vp.zoom);
    scene.boxes.push((min, min + size, border));

    // Text needs at least a few cells inside the border
    let cols = (size.x / CELL_W) as usize;
    if cols < 5 {
        return;
    }
    let inner = cols - 3;
    let mark = if node.completed { "\u{2713} " } else { "" };
    let title = unicode::truncate_to_width(&format!("{}{}", mark, node.title), inner);
    let title_style = if node.locked {
        Style::default().fg(theme.dim)
    } else if selected {
        Style::default()
            .fg(theme.text_bright)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    };
    let text_x = min.x + 1.5 * CELL_W;
    scene.label(Point::new(text_x, min.y + 1.5 * CELL_H), title, title_style);

    if size.y / CELL_H >= 4.0
        && let Some(detail) = node_detail(app, node)
    {
        scene.label(
            Point::new(text_x, min.y + 2.5 * CELL_H),
            unicode::truncate_to_width(&detail, inner),
            Style::default().fg(theme.xp),
        );
    }
}

/// Second line of a card: XP, due date or subtask progress
fn node_detail(app: &App, node: &Node) -> Option<String> {
    if node.locked {
        return Some("LOCKED".to_string());
    }
    let task = match app.view {
        View::Roadmap => app.ws.task(&node.id)?,
        _ => match node.kind {
            NodeKind::Task => app.project()?.find_task(&node.id)?,
            NodeKind::Subtask => return None,
        },
    };
    if !task.subtasks.is_empty() {
        let done = task.subtasks.iter().filter(|s| s.completed).count();
        return Some(format!("{}/{} sub  +{} XP", done, task.subtasks.len(), task.effective_xp()));
    }
    Some(match &task.due_date {
        Some(due) => format!("+{} XP  due {}", task.effective_xp(), due),
        None => format!("+{} XP", task.effective_xp()),
    })
}

/// Ghost link while dragging from a handle; outline where a dragged card lands
fn gesture_overlay(app: &App, graph: &Graph, vp: &Viewport, scene: &mut Scene) {
    if let Some(path) = app.interaction.ghost_edge(graph) {
        let points: Vec<Point> = path
            .sample(CURVE_SEGMENTS)
            .into_iter()
            .map(|p| vp.to_screen(p))
            .collect();
        scene.polyline(&points, app.theme.yellow);
    }
    if let Some((id, at)) = app.interaction.drag_preview()
        && let Some(node) = graph.node(id)
    {
        let min = vp.to_screen(at);
        let size = Point::new(node.width * vp.zoom, node.height * vp.zoom);
        scene.boxes.push((min, min + size, app.theme.yellow));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::Category;
    use crate::model::task::Task;
    use crate::ops::mission_ops::ProjectDraft;
    use crate::ops::tree_ops;
    use crate::tui::app::test_app;
    use crate::tui::render::test_helpers::*;
    use tempfile::TempDir;

    #[test]
    fn cells_map_to_pixel_centres() {
        let area = Rect::new(2, 3, 40, 10);
        assert_eq!(cell_to_screen(area, 2, 3), Point::new(5.0, 10.0));
        assert_eq!(cell_to_screen(area, 7, 4), Point::new(55.0, 30.0));
        assert_eq!(canvas_center(area), Point::new(200.0, 100.0));
    }

    #[test]
    fn empty_roadmap_shows_a_hint() {
        let tmp = TempDir::new().unwrap();
        let mut app = test_app(tmp.path());
        let output = render_to_string(TERM_W, TERM_H, |frame, area| {
            render_canvas_view(frame, &mut app, area);
        });
        assert!(output.contains("No quests on the roadmap. Press a to add one."));
        assert_eq!(app.canvas_area, Rect::new(0, 0, TERM_W, TERM_H));
    }

    #[test]
    fn roadmap_cards_show_title_and_xp() {
        let tmp = TempDir::new().unwrap();
        let mut app = test_app(tmp.path());
        let mut task = Task::new("q".into(), "Ship it".into(), Category::Roadmap);
        task.set_position(300.0, 200.0);
        task.xp_value = 40;
        app.rt.block_on(app.ws.add_task(task)).unwrap();

        let output = render_to_string(TERM_W, TERM_H, |frame, area| {
            render_canvas_view(frame, &mut app, area);
        });
        assert!(output.contains("Ship it"));
        assert!(output.contains("+40 XP"));
    }

    #[test]
    fn project_canvas_shows_phase_headers_and_steps() {
        let tmp = TempDir::new().unwrap();
        let mut app = test_app(tmp.path());
        app.ws.config.canvas.compact = true;
        let project = app
            .ws
            .create_project(
                &ProjectDraft {
                    name: "Cabin".into(),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        let phase = project.phases[0].id.clone();
        app.ws
            .mutate_project(&project.id, |p| tree_ops::add_task(p, &phase, "Pour slab"))
            .unwrap();
        app.active_project = Some(project.id);
        app.switch_view(View::Project);

        let output = render_to_string(TERM_W, TERM_H, |frame, area| {
            render_canvas_view(frame, &mut app, area);
        });
        assert!(output.contains("PHASE 1: FOUNDATION [UNLOCKED]"));
        assert!(output.contains("Pour slab") || output.contains("POUR SLAB"));
    }
}
