use super::layout::{Graph, HitTarget};
use super::path::{EdgePath, Point, link_curve};
use super::viewport::Viewport;

/// Pointer input in screen space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
    Wheel(f64),
}

/// Current gesture
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Mode {
    #[default]
    Idle,
    /// Dragging the canvas; `last` is the previous pointer position
    Panning { last: Point },
    /// Dragging a link out of `source`'s output handle; `cursor` in world space
    Linking { source: String, cursor: Point },
    /// Dragging a node; `grab` is the pointer offset from the node's corner
    Dragging {
        node: String,
        grab: Point,
        at: Point,
        moved: bool,
    },
}

/// What the caller should do once a gesture ends
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    None,
    /// Add a connection `source → target`
    Link { source: String, target: String },
    /// Persist a node position (drag end only)
    Move { node: String, x: f64, y: f64 },
    /// Node clicked without moving
    Select(String),
    /// A link drag ended away from any node
    CancelLink,
}

/// Canvas pointer state machine.
///
/// Pan and zoom change the viewport directly; link and move gestures only
/// produce a `Command` on pointer-up, so nothing is persisted mid-drag.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    mode: Mode,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn handle(&mut self, event: PointerEvent, view: &mut Viewport, graph: &Graph) -> Command {
        match event {
            PointerEvent::Wheel(delta) => {
                view.wheel(delta);
                Command::None
            }
            PointerEvent::Down(screen) => {
                self.pointer_down(screen, view, graph);
                Command::None
            }
            PointerEvent::Move(screen) => {
                self.pointer_move(screen, view);
                Command::None
            }
            PointerEvent::Up(screen) => self.pointer_up(screen, view, graph),
        }
    }

    fn pointer_down(&mut self, screen: Point, view: &Viewport, graph: &Graph) {
        let world = view.to_world(screen);
        self.mode = match graph.hit_test(world) {
            HitTarget::Empty => Mode::Panning { last: screen },
            HitTarget::OutputHandle(source) => Mode::Linking {
                source,
                cursor: world,
            },
            HitTarget::NodeBody(node) => match graph.node(&node) {
                Some(n) => Mode::Dragging {
                    grab: world - n.pos,
                    at: n.pos,
                    node,
                    moved: false,
                },
                None => Mode::Idle,
            },
        };
    }

    fn pointer_move(&mut self, screen: Point, view: &mut Viewport) {
        let world = view.to_world(screen);
        match &mut self.mode {
            Mode::Idle => {}
            Mode::Panning { last } => {
                let (dx, dy) = (screen.x - last.x, screen.y - last.y);
                *last = screen;
                view.pan_by(dx, dy);
            }
            Mode::Linking { cursor, .. } => *cursor = world,
            Mode::Dragging {
                grab, at, moved, ..
            } => {
                let next = world - *grab;
                if next != *at {
                    *at = next;
                    *moved = true;
                }
            }
        }
    }

    fn pointer_up(&mut self, screen: Point, view: &Viewport, graph: &Graph) -> Command {
        let world = view.to_world(screen);
        match std::mem::take(&mut self.mode) {
            Mode::Idle | Mode::Panning { .. } => Command::None,
            Mode::Linking { source, .. } => match graph.hit_test(world) {
                HitTarget::NodeBody(target) | HitTarget::OutputHandle(target)
                    if target != source =>
                {
                    Command::Link { source, target }
                }
                _ => Command::CancelLink,
            },
            Mode::Dragging {
                node, at, moved, ..
            } => {
                if moved && graph.movable {
                    Command::Move {
                        node,
                        x: at.x,
                        y: at.y,
                    }
                } else {
                    Command::Select(node)
                }
            }
        }
    }

    /// Abandon the current gesture
    pub fn cancel(&mut self) {
        self.mode = Mode::Idle;
    }

    /// Edge following the cursor while linking
    pub fn ghost_edge(&self, graph: &Graph) -> Option<EdgePath> {
        match &self.mode {
            Mode::Linking { source, cursor } => {
                let node = graph.node(source)?;
                Some(link_curve(node.output_anchor(), *cursor))
            }
            _ => None,
        }
    }

    /// Node being dragged and where it would land
    pub fn drag_preview(&self) -> Option<(&str, Point)> {
        match &self.mode {
            Mode::Dragging {
                node, at, moved, ..
            } if *moved => Some((node.as_str(), *at)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::layout::roadmap_graph;
    use crate::canvas::viewport::ZoomRange;
    use crate::model::category::Category;
    use crate::model::task::Task;
    use pretty_assertions::assert_eq;

    fn graph() -> Graph {
        let mut a = Task::new("a".into(), "A".into(), Category::Roadmap);
        a.set_position(0.0, 0.0);
        let mut b = Task::new("b".into(), "B".into(), Category::Roadmap);
        b.set_position(400.0, 0.0);
        roadmap_graph([&a, &b])
    }

    #[test]
    fn drag_on_empty_canvas_pans() {
        let g = graph();
        let mut view = Viewport::new(ZoomRange::ROADMAP);
        let mut ix = Interaction::new();
        ix.handle(PointerEvent::Down(Point::new(300.0, 300.0)), &mut view, &g);
        assert!(matches!(ix.mode(), Mode::Panning { .. }));
        ix.handle(PointerEvent::Move(Point::new(310.0, 320.0)), &mut view, &g);
        ix.handle(PointerEvent::Move(Point::new(315.0, 330.0)), &mut view, &g);
        assert_eq!(view.pan, Point::new(15.0, 30.0));
        assert_eq!(
            ix.handle(PointerEvent::Up(Point::new(315.0, 330.0)), &mut view, &g),
            Command::None
        );
        assert_eq!(ix.mode(), &Mode::Idle);
    }

    #[test]
    fn link_from_handle_to_body_commits() {
        let g = graph();
        let mut view = Viewport::new(ZoomRange::ROADMAP);
        let mut ix = Interaction::new();
        ix.handle(PointerEvent::Down(Point::new(200.0, 45.0)), &mut view, &g);
        ix.handle(PointerEvent::Move(Point::new(450.0, 40.0)), &mut view, &g);
        let ghost = ix.ghost_edge(&g).unwrap();
        assert_eq!(ghost.end(), Point::new(450.0, 40.0));

        let cmd = ix.handle(PointerEvent::Up(Point::new(450.0, 40.0)), &mut view, &g);
        assert_eq!(
            cmd,
            Command::Link {
                source: "a".into(),
                target: "b".into()
            }
        );
        assert!(ix.ghost_edge(&g).is_none());
    }

    #[test]
    fn link_released_on_empty_or_self_cancels() {
        let g = graph();
        let mut view = Viewport::new(ZoomRange::ROADMAP);
        let mut ix = Interaction::new();
        ix.handle(PointerEvent::Down(Point::new(200.0, 45.0)), &mut view, &g);
        let cmd = ix.handle(PointerEvent::Up(Point::new(900.0, 900.0)), &mut view, &g);
        assert_eq!(cmd, Command::CancelLink);

        ix.handle(PointerEvent::Down(Point::new(200.0, 45.0)), &mut view, &g);
        let cmd = ix.handle(PointerEvent::Up(Point::new(50.0, 45.0)), &mut view, &g);
        assert_eq!(cmd, Command::CancelLink);
        assert_eq!(ix.mode(), &Mode::Idle);
    }

    #[test]
    fn dragging_commits_once_on_release() {
        let g = graph();
        let mut view = Viewport::new(ZoomRange::ROADMAP);
        view.zoom = 2.0;
        let mut ix = Interaction::new();
        // screen (20,20) is world (10,10), inside node a
        ix.handle(PointerEvent::Down(Point::new(20.0, 20.0)), &mut view, &g);
        for step in 1..=5 {
            let s = 20.0 + step as f64 * 20.0;
            assert_eq!(
                ix.handle(PointerEvent::Move(Point::new(s, s)), &mut view, &g),
                Command::None
            );
        }
        assert_eq!(ix.drag_preview(), Some(("a", Point::new(50.0, 50.0))));
        let cmd = ix.handle(PointerEvent::Up(Point::new(120.0, 120.0)), &mut view, &g);
        assert_eq!(
            cmd,
            Command::Move {
                node: "a".into(),
                x: 50.0,
                y: 50.0
            }
        );
    }

    #[test]
    fn click_without_motion_selects() {
        let g = graph();
        let mut view = Viewport::new(ZoomRange::ROADMAP);
        let mut ix = Interaction::new();
        ix.handle(PointerEvent::Down(Point::new(410.0, 10.0)), &mut view, &g);
        let cmd = ix.handle(PointerEvent::Up(Point::new(410.0, 10.0)), &mut view, &g);
        assert_eq!(cmd, Command::Select("b".into()));
    }

    #[test]
    fn wheel_zooms_in_any_mode() {
        let g = graph();
        let mut view = Viewport::new(ZoomRange::ROADMAP);
        let mut ix = Interaction::new();
        ix.handle(PointerEvent::Down(Point::new(200.0, 45.0)), &mut view, &g);
        ix.handle(PointerEvent::Wheel(-200.0), &mut view, &g);
        assert!((view.zoom - 1.2).abs() < 1e-9);
        assert!(matches!(ix.mode(), Mode::Linking { .. }));
    }
}
