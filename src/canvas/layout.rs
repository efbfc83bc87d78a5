use crate::model::project::Project;
use crate::model::task::Task;

use super::path::{EdgePath, Point, elbow, link_curve};

pub const TASK_NODE_W: f64 = 256.0;
pub const TASK_NODE_H: f64 = 100.0;
pub const SUBTASK_NODE_W: f64 = 192.0;
pub const SUBTASK_NODE_H: f64 = 80.0;
pub const ROADMAP_NODE_W: f64 = 200.0;
pub const ROADMAP_NODE_H: f64 = 90.0;
/// Where an unplaced roadmap node lands
pub const ROADMAP_DEFAULT_POS: Point = Point::new(100.0, 100.0);
/// Gap between a link's arrow tip and the target's left edge
const LINK_TARGET_GAP: f64 = 10.0;
/// Radius of the output handle hit area
const HANDLE_RADIUS: f64 = 12.0;

/// Spacing for the phase-column layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutProfile {
    pub initial_x: f64,
    pub column_spacing: f64,
    pub top: f64,
    pub row_spacing: f64,
    pub subtask_spacing: f64,
    pub subtask_drop: f64,
}

impl LayoutProfile {
    pub const STANDARD: LayoutProfile = LayoutProfile {
        initial_x: 300.0,
        column_spacing: 500.0,
        top: 100.0,
        row_spacing: 250.0,
        subtask_spacing: 180.0,
        subtask_drop: 250.0,
    };

    pub const COMPACT: LayoutProfile = LayoutProfile {
        initial_x: 50.0,
        column_spacing: 350.0,
        top: 100.0,
        row_spacing: 250.0,
        subtask_spacing: 140.0,
        subtask_drop: 250.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Task,
    Subtask,
}

/// A placed node card
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub title: String,
    pub completed: bool,
    /// Top-left corner, world space
    pub pos: Point,
    pub width: f64,
    pub height: f64,
    /// Owning task, for subtask nodes
    pub parent: Option<String>,
    pub locked: bool,
}

impl Node {
    pub fn center(&self) -> Point {
        Point::new(self.pos.x + self.width / 2.0, self.pos.y + self.height / 2.0)
    }

    /// Where outgoing links start: the middle of the right edge
    pub fn output_anchor(&self) -> Point {
        Point::new(self.pos.x + self.width, self.pos.y + self.height / 2.0)
    }

    /// Where incoming links end, just left of the card
    pub fn input_anchor(&self) -> Point {
        Point::new(self.pos.x - LINK_TARGET_GAP, self.pos.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.pos.x
            && p.x <= self.pos.x + self.width
            && p.y >= self.pos.y
            && p.y <= self.pos.y + self.height
    }

    pub fn on_output_handle(&self, p: Point) -> bool {
        let a = self.output_anchor();
        let (dx, dy) = (p.x - a.x, p.y - a.y);
        dx * dx + dy * dy <= HANDLE_RADIUS * HANDLE_RADIUS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Parent task → subtask (expanded tasks only)
    Tree,
    /// Explicit connection
    Link,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

/// What a world-space point lands on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Empty,
    NodeBody(String),
    OutputHandle(String),
}

/// A laid-out node graph
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Whether nodes keep positions the user drags them to
    pub movable: bool,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Topmost thing under `p`. Nodes drawn later sit on top; handles win over
    /// bodies.
    pub fn hit_test(&self, p: Point) -> HitTarget {
        for node in self.nodes.iter().rev() {
            if node.on_output_handle(p) {
                return HitTarget::OutputHandle(node.id.clone());
            }
            if node.contains(p) {
                return HitTarget::NodeBody(node.id.clone());
            }
        }
        HitTarget::Empty
    }

    /// Geometry for an edge; `None` if either end is not on the canvas
    pub fn edge_path(&self, edge: &Edge) -> Option<EdgePath> {
        let s = self.node(&edge.source)?;
        let t = self.node(&edge.target)?;
        Some(match edge.kind {
            EdgeKind::Tree => elbow(
                Point::new(s.center().x, s.pos.y + s.height),
                Point::new(t.center().x, t.pos.y),
            ),
            EdgeKind::Link => link_curve(s.output_anchor(), t.input_anchor()),
        })
    }

    /// World-space bounding box of every node, as (min, max)
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let mut iter = self.nodes.iter();
        let first = iter.next()?;
        let mut min = first.pos;
        let mut max = Point::new(first.pos.x + first.width, first.pos.y + first.height);
        for n in iter {
            min.x = min.x.min(n.pos.x);
            min.y = min.y.min(n.pos.y);
            max.x = max.x.max(n.pos.x + n.width);
            max.y = max.y.max(n.pos.y + n.height);
        }
        Some((min, max))
    }

    fn push_links(&mut self, source: &str, targets: impl IntoIterator<Item = String>) {
        for target in targets {
            self.edges.push(Edge {
                source: source.to_string(),
                target,
                kind: EdgeKind::Link,
            });
        }
    }

    /// Drop edges whose endpoints are not both on the canvas
    fn retain_visible_edges(&mut self) {
        let ids: std::collections::HashSet<&str> =
            self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.edges
            .retain(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()));
    }
}

/// Lay out a project: one column per phase, tasks stacked down the column,
/// and the expanded task's subtasks in a row centred beneath it.
pub fn project_graph(project: &Project, expanded: Option<&str>, profile: &LayoutProfile) -> Graph {
    let mut graph = Graph::default();

    for (col, phase) in project.phases.iter().enumerate() {
        let x = profile.initial_x + col as f64 * profile.column_spacing;
        for (row, task) in phase.tasks.iter().enumerate() {
            let y = profile.top + row as f64 * profile.row_spacing;
            graph.nodes.push(Node {
                id: task.id.clone(),
                kind: NodeKind::Task,
                title: task.title.clone(),
                completed: task.completed,
                pos: Point::new(x, y),
                width: TASK_NODE_W,
                height: TASK_NODE_H,
                parent: None,
                locked: phase.is_locked(),
            });
            graph.push_links(&task.id, task.connections.iter().cloned());

            if expanded != Some(task.id.as_str()) {
                continue;
            }
            let n = task.subtasks.len();
            let start = -(profile.subtask_spacing * n.saturating_sub(1) as f64) / 2.0;
            for (i, sub) in task.subtasks.iter().enumerate() {
                graph.nodes.push(Node {
                    id: sub.id.clone(),
                    kind: NodeKind::Subtask,
                    title: sub.title.clone(),
                    completed: sub.completed,
                    pos: Point::new(
                        x + start + i as f64 * profile.subtask_spacing,
                        y + profile.subtask_drop,
                    ),
                    width: SUBTASK_NODE_W,
                    height: SUBTASK_NODE_H,
                    parent: Some(task.id.clone()),
                    locked: phase.is_locked(),
                });
                graph.edges.push(Edge {
                    source: task.id.clone(),
                    target: sub.id.clone(),
                    kind: EdgeKind::Tree,
                });
                graph.push_links(&sub.id, sub.connections.iter().cloned());
            }
        }
    }

    graph.retain_visible_edges();
    graph
}

/// Free-form roadmap: each task sits at its stored position
pub fn roadmap_graph<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Graph {
    let mut graph = Graph {
        movable: true,
        ..Graph::default()
    };
    for task in tasks {
        let pos = task
            .position()
            .map(|(x, y)| Point::new(x, y))
            .unwrap_or(ROADMAP_DEFAULT_POS);
        graph.nodes.push(Node {
            id: task.id.clone(),
            kind: NodeKind::Task,
            title: task.title.clone(),
            completed: task.completed,
            pos,
            width: ROADMAP_NODE_W,
            height: ROADMAP_NODE_H,
            parent: None,
            locked: false,
        });
        graph.push_links(&task.id, task.connections.iter().cloned());
    }
    graph.retain_visible_edges();
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::{Category, ExecutionStyle, ProjectField};
    use crate::model::project::{Phase, PhaseStatus};
    use crate::model::task::Subtask;
    use pretty_assertions::assert_eq;

    fn task(id: &str) -> Task {
        Task::new(id.into(), id.to_uppercase(), Category::Projects)
    }

    fn project() -> Project {
        let mut t1 = task("t1");
        t1.subtasks = vec![
            Subtask::new("s1".into(), "a".into()),
            Subtask::new("s2".into(), "b".into()),
            Subtask::new("s3".into(), "c".into()),
        ];
        t1.connections.insert("t3".into());
        t1.connections.insert("missing".into());
        t1.subtasks[0].connections.insert("t2".into());
        let phases = vec![
            Phase {
                id: "p1".into(),
                title: "ONE".into(),
                order: 1,
                status: PhaseStatus::Unlocked,
                tasks: vec![t1, task("t2")],
            },
            Phase {
                id: "p2".into(),
                title: "TWO".into(),
                order: 2,
                status: PhaseStatus::Locked,
                tasks: vec![task("t3")],
            },
        ];
        Project {
            id: "proj".into(),
            title: "P".into(),
            field: ProjectField::Tech,
            mission_id: None,
            phases,
            progress: 0,
            execution_style: ExecutionStyle::Structured,
            user_id: "u".into(),
        }
    }

    fn pos(g: &Graph, id: &str) -> (f64, f64) {
        let p = g.node(id).unwrap().pos;
        (p.x, p.y)
    }

    #[test]
    fn phases_become_columns() {
        let g = project_graph(&project(), None, &LayoutProfile::STANDARD);
        assert_eq!(pos(&g, "t1"), (300.0, 100.0));
        assert_eq!(pos(&g, "t2"), (300.0, 350.0));
        assert_eq!(pos(&g, "t3"), (800.0, 100.0));
        assert!(g.node("t3").unwrap().locked);
        assert!(g.node("s1").is_none());
    }

    #[test]
    fn collapsed_task_hides_subtask_edges() {
        let g = project_graph(&project(), None, &LayoutProfile::STANDARD);
        // the dangling "missing" link and the hidden subtask link are dropped
        assert_eq!(
            g.edges,
            vec![Edge {
                source: "t1".into(),
                target: "t3".into(),
                kind: EdgeKind::Link
            }]
        );
    }

    #[test]
    fn expanded_subtasks_are_centred_below() {
        let g = project_graph(&project(), Some("t1"), &LayoutProfile::STANDARD);
        assert_eq!(pos(&g, "s1"), (120.0, 350.0));
        assert_eq!(pos(&g, "s2"), (300.0, 350.0));
        assert_eq!(pos(&g, "s3"), (480.0, 350.0));
        let tree = g.edges.iter().filter(|e| e.kind == EdgeKind::Tree).count();
        assert_eq!(tree, 3);
        assert!(
            g.edges
                .iter()
                .any(|e| e.source == "s1" && e.target == "t2" && e.kind == EdgeKind::Link)
        );
    }

    #[test]
    fn compact_profile_tightens_spacing() {
        let g = project_graph(&project(), Some("t1"), &LayoutProfile::COMPACT);
        assert_eq!(pos(&g, "t3"), (400.0, 100.0));
        assert_eq!(pos(&g, "s1"), (-90.0, 350.0));
    }

    #[test]
    fn edge_paths_use_anchors() {
        let g = project_graph(&project(), Some("t1"), &LayoutProfile::STANDARD);
        let link = g.edges.iter().find(|e| e.target == "t3").unwrap();
        insta::assert_snapshot!(g.edge_path(link).unwrap().to_svg(), @"M 556 150 C 673 150, 673 150, 790 150");
        let tree = g.edges.iter().find(|e| e.target == "s2").unwrap();
        insta::assert_snapshot!(g.edge_path(tree).unwrap().to_svg(), @"M 428 200 L 428 350 L 396 350");
    }

    #[test]
    fn roadmap_uses_stored_positions() {
        let mut a = task("a");
        a.set_position(400.0, 250.0);
        a.connections.insert("b".into());
        let b = task("b");
        let g = roadmap_graph([&a, &b]);
        assert!(g.movable);
        assert_eq!(pos(&g, "a"), (400.0, 250.0));
        assert_eq!(pos(&g, "b"), (100.0, 100.0));
        let path = g.edge_path(&g.edges[0]).unwrap();
        assert_eq!(path.start(), Point::new(600.0, 295.0));
        assert_eq!(path.end(), Point::new(90.0, 145.0));
    }

    #[test]
    fn hit_testing_prefers_handles_and_top_nodes() {
        let mut a = task("a");
        a.set_position(0.0, 0.0);
        let mut b = task("b");
        b.set_position(50.0, 0.0);
        let g = roadmap_graph([&a, &b]);
        assert_eq!(g.hit_test(Point::new(60.0, 10.0)), HitTarget::NodeBody("b".into()));
        assert_eq!(g.hit_test(Point::new(10.0, 10.0)), HitTarget::NodeBody("a".into()));
        assert_eq!(
            g.hit_test(Point::new(252.0, 45.0)),
            HitTarget::OutputHandle("b".into())
        );
        assert_eq!(g.hit_test(Point::new(900.0, 900.0)), HitTarget::Empty);
        let (min, max) = g.bounds().unwrap();
        assert_eq!((min, max), (Point::new(0.0, 0.0), Point::new(250.0, 90.0)));
    }
}
