pub mod interaction;
pub mod layout;
pub mod path;
pub mod viewport;

pub use interaction::{Command, Interaction, Mode, PointerEvent};
pub use layout::{Graph, HitTarget, LayoutProfile, project_graph, roadmap_graph};
pub use path::{EdgePath, Point};
pub use viewport::{Viewport, ZoomRange};
