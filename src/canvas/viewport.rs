use super::path::Point;

/// Zoom change per unit of wheel delta
pub const WHEEL_ZOOM_STEP: f64 = 0.001;
/// Zoom change per +/- button press
pub const BUTTON_ZOOM_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
}

impl ZoomRange {
    /// Project graph canvas
    pub const WORKSPACE: ZoomRange = ZoomRange { min: 0.2, max: 2.0 };
    /// Free-form roadmap canvas
    pub const ROADMAP: ZoomRange = ZoomRange { min: 0.5, max: 2.0 };

    fn clamp(&self, z: f64) -> f64 {
        z.clamp(self.min, self.max)
    }
}

/// Pan offset plus zoom scalar. `screen = world * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub pan: Point,
    pub zoom: f64,
    pub range: ZoomRange,
}

impl Viewport {
    pub fn new(range: ZoomRange) -> Self {
        Viewport {
            pan: Point::default(),
            zoom: 1.0,
            range,
        }
    }

    pub fn to_world(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    pub fn to_screen(&self, world: Point) -> Point {
        Point::new(
            world.x * self.zoom + self.pan.x,
            world.y * self.zoom + self.pan.y,
        )
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan.x += dx;
        self.pan.y += dy;
    }

    /// Wheel scroll: positive delta zooms out
    pub fn wheel(&mut self, delta_y: f64) {
        self.zoom = self.range.clamp(self.zoom - delta_y * WHEEL_ZOOM_STEP);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = self.range.clamp(self.zoom + BUTTON_ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = self.range.clamp(self.zoom - BUTTON_ZOOM_STEP);
    }

    pub fn reset(&mut self) {
        self.pan = Point::default();
        self.zoom = 1.0;
    }

    /// Pan so the world point lands at the given screen point
    pub fn center_on(&mut self, world: Point, screen: Point) {
        self.pan = Point::new(
            screen.x - world.x * self.zoom,
            screen.y - world.y * self.zoom,
        );
    }
}
