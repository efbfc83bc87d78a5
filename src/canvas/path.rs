use serde::Serialize;

/// A point in world or screen space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Geometry of an edge between two anchors
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgePath {
    /// Down from `from`, then across to `to`
    Elbow { from: Point, to: Point },
    /// Cubic Bézier whose control points pull toward the horizontal midpoint
    Cubic {
        from: Point,
        c1: Point,
        c2: Point,
        to: Point,
    },
}

/// L-shaped path used for parent → child edges
pub fn elbow(from: Point, to: Point) -> EdgePath {
    EdgePath::Elbow { from, to }
}

/// Curve used for explicit links. Control points sit half the horizontal
/// distance inward from each end, level with their endpoint.
pub fn link_curve(from: Point, to: Point) -> EdgePath {
    let half = (to.x - from.x).abs() * 0.5;
    EdgePath::Cubic {
        from,
        c1: Point::new(from.x + half, from.y),
        c2: Point::new(to.x - half, to.y),
        to,
    }
}

impl EdgePath {
    pub fn start(&self) -> Point {
        match *self {
            EdgePath::Elbow { from, .. } | EdgePath::Cubic { from, .. } => from,
        }
    }

    pub fn end(&self) -> Point {
        match *self {
            EdgePath::Elbow { to, .. } | EdgePath::Cubic { to, .. } => to,
        }
    }

    /// SVG path data (`d` attribute)
    pub fn to_svg(&self) -> String {
        match *self {
            EdgePath::Elbow { from, to } => format!(
                "M {} {} L {} {} L {} {}",
                from.x, from.y, from.x, to.y, to.x, to.y
            ),
            EdgePath::Cubic { from, c1, c2, to } => format!(
                "M {} {} C {} {}, {} {}, {} {}",
                from.x, from.y, c1.x, c1.y, c2.x, c2.y, to.x, to.y
            ),
        }
    }

    /// Polyline approximation. Elbows are exact (three vertices); curves are
    /// evaluated at `segments + 1` evenly spaced parameters.
    pub fn sample(&self, segments: usize) -> Vec<Point> {
        match *self {
            EdgePath::Elbow { from, to } => vec![from, Point::new(from.x, to.y), to],
            EdgePath::Cubic { from, c1, c2, to } => {
                let n = segments.max(1);
                (0..=n)
                    .map(|i| cubic_at(from, c1, c2, to, i as f64 / n as f64))
                    .collect()
            }
        }
    }
}

fn cubic_at(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let u = 1.0 - t;
    let b0 = u * u * u;
    let b1 = 3.0 * u * u * t;
    let b2 = 3.0 * u * t * t;
    let b3 = t * t * t;
    Point::new(
        b0 * p0.x + b1 * p1.x + b2 * p2.x + b3 * p3.x,
        b0 * p0.y + b1 * p1.y + b2 * p2.y + b3 * p3.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elbow_svg() {
        let p = elbow(Point::new(100.0, 200.0), Point::new(40.0, 450.0));
        insta::assert_snapshot!(p.to_svg(), @"M 100 200 L 100 450 L 40 450");
    }

    #[test]
    fn link_curve_bows_toward_midpoint() {
        let p = link_curve(Point::new(300.0, 145.0), Point::new(490.0, 45.0));
        insta::assert_snapshot!(p.to_svg(), @"M 300 145 C 395 145, 395 45, 490 45");
    }

    #[test]
    fn backwards_link_still_uses_absolute_distance() {
        let p = link_curve(Point::new(500.0, 0.0), Point::new(100.0, 0.0));
        insta::assert_snapshot!(p.to_svg(), @"M 500 0 C 700 0, -100 0, 100 0");
    }

    #[test]
    fn sampling_hits_endpoints() {
        let p = link_curve(Point::new(0.0, 0.0), Point::new(100.0, 50.0));
        let pts = p.sample(8);
        assert_eq!(pts.len(), 9);
        assert_eq!(pts[0], Point::new(0.0, 0.0));
        assert_eq!(pts[8], Point::new(100.0, 50.0));
        // symmetric curve passes through the midpoint
        assert!((pts[4].x - 50.0).abs() < 1e-9);
        assert!((pts[4].y - 25.0).abs() < 1e-9);

        let e = elbow(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        assert_eq!(e.sample(8).len(), 3);
    }
}
