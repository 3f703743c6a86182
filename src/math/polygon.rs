use super::Point2d;
use itertools::{iproduct, Itertools};

/// A closed polygon ring on the ground plane.
///
/// The ring is stored with its first point re-appended at the end, so every
/// consecutive pair of stored points is an edge.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon2d {
    points: Vec<Point2d>,
}

impl Polygon2d {
    /// Builds a closed ring from a boundary trace by re-appending its first
    /// point.
    pub fn from_boundary(boundary: &[Point2d]) -> Self {
        let mut points = boundary.to_vec();
        if let Some(first) = boundary.first().copied() {
            points.push(first);
        }
        Self { points }
    }

    /// The ring vertices, first point duplicated at the end.
    pub fn points(&self) -> &[Point2d] {
        &self.points
    }

    /// Signed area of the ring. Non-positive for clockwise winding in the
    /// left-handed world frame.
    pub fn signed_area(&self) -> f64 {
        0.5 * self
            .edges()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f64>()
    }

    /// Even-odd test for a point inside the ring.
    pub fn contains(&self, point: Point2d) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > point.y) != (b.y > point.y) {
                let x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if point.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Distance from a point to the ring. Zero if the point lies inside.
    pub fn distance_to_point(&self, point: Point2d) -> f64 {
        if self.contains(point) {
            return 0.0;
        }
        self.edges()
            .map(|(a, b)| point_segment_distance_squared(point, a, b))
            .fold(f64::INFINITY, f64::min)
            .sqrt()
    }

    /// Minimum distance between two rings. Zero if they touch or overlap.
    pub fn distance(&self, other: &Polygon2d) -> f64 {
        let own_edges = self.edges().collect::<Vec<_>>();
        let other_edges = other.edges().collect::<Vec<_>>();
        let edge_distance = iproduct!(&own_edges, &other_edges)
            .map(|(&(a1, a2), &(b1, b2))| segment_distance(a1, a2, b1, b2))
            .fold(f64::INFINITY, f64::min);
        if edge_distance <= 0.0 {
            return 0.0;
        }
        // Disjoint edges can still mean one ring is nested inside the other.
        let nested = match (self.points.first(), other.points.first()) {
            (Some(p), Some(q)) => other.contains(*p) || self.contains(*q),
            _ => false,
        };
        if nested {
            0.0
        } else {
            edge_distance
        }
    }

    fn edges(&self) -> impl Iterator<Item = (Point2d, Point2d)> + '_ {
        self.points.iter().copied().tuple_windows()
    }
}

/// Squared distance from a point to a segment.
fn point_segment_distance_squared(point: Point2d, a: Point2d, b: Point2d) -> f64 {
    let length_squared = (b.x - a.x).powi(2) + (b.y - a.y).powi(2);
    if length_squared == 0.0 {
        return (point.x - a.x).powi(2) + (point.y - a.y).powi(2);
    }
    let t = ((point.x - a.x) * (b.x - a.x) + (point.y - a.y) * (b.y - a.y)) / length_squared;
    let t = t.clamp(0.0, 1.0);
    let proj_x = a.x + t * (b.x - a.x);
    let proj_y = a.y + t * (b.y - a.y);
    (point.x - proj_x).powi(2) + (point.y - proj_y).powi(2)
}

/// Parametric intersection test over the closed interval [0, 1].
/// Collinear overlap is left to the endpoint distance checks.
fn segments_intersect(a1: Point2d, a2: Point2d, b1: Point2d, b2: Point2d) -> bool {
    let denominator = (b2.y - b1.y) * (a2.x - a1.x) - (b2.x - b1.x) * (a2.y - a1.y);
    if denominator == 0.0 {
        return false;
    }
    let ua = ((b2.x - b1.x) * (a1.y - b1.y) - (b2.y - b1.y) * (a1.x - b1.x)) / denominator;
    if !(0.0..=1.0).contains(&ua) {
        return false;
    }
    let ub = ((a2.x - a1.x) * (a1.y - b1.y) - (a2.y - a1.y) * (a1.x - b1.x)) / denominator;
    (0.0..=1.0).contains(&ub)
}

/// Minimum distance between two segments. Zero if they intersect.
fn segment_distance(a1: Point2d, a2: Point2d, b1: Point2d, b2: Point2d) -> f64 {
    if segments_intersect(a1, a2, b1, b2) {
        return 0.0;
    }
    [
        point_segment_distance_squared(a1, b1, b2),
        point_segment_distance_squared(a2, b1, b2),
        point_segment_distance_squared(b1, a1, a2),
        point_segment_distance_squared(b2, a1, a2),
    ]
    .into_iter()
    .fold(f64::INFINITY, f64::min)
    .sqrt()
}
