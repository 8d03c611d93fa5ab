//! Geometric helpers for 2D footprint polygons.
//!
//! A polygon is an ordered ring of points with an implicit closing edge from
//! the last point back to the first.

use serde::Serialize;

use crate::types::{EPSILON_GENERAL, Point2};

/// Closed 2D outline of a container footprint.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Polygon {
    points: Vec<Point2>,
}

impl Polygon {
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates over all edges, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Signed area via the shoelace formula; positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        self.edges()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f64>()
            / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Returns a copy shifted by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.points.iter().map(|p| p.translate(dx, dy)).collect())
    }

    /// Minimum and maximum corner of the axis-aligned bounds.
    pub fn bounds(&self) -> Option<(Point2, Point2)> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (
                Point2::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point2::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }

    /// Center of the axis-aligned bounds.
    pub fn bounds_center(&self) -> Option<Point2> {
        self.bounds()
            .map(|(lo, hi)| Point2::new((lo.x + hi.x) / 2.0, (lo.y + hi.y) / 2.0))
    }

    /// Checks that no two non-adjacent edges touch or cross.
    pub fn is_simple(&self) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let edges: Vec<(Point2, Point2)> = self.edges().collect();
        for i in 0..n {
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                if adjacent {
                    continue;
                }
                if segments_intersect(edges[i].0, edges[i].1, edges[j].0, edges[j].1) {
                    return false;
                }
            }
        }
        true
    }
}

fn orientation(a: Point2, b: Point2, c: Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: Point2, b: Point2, p: Point2) -> bool {
    p.x >= a.x.min(b.x) - EPSILON_GENERAL
        && p.x <= a.x.max(b.x) + EPSILON_GENERAL
        && p.y >= a.y.min(b.y) - EPSILON_GENERAL
        && p.y <= a.y.max(b.y) + EPSILON_GENERAL
}

/// Checks whether two segments touch or cross.
pub fn segments_intersect(p1: Point2, p2: Point2, q1: Point2, q2: Point2) -> bool {
    // Bounding-box rejection first; touching boxes still need the exact test.
    let x_gap = (p1.x.max(p2.x) < q1.x.min(q2.x) - EPSILON_GENERAL)
        || (q1.x.max(q2.x) < p1.x.min(p2.x) - EPSILON_GENERAL);
    let y_gap = (p1.y.max(p2.y) < q1.y.min(q2.y) - EPSILON_GENERAL)
        || (q1.y.max(q2.y) < p1.y.min(p2.y) - EPSILON_GENERAL);
    if x_gap || y_gap {
        return false;
    }

    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > EPSILON_GENERAL && d2 < -EPSILON_GENERAL)
        || (d1 < -EPSILON_GENERAL && d2 > EPSILON_GENERAL))
        && ((d3 > EPSILON_GENERAL && d4 < -EPSILON_GENERAL)
            || (d3 < -EPSILON_GENERAL && d4 > EPSILON_GENERAL))
    {
        return true;
    }

    (d1.abs() <= EPSILON_GENERAL && on_segment(q1, q2, p1))
        || (d2.abs() <= EPSILON_GENERAL && on_segment(q1, q2, p2))
        || (d3.abs() <= EPSILON_GENERAL && on_segment(p1, p2, q1))
        || (d4.abs() <= EPSILON_GENERAL && on_segment(p1, p2, q2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Polygon {
        Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(size, 0.0),
            Point2::new(size, size),
            Point2::new(0.0, size),
        ])
    }

    #[test]
    fn shoelace_area_and_orientation() {
        let poly = square(4.0);
        assert!((poly.area() - 16.0).abs() < EPSILON_GENERAL);
        assert!(poly.is_counter_clockwise());

        let reversed = Polygon::new(poly.points().iter().rev().copied().collect());
        assert!(!reversed.is_counter_clockwise());
        assert!((reversed.area() - 16.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn translated_moves_bounds_center() {
        let poly = square(2.0).translated(-1.0, -1.0);
        let center = poly.bounds_center().unwrap();
        assert!(center.x.abs() < EPSILON_GENERAL);
        assert!(center.y.abs() < EPSILON_GENERAL);
    }

    #[test]
    fn bowtie_is_not_simple() {
        let bowtie = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 2.0),
        ]);
        assert!(!bowtie.is_simple());
        assert!(square(1.0).is_simple());
    }

    #[test]
    fn collinear_touching_segments_intersect() {
        assert!(segments_intersect(
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(3.0, 0.0),
        ));
        assert!(!segments_intersect(
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(3.0, 0.0),
        ));
    }
}
