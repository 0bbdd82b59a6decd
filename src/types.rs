//! Geometry primitives shared by every pipeline stage.
//!
//! Coordinates are `f64` throughout (see DESIGN.md for why this widens the
//! teacher's `f32`): contour point sums and circularity ratios otherwise
//! accumulate visible rounding drift on large contours, which would make
//! determinism testing (spec.md §8) flaky across target platforms.

use nalgebra::Point2;

/// A point in image space. Origin top-left, y increases downward.
pub type Point = Point2<f64>;

/// An ordered, closed sequence of integer-coordinate points tracing the
/// boundary of a connected foreground region.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<(u32, u32)>,
}

impl Contour {
    pub fn new(points: Vec<(u32, u32)>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Polygon perimeter via the closed-loop edge sum.
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        let mut total = 0.0;
        for i in 0..n {
            let (x0, y0) = self.points[i];
            let (x1, y1) = self.points[(i + 1) % n];
            let dx = x1 as f64 - x0 as f64;
            let dy = y1 as f64 - y0 as f64;
            total += (dx * dx + dy * dy).sqrt();
        }
        total
    }

    /// Signed polygon area via the shoelace formula, always returned
    /// non-negative.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut acc = 0.0;
        for i in 0..n {
            let (x0, y0) = self.points[i];
            let (x1, y1) = self.points[(i + 1) % n];
            acc += x0 as f64 * y1 as f64 - x1 as f64 * y0 as f64;
        }
        acc.abs() / 2.0
    }

    /// Centroid of the vertex set (not the area centroid — matches the
    /// teacher's vertex-mean approach, which is what the rest of the
    /// pipeline's distance/grid math assumes).
    pub fn centroid(&self) -> Point {
        let n = self.points.len() as f64;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x as f64, sy + y as f64));
        Point2::new(sx / n, sy / n)
    }

    /// `4*pi*area / perimeter^2`. A perfect circle scores 1.0.
    pub fn circularity(&self) -> f64 {
        let perimeter = self.perimeter();
        if perimeter <= 0.0 {
            return 0.0;
        }
        4.0 * std::f64::consts::PI * self.area() / (perimeter * perimeter)
    }

    /// Axis-aligned bounding box as (min_x, min_y, max_x, max_y).
    pub fn bounding_box(&self) -> (u32, u32, u32, u32) {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        for &(x, y) in &self.points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        (min_x, min_y, max_x, max_y)
    }
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    (a - b).norm()
}

/// The p-th percentile of a distance sample, using nearest-rank on a sorted
/// copy. Used for the proximity cutoffs in connection/flow-graph inference
/// (spec.md §4.1.5, §4.2.3) so both stay O(n log n) on the input
/// distribution rather than hard-coded absolute distances.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let rank = ((pct / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_contour_area_and_perimeter() {
        let c = Contour::new(vec![(0, 0), (10, 0), (10, 10), (0, 10)]);
        assert_eq!(c.area(), 100.0);
        assert_eq!(c.perimeter(), 40.0);
    }

    #[test]
    fn square_circularity_below_one() {
        let c = Contour::new(vec![(0, 0), (10, 0), (10, 10), (0, 10)]);
        assert!(c.circularity() < 0.9);
        assert!(c.circularity() > 0.7);
    }

    #[test]
    fn centroid_of_square_is_center() {
        let c = Contour::new(vec![(0, 0), (10, 0), (10, 10), (0, 10)]);
        let centroid = c.centroid();
        assert_eq!(centroid.x, 5.0);
        assert_eq!(centroid.y, 5.0);
    }

    #[test]
    fn percentile_nearest_rank() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
    }

    #[test]
    fn distance_pythagorean() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        assert_eq!(distance(a, b), 5.0);
    }
}
