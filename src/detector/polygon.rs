//! Polygon approximation and the geometric tests used to classify a
//! contour's vertex count into a symbol shape (spec.md §4.1.3).

use crate::types::Point;
use nalgebra::Point2;

/// Ramer/Douglas-Peucker polygon simplification with `epsilon =
/// dp_epsilon_ratio * perimeter`, operating on a closed polygon by
/// splitting it at its two most distant points and simplifying each half
/// as an open polyline.
pub fn douglas_peucker(points: &[(u32, u32)], epsilon_ratio: f64) -> Vec<(u32, u32)> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let perimeter = crate::types::Contour::new(points.to_vec()).perimeter();
    let epsilon = (epsilon_ratio * perimeter).max(1e-6);

    // Closed contours need a split into two open chains before the
    // classic open-polyline DP recursion applies; using the two points
    // farthest apart as anchors keeps the split stable and deterministic.
    let (i, j) = farthest_pair(points);
    let (lo, hi) = if i < j { (i, j) } else { (j, i) };

    let mut chain_a: Vec<(u32, u32)> = points[lo..=hi].to_vec();
    let mut chain_b: Vec<(u32, u32)> = points[hi..]
        .iter()
        .chain(points[..=lo].iter())
        .copied()
        .collect();

    chain_a = simplify_open(&chain_a, epsilon);
    chain_b = simplify_open(&chain_b, epsilon);

    // Drop the duplicated shared endpoints when stitching back together.
    chain_b.pop();
    let mut out = chain_a;
    out.extend(chain_b.into_iter().skip(1));
    out
}

fn farthest_pair(points: &[(u32, u32)]) -> (usize, usize) {
    let mut best = (0, 0, 0.0f64);
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let (x0, y0) = points[i];
            let (x1, y1) = points[j];
            let dx = x1 as f64 - x0 as f64;
            let dy = y1 as f64 - y0 as f64;
            let d2 = dx * dx + dy * dy;
            if d2 > best.2 {
                best = (i, j, d2);
            }
        }
    }
    (best.0, best.1)
}

fn simplify_open(points: &[(u32, u32)], epsilon: f64) -> Vec<(u32, u32)> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let first = points[0];
    let last = *points.last().unwrap();

    let mut max_dist = 0.0;
    let mut index = 0;
    for (i, &p) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let d = perpendicular_distance(p, first, last);
        if d > max_dist {
            max_dist = d;
            index = i;
        }
    }

    if max_dist > epsilon {
        let mut left = simplify_open(&points[..=index], epsilon);
        let right = simplify_open(&points[index..], epsilon);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

fn perpendicular_distance(p: (u32, u32), a: (u32, u32), b: (u32, u32)) -> f64 {
    let (px, py) = (p.0 as f64, p.1 as f64);
    let (ax, ay) = (a.0 as f64, a.1 as f64);
    let (bx, by) = (b.0 as f64, b.1 as f64);
    let dx = bx - ax;
    let dy = by - ay;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-9 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    ((px - ax) * dy - (py - ay) * dx).abs() / len
}

/// Interior angle in degrees at vertex `b`, formed by `a -> b -> c`.
fn interior_angle_deg(a: Point, b: Point, c: Point) -> f64 {
    let v1 = a - b;
    let v2 = c - b;
    let cos = v1.dot(&v2) / (v1.norm() * v2.norm()).max(1e-9);
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// True if a 4-vertex polygon's aspect ratio and corner angles fall within
/// the square tolerances (spec.md §4.1.3 rule 5).
pub fn is_square(
    vertices: &[(u32, u32)],
    aspect_range: (f64, f64),
    angle_tolerance_deg: f64,
) -> bool {
    if vertices.len() != 4 {
        return false;
    }
    let pts: Vec<Point> = vertices.iter().map(|&(x, y)| Point2::new(x as f64, y as f64)).collect();

    for i in 0..4 {
        let a = pts[i];
        let b = pts[(i + 1) % 4];
        let c = pts[(i + 2) % 4];
        let angle = interior_angle_deg(a, b, c);
        if (angle - 90.0).abs() > angle_tolerance_deg {
            return false;
        }
    }

    let (min_x, min_y, max_x, max_y) = crate::types::Contour::new(vertices.to_vec()).bounding_box();
    let w = (max_x - min_x).max(1) as f64;
    let h = (max_y - min_y).max(1) as f64;
    let aspect = w / h;
    aspect >= aspect_range.0 && aspect <= aspect_range.1
}

/// True if the radial distances from the centroid alternate short/long
/// enough to read as a star rather than a regular polygon (spec.md
/// §4.1.3 rule 6).
pub fn is_star_shape(points: &[(u32, u32)]) -> bool {
    if points.len() < 6 {
        return false;
    }
    let contour = crate::types::Contour::new(points.to_vec());
    let centroid = contour.centroid();
    let distances: Vec<f64> = points
        .iter()
        .map(|&(x, y)| {
            let p = Point2::new(x as f64, y as f64);
            (p - centroid).norm()
        })
        .collect();

    let mean = distances.iter().sum::<f64>() / distances.len() as f64;
    if mean <= 0.0 {
        return false;
    }
    let variance = distances.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / distances.len() as f64;
    let coefficient_of_variation = variance.sqrt() / mean;
    coefficient_of_variation > 0.18
}

/// Distinguishes an 8-pointed vs 6-pointed star by counting local maxima
/// in the radial-distance profile around the centroid.
pub fn count_radial_spokes(points: &[(u32, u32)]) -> usize {
    if points.len() < 3 {
        return 0;
    }
    let contour = crate::types::Contour::new(points.to_vec());
    let centroid = contour.centroid();
    let distances: Vec<f64> = points
        .iter()
        .map(|&(x, y)| {
            let p = Point2::new(x as f64, y as f64);
            (p - centroid).norm()
        })
        .collect();

    let n = distances.len();
    let mean = distances.iter().sum::<f64>() / n as f64;
    let mut spokes = 0;
    for i in 0..n {
        let prev = distances[(i + n - 1) % n];
        let cur = distances[i];
        let next = distances[(i + 1) % n];
        if cur > prev && cur >= next && cur > mean {
            spokes += 1;
        }
    }
    spokes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_passes_is_square() {
        let pts = vec![(0, 0), (10, 0), (10, 10), (0, 10)];
        assert!(is_square(&pts, (0.7, 1.3), 15.0));
    }

    #[test]
    fn thin_rectangle_fails_is_square() {
        let pts = vec![(0, 0), (40, 0), (40, 10), (0, 10)];
        assert!(!is_square(&pts, (0.7, 1.3), 15.0));
    }

    #[test]
    fn douglas_peucker_reduces_dense_circle_approximation() {
        let mut pts = Vec::new();
        for i in 0..360 {
            let angle = (i as f64).to_radians();
            let x = (50.0 + 40.0 * angle.cos()).round() as u32;
            let y = (50.0 + 40.0 * angle.sin()).round() as u32;
            pts.push((x, y));
        }
        let simplified = douglas_peucker(&pts, 0.02);
        assert!(simplified.len() < pts.len());
        assert!(simplified.len() > 8);
    }

    #[test]
    fn douglas_peucker_keeps_square_corners() {
        let mut pts = Vec::new();
        for x in 0..=20 {
            pts.push((x, 0));
        }
        for y in 0..=20 {
            pts.push((20, y));
        }
        for x in (0..=20).rev() {
            pts.push((x, 20));
        }
        for y in (0..=20).rev() {
            pts.push((0, y));
        }
        let simplified = douglas_peucker(&pts, 0.02);
        assert!(simplified.len() >= 4 && simplified.len() <= 6);
    }

    #[test]
    fn star_shape_has_high_variation() {
        let mut pts = Vec::new();
        for i in 0..10 {
            let angle = (i as f64) * std::f64::consts::PI / 5.0;
            let r = if i % 2 == 0 { 40.0 } else { 15.0 };
            let x = (50.0 + r * angle.cos()).round() as u32;
            let y = (50.0 + r * angle.sin()).round() as u32;
            pts.push((x, y));
        }
        assert!(is_star_shape(&pts));
    }

    #[test]
    fn regular_hexagon_is_not_star_shaped() {
        let mut pts = Vec::new();
        for i in 0..6 {
            let angle = (i as f64) * std::f64::consts::PI / 3.0;
            let x = (50.0 + 30.0 * angle.cos()).round() as u32;
            let y = (50.0 + 30.0 * angle.sin()).round() as u32;
            pts.push((x, y));
        }
        assert!(!is_star_shape(&pts));
    }
}
