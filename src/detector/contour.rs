//! Moore-neighbour boundary tracing over the binary mask (spec.md §4.1.2).
//!
//! For each unvisited foreground pixel that borders background, walks the
//! 8-connected boundary clockwise until it returns to the start, emitting
//! each closed contour exactly once. Contours shorter than the configured
//! minimum perimeter or area are discarded by the caller.

use crate::types::Contour;
use image::GrayImage;

/// 8-connected clockwise neighbour offsets, starting from "right".
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// A pixel is foreground if its value is above the midpoint; `threshold`
/// already produces a strictly binary image so this is an exact test in
/// practice.
fn is_foreground(mask: &GrayImage, x: i32, y: i32) -> bool {
    if x < 0 || y < 0 || x >= mask.width() as i32 || y >= mask.height() as i32 {
        return false;
    }
    mask.get_pixel(x as u32, y as u32).0[0] > 127
}

/// True if `(x, y)` is foreground and has at least one background
/// 8-neighbour (including the image border, which counts as background).
fn is_boundary_pixel(mask: &GrayImage, x: i32, y: i32) -> bool {
    if !is_foreground(mask, x, y) {
        return false;
    }
    for (dx, dy) in DIRECTIONS {
        if !is_foreground(mask, x + dx, y + dy) {
            return true;
        }
    }
    false
}

/// Traces one closed contour starting at a known boundary pixel, marking
/// every visited pixel in `visited` so the outer scan never restarts from
/// a pixel already claimed by this or an earlier contour.
fn trace_one(mask: &GrayImage, visited: &mut [bool], width: u32, start_x: i32, start_y: i32) -> Vec<(u32, u32)> {
    let mut points = Vec::new();
    let mut x = start_x;
    let mut y = start_y;
    // Search begins looking "backward" from the direction most recently
    // arrived from, which is the standard Moore-tracing convention for
    // keeping the walk clockwise around the boundary.
    let mut prev_dir = 6usize;

    // A generous but finite step bound: a contour cannot legitimately visit
    // more pixels than exist in the image, but pathological masks (single
    // dangling pixels) could otherwise loop forever chasing a direction
    // that never returns to the start.
    let max_steps = (mask.width() as usize).saturating_mul(mask.height() as usize).max(8);

    for _ in 0..max_steps {
        let idx = (y as u32 * width + x as u32) as usize;
        if idx < visited.len() {
            visited[idx] = true;
        }
        points.push((x as u32, y as u32));

        let search_start = (prev_dir + 6) % 8;
        let mut found = false;
        let mut next_x = x;
        let mut next_y = y;
        let mut next_dir = prev_dir;

        for i in 0..8 {
            let dir_idx = (search_start + i) % 8;
            let (dx, dy) = DIRECTIONS[dir_idx];
            let nx = x + dx;
            let ny = y + dy;
            if is_boundary_pixel(mask, nx, ny) {
                next_x = nx;
                next_y = ny;
                next_dir = dir_idx;
                found = true;
                break;
            }
        }

        if !found {
            break;
        }

        if points.len() > 2 && next_x == start_x && next_y == start_y {
            break;
        }

        x = next_x;
        y = next_y;
        prev_dir = next_dir;
    }

    points
}

/// Traces every external contour in the binary mask. Returned contours are
/// in raster-scan order of their starting pixel, which is not the
/// canonical order — callers sort before this list is observed externally
/// (spec.md §4.1.2, §9).
pub fn trace_contours(mask: &GrayImage) -> Vec<Contour> {
    let width = mask.width();
    let height = mask.height();
    let mut visited = vec![false; (width as usize) * (height as usize)];
    let mut contours = Vec::new();

    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let idx = (y as u32 * width + x as u32) as usize;
            if visited[idx] {
                continue;
            }
            if !is_boundary_pixel(mask, x, y) {
                continue;
            }
            let points = trace_one(mask, &mut visited, width, x, y);
            if points.len() >= 3 {
                contours.push(Contour::new(points));
            }
        }
    }

    contours
}

/// Discards contours shorter than the minimum perimeter or smaller than
/// the minimum area (spec.md §4.1.2).
pub fn filter_contours(contours: Vec<Contour>, min_perimeter: f64, min_area: f64) -> Vec<Contour> {
    contours
        .into_iter()
        .filter(|c| c.perimeter() >= min_perimeter && c.area() >= min_area)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn filled_square(size: u32, side: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(size, size, Luma([0]));
        let off = (size - side) / 2;
        for y in off..off + side {
            for x in off..off + side {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        img
    }

    #[test]
    fn traces_single_square_contour() {
        let img = filled_square(40, 20);
        let contours = trace_contours(&img);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].len() >= 4);
    }

    #[test]
    fn blank_image_has_no_contours() {
        let img = GrayImage::from_pixel(40, 40, Luma([0]));
        assert!(trace_contours(&img).is_empty());
    }

    #[test]
    fn filter_drops_tiny_contours() {
        let img = filled_square(40, 4);
        let contours = trace_contours(&img);
        let filtered = filter_contours(contours, 20.0, 100.0);
        assert!(filtered.is_empty());
    }

    #[test]
    fn two_disjoint_squares_give_two_contours() {
        let mut img = GrayImage::from_pixel(60, 60, Luma([0]));
        for y in 5..15 {
            for x in 5..15 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        for y in 40..50 {
            for x in 40..50 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let contours = trace_contours(&img);
        assert_eq!(contours.len(), 2);
    }
}
