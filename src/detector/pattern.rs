//! Internal ink-pattern detection (spec.md §4.1.4): counts connected ink
//! blobs inside a symbol's bounding-box interior and classifies the result.

use crate::detector::symbol::{Pattern, Symbol};
use image::GrayImage;

fn is_ink(mask: &GrayImage, x: i32, y: i32) -> bool {
    if x < 0 || y < 0 || x >= mask.width() as i32 || y >= mask.height() as i32 {
        return false;
    }
    mask.get_pixel(x as u32, y as u32).0[0] > 127
}

/// One maximal 8-connected foreground region, with its bounding box used
/// downstream to tell a dot from a line.
struct Blob {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
    count: usize,
}

impl Blob {
    fn width(&self) -> i32 {
        self.max_x - self.min_x + 1
    }
    fn height(&self) -> i32 {
        self.max_y - self.min_y + 1
    }
    fn is_long_thin(&self) -> bool {
        let (w, h) = (self.width(), self.height());
        let long = w.max(h) as f64;
        let short = w.min(h) as f64;
        short > 0.0 && long / short >= 3.0
    }
}

/// Finds every connected ink blob fully contained in
/// `[x0, x1) x [y0, y1)`, flood-filling on the full mask but only ever
/// starting from, and only ever recording, pixels inside the interior
/// window.
fn find_blobs(mask: &GrayImage, x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Blob> {
    let mut visited = vec![false; ((x1 - x0).max(0) as usize) * ((y1 - y0).max(0) as usize)];
    let w = (x1 - x0).max(0) as usize;
    let idx = |x: i32, y: i32| -> usize { ((y - y0) as usize) * w + (x - x0) as usize };

    let mut blobs = Vec::new();
    for y in y0..y1 {
        for x in x0..x1 {
            if !is_ink(mask, x, y) || visited[idx(x, y)] {
                continue;
            }
            let mut stack = vec![(x, y)];
            let mut blob = Blob { min_x: x, min_y: y, max_x: x, max_y: y, count: 0 };
            visited[idx(x, y)] = true;
            while let Some((cx, cy)) = stack.pop() {
                blob.count += 1;
                blob.min_x = blob.min_x.min(cx);
                blob.min_y = blob.min_y.min(cy);
                blob.max_x = blob.max_x.max(cx);
                blob.max_y = blob.max_y.max(cy);
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = cx + dx;
                        let ny = cy + dy;
                        if nx >= x0 && nx < x1 && ny >= y0 && ny < y1 && is_ink(mask, nx, ny) && !visited[idx(nx, ny)]
                        {
                            visited[idx(nx, ny)] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }
            blobs.push(blob);
        }
    }
    blobs
}

/// Classifies the interior ink pattern of a symbol's bounding box (spec.md
/// §4.1.4). Returns `Pattern::None` when the interior can't be read (out
/// of bounds) or matches no rule.
pub fn detect_internal_pattern(mask: &GrayImage, symbol: &Symbol) -> Pattern {
    let half = symbol.size * 0.8;
    let x0 = (symbol.position.x - half).round() as i32;
    let y0 = (symbol.position.y - half).round() as i32;
    let x1 = (symbol.position.x + half).round() as i32;
    let y1 = (symbol.position.y + half).round() as i32;

    if x0 < 0 || y0 < 0 || x1 > mask.width() as i32 || y1 > mask.height() as i32 || x1 <= x0 || y1 <= y0 {
        return Pattern::None;
    }

    let blobs = find_blobs(mask, x0, y0, x1, y1);

    let long_thin: Vec<&Blob> = blobs.iter().filter(|b| b.is_long_thin()).collect();
    if is_cross(&long_thin) {
        return Pattern::Cross;
    }
    if long_thin.len() == 2 {
        return Pattern::DoubleLine;
    }
    if long_thin.len() == 3 {
        return Pattern::TripleLine;
    }

    let spoke_count = count_spokes_from_centroid(&blobs, (x0 + x1) / 2, (y0 + y1) / 2);
    if spoke_count >= 5 && long_thin.len() >= 5 {
        return Pattern::Star;
    }

    match blobs.len() {
        0 => Pattern::None,
        1 => Pattern::SingleDot,
        2 => Pattern::DoubleDot,
        3 => Pattern::TripleDot,
        4 => Pattern::QuadDot,
        5 => Pattern::FivePoints,
        _ => Pattern::None,
    }
}

/// A "+" pattern: exactly two long-thin blobs whose major axes are
/// roughly perpendicular.
fn is_cross(long_thin: &[&Blob]) -> bool {
    if long_thin.len() != 2 {
        return false;
    }
    let a_vertical = long_thin[0].height() > long_thin[0].width();
    let b_vertical = long_thin[1].height() > long_thin[1].width();
    a_vertical != b_vertical
}

fn count_spokes_from_centroid(blobs: &[Blob], cx: i32, cy: i32) -> usize {
    blobs
        .iter()
        .filter(|b| {
            let bx = (b.min_x + b.max_x) / 2;
            let by = (b.min_y + b.max_y) / 2;
            let dx = (bx - cx).abs();
            let dy = (by - cy).abs();
            b.is_long_thin() && (dx > 0 || dy > 0)
        })
        .count()
}

/// Maps an internal pattern to the integer literal it stands for (spec.md
/// §4.2.4): `SingleDot -> 1 .. QuadDot -> 4`, with `Cross` as a special
/// non-numeric token handled separately by the caller.
pub fn pattern_to_literal(pattern: Pattern) -> Option<i64> {
    match pattern {
        Pattern::SingleDot => Some(1),
        Pattern::DoubleDot => Some(2),
        Pattern::TripleDot => Some(3),
        Pattern::QuadDot => Some(4),
        Pattern::FivePoints => Some(5),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::symbol::SymbolType;
    use image::Luma;
    use nalgebra::Point2;

    fn blank_mask(size: u32) -> GrayImage {
        GrayImage::from_pixel(size, size, Luma([0]))
    }

    #[test]
    fn single_dot_detected() {
        let mut mask = blank_mask(60);
        for y in 28..32 {
            for x in 28..32 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let symbol = Symbol::new(SymbolType::Square, Point2::new(30.0, 30.0), 25.0);
        assert_eq!(detect_internal_pattern(&mask, &symbol), Pattern::SingleDot);
    }

    #[test]
    fn double_dot_detected() {
        let mut mask = blank_mask(60);
        for y in 25..30 {
            for x in 15..20 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        for y in 25..30 {
            for x in 40..45 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let symbol = Symbol::new(SymbolType::Square, Point2::new(30.0, 30.0), 25.0);
        assert_eq!(detect_internal_pattern(&mask, &symbol), Pattern::DoubleDot);
    }

    #[test]
    fn empty_interior_is_none() {
        let mask = blank_mask(60);
        let symbol = Symbol::new(SymbolType::Square, Point2::new(30.0, 30.0), 25.0);
        assert_eq!(detect_internal_pattern(&mask, &symbol), Pattern::None);
    }

    #[test]
    fn pattern_to_literal_mapping() {
        assert_eq!(pattern_to_literal(Pattern::SingleDot), Some(1));
        assert_eq!(pattern_to_literal(Pattern::QuadDot), Some(4));
        assert_eq!(pattern_to_literal(Pattern::Cross), None);
    }
}
