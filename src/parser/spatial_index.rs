//! Uniform grid spatial index over non-outer symbols (spec.md §4.2.1).
//! Cell size is `2 * median(symbol size)`, giving O(1)-expected neighbour
//! queries without the overhead of a tree structure for the symbol counts
//! this pipeline deals with.

use crate::detector::symbol::Symbol;
use std::collections::HashMap;

pub struct SpatialIndex {
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

impl SpatialIndex {
    /// Builds the index over `symbols`, indexed by their position in that
    /// same slice, with a cell size derived from the symbols' own scale
    /// (`2 * median size`) — the right default for "what's near this
    /// symbol" queries like a Pentagon's nearest-Square search.
    pub fn build(symbols: &[Symbol]) -> Self {
        let median_size = median(symbols.iter().map(|s| s.size).collect());
        Self::build_with_cell_size(symbols, (2.0 * median_size).max(1.0))
    }

    /// Builds the index with an explicit cell size. Used when the caller
    /// needs every pair within a known radius `r` to turn up in the 3x3
    /// neighbourhood query — the standard uniform-grid guarantee holds
    /// when `cell_size >= r`, since two points closer than `cell_size` in
    /// both axes can never land more than one cell apart.
    pub fn build_with_cell_size(symbols: &[Symbol], cell_size: f64) -> Self {
        let cell_size = cell_size.max(1e-6);
        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, s) in symbols.iter().enumerate() {
            let key = cell_key(s.position.x, s.position.y, cell_size);
            cells.entry(key).or_default().push(i);
        }

        Self { cell_size, cells }
    }

    /// Returns symbol indices in the 3x3 block of cells centred on
    /// `(x, y)` — an expected-O(1) neighbourhood query.
    pub fn neighbors(&self, x: f64, y: f64) -> Vec<usize> {
        let (cx, cy) = cell_key(x, y, self.cell_size);
        let mut out = Vec::new();
        for dy in -1..=1 {
            for dx in -1..=1 {
                if let Some(indices) = self.cells.get(&(cx + dx, cy + dy)) {
                    out.extend(indices.iter().copied());
                }
            }
        }
        out
    }
}

fn cell_key(x: f64, y: f64, cell_size: f64) -> (i64, i64) {
    ((x / cell_size).floor() as i64, (y / cell_size).floor() as i64)
}
