//! Pixels -> (symbols, connections). The detector: spec.md §4.1.
//!
//! `Detector::detect` is the single entry point; everything else in this
//! module tree is a stage it calls in order. The image buffer is owned
//! exclusively by this stage for the duration of one call and is released
//! (dropped) before it returns, per spec.md §5's ownership model.

pub mod cache;
pub mod connection;
pub mod contour;
pub mod image_io;
pub mod parallel;
pub mod pattern;
pub mod polygon;
pub mod preprocess;
pub mod symbol;

use crate::config::Config;
use crate::error::{GrimoireError, Location};
use crate::types::{distance, Contour};
use connection::{detect_connections, Connection};
use std::path::Path;
use symbol::{classify_contour, Symbol, SymbolType};

/// Detected output, ready for the parser. Owned by the caller; the
/// detector keeps nothing after this is returned.
pub type DetectorOutput = (Vec<Symbol>, Vec<Connection>);

pub struct Detector {
    config: Config,
    parallel: bool,
}

impl Detector {
    pub fn new(config: Config) -> Self {
        Self { config, parallel: false }
    }

    /// Enables the rayon-backed parallel contour classification variant
    /// (spec.md §4.1.7). Purely a performance knob: output is identical to
    /// the sequential path after the canonical sort.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Runs the full detector pipeline over raw image bytes. `path` is
    /// used only for error locations and the extension/format check; pass
    /// `None` when compiling from an in-memory buffer with no associated
    /// path.
    pub fn detect(&self, bytes: &[u8], path: Option<&Path>) -> Result<DetectorOutput, GrimoireError> {
        let location = || match path {
            Some(p) => Location::path(p),
            None => Location::none(),
        };

        let image = image_io::load_and_validate(path, bytes)?;
        let rgba = image.to_rgba8();
        log::debug!("decoded {}x{} image", rgba.width(), rgba.height());

        let gray = preprocess::to_luminance_grayscale(&rgba);
        let blurred = preprocess::blur(&gray, self.config.blur_sigma);
        let binary = preprocess::adaptive_threshold(
            &blurred,
            self.config.adaptive_block_size,
            self.config.adaptive_constant,
        );
        let binary = preprocess::close_gaps(&binary, self.config.morphology_radius);

        let raw_contours = contour::trace_contours(&binary);
        let contours = contour::filter_contours(
            raw_contours,
            self.config.min_contour_perimeter,
            self.config.min_contour_area,
        );
        log::debug!("traced {} contours after filtering", contours.len());

        if contours.is_empty() {
            return Err(GrimoireError::NoSymbolsDetected { location: location() });
        }

        let image_area = (rgba.width() as f64) * (rgba.height() as f64);
        let (outer_idx, outer_symbol) = self
            .find_outer_circle(&contours, image_area)
            .ok_or_else(|| GrimoireError::NoOuterCircle { location: location() })?;

        let remaining: Vec<&Contour> = contours
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != outer_idx)
            .map(|(_, c)| c)
            .collect();

        let (double_circles, leftover) = self.collapse_double_circles(&remaining);

        let mut symbols = vec![outer_symbol];
        symbols.extend(double_circles);

        let classified = if self.parallel {
            parallel::classify_and_pattern_parallel(&leftover, &binary, &self.config)
        } else {
            leftover
                .iter()
                .filter_map(|c| classify_contour(c, &self.config))
                .map(|mut s| {
                    if matches!(s.symbol_type, SymbolType::Square | SymbolType::Circle) {
                        s.pattern = pattern::detect_internal_pattern(&binary, &s);
                    }
                    s
                })
                .collect()
        };
        symbols.extend(classified);

        // Keep only symbols the outer circle actually encloses (spec.md
        // §4.1.3 rule 3's "must enclose all other detected symbols"); the
        // outer circle itself always passes.
        let outer_center = symbols[0].position;
        let outer_radius = symbols[0].size;
        symbols.retain(|s| {
            s.symbol_type == SymbolType::OuterCircle || distance(s.position, outer_center) <= outer_radius * 1.05
        });

        let symbols = dedup_symbols(symbols, self.config.symbol_dedup_epsilon);
        let symbols = canonical_symbol_order(symbols);

        let non_outer: Vec<Symbol> = symbols.iter().filter(|s| s.symbol_type != SymbolType::OuterCircle).cloned().collect();
        let connections = detect_connections(&non_outer, &binary, &self.config);
        // `detect_connections` indexes into `non_outer`; remap to indices
        // into the full `symbols` list (outer circle occupies index 0).
        let connections: Vec<Connection> = connections
            .into_iter()
            .map(|mut c| {
                c.from += 1;
                c.to += 1;
                c
            })
            .collect();

        log::debug!("{} symbols, {} connections", symbols.len(), connections.len());
        Ok((symbols, connections))
    }

    /// Finds the outer circle: the circular contour whose area is at
    /// least `outer_circle_area_fraction` of the image area, or the
    /// largest circular contour if none clears that bar (spec.md §4.1.3
    /// rule 3).
    fn find_outer_circle(&self, contours: &[Contour], image_area: f64) -> Option<(usize, Symbol)> {
        let circular: Vec<(usize, &Contour)> = contours
            .iter()
            .enumerate()
            .filter(|(_, c)| c.circularity() >= self.config.circularity_threshold)
            .collect();

        if circular.is_empty() {
            return None;
        }

        let threshold_area = self.config.outer_circle_area_fraction * image_area;
        let candidate = circular
            .iter()
            .filter(|(_, c)| c.area() >= threshold_area)
            .max_by(|(_, a), (_, b)| a.area().partial_cmp(&b.area()).unwrap())
            .or_else(|| circular.iter().max_by(|(_, a), (_, b)| a.area().partial_cmp(&b.area()).unwrap()))?;

        let (idx, contour) = *candidate;
        let (min_x, min_y, max_x, max_y) = contour.bounding_box();
        let radius = ((max_x - min_x).max(max_y - min_y) as f64) / 2.0;
        Some((idx, Symbol::new(SymbolType::OuterCircle, contour.centroid(), radius)))
    }

    /// Pairs concentric circular contours into single `DoubleCircle`
    /// symbols at their shared centroid (spec.md §4.1.3 rule 4). Returns
    /// the collapsed symbols plus every contour not consumed by a pair.
    fn collapse_double_circles<'a>(&self, contours: &[&'a Contour]) -> (Vec<Symbol>, Vec<&'a Contour>) {
        let circular: Vec<usize> = (0..contours.len())
            .filter(|&i| contours[i].circularity() >= self.config.circularity_threshold)
            .collect();

        let mut consumed = vec![false; contours.len()];
        let mut doubles = Vec::new();

        for a in 0..circular.len() {
            let ia = circular[a];
            if consumed[ia] {
                continue;
            }
            for b in (a + 1)..circular.len() {
                let ib = circular[b];
                if consumed[ib] {
                    continue;
                }
                let ca = contours[ia];
                let cb = contours[ib];
                let centroid_dist = distance(ca.centroid(), cb.centroid());
                if centroid_dist > self.config.double_circle_centroid_tolerance {
                    continue;
                }
                let ra = self.radius_of(ca);
                let rb = self.radius_of(cb);
                let (big, small) = if ra >= rb { (ra, rb) } else { (rb, ra) };
                if big <= 0.0 {
                    continue;
                }
                let ratio = (big - small) / big;
                if ratio >= self.config.double_circle_radius_ratio.0 && ratio <= self.config.double_circle_radius_ratio.1 {
                    consumed[ia] = true;
                    consumed[ib] = true;
                    let centroid = ca.centroid();
                    doubles.push(Symbol::new(SymbolType::DoubleCircle, centroid, big));
                    break;
                }
            }
        }

        let leftover: Vec<&Contour> = contours
            .iter()
            .enumerate()
            .filter(|(i, _)| !consumed[*i])
            .map(|(_, c)| *c)
            .collect();

        (doubles, leftover)
    }

    fn radius_of(&self, contour: &Contour) -> f64 {
        let (min_x, min_y, max_x, max_y) = contour.bounding_box();
        ((max_x - min_x).max(max_y - min_y) as f64) / 2.0
    }
}

/// Drops symbols whose centroids lie within `epsilon` pixels of an
/// earlier symbol in the list (spec.md §3.2 invariant).
fn dedup_symbols(symbols: Vec<Symbol>, epsilon: f64) -> Vec<Symbol> {
    let mut kept: Vec<Symbol> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        if kept.iter().any(|k| distance(k.position, symbol.position) < epsilon) {
            continue;
        }
        kept.push(symbol);
    }
    kept
}

/// Canonical order: sorted by `(y, x)` (spec.md's Glossary definition of
/// "canonical order"), with the outer circle kept first regardless since
/// downstream code and the parser assume index 0 is the outer circle.
fn canonical_symbol_order(mut symbols: Vec<Symbol>) -> Vec<Symbol> {
    let outer = symbols
        .iter()
        .position(|s| s.symbol_type == SymbolType::OuterCircle);
    if let Some(idx) = outer {
        let outer_symbol = symbols.remove(idx);
        symbols.sort_by(|a, b| {
            (a.position.y, a.position.x)
                .partial_cmp(&(b.position.y, b.position.x))
                .unwrap()
        });
        symbols.insert(0, outer_symbol);
    } else {
        symbols.sort_by(|a, b| {
            (a.position.y, a.position.x)
                .partial_cmp(&(b.position.y, b.position.x))
                .unwrap()
        });
    }
    symbols
}
