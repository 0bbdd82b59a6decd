//! Optional parallel contour-classification variant (spec.md §4.1.7, §5).
//!
//! Partitions contour classification and internal-pattern probing across a
//! `rayon` thread pool bounded by available hardware parallelism. Workers
//! are stateless and each handles a disjoint slice of contours; the
//! results are always re-sorted into the canonical order before being
//! returned, so no ordering dependency on thread scheduling is observable
//! at the stage boundary.

use crate::config::Config;
use crate::detector::pattern::detect_internal_pattern;
use crate::detector::symbol::{classify_contour, Symbol, SymbolType};
use crate::types::Contour;
use image::GrayImage;
use rayon::prelude::*;

/// Classifies every contour and probes its internal pattern, using a
/// thread pool sized to `std::thread::available_parallelism()`. Equivalent
/// in result (after the caller's canonical sort) to classifying each
/// contour sequentially.
pub fn classify_and_pattern_parallel(contours: &[Contour], mask: &GrayImage, cfg: &Config) -> Vec<Symbol> {
    contours
        .par_iter()
        .filter_map(|contour| {
            let mut symbol = classify_contour(contour, cfg)?;
            if matches!(symbol.symbol_type, SymbolType::Square | SymbolType::Circle) {
                symbol.pattern = detect_internal_pattern(mask, &symbol);
            }
            Some(symbol)
        })
        .collect()
}

/// Thread count the parallel variant will request from rayon's global
/// pool. Exposed for diagnostics/logging; rayon clamps internally if the
/// platform reports zero or an error.
pub fn worker_count() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::symbol::classify_contour;

    #[test]
    fn parallel_classification_matches_sequential() {
        let cfg = Config::default();
        let contours = vec![
            Contour::new(vec![(0, 0), (40, 0), (40, 40), (0, 40)]),
            Contour::new(vec![(0, 40), (20, 0), (40, 40)]),
        ];
        let mask = GrayImage::new(50, 50);

        let sequential: Vec<_> = contours.iter().filter_map(|c| classify_contour(c, &cfg)).collect();
        let mut parallel = classify_and_pattern_parallel(&contours, &mask, &cfg);
        parallel.sort_by(|a, b| a.position.x.partial_cmp(&b.position.x).unwrap());

        assert_eq!(sequential.len(), parallel.len());
        for (s, p) in sequential.iter().zip(parallel.iter()) {
            assert_eq!(s.symbol_type, p.symbol_type);
        }
    }

    #[test]
    fn worker_count_is_at_least_one() {
        assert!(worker_count() >= 1);
    }
}
