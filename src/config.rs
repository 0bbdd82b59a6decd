//! Process-wide, read-once configuration: detector/parser tunables plus the
//! debug-mode flag and diagnostic locale from spec.md §9 ("global"
//! mutability is limited to these two, read at invocation start, never
//! mutated by the pipeline itself).

use std::str::FromStr;

/// Diagnostic message locale. Only `En` carries a real catalogue (spec.md's
/// "internationalised message catalogue" is an out-of-scope collaborator);
/// `Ja` is accepted but falls back to `En` with a logged notice, so the CLI
/// contract (`--lang`/`GRIMOIRE_LANG`) is honoured without inventing
/// translated strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Locale::En),
            "ja" => Ok(Locale::Ja),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

impl Locale {
    /// Resolves to the locale whose catalogue actually exists, logging a
    /// fallback notice when it doesn't.
    pub fn resolved(self) -> Locale {
        match self {
            Locale::En => Locale::En,
            Locale::Ja => {
                log::warn!("locale 'ja' has no message catalogue yet; falling back to 'en'");
                Locale::En
            }
        }
    }
}

/// Every tunable constant spec.md names, collected so the detector/parser
/// never hard-code a magic number inline. `Config::default()` reproduces
/// the numbers spec.md gives and is what every CLI subcommand uses; nothing
/// in this crate currently exposes these as CLI flags (out of scope per
/// spec.md §1's CLI boundary), but centralising them here keeps the core
/// pipeline's functions parameterised rather than littered with literals.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Gaussian blur sigma (spec.md §4.1.1).
    pub blur_sigma: f32,
    /// Adaptive threshold neighbourhood size N (spec.md §4.1.1).
    pub adaptive_block_size: u32,
    /// Adaptive threshold constant C subtracted from the local mean.
    pub adaptive_constant: f64,
    /// Morphological closing structuring element radius.
    pub morphology_radius: u32,
    /// Minimum contour perimeter in pixels to keep (spec.md §4.1.2).
    pub min_contour_perimeter: f64,
    /// Minimum contour area in pixels² to keep (spec.md §4.1.2).
    pub min_contour_area: f64,
    /// Douglas-Peucker epsilon as a fraction of perimeter (spec.md §4.1.3).
    pub dp_epsilon_ratio: f64,
    /// Circularity threshold above which a contour is circular.
    pub circularity_threshold: f64,
    /// Fraction of image area an outer-circle candidate must meet.
    pub outer_circle_area_fraction: f64,
    /// Max centroid distance, in pixels, for double-circle collapsing.
    pub double_circle_centroid_tolerance: f64,
    /// Radius-ratio range `(min, max)` for double-circle collapsing.
    pub double_circle_radius_ratio: (f64, f64),
    /// Square aspect-ratio acceptance range.
    pub square_aspect_ratio: (f64, f64),
    /// Square corner-angle deviation tolerance, in degrees, from 90°.
    pub square_angle_tolerance_deg: f64,
    /// Minimum pattern-match score for operator-symbol classification.
    pub operator_match_floor: f64,
    /// Minimum ink-sample density to accept a connection (spec.md §4.1.5).
    pub connection_density_threshold: f64,
    /// Percentile cutoff for candidate connection pairs (spec.md §4.1.5).
    pub connection_proximity_percentile: f64,
    /// Percentile cutoff for inferring missing connections (spec.md §4.2.3).
    pub missing_edge_percentile: f64,
    /// Graph-distance threshold above which a missing edge is inferred.
    pub missing_edge_graph_distance: usize,
    /// De-duplication epsilon for near-coincident symbol centroids.
    pub symbol_dedup_epsilon: f64,
    /// Runs contour classification across a `rayon` thread pool instead of
    /// sequentially (spec.md §5's optional parallel variant). Off by
    /// default; the CLI's `--parallel` flag is the only thing that sets it.
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            adaptive_block_size: 11,
            adaptive_constant: 2.0,
            morphology_radius: 1,
            min_contour_perimeter: 20.0,
            min_contour_area: 100.0,
            dp_epsilon_ratio: 0.02,
            circularity_threshold: 0.80,
            outer_circle_area_fraction: 0.40,
            double_circle_centroid_tolerance: 5.0,
            double_circle_radius_ratio: (0.10, 0.40),
            square_aspect_ratio: (0.7, 1.3),
            square_angle_tolerance_deg: 15.0,
            operator_match_floor: 0.35,
            connection_density_threshold: 0.7,
            connection_proximity_percentile: 80.0,
            missing_edge_percentile: 20.0,
            missing_edge_graph_distance: 3,
            symbol_dedup_epsilon: 3.0,
            parallel: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_parses_known_values() {
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::En);
        assert_eq!("ja".parse::<Locale>().unwrap(), Locale::Ja);
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn ja_resolves_to_en() {
        assert_eq!(Locale::Ja.resolved(), Locale::En);
        assert_eq!(Locale::En.resolved(), Locale::En);
    }

    #[test]
    fn default_config_matches_spec_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.min_contour_perimeter, 20.0);
        assert_eq!(cfg.min_contour_area, 100.0);
        assert_eq!(cfg.circularity_threshold, 0.80);
    }
}
