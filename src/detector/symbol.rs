//! Symbol type (spec.md §3.2) and the shape-classification rules of
//! spec.md §4.1.3.

use crate::config::Config;
use crate::detector::polygon::{count_radial_spokes, douglas_peucker, is_square, is_star_shape};
use crate::types::{Contour, Point};
use std::collections::BTreeMap;

/// The closed set of symbol types spec.md §3.2 enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SymbolType {
    OuterCircle,
    DoubleCircle,
    Circle,
    Square,
    Triangle,
    Pentagon,
    Hexagon,
    Star,
    SixPointedStar,
    EightPointedStar,
    Convergence,
    Divergence,
    Amplification,
    Distribution,
    Transfer,
    Seal,
    Cycle,
    Unknown,
}

/// Internal ink pattern used for type/literal inference (spec.md §3.2,
/// §4.1.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    None,
    SingleDot,
    DoubleDot,
    TripleDot,
    QuadDot,
    FivePoints,
    DoubleLine,
    TripleLine,
    Cross,
    Star,
}

/// Attribute bag attached to a symbol, e.g. `"is_double_circle" -> "true"`.
pub type Properties = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub symbol_type: SymbolType,
    pub position: Point,
    pub size: f64,
    pub pattern: Pattern,
    pub properties: Properties,
}

impl Symbol {
    pub fn new(symbol_type: SymbolType, position: Point, size: f64) -> Self {
        Self {
            symbol_type,
            position,
            size: size.max(f64::MIN_POSITIVE),
            pattern: Pattern::None,
            properties: Properties::new(),
        }
    }
}

/// Characteristic radius: half the longer bounding-box dimension (spec.md
/// §3.2).
fn characteristic_radius(contour: &Contour) -> f64 {
    let (min_x, min_y, max_x, max_y) = contour.bounding_box();
    let w = (max_x - min_x) as f64;
    let h = (max_y - min_y) as f64;
    w.max(h) / 2.0
}

/// Scores how well a contour's radial-spoke profile matches one of the
/// operator templates (spec.md §4.1.3 rule 6). Every template is matched
/// by spoke count and a loose symmetry check; ties break toward the type
/// declared earlier in `SymbolType`'s enumeration, which callers achieve
/// simply by trying candidates in declaration order and keeping the first
/// maximal score.
fn operator_template_scores(spokes: usize, circularity: f64) -> Vec<(SymbolType, f64)> {
    // These are deliberately simple heuristics, consistent with spec.md §9's
    // instruction not to "fix" the original's imprecise operator templates
    // by inventing a better classifier.
    vec![
        (SymbolType::Convergence, template_score(spokes, 3, circularity)),
        (SymbolType::Divergence, template_score(spokes, 2, circularity)),
        (SymbolType::Amplification, template_score(spokes, 4, circularity)),
        (SymbolType::Distribution, template_score(spokes, 5, circularity)),
        (SymbolType::Transfer, template_score(spokes, 2, 1.0 - circularity)),
        (SymbolType::Seal, template_score(spokes, 1, circularity)),
        (SymbolType::Cycle, template_score(spokes, 0, circularity)),
    ]
}

fn template_score(spokes: usize, target: usize, circularity: f64) -> f64 {
    let spoke_term = 1.0 - ((spokes as i64 - target as i64).abs() as f64 / 6.0).min(1.0);
    (spoke_term * 0.7 + circularity.clamp(0.0, 1.0) * 0.3).max(0.0)
}

/// Picks the best-scoring operator type, preferring the earliest-declared
/// type on ties (spec.md §4.1.3 rule 6).
fn best_operator(spokes: usize, circularity: f64, floor: f64) -> Option<SymbolType> {
    let scores = operator_template_scores(spokes, circularity);
    let mut best: Option<(SymbolType, f64)> = None;
    for (ty, score) in scores {
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((ty, score)),
        }
    }
    best.filter(|(_, score)| *score >= floor).map(|(ty, _)| ty)
}

/// Classifies a non-outer contour into a `Symbol`, or `None` if it fails a
/// hard gate (too small, degenerate). Contours that clear the gates but
/// match no specific rule become `SymbolType::Unknown` rather than being
/// dropped (spec.md §4.1.6: "the detector never guesses").
pub fn classify_contour(contour: &Contour, cfg: &Config) -> Option<Symbol> {
    if contour.len() < 3 {
        return None;
    }
    let area = contour.area();
    if area < cfg.min_contour_area {
        return None;
    }

    let centroid = contour.centroid();
    let circularity = contour.circularity();
    let radius = characteristic_radius(contour);
    let simplified = douglas_peucker(&contour.points, cfg.dp_epsilon_ratio);
    let vertices = simplified.len();

    if circularity >= cfg.circularity_threshold {
        return Some(Symbol::new(SymbolType::Circle, centroid, radius));
    }

    let symbol_type = match vertices {
        3 => SymbolType::Triangle,
        4 => {
            if is_square(&simplified, cfg.square_aspect_ratio, cfg.square_angle_tolerance_deg) {
                SymbolType::Square
            } else {
                SymbolType::Unknown
            }
        }
        5 => SymbolType::Pentagon,
        6 => SymbolType::Hexagon,
        n if n >= 8 => {
            if is_star_shape(&simplified) {
                let spokes = count_radial_spokes(&simplified);
                if spokes >= 8 {
                    SymbolType::EightPointedStar
                } else if spokes >= 6 {
                    SymbolType::SixPointedStar
                } else {
                    SymbolType::Star
                }
            } else {
                best_operator(count_radial_spokes(&simplified), circularity, cfg.operator_match_floor)
                    .unwrap_or(SymbolType::Unknown)
            }
        }
        _ => best_operator(count_radial_spokes(&simplified), circularity, cfg.operator_match_floor)
            .unwrap_or(SymbolType::Unknown),
    };

    Some(Symbol::new(symbol_type, centroid, radius))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_contour() -> Contour {
        Contour::new(vec![(0, 0), (40, 0), (40, 40), (0, 40)])
    }

    fn triangle_contour() -> Contour {
        Contour::new(vec![(0, 40), (20, 0), (40, 40)])
    }

    #[test]
    fn classifies_square() {
        let cfg = Config::default();
        let symbol = classify_contour(&square_contour(), &cfg).unwrap();
        assert_eq!(symbol.symbol_type, SymbolType::Square);
    }

    #[test]
    fn classifies_triangle() {
        let cfg = Config::default();
        let symbol = classify_contour(&triangle_contour(), &cfg).unwrap();
        assert_eq!(symbol.symbol_type, SymbolType::Triangle);
    }

    #[test]
    fn tiny_contour_is_rejected() {
        let cfg = Config::default();
        let tiny = Contour::new(vec![(0, 0), (2, 0), (2, 2), (0, 2)]);
        assert!(classify_contour(&tiny, &cfg).is_none());
    }

    #[test]
    fn characteristic_radius_is_half_longest_side() {
        let c = square_contour();
        assert_eq!(characteristic_radius(&c), 20.0);
    }
}
