//! Builds a typed `Program` from the detector's symbols and connections
//! (spec.md §4.2).

pub mod ast;
pub mod expression;
pub mod flow_graph;
pub mod spatial_index;
pub mod statement;
pub mod type_infer;

use crate::detector::connection::Connection;
use crate::detector::symbol::{Symbol, SymbolType};
use crate::error::{GrimoireError, Location};
use crate::types::distance;
use ast::{Function, Program};
use flow_graph::FlowGraph;
use statement::NameGen;
use std::collections::HashSet;

/// Picks `main_entry`: the unique `DoubleCircle`, or the one closest to
/// `outer_centroid` when several exist (spec.md §4.2.2).
fn find_main_entry(symbols: &[Symbol], outer_centroid: crate::types::Point) -> Option<usize> {
    let candidates: Vec<usize> =
        symbols.iter().enumerate().filter(|(_, s)| s.symbol_type == SymbolType::DoubleCircle).map(|(i, _)| i).collect();

    match candidates.len() {
        0 => None,
        1 => Some(candidates[0]),
        _ => candidates
            .into_iter()
            .min_by(|&a, &b| {
                distance(symbols[a].position, outer_centroid)
                    .partial_cmp(&distance(symbols[b].position, outer_centroid))
                    .unwrap()
            }),
    }
}

/// Parses `symbols` (outer circle already excluded) and `connections` into
/// a typed program, rooted at the detected `main_entry`.
pub fn parse(
    symbols: &[Symbol],
    connections: &[Connection],
    outer_centroid: crate::types::Point,
    loc: &Location,
) -> crate::error::Result<Program> {
    let main_entry_idx = find_main_entry(symbols, outer_centroid)
        .ok_or_else(|| GrimoireError::MissingMainEntry { location: loc.clone() })?;

    let graph = FlowGraph::build(symbols, connections);
    let mut visited = HashSet::new();
    let mut gen = NameGen::new();
    // Shared across every function body in this program, so an operand
    // claimed by an operator in `main` can't be re-claimed by an operator
    // in a function discovered later (spec.md §4.2.5's tie-break is between
    // competing operators, not just within one body).
    let mut claimed = HashSet::new();

    let main_body =
        statement::build_body(main_entry_idx, false, symbols, &graph, &mut visited, &mut gen, loc, &mut claimed)?;
    let main_entry = Function { name: "main".to_string(), params: Vec::new(), body: main_body };

    let mut functions = Vec::new();
    let mut queue = std::mem::take(&mut gen.pending_functions);
    while let Some((name, root)) = queue.pop() {
        if visited.contains(&root) {
            // Already folded into an earlier function or branch body;
            // still declare it as a no-op so the call site resolves.
            functions.push(Function { name, params: Vec::new(), body: Vec::new() });
            continue;
        }
        let body = statement::build_body(root, false, symbols, &graph, &mut visited, &mut gen, loc, &mut claimed)?;
        functions.push(Function { name, params: Vec::new(), body });
        queue.extend(std::mem::take(&mut gen.pending_functions));
    }

    let mut program = Program { has_outer_circle: true, main_entry, functions, globals: Vec::new() };
    type_infer::infer_program(&mut program);
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::connection::ConnectionType;
    use crate::detector::symbol::Symbol;
    use nalgebra::Point2;

    fn symbol_at(ty: SymbolType, x: f64, y: f64) -> Symbol {
        Symbol::new(ty, Point2::new(x, y), 5.0)
    }

    #[test]
    fn missing_double_circle_is_missing_main_entry() {
        let symbols = vec![symbol_at(SymbolType::Star, 0.0, 0.0)];
        let result = parse(&symbols, &[], Point2::new(0.0, 0.0), &Location::none());
        assert!(matches!(result, Err(GrimoireError::MissingMainEntry { .. })));
    }

    #[test]
    fn ambiguous_main_entry_picks_nearest_to_outer_centroid() {
        let symbols =
            vec![symbol_at(SymbolType::DoubleCircle, 0.0, 0.0), symbol_at(SymbolType::DoubleCircle, 100.0, 100.0)];
        let outer_centroid = Point2::new(1.0, 1.0);
        let idx = find_main_entry(&symbols, outer_centroid).unwrap();
        assert_eq!(idx, 0);
    }

    #[test]
    fn hello_world_style_program_parses() {
        let symbols = vec![symbol_at(SymbolType::DoubleCircle, 0.0, 0.0), symbol_at(SymbolType::Star, 20.0, 0.0)];
        let connections = vec![Connection {
            from: 0,
            to: 1,
            connection_type: ConnectionType::Solid,
            directed: false,
            weight: 1.0,
        }];
        let program = parse(&symbols, &connections, Point2::new(0.0, 0.0), &Location::none()).unwrap();
        assert_eq!(program.main_entry.body.len(), 1);
        assert!(matches!(program.main_entry.body[0], ast::Statement::OutputStatement { .. }));
    }

    #[test]
    fn empty_main_body_is_legal() {
        let symbols = vec![symbol_at(SymbolType::DoubleCircle, 0.0, 0.0)];
        let program = parse(&symbols, &[], Point2::new(0.0, 0.0), &Location::none()).unwrap();
        assert!(program.main_entry.body.is_empty());
    }
}
