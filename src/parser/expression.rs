//! Expression construction from operator symbols and their operand
//! neighbours (spec.md §4.2.5).

use crate::detector::symbol::{Pattern, Symbol, SymbolType};
use crate::parser::ast::{BinaryOperator, DataType, Expression, Literal, UnaryOperator};
use crate::parser::flow_graph::FlowGraph;
use crate::types::distance;
use std::collections::HashSet;

/// Maps an operator symbol's type to the binary operator it denotes
/// (spec.md §4.2.5). Non-operator types return `None`.
fn binary_operator_for(symbol_type: SymbolType) -> Option<BinaryOperator> {
    match symbol_type {
        SymbolType::Convergence => Some(BinaryOperator::Add),
        SymbolType::Divergence => Some(BinaryOperator::Subtract),
        SymbolType::Amplification => Some(BinaryOperator::Multiply),
        SymbolType::Distribution => Some(BinaryOperator::Divide),
        _ => None,
    }
}

fn is_operator(symbol_type: SymbolType) -> bool {
    binary_operator_for(symbol_type).is_some()
}

/// An operand symbol's connection to the operator, carried alongside its
/// index so tie-breaks can compare connection length and angle.
struct Candidate {
    index: usize,
    length: f64,
    angle: f64,
}

fn candidates_for(op_index: usize, symbols: &[Symbol], graph: &FlowGraph, exclude: &[usize]) -> Vec<Candidate> {
    let origin = symbols[op_index].position;
    graph.adjacency[op_index]
        .iter()
        .map(|e| e.to)
        .filter(|idx| !is_operator(symbols[*idx].symbol_type) && !exclude.contains(idx))
        .map(|idx| {
            let target = symbols[idx].position;
            let length = distance(origin, target);
            let delta = target - origin;
            let angle = delta.y.atan2(delta.x);
            Candidate { index: idx, length, angle }
        })
        .collect()
}

/// Resolves parsing ambiguity when two operators compete for the same
/// operand: shortest connection length wins; ties broken by
/// counter-clockwise angle from the operator's centroid (spec.md §4.2.5).
fn pick_operands(mut candidates: Vec<Candidate>, count: usize) -> Vec<usize> {
    candidates.sort_by(|a, b| {
        a.length
            .partial_cmp(&b.length)
            .unwrap()
            .then_with(|| a.angle.partial_cmp(&b.angle).unwrap())
    });
    candidates.into_iter().take(count).map(|c| c.index).collect()
}

/// Builds the literal or identifier expression denoted by a leaf operand
/// symbol (a Square carrying a dot-pattern literal, or any other symbol
/// read by its position as an identifier).
pub fn operand_expression(symbol: &Symbol, name_of: impl Fn(usize) -> String, index: usize) -> Expression {
    if symbol.symbol_type == SymbolType::Square {
        if let Some(n) = crate::detector::pattern::pattern_to_literal(symbol.pattern) {
            return Expression::Literal { value: Literal::Int(n), ty: DataType::Integer };
        }
        if symbol.pattern == Pattern::Cross {
            return Expression::Literal { value: Literal::Str("#".to_string()), ty: DataType::String };
        }
    }
    Expression::Identifier { name: name_of(index), ty: DataType::Any }
}

/// Builds the expression rooted at an operator symbol: a `BinaryOp` when
/// two operand neighbours are found, a `UnaryOp` when exactly one is, or
/// the lone operand's own expression (no-op pass-through) when the
/// operator has no usable neighbours (spec.md §4.2.5).
///
/// `claimed` tracks operand symbols already bound to an earlier operator
/// in this parse — spec.md §4.2.5's tie-break ("shortest connection,
/// ties by CCW angle") is stated for the case of two operators competing
/// for the same operand; excluding already-claimed candidates before
/// picking, then claiming what this call picks, is what makes that
/// arbitration actually hold across independent `build_operator_expression`
/// calls instead of only within one operator's own candidate list.
pub fn build_operator_expression(
    op_index: usize,
    symbols: &[Symbol],
    graph: &FlowGraph,
    name_of: impl Fn(usize) -> String,
    claimed: &mut HashSet<usize>,
) -> Expression {
    let op = binary_operator_for(symbols[op_index].symbol_type);
    let candidates: Vec<Candidate> =
        candidates_for(op_index, symbols, graph, &[]).into_iter().filter(|c| !claimed.contains(&c.index)).collect();

    match op {
        Some(operator) if candidates.len() >= 2 => {
            let picked = pick_operands(candidates, 2);
            claimed.extend(picked.iter().copied());
            let left = operand_expression(&symbols[picked[0]], &name_of, picked[0]);
            let right = operand_expression(&symbols[picked[1]], &name_of, picked[1]);
            Expression::BinaryOp {
                op: operator,
                left: Box::new(left),
                right: Box::new(right),
                ty: DataType::Any,
            }
        }
        Some(_) if candidates.len() == 1 => {
            let picked = pick_operands(candidates, 1);
            claimed.extend(picked.iter().copied());
            let operand = operand_expression(&symbols[picked[0]], &name_of, picked[0]);
            Expression::UnaryOp { op: UnaryOperator::Negate, operand: Box::new(operand), ty: DataType::Any }
        }
        _ => Expression::Literal { value: Literal::Int(0), ty: DataType::Integer },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::connection::{Connection, ConnectionType};
    use nalgebra::Point2;

    fn symbol_at(ty: SymbolType, x: f64, y: f64) -> Symbol {
        Symbol::new(ty, Point2::new(x, y), 5.0)
    }

    #[test]
    fn convergence_with_two_operands_builds_add() {
        let symbols = vec![
            symbol_at(SymbolType::Convergence, 10.0, 0.0),
            symbol_at(SymbolType::Square, 0.0, 0.0),
            symbol_at(SymbolType::Square, 20.0, 0.0),
        ];
        let connections = vec![
            Connection { from: 0, to: 1, connection_type: ConnectionType::Solid, directed: false, weight: 1.0 },
            Connection { from: 0, to: 2, connection_type: ConnectionType::Solid, directed: false, weight: 1.0 },
        ];
        let graph = FlowGraph::build(&symbols, &connections);
        let mut claimed = HashSet::new();
        let expr = build_operator_expression(0, &symbols, &graph, |i| format!("v{i}"), &mut claimed);
        match expr {
            Expression::BinaryOp { op, .. } => assert_eq!(op, BinaryOperator::Add),
            other => panic!("expected BinaryOp, got {other:?}"),
        }
        assert_eq!(claimed, HashSet::from([1, 2]));
    }

    #[test]
    fn tie_break_prefers_shorter_connection() {
        let symbols = vec![
            symbol_at(SymbolType::Convergence, 0.0, 0.0),
            symbol_at(SymbolType::Square, 5.0, 0.0),
            symbol_at(SymbolType::Square, 50.0, 0.0),
            symbol_at(SymbolType::Square, -5.0, 0.0),
        ];
        let connections = vec![
            Connection { from: 0, to: 1, connection_type: ConnectionType::Solid, directed: false, weight: 1.0 },
            Connection { from: 0, to: 2, connection_type: ConnectionType::Solid, directed: false, weight: 1.0 },
            Connection { from: 0, to: 3, connection_type: ConnectionType::Solid, directed: false, weight: 1.0 },
        ];
        let graph = FlowGraph::build(&symbols, &connections);
        let candidates = candidates_for(0, &symbols, &graph, &[]);
        let picked = pick_operands(candidates, 2);
        assert!(picked.contains(&1));
        assert!(picked.contains(&3));
        assert!(!picked.contains(&2));
    }

    #[test]
    fn second_operator_cannot_claim_an_operand_the_first_already_took() {
        // Two Convergences share a single Square neighbour; the Square is
        // also the nearer operand for the first Convergence once ties are
        // broken, so the second Convergence must fall back to its own
        // other neighbour rather than reusing it.
        let symbols = vec![
            symbol_at(SymbolType::Convergence, 0.0, 0.0),
            symbol_at(SymbolType::Square, 5.0, 0.0),
            symbol_at(SymbolType::Square, -5.0, 0.0),
            symbol_at(SymbolType::Convergence, 10.0, 0.0),
            symbol_at(SymbolType::Square, 15.0, 0.0),
        ];
        let connections = vec![
            Connection { from: 0, to: 1, connection_type: ConnectionType::Solid, directed: false, weight: 1.0 },
            Connection { from: 0, to: 2, connection_type: ConnectionType::Solid, directed: false, weight: 1.0 },
            Connection { from: 3, to: 1, connection_type: ConnectionType::Solid, directed: false, weight: 1.0 },
            Connection { from: 3, to: 4, connection_type: ConnectionType::Solid, directed: false, weight: 1.0 },
        ];
        let graph = FlowGraph::build(&symbols, &connections);
        let mut claimed = HashSet::new();
        let _first = build_operator_expression(0, &symbols, &graph, |i| format!("v{i}"), &mut claimed);
        assert!(claimed.contains(&1));

        let second = build_operator_expression(3, &symbols, &graph, |i| format!("v{i}"), &mut claimed);
        match second {
            Expression::UnaryOp { operand, .. } => {
                assert_eq!(*operand, Expression::Identifier { name: "v4".to_string(), ty: DataType::Any });
            }
            other => panic!("expected UnaryOp over the unclaimed operand, got {other:?}"),
        }
    }

    #[test]
    fn single_dot_square_is_literal_one() {
        let mut symbol = symbol_at(SymbolType::Square, 0.0, 0.0);
        symbol.pattern = Pattern::SingleDot;
        let expr = operand_expression(&symbol, |i| format!("v{i}"), 0);
        assert_eq!(expr, Expression::Literal { value: Literal::Int(1), ty: DataType::Integer });
    }
}
