//! Statement synthesis: walks the flow graph outward from a function's
//! entry symbol and turns each reachable symbol into a statement, per the
//! type table of spec.md §4.2.4.

use crate::detector::connection::ConnectionType;
use crate::detector::symbol::{Pattern, Symbol, SymbolType};
use crate::error::{GrimoireError, Location};
use crate::parser::ast::{DataType, Expression, Literal, Statement};
use crate::parser::expression::{build_operator_expression, operand_expression};
use crate::parser::flow_graph::FlowGraph;
use crate::parser::spatial_index::SpatialIndex;
use crate::types::distance;
use std::collections::{HashSet, VecDeque};

fn is_operator_type(ty: SymbolType) -> bool {
    matches!(
        ty,
        SymbolType::Convergence
            | SymbolType::Divergence
            | SymbolType::Amplification
            | SymbolType::Distribution
            | SymbolType::Transfer
            | SymbolType::Seal
            | SymbolType::Cycle
    )
}

/// Maps a Square's incoming connection stroke style to its declared data
/// type (spec.md §4.2.4's five-row table: solid, dashed, dotted,
/// double-stroke and wavy each own a distinct type). Falls back to
/// `Integer` when the square wasn't reached over a drawn connection (e.g.
/// it's the walk's own entry).
fn style_to_type(style: Option<ConnectionType>) -> DataType {
    match style {
        Some(ConnectionType::Solid) | None => DataType::Integer,
        Some(ConnectionType::Dashed) => DataType::Float,
        Some(ConnectionType::Dotted) => DataType::String,
        Some(ConnectionType::Double) => DataType::Boolean,
        Some(ConnectionType::Wavy) => DataType::Array,
        Some(ConnectionType::Arrow) => DataType::Integer,
    }
}

/// Fresh identifiers and the function roots discovered while walking a
/// body (spec.md §4.2.4's `DoubleCircle`/`Circle` rows become separate
/// `Function`s, built by the caller after the current body is done).
pub struct NameGen {
    counter: usize,
    names: std::collections::HashMap<usize, String>,
    pub pending_functions: Vec<(String, usize)>,
}

impl NameGen {
    pub fn new() -> Self {
        Self { counter: 0, names: std::collections::HashMap::new(), pending_functions: Vec::new() }
    }

    fn name_for(&mut self, idx: usize) -> String {
        if let Some(name) = self.names.get(&idx) {
            return name.clone();
        }
        let name = format!("v{}", self.counter);
        self.counter += 1;
        self.names.insert(idx, name.clone());
        name
    }

    fn fresh_function_name(&mut self) -> String {
        let name = format!("fn_{}", self.counter);
        self.counter += 1;
        name
    }
}

/// Outgoing neighbours of `node`, excluding `exclude` (typically the
/// parent it was reached from), sorted by symbol index for determinism.
fn outgoing(node: usize, graph: &FlowGraph, exclude: &[usize]) -> Vec<usize> {
    let mut out: Vec<usize> =
        graph.adjacency[node].iter().map(|e| e.to).filter(|n| !exclude.contains(n)).collect();
    out.sort_unstable();
    out.dedup();
    out
}

fn style_into(node: usize, from: usize, graph: &FlowGraph) -> Option<ConnectionType> {
    graph.adjacency[from].iter().find(|e| e.to == node).and_then(|e| e.style)
}

fn angle_from(origin: &Symbol, target: &Symbol) -> f64 {
    let delta = target.position - origin.position;
    delta.y.atan2(delta.x)
}

/// Breadth-first order starting at `entry`, each item paired with the
/// parent it was discovered from (`None` for `entry` itself).
fn bfs_with_parent(entry: usize, graph: &FlowGraph, visited: &HashSet<usize>) -> Vec<(usize, Option<usize>)> {
    let mut seen = vec![false; graph.adjacency.len()];
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    seen[entry] = true;
    queue.push_back((entry, None));
    while let Some((node, parent)) = queue.pop_front() {
        order.push((node, parent));
        let mut next: Vec<usize> = graph.adjacency[node].iter().map(|e| e.to).collect();
        next.sort_unstable();
        for n in next {
            if !seen[n] && !visited.contains(&n) {
                seen[n] = true;
                queue.push_back((n, Some(node)));
            }
        }
    }
    order
}

/// Builds the statement list for the body rooted at `entry`. When
/// `include_entry` is false, `entry` itself is a container (a function's
/// own symbol) and only its reachable descendants become statements —
/// used for `main_entry`/`Circle`/`DoubleCircle` bodies. When true,
/// `entry`'s own statement is included — used for Triangle/Hexagon/
/// Pentagon branch bodies, whose root is itself a statement.
pub fn build_body(
    entry: usize,
    include_entry: bool,
    symbols: &[Symbol],
    graph: &FlowGraph,
    visited: &mut HashSet<usize>,
    gen: &mut NameGen,
    loc: &Location,
    claimed: &mut HashSet<usize>,
) -> crate::error::Result<Vec<Statement>> {
    visited.insert(entry);
    let order = bfs_with_parent(entry, graph, visited);
    let mut statements = Vec::new();

    for (idx, parent) in order {
        if idx == entry && !include_entry {
            continue;
        }
        // A node consumed by an earlier sibling's nested body (branch,
        // loop, parallel arm) is skipped here; `visited` only grows
        // during this walk, so a re-visit means that happened.
        if visited.contains(&idx) && idx != entry {
            continue;
        }
        visited.insert(idx);
        if let Some(stmt) = synthesize_one(idx, parent, symbols, graph, visited, gen, loc, claimed)? {
            statements.push(stmt);
        }
    }
    Ok(statements)
}

fn synthesize_one(
    idx: usize,
    parent: Option<usize>,
    symbols: &[Symbol],
    graph: &FlowGraph,
    visited: &mut HashSet<usize>,
    gen: &mut NameGen,
    loc: &Location,
    claimed: &mut HashSet<usize>,
) -> crate::error::Result<Option<Statement>> {
    let symbol = &symbols[idx];
    let exclude: Vec<usize> = parent.into_iter().collect();

    match symbol.symbol_type {
        SymbolType::Star | SymbolType::SixPointedStar | SymbolType::EightPointedStar => {
            Ok(Some(output_statement(idx, symbols, graph, &exclude, gen, claimed)))
        }
        SymbolType::Square => Ok(Some(assignment_statement(idx, parent, symbols, graph, gen))),
        SymbolType::Triangle => {
            Ok(Some(if_statement(idx, symbols, graph, &exclude, visited, gen, loc, claimed)?))
        }
        SymbolType::Pentagon => {
            Ok(Some(for_loop_statement(idx, symbols, graph, &exclude, visited, gen, loc, claimed)?))
        }
        SymbolType::Hexagon => {
            Ok(Some(parallel_block_statement(idx, symbols, graph, &exclude, visited, gen, loc, claimed)?))
        }
        SymbolType::DoubleCircle | SymbolType::Circle => {
            let name = gen.fresh_function_name();
            gen.pending_functions.push((name.clone(), idx));
            Ok(Some(Statement::ExpressionStatement {
                expr: Expression::FunctionCall { name, args: Vec::new(), ty: DataType::Any },
            }))
        }
        SymbolType::Unknown => Err(GrimoireError::UnexpectedSymbol { location: loc.clone() }),
        _ if symbol.pattern == Pattern::FivePoints => {
            Ok(Some(output_statement(idx, symbols, graph, &exclude, gen, claimed)))
        }
        _ => Ok(None),
    }
}

fn output_statement(
    idx: usize,
    symbols: &[Symbol],
    graph: &FlowGraph,
    exclude: &[usize],
    gen: &mut NameGen,
    claimed: &mut HashSet<usize>,
) -> Statement {
    let mut neighbors = outgoing(idx, graph, exclude);
    neighbors.retain(|n| n != &idx);
    let value = match neighbors.first() {
        Some(&n) if is_operator_type(symbols[n].symbol_type) => {
            build_operator_expression(n, symbols, graph, |i| gen.name_for(i), claimed)
        }
        Some(&n) => operand_expression(&symbols[n], |i| gen.name_for(i), n),
        None => Expression::Literal { value: Literal::Str(String::new()), ty: DataType::String },
    };
    Statement::OutputStatement { value }
}

fn assignment_statement(idx: usize, parent: Option<usize>, symbols: &[Symbol], graph: &FlowGraph, gen: &mut NameGen) -> Statement {
    let symbol = &symbols[idx];
    let target = gen.name_for(idx);
    let value = match crate::detector::pattern::pattern_to_literal(symbol.pattern) {
        Some(n) => Expression::Literal { value: Literal::Int(n), ty: DataType::Integer },
        None if symbol.pattern == Pattern::Cross => {
            Expression::Literal { value: Literal::Str("#".to_string()), ty: DataType::String }
        }
        None => Expression::Literal { value: Literal::Int(0), ty: DataType::Integer },
    };
    let style = parent.and_then(|p| style_into(idx, p, graph));
    let ty = style_to_type(style);
    Statement::Assignment { target, value, ty }
}

fn if_statement(
    idx: usize,
    symbols: &[Symbol],
    graph: &FlowGraph,
    exclude: &[usize],
    visited: &mut HashSet<usize>,
    gen: &mut NameGen,
    loc: &Location,
    claimed: &mut HashSet<usize>,
) -> crate::error::Result<Statement> {
    let mut outs = outgoing(idx, graph, exclude);

    let operator_pos = outs.iter().position(|&n| is_operator_type(symbols[n].symbol_type));
    let condition = match operator_pos {
        Some(pos) => {
            let op_idx = outs.remove(pos);
            build_operator_expression(op_idx, symbols, graph, |i| gen.name_for(i), claimed)
        }
        None => Expression::Literal { value: Literal::Bool(true), ty: DataType::Boolean },
    };

    if outs.len() < 2 {
        return Err(GrimoireError::SyntaxError {
            location: loc.clone(),
            reason: "Triangle has fewer than two outgoing branches".to_string(),
        });
    }

    let origin = &symbols[idx];
    outs.sort_by(|&a, &b| angle_from(origin, &symbols[a]).partial_cmp(&angle_from(origin, &symbols[b])).unwrap());
    let (then_root, else_root) = (outs[0], outs[1]);

    let then_branch = build_body(then_root, true, symbols, graph, visited, gen, loc, claimed)?;
    let else_branch = build_body(else_root, true, symbols, graph, visited, gen, loc, claimed)?;

    Ok(Statement::IfStatement { condition, then_branch, else_branch })
}

/// Nearest Square carrying a numeric dot pattern, used as a Pentagon's
/// loop bound (spec.md §4.2.4). Search is over every symbol, not just
/// reachable ones — the spec says "nearest Square", not "connected
/// Square". Tries the spatial index's 3x3 neighbourhood around the
/// Pentagon first (the expected-O(1) path for the common case of a
/// nearby count-square); falls back to the exhaustive scan only when that
/// neighbourhood holds no usable Square, so correctness never depends on
/// a Square happening to land in-grid.
fn nearest_count_square(idx: usize, symbols: &[Symbol]) -> Option<i64> {
    let origin = &symbols[idx];
    let nearest_in = |candidates: &mut dyn Iterator<Item = usize>| {
        candidates
            .filter(|&i| i != idx && symbols[i].symbol_type == SymbolType::Square)
            .filter_map(|i| crate::detector::pattern::pattern_to_literal(symbols[i].pattern).map(|n| (i, n)))
            .min_by(|(a, _), (b, _)| {
                distance(origin.position, symbols[*a].position)
                    .partial_cmp(&distance(origin.position, symbols[*b].position))
                    .unwrap()
            })
            .map(|(_, n)| n)
    };

    let index = SpatialIndex::build(symbols);
    let mut nearby = index.neighbors(origin.position.x, origin.position.y).into_iter();
    nearest_in(&mut nearby).or_else(|| nearest_in(&mut (0..symbols.len())))
}

fn for_loop_statement(
    idx: usize,
    symbols: &[Symbol],
    graph: &FlowGraph,
    exclude: &[usize],
    visited: &mut HashSet<usize>,
    gen: &mut NameGen,
    loc: &Location,
    claimed: &mut HashSet<usize>,
) -> crate::error::Result<Statement> {
    let outs = outgoing(idx, graph, exclude);
    if outs.is_empty() {
        return Err(GrimoireError::SyntaxError {
            location: loc.clone(),
            reason: "Pentagon has no reachable body".to_string(),
        });
    }

    let count = nearest_count_square(idx, symbols).unwrap_or(1);
    let counter = gen.name_for(idx);

    let mut body = Vec::new();
    for root in outs {
        if visited.contains(&root) {
            continue;
        }
        body.extend(build_body(root, true, symbols, graph, visited, gen, loc, claimed)?);
    }

    Ok(Statement::ForLoop {
        counter,
        start: Expression::Literal { value: Literal::Int(0), ty: DataType::Integer },
        end: Expression::Literal { value: Literal::Int(count), ty: DataType::Integer },
        step: Expression::Literal { value: Literal::Int(1), ty: DataType::Integer },
        body,
    })
}

fn parallel_block_statement(
    idx: usize,
    symbols: &[Symbol],
    graph: &FlowGraph,
    exclude: &[usize],
    visited: &mut HashSet<usize>,
    gen: &mut NameGen,
    loc: &Location,
    claimed: &mut HashSet<usize>,
) -> crate::error::Result<Statement> {
    let outs = outgoing(idx, graph, exclude);
    let mut branches = Vec::new();
    for root in outs {
        if visited.contains(&root) {
            continue;
        }
        branches.push(build_body(root, true, symbols, graph, visited, gen, loc, claimed)?);
    }
    Ok(Statement::ParallelBlock { branches })
}
