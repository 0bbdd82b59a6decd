//! The directed flow graph over symbols, induced by connections (spec.md
//! §4.2.3), plus missing-edge inference for implicit adjacency the
//! drawing omitted.

use crate::detector::connection::{Connection, ConnectionType};
use crate::detector::symbol::Symbol;
use crate::parser::spatial_index::SpatialIndex;
use crate::types::{distance, percentile};
use std::collections::{HashSet, VecDeque};

/// A directed edge, annotated with the stroke style that produced it
/// (`None` for edges synthesised by missing-edge inference).
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub to: usize,
    pub style: Option<ConnectionType>,
}

pub struct FlowGraph {
    pub adjacency: Vec<Vec<Edge>>,
}

impl FlowGraph {
    /// Builds the graph over `symbols` (indices local to that slice,
    /// i.e. with the outer circle already excluded — spec.md §3.3:
    /// "connections targeting the OuterCircle are excluded from the
    /// parse"). Undirected connections contribute an edge in both
    /// directions; directed ones contribute one (spec.md §4.2.3).
    pub fn build(symbols: &[Symbol], connections: &[Connection]) -> Self {
        let mut adjacency = vec![Vec::new(); symbols.len()];
        for conn in connections {
            if conn.from >= symbols.len() || conn.to >= symbols.len() {
                continue;
            }
            adjacency[conn.from].push(Edge { to: conn.to, style: Some(conn.connection_type) });
            if !conn.directed {
                adjacency[conn.to].push(Edge { to: conn.from, style: Some(conn.connection_type) });
            }
        }

        let mut graph = Self { adjacency };
        graph.infer_missing_edges(symbols);
        graph
    }

    /// BFS shortest-path distance between `from` and `to`, or `usize::MAX`
    /// if unreachable.
    pub fn shortest_path_len(&self, from: usize, to: usize) -> usize {
        if from == to {
            return 0;
        }
        let mut visited = vec![false; self.adjacency.len()];
        let mut queue = VecDeque::new();
        queue.push_back((from, 0usize));
        visited[from] = true;
        while let Some((node, dist)) = queue.pop_front() {
            for edge in &self.adjacency[node] {
                if edge.to == to {
                    return dist + 1;
                }
                if !visited[edge.to] {
                    visited[edge.to] = true;
                    queue.push_back((edge.to, dist + 1));
                }
            }
        }
        usize::MAX
    }

    /// Breadth-first visit order starting from `root`, visiting each
    /// reachable node exactly once (spec.md §4.2.4: "walk outward from
    /// `main_entry` in breadth-first order").
    pub fn bfs_order(&self, root: usize) -> Vec<usize> {
        let mut visited = vec![false; self.adjacency.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(root);
        visited[root] = true;
        while let Some(node) = queue.pop_front() {
            order.push(node);
            let mut next: Vec<usize> = self.adjacency[node].iter().map(|e| e.to).collect();
            next.sort_unstable();
            for n in next {
                if !visited[n] {
                    visited[n] = true;
                    queue.push_back(n);
                }
            }
        }
        order
    }

    /// Every node unreachable from `root` (spec.md §4.2.7: "a cycle-free
    /// unreachable subgraph is discarded silently").
    pub fn unreachable_from(&self, root: usize) -> HashSet<usize> {
        let reached: HashSet<usize> = self.bfs_order(root).into_iter().collect();
        (0..self.adjacency.len()).filter(|i| !reached.contains(i)).collect()
    }

    /// Adds an edge between any two symbols whose centroid distance is
    /// below the `missing_edge_percentile`-th percentile of all pairwise
    /// distances and whose current shortest path exceeds
    /// `missing_edge_graph_distance` (spec.md §4.2.3). Uses the defaults
    /// baked into spec.md's numbers directly since the flow graph doesn't
    /// carry a `Config` reference; call sites needing different tuning use
    /// `infer_missing_edges_with` instead.
    fn infer_missing_edges(&mut self, symbols: &[Symbol]) {
        self.infer_missing_edges_with(symbols, 20.0, 3);
    }

    pub fn infer_missing_edges_with(&mut self, symbols: &[Symbol], percentile_cutoff: f64, graph_distance: usize) {
        let n = symbols.len();
        if n < 2 {
            return;
        }
        let mut all_distances = Vec::with_capacity(n * (n - 1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                all_distances.push(distance(symbols[i].position, symbols[j].position));
            }
        }
        let cutoff = percentile(&all_distances, percentile_cutoff);

        // Candidate pairs worth checking are exactly those within `cutoff`
        // of each other, so a grid cell sized to `cutoff` turns the search
        // from all-pairs into an expected-O(1)-per-symbol neighbourhood
        // query (see `SpatialIndex::build_with_cell_size`).
        let index = SpatialIndex::build_with_cell_size(symbols, cutoff);
        let mut to_add = Vec::new();
        for i in 0..n {
            for j in index.neighbors(symbols[i].position.x, symbols[i].position.y) {
                if j <= i {
                    continue;
                }
                let d = distance(symbols[i].position, symbols[j].position);
                if d <= cutoff && self.shortest_path_len(i, j) > graph_distance {
                    to_add.push((i, j));
                }
            }
        }
        for (i, j) in to_add {
            self.adjacency[i].push(Edge { to: j, style: None });
            self.adjacency[j].push(Edge { to: i, style: None });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::symbol::SymbolType;
    use nalgebra::Point2;

    fn symbol_at(x: f64, y: f64) -> Symbol {
        Symbol::new(SymbolType::Star, Point2::new(x, y), 5.0)
    }

    #[test]
    fn directed_connection_contributes_one_edge() {
        let symbols = vec![symbol_at(0.0, 0.0), symbol_at(10.0, 0.0)];
        let connections = vec![Connection {
            from: 0,
            to: 1,
            connection_type: ConnectionType::Arrow,
            directed: true,
            weight: 1.0,
        }];
        let graph = FlowGraph::build(&symbols, &connections);
        assert_eq!(graph.adjacency[0].len(), 1);
        assert_eq!(graph.adjacency[1].len(), 0);
    }

    #[test]
    fn undirected_connection_contributes_both_directions() {
        let symbols = vec![symbol_at(0.0, 0.0), symbol_at(10.0, 0.0)];
        let connections = vec![Connection {
            from: 0,
            to: 1,
            connection_type: ConnectionType::Solid,
            directed: false,
            weight: 1.0,
        }];
        let graph = FlowGraph::build(&symbols, &connections);
        assert_eq!(graph.adjacency[0].len(), 1);
        assert_eq!(graph.adjacency[1].len(), 1);
    }

    #[test]
    fn bfs_order_visits_each_node_once() {
        let symbols = vec![symbol_at(0.0, 0.0), symbol_at(10.0, 0.0), symbol_at(20.0, 0.0)];
        let connections = vec![
            Connection { from: 0, to: 1, connection_type: ConnectionType::Solid, directed: false, weight: 1.0 },
            Connection { from: 1, to: 2, connection_type: ConnectionType::Solid, directed: false, weight: 1.0 },
        ];
        let graph = FlowGraph::build(&symbols, &connections);
        assert_eq!(graph.bfs_order(0), vec![0, 1, 2]);
    }

    #[test]
    fn unreachable_subgraph_is_reported() {
        let symbols = vec![symbol_at(0.0, 0.0), symbol_at(500.0, 500.0)];
        let connections = Vec::new();
        let graph = FlowGraph::build(&symbols, &connections);
        let unreachable = graph.unreachable_from(0);
        assert!(unreachable.contains(&1));
    }
}
