use crate::*;
use rustworkx_core::petgraph;
use rustworkx_core::petgraph::{graph::NodeIndex, Directed, Direction, Graph};

/// Keyed directed graph with unit-length edges.
#[derive(Debug)]
pub struct DiGraph<N> {
    pub map: Dict<N, NodeIndex>,
    pub graph: Graph<N, (), Directed>,
}

impl<N: Eq + Hash + Clone> Default for DiGraph<N> {
    fn default() -> Self {
        Self {
            map: Dict::new(),
            graph: Graph::new(),
        }
    }
}

impl<N: Eq + Hash + Clone> DiGraph<N> {
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            map: Dict::with_capacity(nodes),
            graph: Graph::with_capacity(nodes, edges),
        }
    }
    /// Index of `key`, inserting the node on first sight.
    pub fn add_node(&mut self, key: N) -> NodeIndex {
        if let Some(&idx) = self.map.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(key.clone());
        self.map.insert(key, idx);
        idx
    }
    pub fn add_edge(&mut self, a: N, b: N) {
        let a = self.add_node(a);
        let b = self.add_node(b);
        self.graph.add_edge(a, b, ());
    }
    pub fn index_of(&self, key: &N) -> Option<NodeIndex> {
        self.map.get(key).copied()
    }
    pub fn key(&self, idx: NodeIndex) -> &N {
        &self.graph[idx]
    }
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
    /// Hop distance of every node from `source`; `None` marks unreachable nodes.
    pub fn hop_distances(&self, source: &N) -> Vec<Option<usize>> {
        let mut dist = vec![None; self.graph.node_count()];
        let Some(src) = self.index_of(source) else {
            return dist;
        };
        let reached = petgraph::algo::dijkstra(&self.graph, src, None, |_| 1usize);
        for (idx, d) in reached {
            dist[idx.index()] = Some(d);
        }
        dist
    }
    /// Number of distinct shortest paths from the distance origin, saturated at `cap`.
    pub fn count_shortest_paths(&self, dist: &[Option<usize>], cap: usize) -> Vec<usize> {
        let mut order = (0..self.graph.node_count())
            .filter(|&i| dist[i].is_some())
            .collect_vec();
        order.sort_by_key(|&i| dist[i]);
        let mut count = vec![0usize; self.graph.node_count()];
        for i in order {
            let d = dist[i].unwrap_or(0);
            if d == 0 {
                count[i] = 1;
                continue;
            }
            let mut total = 0usize;
            for u in self
                .graph
                .neighbors_directed(NodeIndex::new(i), Direction::Incoming)
            {
                if dist[u.index()] == Some(d - 1) {
                    total = total.saturating_add(count[u.index()]).min(cap);
                }
            }
            count[i] = total;
        }
        count
    }
    /// Every shortest path ending at `target`, as node sequences starting at the origin.
    pub fn shortest_paths_to(
        &self,
        dist: &[Option<usize>],
        target: NodeIndex,
    ) -> Vec<Vec<NodeIndex>> {
        let mut paths = Vec::new();
        if dist[target.index()].is_none() {
            return paths;
        }
        let mut stack = vec![vec![target]];
        while let Some(partial) = stack.pop() {
            let head = partial[partial.len() - 1];
            let d = dist[head.index()].unwrap_or(0);
            if d == 0 {
                let mut path = partial;
                path.reverse();
                paths.push(path);
                continue;
            }
            for u in self.graph.neighbors_directed(head, Direction::Incoming) {
                if dist[u.index()] == Some(d - 1) {
                    let mut next = partial.clone();
                    next.push(u);
                    stack.push(next);
                }
            }
        }
        paths
    }
}
