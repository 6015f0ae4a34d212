use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::graph_export::CharacterGraph;

pub const DEFAULT_RESOLUTION: f64 = 1.0;
pub const DEFAULT_THRESHOLD: f64 = 1e-7;

/// Louvain community detection over edge weights.
///
/// Each level moves nodes to the neighbouring community with the best
/// modularity gain, then collapses communities into single nodes. Stops once
/// a level gains no more than `threshold` modularity.
#[derive(Debug, Clone)]
pub struct LouvainDetector {
    resolution: f64,
    threshold: f64,
    seed: Option<u64>,
}

impl Default for LouvainDetector {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            threshold: DEFAULT_THRESHOLD,
            seed: None,
        }
    }
}

impl LouvainDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Partition of the graph's nodes into communities
    pub fn detect_communities(&self, graph: &CharacterGraph) -> Vec<Vec<String>> {
        let names: Vec<&str> = graph.names().collect();
        let partition = self.detect_indices(&Level::from_graph(graph));

        partition
            .into_iter()
            .map(|community| community.into_iter().map(|i| names[i].to_string()).collect())
            .collect()
    }

    fn detect_indices(&self, base: &Level) -> Vec<Vec<usize>> {
        let singletons: Vec<Vec<usize>> = (0..base.n).map(|i| vec![i]).collect();
        let m = base.total_weight();
        if base.n == 0 || base.edges.is_empty() || m <= 0.0 {
            return singletons;
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut modularity = base.modularity(&singletons, m, self.resolution);
        let mut level = base.clone();
        let mut members = singletons;

        let (mut inner, _) = self.one_level(&level, m, &mut rng);
        let mut partition = lift(&inner, &members);
        let mut levels = 1;

        let result = loop {
            let current = partition.clone();

            let new_modularity = level.modularity(&inner, m, self.resolution);
            if new_modularity - modularity <= self.threshold {
                break current;
            }
            modularity = new_modularity;

            level = level.aggregate(&inner);
            members = partition;
            let (next_inner, improvement) = self.one_level(&level, m, &mut rng);
            inner = next_inner;
            partition = lift(&inner, &members);
            levels += 1;

            if !improvement {
                break current;
            }
        };

        debug!(
            communities = result.len(),
            levels,
            modularity,
            "Louvain finished"
        );
        result
    }

    /// One round of local moves. Returns the communities as lists of level nodes
    /// and whether any node moved.
    fn one_level(&self, level: &Level, m: f64, rng: &mut StdRng) -> (Vec<Vec<usize>>, bool) {
        let n = level.n;
        let degrees = level.degrees();
        let neighbors = level.neighbors();

        let mut node_to_comm: Vec<usize> = (0..n).collect();
        let mut sigma_tot = degrees.clone();
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);

        let mut improvement = false;
        let mut moves = 1;

        while moves > 0 {
            moves = 0;

            for &node in &order {
                let degree = degrees[node];
                let current = node_to_comm[node];
                let weights = neighbor_weights(&neighbors[node], &node_to_comm);

                sigma_tot[current] -= degree;
                let weight_to_current = weights
                    .iter()
                    .find(|(c, _)| *c == current)
                    .map(|(_, w)| *w)
                    .unwrap_or(0.0);
                let remove_cost = -weight_to_current / m
                    + self.resolution * (sigma_tot[current] * degree) / (2.0 * m * m);

                let mut best_comm = current;
                let mut best_gain = 0.0;
                for &(comm, weight) in &weights {
                    let gain = remove_cost + weight / m
                        - self.resolution * (sigma_tot[comm] * degree) / (2.0 * m * m);
                    if gain > best_gain {
                        best_gain = gain;
                        best_comm = comm;
                    }
                }
                sigma_tot[best_comm] += degree;

                if best_comm != current {
                    node_to_comm[node] = best_comm;
                    improvement = true;
                    moves += 1;
                }
            }
        }

        (group_by_community(&node_to_comm), improvement)
    }
}

/// Weighted modularity of `communities` over `graph`. Names missing from the graph are ignored.
pub fn modularity(graph: &CharacterGraph, communities: &[Vec<String>], resolution: f64) -> f64 {
    let level = Level::from_graph(graph);
    let m = level.total_weight();
    if m <= 0.0 {
        return 0.0;
    }

    let partition: Vec<Vec<usize>> = communities
        .iter()
        .map(|community| {
            community
                .iter()
                .filter_map(|name| graph.index_of(name).map(|idx| idx.index()))
                .collect()
        })
        .collect();

    level.modularity(&partition, m, resolution)
}

/// Weights from one node to each neighbouring community, in neighbour order
fn neighbor_weights(neighbors: &[(usize, f64)], node_to_comm: &[usize]) -> Vec<(usize, f64)> {
    let mut weights: Vec<(usize, f64)> = Vec::new();
    let mut slots: HashMap<usize, usize> = HashMap::new();

    for &(neighbor, weight) in neighbors {
        let comm = node_to_comm[neighbor];
        match slots.get(&comm) {
            Some(&slot) => weights[slot].1 += weight,
            None => {
                slots.insert(comm, weights.len());
                weights.push((comm, weight));
            }
        }
    }

    weights
}

/// Non-empty communities ordered by community id
fn group_by_community(node_to_comm: &[usize]) -> Vec<Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (node, &comm) in node_to_comm.iter().enumerate() {
        groups.entry(comm).or_default().push(node);
    }
    groups.into_values().collect()
}

/// Map communities of level nodes back to the original nodes they contain
fn lift(inner: &[Vec<usize>], members: &[Vec<usize>]) -> Vec<Vec<usize>> {
    inner
        .iter()
        .map(|community| {
            community
                .iter()
                .flat_map(|&node| members[node].iter().copied())
                .collect()
        })
        .collect()
}

/// Working graph for one Louvain level. Self-loops hold the weight internal to a collapsed community.
#[derive(Debug, Clone)]
struct Level {
    n: usize,
    edges: Vec<(usize, usize, f64)>,
}

impl Level {
    fn from_graph(graph: &CharacterGraph) -> Self {
        use petgraph::visit::EdgeRef;

        let inner = graph.inner();
        Self {
            n: inner.node_count(),
            edges: inner
                .edge_references()
                .map(|e| (e.source().index(), e.target().index(), *e.weight()))
                .collect(),
        }
    }

    fn total_weight(&self) -> f64 {
        self.edges.iter().map(|&(_, _, w)| w).sum()
    }

    /// Weighted degree; a self-loop counts twice
    fn degrees(&self) -> Vec<f64> {
        let mut degrees = vec![0.0; self.n];
        for &(u, v, w) in &self.edges {
            degrees[u] += w;
            degrees[v] += w;
        }
        degrees
    }

    fn neighbors(&self) -> Vec<Vec<(usize, f64)>> {
        let mut neighbors = vec![Vec::new(); self.n];
        for &(u, v, w) in &self.edges {
            if u != v {
                neighbors[u].push((v, w));
                neighbors[v].push((u, w));
            }
        }
        neighbors
    }

    fn modularity(&self, partition: &[Vec<usize>], m: f64, resolution: f64) -> f64 {
        let mut node_to_comm = vec![usize::MAX; self.n];
        for (comm, nodes) in partition.iter().enumerate() {
            for &node in nodes {
                node_to_comm[node] = comm;
            }
        }

        let degrees = self.degrees();
        let mut internal = vec![0.0; partition.len()];
        for &(u, v, w) in &self.edges {
            let (cu, cv) = (node_to_comm[u], node_to_comm[v]);
            if cu == cv && cu != usize::MAX {
                internal[cu] += w;
            }
        }

        partition
            .iter()
            .zip(internal)
            .map(|(nodes, l_c)| {
                let degree_sum: f64 = nodes.iter().map(|&node| degrees[node]).sum();
                l_c / m - resolution * degree_sum * degree_sum / (4.0 * m * m)
            })
            .sum()
    }

    /// Collapse each community into one node, summing weights between and within communities
    fn aggregate(&self, communities: &[Vec<usize>]) -> Level {
        let mut node_to_comm = vec![0; self.n];
        for (comm, nodes) in communities.iter().enumerate() {
            for &node in nodes {
                node_to_comm[node] = comm;
            }
        }

        let mut weights: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for &(u, v, w) in &self.edges {
            let (a, b) = (node_to_comm[u], node_to_comm[v]);
            *weights.entry((a.min(b), a.max(b))).or_insert(0.0) += w;
        }

        Level {
            n: communities.len(),
            edges: weights.into_iter().map(|((a, b), w)| (a, b, w)).collect(),
        }
    }
}
