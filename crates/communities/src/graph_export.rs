use anyhow::{Context, Result};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::info;

use store::{Neo4jConnection, query};

const DEFAULT_WEIGHT: f64 = 1.0;

/// Undirected weighted character graph, one node per name
#[derive(Debug, Clone, Default)]
pub struct CharacterGraph {
    graph: UnGraph<String, f64>,
    name_to_idx: HashMap<String, NodeIndex>,
}

impl CharacterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.name_to_idx.get(name) {
            return idx;
        }

        let idx = self.graph.add_node(name.to_string());
        self.name_to_idx.insert(name.to_string(), idx);
        idx
    }

    /// Adds both endpoints if needed. A repeated pair overwrites the previous weight.
    pub fn add_edge(&mut self, source: &str, target: &str, weight: f64) {
        let a = self.add_node(source);
        let b = self.add_node(target);

        match self.graph.find_edge(a, b) {
            Some(edge) => self.graph[edge] = weight,
            None => {
                self.graph.add_edge(a, b, weight);
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_to_idx.contains_key(name)
    }

    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.name_to_idx.get(name).copied()
    }

    /// Node names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(String::as_str)
    }

    pub fn weight(&self, source: &str, target: &str) -> Option<f64> {
        let a = self.index_of(source)?;
        let b = self.index_of(target)?;
        self.graph.find_edge(a, b).map(|e| self.graph[e])
    }

    /// (source, target, weight) for every edge, each listed once
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].as_str(),
                self.graph[e.target()].as_str(),
                *e.weight(),
            )
        })
    }

    pub fn inner(&self) -> &UnGraph<String, f64> {
        &self.graph
    }

    /// Graph induced by `names`, keeping this graph's node order
    pub fn subgraph<'a, I>(&self, names: I) -> CharacterGraph
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keep: HashSet<&str> = names.into_iter().collect();
        let mut sub = CharacterGraph::new();

        for name in self.names().filter(|n| keep.contains(n)) {
            sub.add_node(name);
        }
        for (source, target, weight) in self.edges() {
            if keep.contains(source) && keep.contains(target) {
                sub.add_edge(source, target, weight);
            }
        }

        sub
    }
}

#[derive(Debug, Deserialize)]
struct NodeRow {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelationshipRow {
    source: Option<String>,
    target: Option<String>,
    weight: Option<f64>,
}

#[derive(Debug)]
struct ExportSummary {
    nodes: usize,
    edges: usize,
    skipped_unnamed: usize,
}

pub struct GraphExporter {
    conn: Neo4jConnection,
}

impl GraphExporter {
    pub fn new(conn: Neo4jConnection) -> Self {
        Self { conn }
    }

    /// Load every named node and every relationship into a `CharacterGraph`
    pub async fn export_graph(&self) -> Result<CharacterGraph> {
        let nodes: Vec<NodeRow> = self
            .conn
            .run_query(query("MATCH (n) RETURN n.name AS name"))
            .await
            .context("Failed to export nodes from Neo4j")?;

        let relationships: Vec<RelationshipRow> = self
            .conn
            .run_query(query(
                "MATCH (s)-[r]->(t) \
                 RETURN s.name AS source, t.name AS target, toFloat(r.weight) AS weight",
            ))
            .await
            .context("Failed to export relationships from Neo4j")?;

        let (graph, summary) = build_graph(nodes, relationships);

        info!(
            nodes = summary.nodes,
            edges = summary.edges,
            skipped_unnamed = summary.skipped_unnamed,
            "Exported graph"
        );

        Ok(graph)
    }
}

fn build_graph(
    nodes: Vec<NodeRow>,
    relationships: Vec<RelationshipRow>,
) -> (CharacterGraph, ExportSummary) {
    let mut graph = CharacterGraph::new();
    let mut skipped_unnamed = 0;

    for node in nodes {
        match node.name {
            Some(name) => {
                graph.add_node(&name);
            }
            None => skipped_unnamed += 1,
        }
    }

    for rel in relationships {
        match (rel.source, rel.target) {
            (Some(source), Some(target)) => {
                graph.add_edge(&source, &target, rel.weight.unwrap_or(DEFAULT_WEIGHT));
            }
            _ => skipped_unnamed += 1,
        }
    }

    let summary = ExportSummary {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        skipped_unnamed,
    };
    (graph, summary)
}
