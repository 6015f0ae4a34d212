pub mod graph_export;
pub mod louvain;
pub mod report;

pub use graph_export::{CharacterGraph, GraphExporter};
pub use louvain::{LouvainDetector, modularity};
pub use report::{
    CommunityReport, CommunitySize, LargestCommunity, community_sizes, largest_community,
    print_community_sizes,
};

use anyhow::Result;
use tracing::info;

use store::Neo4jConnection;

pub struct CommunityDetector {
    exporter: GraphExporter,
    louvain: LouvainDetector,
}

impl CommunityDetector {
    pub fn new(conn: Neo4jConnection, louvain: LouvainDetector) -> Self {
        Self {
            exporter: GraphExporter::new(conn),
            louvain,
        }
    }

    pub async fn communities(&self) -> Result<(CharacterGraph, Vec<Vec<String>>)> {
        let graph = self.exporter.export_graph().await?;
        let communities = self.louvain.detect_communities(&graph);
        info!(communities = communities.len(), "Detected communities");
        Ok((graph, communities))
    }

    /// Induced subgraph of the largest detected community
    pub async fn subgraph_largest_community(&self) -> Result<CharacterGraph> {
        let (graph, communities) = self.communities().await?;
        Ok(largest_subgraph(&graph, &communities))
    }

    /// Full pipeline: export, detect, and summarise sizes and the largest community
    pub async fn detect(&self) -> Result<CommunityReport> {
        let (graph, communities) = self.communities().await?;
        Ok(build_report(&graph, &communities, self.louvain.resolution()))
    }
}

fn largest_subgraph(graph: &CharacterGraph, communities: &[Vec<String>]) -> CharacterGraph {
    match largest_community(communities) {
        Some(idx) => graph.subgraph(communities[idx].iter().map(String::as_str)),
        None => CharacterGraph::new(),
    }
}

pub fn build_report(
    graph: &CharacterGraph,
    communities: &[Vec<String>],
    resolution: f64,
) -> CommunityReport {
    let largest = largest_community(communities).map(|idx| {
        let sub = graph.subgraph(communities[idx].iter().map(String::as_str));
        LargestCommunity {
            community: idx + 1,
            nodes: sub.node_count(),
            edges: sub.edge_count(),
            members: sub.names().map(String::from).collect(),
        }
    });

    CommunityReport {
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        community_count: communities.len(),
        modularity: modularity(graph, communities, resolution),
        sizes: community_sizes(communities),
        largest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_groups() -> CharacterGraph {
        let mut graph = CharacterGraph::new();
        for (a, b) in [("A", "B"), ("B", "C"), ("A", "C"), ("C", "D")] {
            graph.add_edge(a, b, 1.0);
        }
        for (a, b) in [("D", "E"), ("E", "F")] {
            graph.add_edge(a, b, 1.0);
        }
        graph
    }

    #[test]
    fn test_report_for_fixed_partition() {
        let graph = two_groups();
        let communities = vec![
            vec!["D".to_string(), "E".to_string()],
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            vec!["F".to_string()],
        ];

        let report = build_report(&graph, &communities, 1.0);

        assert_eq!(report.node_count, 6);
        assert_eq!(report.edge_count, 6);
        assert_eq!(report.community_count, 3);
        assert_eq!(report.sizes[0], CommunitySize { community: 2, size: 3 });

        let largest = report.largest.unwrap();
        assert_eq!(largest.community, 2);
        assert_eq!(largest.nodes, 3);
        assert_eq!(largest.edges, 3);
        assert_eq!(largest.members, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_largest_subgraph_of_empty_graph() {
        let sub = largest_subgraph(&CharacterGraph::new(), &[]);
        assert!(sub.is_empty());

        let report = build_report(&CharacterGraph::new(), &[], 1.0);
        assert_eq!(report.community_count, 0);
        assert_eq!(report.modularity, 0.0);
        assert!(report.largest.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["community_count"], 0);
        assert!(json["largest"].is_null());
    }

    #[test]
    fn test_largest_subgraph_after_detection() {
        let graph = two_groups();
        let communities = LouvainDetector::new()
            .with_seed(Some(11))
            .detect_communities(&graph);

        let sub = largest_subgraph(&graph, &communities);
        let idx = largest_community(&communities).unwrap();

        assert_eq!(sub.node_count(), communities[idx].len());
        assert!(communities[idx].iter().all(|n| sub.contains(n)));
    }
}
