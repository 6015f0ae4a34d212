use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySize {
    /// 1-based position in detection order
    pub community: usize,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LargestCommunity {
    pub community: usize,
    pub nodes: usize,
    pub edges: usize,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityReport {
    pub node_count: usize,
    pub edge_count: usize,
    pub community_count: usize,
    pub modularity: f64,
    pub sizes: Vec<CommunitySize>,
    pub largest: Option<LargestCommunity>,
}

/// Sizes sorted largest first; ties keep detection order
pub fn community_sizes(communities: &[Vec<String>]) -> Vec<CommunitySize> {
    let mut sizes: Vec<CommunitySize> = communities
        .iter()
        .enumerate()
        .map(|(idx, community)| CommunitySize {
            community: idx + 1,
            size: community.len(),
        })
        .collect();

    sizes.sort_by(|a, b| b.size.cmp(&a.size));
    sizes
}

/// Index of the largest community, the earliest one on ties
pub fn largest_community(communities: &[Vec<String>]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, community) in communities.iter().enumerate() {
        match best {
            Some(b) if communities[b].len() >= community.len() => {}
            _ => best = Some(idx),
        }
    }
    best
}

pub fn format_community_sizes(communities: &[Vec<String>]) -> String {
    let mut out = format!("Number of communities: {}\n", communities.len());
    for entry in community_sizes(communities) {
        let _ = writeln!(out, "Community {}: {} nodes", entry.community, entry.size);
    }
    out
}

pub fn print_community_sizes(communities: &[Vec<String>]) {
    print!("{}", format_community_sizes(communities));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn communities(sizes: &[usize]) -> Vec<Vec<String>> {
        sizes
            .iter()
            .enumerate()
            .map(|(c, &n)| (0..n).map(|i| format!("c{}n{}", c, i)).collect())
            .collect()
    }

    #[test]
    fn test_sizes_sorted_descending_stable() {
        let sizes = community_sizes(&communities(&[2, 5, 2, 7]));
        let pairs: Vec<(usize, usize)> = sizes.iter().map(|s| (s.community, s.size)).collect();
        assert_eq!(pairs, vec![(4, 7), (2, 5), (1, 2), (3, 2)]);
    }

    #[test]
    fn test_largest_prefers_first_on_tie() {
        assert_eq!(largest_community(&communities(&[3, 5, 5, 1])), Some(1));
        assert_eq!(largest_community(&[]), None);
    }

    #[test]
    fn test_format() {
        let text = format_community_sizes(&communities(&[1, 3]));
        assert_eq!(
            text,
            "Number of communities: 2\nCommunity 2: 3 nodes\nCommunity 1: 1 nodes\n"
        );
    }
}
