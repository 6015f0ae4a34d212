use std::fmt::Write;

use communities::CharacterGraph;
use store::{BookDegreeStatistics, BookInteractionCount, DegreeStatistics};

fn book_label(book: Option<i64>) -> String {
    book.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn interactions_by_book(rows: &[BookInteractionCount]) -> String {
    let mut out = format!("{:<6} {:>12}\n", "book", "interactions");
    for row in rows {
        let _ = writeln!(out, "{:<6} {:>12}", book_label(row.book), row.interaction_count);
    }
    out
}

pub fn statistics(stats: Option<&DegreeStatistics>) -> String {
    match stats {
        Some(s) => format!(
            "min: {}\nmax: {}\navg_characters: {:.2}\nstdev: {:.2}\n",
            s.min, s.max, s.avg_characters, s.stdev
        ),
        None => "No statistics: no character has outgoing interactions\n".to_string(),
    }
}

pub fn statistics_by_book(rows: &[BookDegreeStatistics]) -> String {
    let mut out = format!(
        "{:<6} {:>5} {:>5} {:>8} {:>8}\n",
        "book", "min", "max", "avg", "stdev"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<6} {:>5} {:>5} {:>8.2} {:>8.2}",
            book_label(row.book),
            row.min,
            row.max,
            row.avg_characters,
            row.stdev
        );
    }
    out
}

pub fn community_graph(graph: &CharacterGraph) -> String {
    let mut out = format!(
        "Largest community: {} nodes, {} edges\n",
        graph.node_count(),
        graph.edge_count()
    );
    for name in graph.names() {
        let _ = writeln!(out, "  {}", name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interactions_table() {
        let rows = vec![
            BookInteractionCount { book: None, interaction_count: 3 },
            BookInteractionCount { book: Some(1), interaction_count: 684 },
        ];
        let text = interactions_by_book(&rows);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with('-'));
        assert!(lines[2].starts_with('1'));
        assert!(lines[2].ends_with("684"));
    }

    #[test]
    fn test_statistics_text() {
        let stats = DegreeStatistics { min: 1, max: 122, avg_characters: 6.5714, stdev: 10.2 };
        assert_eq!(
            statistics(Some(&stats)),
            "min: 1\nmax: 122\navg_characters: 6.57\nstdev: 10.20\n"
        );
        assert!(statistics(None).starts_with("No statistics"));
    }

    #[test]
    fn test_community_graph_lists_members() {
        let mut graph = CharacterGraph::new();
        graph.add_edge("Jon", "Sam", 5.0);
        graph.add_node("Ghost");

        let text = community_graph(&graph);
        assert!(text.starts_with("Largest community: 3 nodes, 1 edges"));
        assert!(text.contains("  Ghost\n"));
    }
}
