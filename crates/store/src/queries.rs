use anyhow::Result;
use neo4rs::query;
use serde::{Deserialize, Serialize};

use crate::connection::Neo4jConnection;

pub const COUNT_CHARACTERS: &str = "MATCH (c:Character) RETURN count(c) AS count";

pub const COUNT_INTERACTIONS: &str = "MATCH ()-[r]->() RETURN count(r) AS count";

pub const COUNT_INTERACTIONS_BY_BOOK: &str = "MATCH ()-[r]->() \
     RETURN r.book AS book, count(r) AS interaction_count \
     ORDER BY book";

pub const NETWORK_SUMMARY_STATISTICS: &str = "MATCH (c:Character)-->() \
     WITH c, count(*) AS num \
     RETURN min(num) AS min, max(num) AS max, avg(num) AS avg_characters, stdev(num) AS stdev";

pub const NETWORK_SUMMARY_STATISTICS_BY_BOOK: &str = "MATCH (c:Character)-[r]->() \
     WITH r.book AS book, c, count(*) AS num \
     RETURN book, min(num) AS min, max(num) AS max, avg(num) AS avg_characters, stdev(num) AS stdev \
     ORDER BY book";

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CountRow {
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookInteractionCount {
    pub book: Option<i64>,
    pub interaction_count: i64,
}

/// Outgoing-degree statistics over characters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreeStatistics {
    pub min: i64,
    pub max: i64,
    pub avg_characters: f64,
    pub stdev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookDegreeStatistics {
    pub book: Option<i64>,
    pub min: i64,
    pub max: i64,
    pub avg_characters: f64,
    pub stdev: f64,
}

/// Aggregates come back null when nothing matched
#[derive(Debug, Clone, Deserialize)]
struct RawStatisticsRow {
    #[serde(default)]
    book: Option<i64>,
    min: Option<i64>,
    max: Option<i64>,
    avg_characters: Option<f64>,
    stdev: Option<f64>,
}

impl RawStatisticsRow {
    fn into_statistics(self) -> Option<DegreeStatistics> {
        Some(DegreeStatistics {
            min: self.min?,
            max: self.max?,
            avg_characters: self.avg_characters?,
            stdev: self.stdev.unwrap_or(0.0),
        })
    }

    fn into_book_statistics(self) -> Option<BookDegreeStatistics> {
        let book = self.book;
        self.into_statistics().map(|s| BookDegreeStatistics {
            book,
            min: s.min,
            max: s.max,
            avg_characters: s.avg_characters,
            stdev: s.stdev,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub characters: i64,
    pub interactions: i64,
}

impl Neo4jConnection {
    async fn fetch_count(&self, cypher: &str) -> Result<i64> {
        let row: Option<CountRow> = self.run_query_single(query(cypher)).await?;
        Ok(row.map(|r| r.count).unwrap_or(0))
    }

    pub async fn count_characters(&self) -> Result<i64> {
        self.fetch_count(COUNT_CHARACTERS).await
    }

    pub async fn count_interactions(&self) -> Result<i64> {
        self.fetch_count(COUNT_INTERACTIONS).await
    }

    pub async fn count_interactions_by_book(&self) -> Result<Vec<BookInteractionCount>> {
        self.run_query(query(COUNT_INTERACTIONS_BY_BOOK)).await
    }

    pub async fn network_summary_statistics(&self) -> Result<Option<DegreeStatistics>> {
        let row: Option<RawStatisticsRow> = self
            .run_query_single(query(NETWORK_SUMMARY_STATISTICS))
            .await?;
        Ok(row.and_then(RawStatisticsRow::into_statistics))
    }

    pub async fn network_summary_statistics_by_book(&self) -> Result<Vec<BookDegreeStatistics>> {
        let rows: Vec<RawStatisticsRow> = self
            .run_query(query(NETWORK_SUMMARY_STATISTICS_BY_BOOK))
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(RawStatisticsRow::into_book_statistics)
            .collect())
    }

    pub async fn get_stats(&self) -> Result<GraphStats> {
        Ok(GraphStats {
            characters: self.count_characters().await?,
            interactions: self.count_interactions().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(min: Option<i64>, avg: Option<f64>, stdev: Option<f64>) -> RawStatisticsRow {
        RawStatisticsRow {
            book: Some(2),
            min,
            max: min.map(|m| m + 10),
            avg_characters: avg,
            stdev,
        }
    }

    #[test]
    fn test_empty_aggregate_has_no_statistics() {
        assert_eq!(raw(None, None, Some(0.0)).into_statistics(), None);
    }

    #[test]
    fn test_statistics_from_row() {
        let stats = raw(Some(1), Some(4.5), Some(2.25)).into_statistics().unwrap();
        assert_eq!(stats.min, 1);
        assert_eq!(stats.max, 11);
        assert_eq!(stats.avg_characters, 4.5);
        assert_eq!(stats.stdev, 2.25);
    }

    #[test]
    fn test_book_statistics_keep_book() {
        let stats = raw(Some(3), Some(5.0), None).into_book_statistics().unwrap();
        assert_eq!(stats.book, Some(2));
        assert_eq!(stats.stdev, 0.0);
    }

    #[test]
    fn test_rows_deserialize_from_aliases() {
        let row: RawStatisticsRow = serde_json::from_str(
            r#"{"min": 1, "max": 122, "avg_characters": 6.57, "stdev": 10.4}"#,
        )
        .unwrap();
        assert_eq!(row.book, None);
        assert_eq!(row.max, Some(122));

        let by_book: BookInteractionCount =
            serde_json::from_str(r#"{"book": null, "interaction_count": 12}"#).unwrap();
        assert_eq!(by_book.book, None);
        assert_eq!(by_book.interaction_count, 12);
    }

    #[test]
    fn test_graph_stats_json() {
        let stats = GraphStats { characters: 796, interactions: 2823 };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json, serde_json::json!({ "characters": 796, "interactions": 2823 }));
    }

    #[test]
    fn test_queries_order_by_book() {
        assert!(COUNT_INTERACTIONS_BY_BOOK.ends_with("ORDER BY book"));
        assert!(NETWORK_SUMMARY_STATISTICS_BY_BOOK.ends_with("ORDER BY book"));
        assert!(NETWORK_SUMMARY_STATISTICS.contains("stdev(num) AS stdev"));
    }
}
