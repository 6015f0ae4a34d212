//! Checks against a running Neo4j loaded with the reference character network.
//! Run with `cargo test -p store -- --ignored`.

use serde::Deserialize;
use store::{Neo4jConfig, Neo4jConnection, query};

#[derive(Deserialize)]
struct Count {
    count: i64,
}

async fn connect() -> Neo4jConnection {
    let config = Neo4jConfig::from_env().expect("invalid NEO4J_* environment");
    Neo4jConnection::connect(&config)
        .await
        .expect("Neo4j must be running for ignored tests")
}

#[tokio::test]
#[ignore]
async fn verify_connection_matches_reference_node_count() {
    let conn = connect().await;
    assert!(conn.verify_connection().await);
}

#[tokio::test]
#[ignore]
async fn count_characters_matches_database() {
    let conn = connect().await;

    let expected: Vec<Count> = conn
        .run_query(query("MATCH (c:Character) RETURN count(c) AS count"))
        .await
        .unwrap();
    let count = conn.count_characters().await.unwrap();

    assert_eq!(expected[0].count, count);
}

#[tokio::test]
#[ignore]
async fn interactions_by_book_sum_to_total() {
    let conn = connect().await;

    let total = conn.count_interactions().await.unwrap();
    let by_book = conn.count_interactions_by_book().await.unwrap();

    assert_eq!(by_book.iter().map(|b| b.interaction_count).sum::<i64>(), total);
    // ORDER BY puts null books last
    let key = |book: Option<i64>| (book.is_none(), book.unwrap_or_default());
    assert!(by_book.windows(2).all(|w| key(w[0].book) <= key(w[1].book)));
}

#[tokio::test]
#[ignore]
async fn summary_statistics_are_consistent() {
    let conn = connect().await;

    let stats = conn.network_summary_statistics().await.unwrap().unwrap();
    assert!(stats.min <= stats.max);
    assert!(stats.avg_characters >= stats.min as f64);
    assert!(stats.avg_characters <= stats.max as f64);
}

#[tokio::test]
#[ignore]
async fn wrong_expected_count_fails_verification() {
    let conn = connect().await;
    let other = Neo4jConnection::from_graph(conn.graph().clone(), -1);
    assert!(!other.verify_connection().await);
}
