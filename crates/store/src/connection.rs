use anyhow::{Context, Result};
use neo4rs::{ConfigBuilder, Graph, Query, query};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::Neo4jConfig;
use crate::queries::CountRow;
use crate::retry::RetryPolicy;

const NODE_COUNT_QUERY: &str = "MATCH (n) RETURN count(n) AS count";

/// Build the driver pool. Connections are opened lazily, so this succeeds without a server.
pub async fn build_graph(config: &Neo4jConfig) -> Result<Graph, neo4rs::Error> {
    let mut builder = ConfigBuilder::default()
        .uri(config.uri.as_str())
        .user(config.user.as_str())
        .password(config.password.as_str())
        .fetch_size(config.fetch_size)
        .max_connections(config.max_connections);
    if let Some(database) = &config.database {
        builder = builder.db(database.as_str());
    }
    Graph::connect(builder.build()?).await
}

/// One connection attempt: build the pool and round-trip `RETURN 1`
async fn open_graph(config: &Neo4jConfig) -> Result<Graph, neo4rs::Error> {
    let graph = build_graph(config).await?;
    graph.run(query("RETURN 1")).await?;
    Ok(graph)
}

/// Handle to a Neo4j database. Clones share the same connection pool.
#[derive(Clone)]
pub struct Neo4jConnection {
    graph: Graph,
    expected_node_count: i64,
}

impl Neo4jConnection {
    /// Open the pool and check the server answers, retrying with backoff while it is unreachable
    pub async fn connect(config: &Neo4jConfig) -> Result<Self> {
        let policy = RetryPolicy::from_config(&config.retry);

        let graph = policy
            .retry("neo4j_connect", || open_graph(config))
            .await
            .with_context(|| format!("Failed to connect to Neo4j at {}", config.uri))?;

        info!(uri = %config.uri, user = %config.user, "Connected to Neo4j");

        Ok(Self {
            graph,
            expected_node_count: config.expected_node_count,
        })
    }

    /// Wrap an already opened driver
    pub fn from_graph(graph: Graph, expected_node_count: i64) -> Self {
        Self {
            graph,
            expected_node_count,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn expected_node_count(&self) -> i64 {
        self.expected_node_count
    }

    /// Run a Cypher query and deserialize every returned record into `T`
    pub async fn run_query<T: DeserializeOwned>(&self, query: Query) -> Result<Vec<T>> {
        let mut result = self
            .graph
            .execute(query)
            .await
            .context("Failed to execute Cypher query")?;

        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            rows.push(row.to::<T>().context("Failed to deserialize query row")?);
        }

        debug!(rows = rows.len(), "Query returned");
        Ok(rows)
    }

    /// Like `run_query`, keeping only the first record
    pub async fn run_query_single<T: DeserializeOwned>(&self, query: Query) -> Result<Option<T>> {
        let mut result = self
            .graph
            .execute(query)
            .await
            .context("Failed to execute Cypher query")?;

        match result.next().await? {
            Some(row) => Ok(Some(
                row.to::<T>().context("Failed to deserialize query row")?,
            )),
            None => Ok(None),
        }
    }

    /// Run a statement and discard its result
    pub async fn run(&self, query: Query) -> Result<()> {
        self.graph
            .run(query)
            .await
            .context("Failed to run Cypher statement")
    }

    pub async fn ping(&self) -> Result<()> {
        self.run(query("RETURN 1")).await
    }

    pub async fn count_nodes(&self) -> Result<Option<i64>> {
        let row: Option<CountRow> = self.run_query_single(query(NODE_COUNT_QUERY)).await?;
        Ok(row.map(|r| r.count))
    }

    /// True when the database answers and holds exactly the expected number of nodes.
    /// Any failure is logged and reported as `false`.
    pub async fn verify_connection(&self) -> bool {
        match self.count_nodes().await {
            Ok(Some(count)) if count == self.expected_node_count => true,
            Ok(Some(count)) => {
                warn!(
                    count,
                    expected = self.expected_node_count,
                    "Connection verification failed: unexpected node count"
                );
                false
            }
            Ok(None) => {
                warn!("Connection verification failed: node count query returned no rows");
                false
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Connection verification failed");
                false
            }
        }
    }

    /// Release the pool. Queries need a fresh connection afterwards.
    pub fn close(self) {
        info!("Closing Neo4j connection");
        drop(self.graph);
    }
}
