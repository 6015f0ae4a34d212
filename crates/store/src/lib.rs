pub mod config;
pub mod connection;
pub mod queries;
pub mod retry;

pub use config::{Neo4jConfig, RetryConfig, REFERENCE_NODE_COUNT};
pub use connection::{Neo4jConnection, build_graph};
pub use queries::{BookDegreeStatistics, BookInteractionCount, DegreeStatistics, GraphStats};
pub use retry::RetryPolicy;

pub use neo4rs::{Query, query};
