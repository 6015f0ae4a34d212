use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Node count of the reference character network.
pub const REFERENCE_NODE_COUNT: i64 = 796;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub database: Option<String>,
    pub max_connections: usize,
    pub fetch_size: usize,
    pub expected_node_count: i64,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            database: None,
            max_connections: 16,
            fetch_size: 200,
            expected_node_count: REFERENCE_NODE_COUNT,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 5000,
        }
    }
}

impl Neo4jConfig {
    /// Defaults overlaid with `NEO4J_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(uri) = lookup("NEO4J_URI") {
            config.uri = uri;
        }
        if let Some(user) = lookup("NEO4J_USER") {
            config.user = user;
        }
        if let Some(password) = lookup("NEO4J_PASSWORD") {
            config.password = password;
        }
        if let Some(database) = lookup("NEO4J_DATABASE").filter(|db| !db.is_empty()) {
            config.database = Some(database);
        }
        if let Some(value) = lookup("NEO4J_MAX_CONNECTIONS") {
            config.max_connections = parse_var("NEO4J_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = lookup("NEO4J_FETCH_SIZE") {
            config.fetch_size = parse_var("NEO4J_FETCH_SIZE", &value)?;
        }
        if let Some(value) = lookup("NEO4J_EXPECTED_NODES") {
            config.expected_node_count = parse_var("NEO4J_EXPECTED_NODES", &value)?;
        }
        if let Some(value) = lookup("NEO4J_CONNECT_RETRIES") {
            config.retry.max_retries = parse_var("NEO4J_CONNECT_RETRIES", &value)?;
        }

        Ok(config)
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = Neo4jConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.user, "neo4j");
        assert_eq!(config.password, "password");
        assert_eq!(config.database, None);
        assert_eq!(config.expected_node_count, 796);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_env_overlay() {
        let config = Neo4jConfig::from_lookup(lookup_from(&[
            ("NEO4J_URI", "neo4j://db.internal:7687"),
            ("NEO4J_PASSWORD", "s3cret"),
            ("NEO4J_DATABASE", "got"),
            ("NEO4J_EXPECTED_NODES", " 107 "),
            ("NEO4J_MAX_CONNECTIONS", "4"),
        ]))
        .unwrap();

        assert_eq!(config.uri, "neo4j://db.internal:7687");
        assert_eq!(config.user, "neo4j");
        assert_eq!(config.password, "s3cret");
        assert_eq!(config.database.as_deref(), Some("got"));
        assert_eq!(config.expected_node_count, 107);
        assert_eq!(config.max_connections, 4);
    }

    #[test]
    fn test_empty_database_is_ignored() {
        let config = Neo4jConfig::from_lookup(lookup_from(&[("NEO4J_DATABASE", "")])).unwrap();
        assert_eq!(config.database, None);
    }

    #[test]
    fn test_bad_number_names_variable() {
        let err = Neo4jConfig::from_lookup(lookup_from(&[("NEO4J_MAX_CONNECTIONS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("NEO4J_MAX_CONNECTIONS"));
    }

    #[test]
    fn test_password_not_serialized() {
        let json = serde_json::to_string(&Neo4jConfig::default()).unwrap();
        assert!(!json.contains("password\":"));
        assert!(json.contains("bolt://localhost:7687"));
    }
}
