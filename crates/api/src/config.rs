use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use store::Neo4jConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub listen_addr: String,
    pub log_format: LogFormat,
    pub louvain_seed: Option<u64>,
    pub neo4j: Neo4jConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            log_format: LogFormat::Text,
            louvain_seed: None,
            neo4j: Neo4jConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            neo4j: Neo4jConfig::from_lookup(&lookup)?,
            ..Self::default()
        };

        if let Some(addr) = lookup("API_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            config.log_format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "" => LogFormat::Text,
                other => anyhow::bail!("Invalid value for LOG_FORMAT: {:?}", other),
            };
        }
        if let Some(seed) = lookup("LOUVAIN_SEED") {
            config.louvain_seed = Some(
                seed.trim()
                    .parse()
                    .with_context(|| format!("Invalid value for LOUVAIN_SEED: {:?}", seed))?,
            );
        }

        Ok(config)
    }
}
