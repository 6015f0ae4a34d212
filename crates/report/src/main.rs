mod cli;
mod output;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};
use communities::{CharacterGraph, CommunityDetector, LouvainDetector, print_community_sizes};
use store::{Neo4jConfig, Neo4jConnection};

#[derive(Serialize)]
struct GraphJson<'a> {
    nodes: Vec<&'a str>,
    edges: Vec<EdgeJson<'a>>,
}

#[derive(Serialize)]
struct EdgeJson<'a> {
    source: &'a str,
    target: &'a str,
    weight: f64,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();

    // Logs go to stderr; stdout carries results
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Neo4jConfig::from_env()?;
    if let Some(uri) = &cli.uri {
        config.uri = uri.clone();
    }
    if let Some(expected) = cli.expected_nodes {
        config.expected_node_count = expected;
    }

    let conn = Neo4jConnection::connect(&config).await?;
    let code = run(&cli, &conn).await;
    conn.close();
    code
}

async fn run(cli: &Cli, conn: &Neo4jConnection) -> Result<ExitCode> {
    match &cli.command {
        Commands::Verify => {
            let verified = conn.verify_connection().await;
            if cli.json {
                print_json(&serde_json::json!({ "verified": verified }))?;
            } else if verified {
                println!("Connection verified");
            } else {
                println!("Connection verification failed");
            }
            return Ok(if verified { ExitCode::SUCCESS } else { ExitCode::FAILURE });
        }
        Commands::Characters => {
            let count = conn.count_characters().await?;
            print_count(cli.json, count)?;
        }
        Commands::Interactions { by_book: false } => {
            let count = conn.count_interactions().await?;
            print_count(cli.json, count)?;
        }
        Commands::Interactions { by_book: true } => {
            let rows = conn.count_interactions_by_book().await?;
            if cli.json {
                print_json(&rows)?;
            } else {
                print!("{}", output::interactions_by_book(&rows));
            }
        }
        Commands::Stats { by_book: false } => {
            let stats = conn.network_summary_statistics().await?;
            if cli.json {
                print_json(&stats)?;
            } else {
                print!("{}", output::statistics(stats.as_ref()));
            }
        }
        Commands::Stats { by_book: true } => {
            let rows = conn.network_summary_statistics_by_book().await?;
            if cli.json {
                print_json(&rows)?;
            } else {
                print!("{}", output::statistics_by_book(&rows));
            }
        }
        Commands::Communities { seed } => {
            let detector = detector(conn, *seed);
            if cli.json {
                print_json(&detector.detect().await?)?;
            } else {
                let (_, communities) = detector.communities().await?;
                print_community_sizes(&communities);
            }
        }
        Commands::Largest { seed } => {
            let subgraph = detector(conn, *seed).subgraph_largest_community().await?;
            info!(
                nodes = subgraph.node_count(),
                edges = subgraph.edge_count(),
                "Largest community"
            );
            if cli.json {
                print_json(&graph_json(&subgraph))?;
            } else {
                print!("{}", output::community_graph(&subgraph));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn detector(conn: &Neo4jConnection, seed: Option<u64>) -> CommunityDetector {
    CommunityDetector::new(conn.clone(), LouvainDetector::new().with_seed(seed))
}

fn print_count(json: bool, count: i64) -> Result<()> {
    if json {
        print_json(&serde_json::json!({ "count": count }))
    } else {
        println!("{}", count);
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn graph_json(graph: &CharacterGraph) -> GraphJson<'_> {
    GraphJson {
        nodes: graph.names().collect(),
        edges: graph
            .edges()
            .map(|(source, target, weight)| EdgeJson { source, target, weight })
            .collect(),
    }
}
