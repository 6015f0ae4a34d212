use clap::{Parser, Subcommand};

/// Counts, degree statistics and communities of a character network stored in Neo4j
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Bolt URI, overrides NEO4J_URI
    #[arg(long, global = true)]
    pub uri: Option<String>,

    /// Expected node count for `verify`, overrides NEO4J_EXPECTED_NODES
    #[arg(long, global = true)]
    pub expected_nodes: Option<i64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the database answers and holds the expected number of nodes
    Verify,

    /// Count Character nodes
    Characters,

    /// Count interactions (relationships)
    Interactions {
        /// Break the count down per book
        #[arg(long)]
        by_book: bool,
    },

    /// Degree statistics of characters (min, max, mean, standard deviation)
    Stats {
        /// Compute the statistics per book
        #[arg(long)]
        by_book: bool,
    },

    /// Run Louvain community detection and print community sizes
    Communities {
        /// Seed for the node visiting order
        #[arg(long, env = "LOUVAIN_SEED")]
        seed: Option<u64>,
    },

    /// Print the members and edges of the largest community
    Largest {
        /// Seed for the node visiting order
        #[arg(long, env = "LOUVAIN_SEED")]
        seed: Option<u64>,
    },
}
