//! Command-line surface for the demonstration binary.
//!
//! The CLI is explicitly out of scope for the core per the specification —
//! this module exists only so the `axobase-egde` binary has something to
//! parse when driving the core interactively. It never reaches into the
//! genetic operators or survival loop directly; `main.rs` wires the parsed
//! command into calls against the public API in [`crate::prelude`].

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "axobase-egde")]
#[command(about = "Axobase Evolutionary Genome & Decision Engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a genesis genome and print its hash, gene count, and chromosomes.
    Genesis {
        #[arg(short, long, default_value = "lineage-0")]
        lineage: String,
    },
    /// Express a freshly created genesis genome against a sample environment
    /// and print the resulting stats and metabolic cost.
    Express {
        #[arg(short, long, default_value = "lineage-0")]
        lineage: String,
        #[arg(long, default_value_t = 10.0)]
        balance: f64,
        #[arg(long, default_value_t = 0.0)]
        days_starving: f64,
    },
    /// Breed two genesis genomes (seeded deterministically) and print the
    /// child's generation, gene count, and mutation log.
    Breed {
        #[arg(long, default_value = "parent-a")]
        lineage_a: String,
        #[arg(long, default_value = "parent-b")]
        lineage_b: String,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
    /// Run an in-process agent against mock ports for a handful of survival
    /// cycles and print the decision made each cycle.
    Simulate {
        #[arg(short, long, default_value_t = 5)]
        cycles: u32,
        #[arg(long, default_value_t = 20.0)]
        starting_balance: f64,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
}
