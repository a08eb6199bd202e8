//! Axobase Evolutionary Genome & Decision Engine (EGDE).
//!
//! This crate is the deterministic core described in the specification: a
//! variable-length genome, an expression engine that turns a genome plus an
//! environmental snapshot into numeric traits and a metabolic cost, a
//! breeding pipeline of genetic operators, an epigenetic layer, an
//! adaptive-rate controller, a strategy filter, a decision engine, a
//! per-agent survival loop, and an evolution coordinator. Everything this
//! core needs from the surrounding system (wallets, an LLM provider,
//! messaging, permanent storage, a ledger) is reached through the narrow
//! port traits in [`ports`]; no concrete integration lives in this crate.

pub mod cache;
pub mod chromosome;
pub mod cli;
pub mod config;
pub mod decision;
pub mod epigenetics;
pub mod error;
pub mod evolution;
pub mod expression;
pub mod gene;
pub mod genome;
pub mod operators;
pub mod ports;
pub mod rates;
pub mod regulatory;
pub mod rng;
pub mod seed;
pub mod strategy;
pub mod survival;

pub mod prelude {
    pub use crate::cache::{CacheKey, CacheStats, ExpressionCache, InvalidateFilter};
    pub use crate::chromosome::Chromosome;
    pub use crate::config::EgdeConfig;
    pub use crate::decision::{Decision, DecisionEngine};
    pub use crate::epigenetics::{update_epigenome, EnvironmentalState, Mode};
    pub use crate::error::{EgdeError, EgdeResult};
    pub use crate::evolution::{execute_breeding, generate_mating_signal, CooperationLedger};
    pub use crate::expression::{express_genome, ExpressionResult};
    pub use crate::gene::{Domain, Gene};
    pub use crate::genome::{DynamicGenome, GenomeRecord};
    pub use crate::operators::{breed, horizontal_gene_transfer, BreedingContext, BreedingResult};
    pub use crate::ports::{LedgerPort, LlmPort, MessagingPort, PermanentStoragePort, WalletPort};
    pub use crate::rates::calculate_adaptive_rates;
    pub use crate::rng::{ChaChaRng, EgdeRng};
    pub use crate::seed::{create_genesis_genome, create_genesis_genome_at};
    pub use crate::strategy::{filter_strategies, FilterInput};
    pub use crate::survival::{Agent, AgentPorts};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
