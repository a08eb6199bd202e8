//! Demonstration binary for the Axobase Evolutionary Genome & Decision
//! Engine. Everything here is a thin driver over the public API in
//! [`axobase_egde::prelude`] using in-memory mock ports; it exists to give
//! the core a runnable surface, not as a production front end (the CLI,
//! web UI, and bot front ends named in the specification are explicitly
//! out of scope for this crate).

use std::collections::HashSet;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use axobase_egde::cli::{Cli, Commands};
use axobase_egde::config::EgdeConfig;
use axobase_egde::epigenetics::EnvironmentalState;
use axobase_egde::expression::express_genome;
use axobase_egde::operators::BreedingContext;
use axobase_egde::ports::{MockLedger, MockLlm, MockMessaging, MockPermanentStorage, MockWallet};
use axobase_egde::prelude::*;
use chrono::Utc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("axobase_egde=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = EgdeConfig::default();

    match cli.command {
        Commands::Genesis { lineage } => {
            let genome = create_genesis_genome_at(&lineage, Utc::now().timestamp_millis());
            println!("genesis genome for lineage {lineage:?}");
            println!("  generation:  {}", genome.generation);
            println!("  chromosomes: {}", genome.chromosomes.len());
            println!("  total genes: {}", genome.total_gene_count());
            println!("  reg. edges:  {}", genome.regulatory_edges.len());
            println!("  hash:        {}", genome.hash_hex());
            for chr in &genome.chromosomes {
                println!("    - {:<24} essential={:<5} genes={}", chr.name, chr.is_essential, chr.len());
            }
        }

        Commands::Express { lineage, balance, days_starving } => {
            let genome = create_genesis_genome_at(&lineage, Utc::now().timestamp_millis());
            let env = EnvironmentalState {
                balance,
                days_starving,
                days_thriving: if days_starving > 0.0 { 0.0 } else { 10.0 },
                ..EnvironmentalState::default()
            };
            let result = express_genome(&genome, &env, 40.0, 0.0, &[], config.expression);
            println!("expression result for lineage {lineage:?} (balance={balance}, days_starving={days_starving})");
            println!("  total genes:    {}", result.stats.total_genes);
            println!("  active genes:   {}", result.stats.active_genes);
            println!("  silenced genes: {}", result.stats.silenced_genes);
            println!("  metabolic cost: {:.6}", result.total_metabolic_cost);
            if !result.warnings.is_empty() {
                println!("  warnings:");
                for warning in &result.warnings {
                    println!("    - {warning:?}");
                }
            }
        }

        Commands::Breed { lineage_a, lineage_b, seed } => {
            let now = Utc::now().timestamp_millis();
            let parent_a = create_genesis_genome_at(&lineage_a, now);
            let parent_b = create_genesis_genome_at(&lineage_b, now);
            let mut rng = ChaChaRng::from_seed_u64(seed);
            let ctx = BreedingContext {
                parent_a_id: lineage_a.clone(),
                parent_b_id: lineage_b.clone(),
                environmental_stress: 0.2,
                starvation_mode: false,
            };
            match execute_breeding(&parent_a, &parent_b, &ctx, &config, &mut rng) {
                Ok(result) => {
                    println!("bred {lineage_a:?} x {lineage_b:?} (seed={seed})");
                    println!("  child generation: {}", result.child_genome.generation);
                    println!("  child genes:      {}", result.child_genome.total_gene_count());
                    println!("  child hash:        {}", result.child_genome.hash_hex());
                    println!("  mutations:        {}", result.mutations.len());
                    println!("  crossover events: {}", result.crossover_events.len());
                    println!("  structural vars:  {}", result.structural_variations.len());
                    println!("  gene conversions: {}", result.gene_conversions.len());
                }
                Err(err) => println!("breeding refused: {err}"),
            }
        }

        Commands::Simulate { cycles, starting_balance, seed } => {
            info!(cycles, starting_balance, seed, "starting in-process survival simulation");
            let mut rng = ChaChaRng::from_seed_u64(seed);
            let available_tools: HashSet<String> =
                ["messaging", "permanent-storage", "wallet", "llm-local", "llm-premium"].iter().map(|s| s.to_string()).collect();

            let mut agent = Agent {
                id: "demo-agent".to_string(),
                genome: create_genesis_genome_at("demo-agent", Utc::now().timestamp_millis()),
                cache: ExpressionCache::new(config.cache),
                decision_engine: DecisionEngine::new(config.decision),
                ports: AgentPorts {
                    wallet: Arc::new(MockWallet::new(starting_balance, 1.0)),
                    llm: Some(Arc::new(MockLlm::new(None::<String>))),
                    storage: Arc::new(MockPermanentStorage::default()),
                    messaging: Arc::new(MockMessaging::default()),
                    ledger: Arc::new(MockLedger::default()),
                },
                config: config.clone(),
                available_tools,
                age_days: 40.0,
                days_since_last_income: 0.0,
                days_starving: 0.0,
                days_thriving: 0.0,
                days_at_zero_balance: 0.0,
                recent_deception_count: 0.0,
                cooperation_count: 0.0,
                cycles_completed: 0,
                last_inscription_age_days: 0.0,
                thought_log: Vec::new(),
                transaction_log: Vec::new(),
                last_inscription_day: None,
            };

            for cycle in 1..=cycles {
                let now = Utc::now().timestamp_millis();
                let outcome = agent.run_cycle(now, &mut rng).await?;
                println!(
                    "cycle {cycle}: mode={:?} balance={:.2} strategy={} action={:?} confidence={:.2} ({})",
                    outcome.mode,
                    outcome.balance,
                    outcome.decision.strategy_id,
                    outcome.decision.action,
                    outcome.decision.confidence,
                    outcome.dispatch_note
                );
                if !outcome.alive {
                    println!("agent died of sustained insolvency at cycle {cycle}");
                    break;
                }
            }
        }
    }

    Ok(())
}
