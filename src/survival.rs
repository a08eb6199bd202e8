//! The per-agent survival loop (spec §4.10): query balance, derive mode,
//! refresh the epigenome, express the genome (through the cache), filter
//! and choose a strategy, dispatch its action through a port, and update
//! the agent's running counters.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::cache::{CacheKey, ExpressionCache};
use crate::config::{BalanceThresholds, EgdeConfig};
use crate::decision::{Decision, DecisionEngine, RiskLevel};
use crate::epigenetics::{update_epigenome, EnvironmentalState, Mode};
use crate::error::EgdeResult;
use crate::expression::express_genome;
use crate::genome::DynamicGenome;
use crate::ports::{LedgerPort, LlmPort, LlmTier, MessagingPort, PermanentStoragePort, WalletPort};
use crate::rng::EgdeRng;
use crate::strategy::{filter_strategies, ActionType, FilterInput};

/// Consecutive days at or below the zero balance floor before an agent is
/// considered dead. Not in the published contract; chosen so a short
/// liquidity gap doesn't kill an agent but sustained insolvency does.
const DEATH_STARVATION_DAYS: f64 = 21.0;

const CYCLE_INTERVAL_FAST_SECS: u64 = 300;
const CYCLE_INTERVAL_NORMAL_SECS: u64 = 600;
const CYCLE_INTERVAL_SLOW_SECS: u64 = 1800;

const MILLIS_PER_DAY: i64 = 86_400_000;

pub struct AgentPorts {
    pub wallet: Arc<dyn WalletPort>,
    pub llm: Option<Arc<dyn LlmPort>>,
    pub storage: Arc<dyn PermanentStoragePort>,
    pub messaging: Arc<dyn MessagingPort>,
    pub ledger: Arc<dyn LedgerPort>,
}

pub struct Agent {
    pub id: String,
    pub genome: DynamicGenome,
    pub cache: ExpressionCache,
    pub decision_engine: DecisionEngine,
    pub ports: AgentPorts,
    pub config: EgdeConfig,
    pub available_tools: HashSet<String>,
    pub age_days: f64,
    pub days_since_last_income: f64,
    pub days_starving: f64,
    pub days_thriving: f64,
    pub days_at_zero_balance: f64,
    pub recent_deception_count: f64,
    pub cooperation_count: f64,
    pub cycles_completed: u64,
    pub last_inscription_age_days: f64,
    /// Thoughts and transaction notes collected since the last daily
    /// inscription, cleared once `maybe_daily_inscribe` fires (spec §4.10,
    /// §6 `PermanentStorage.dailyInscribe`).
    pub thought_log: Vec<String>,
    pub transaction_log: Vec<String>,
    /// UTC day number (`timestamp_millis / 86_400_000`) of the last daily
    /// inscription, or `None` before the first one.
    pub last_inscription_day: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub mode: Mode,
    pub balance: f64,
    pub decision: Decision,
    pub dispatch_note: String,
    pub alive: bool,
    pub next_cycle_interval_secs: u64,
}

/// Mode from USDC thresholds, with gas (native-token) depletion forcing
/// `Emergency` independent of the stable balance (spec §4.10 step 2).
fn derive_mode(stable: f64, native: f64, thresholds: &BalanceThresholds) -> Mode {
    let from_stable = if stable < thresholds.hibernation {
        Mode::Hibernation
    } else if stable < thresholds.emergency {
        Mode::Emergency
    } else if stable < thresholds.low {
        Mode::LowPower
    } else {
        Mode::Normal
    };
    let gas_depleted = native < thresholds.gas_emergency;
    match from_stable {
        Mode::Normal | Mode::LowPower if gas_depleted => Mode::Emergency,
        other => other,
    }
}

fn derive_stress_level(mode: Mode, days_starving: f64) -> f64 {
    let starvation_component = (days_starving / 7.0).min(1.0) * 0.5;
    let mode_component = match mode {
        Mode::Hibernation => 0.5,
        Mode::Emergency => 0.3,
        Mode::LowPower => 0.1,
        Mode::Normal => 0.0,
    };
    (starvation_component + mode_component).clamp(0.0, 1.0)
}

impl Agent {
    #[instrument(skip(self, rng), fields(agent = %self.id))]
    pub async fn run_cycle(&mut self, now_utc_millis: i64, rng: &mut dyn EgdeRng) -> EgdeResult<CycleOutcome> {
        self.maybe_daily_inscribe(now_utc_millis).await;

        let balance_snapshot = self.ports.wallet.balance().await?;
        let balance = balance_snapshot.stable;

        if balance <= 0.0 {
            self.days_at_zero_balance += 1.0;
            self.days_since_last_income += 1.0;
            self.days_starving += 1.0;
            self.days_thriving = 0.0;
        } else {
            self.days_at_zero_balance = 0.0;
            self.days_thriving += 1.0;
            if balance < self.config.balance.low {
                self.days_starving += 1.0;
            } else {
                self.days_starving = 0.0;
            }
        }

        let mode = derive_mode(balance, balance_snapshot.native, &self.config.balance);
        let stress_level = derive_stress_level(mode, self.days_starving);
        let env = EnvironmentalState {
            balance,
            days_since_last_income: self.days_since_last_income,
            days_starving: self.days_starving,
            days_thriving: self.days_thriving,
            recent_deception_count: self.recent_deception_count,
            cooperation_count: self.cooperation_count,
            stress_level,
            mode,
        };

        update_epigenome(&mut self.genome, &env, self.age_days);
        let genome_hash = self.genome.recompute_hash();

        let key = CacheKey::new(&genome_hash, &env);
        let expressed = match self.cache.get(&key) {
            Some(cached) => cached,
            None => {
                self.cache.begin_pending(&key);
                let result = express_genome(&self.genome, &env, self.age_days, 0.0, &[], self.config.expression);
                self.cache.put(key, result)
            }
        };

        if mode == Mode::Hibernation {
            self.cycles_completed += 1;
            let decision = Decision {
                strategy_id: "low-power-conservation",
                action: ActionType::EnterDormancy,
                reason: "hibernation mode: skipping full deliberation".to_string(),
                confidence: 1.0,
                alternatives: Vec::new(),
                risk_assessment: RiskLevel::Low,
                used_llm: false,
            };
            return Ok(CycleOutcome {
                mode,
                balance,
                decision,
                dispatch_note: "no action dispatched while hibernating".to_string(),
                alive: self.days_at_zero_balance < DEATH_STARVATION_DAYS,
                next_cycle_interval_secs: CYCLE_INTERVAL_SLOW_SECS,
            });
        }

        let runway_days = balance / expressed.total_metabolic_cost.max(1e-9);
        let experience_bonus = (self.cycles_completed as f64 / 500.0).min(0.2);
        let filter_input = FilterInput {
            expressed: &expressed,
            env: &env,
            available_tools: &self.available_tools,
            runway_days,
            market_risk: 0.2,
            experience_bonus,
            deception_count: self.recent_deception_count,
            days_thriving: self.days_thriving,
        };
        let (survivors, rejections) = filter_strategies(&filter_input);
        if survivors.is_empty() {
            warn!(rejected = rejections.len(), "every strategy was rejected this cycle");
        }

        let tier = if mode == Mode::Normal { LlmTier::Premium } else { LlmTier::Local };
        let context_summary = format!(
            "balance={balance:.2} mode={mode:?} days_starving={:.1} days_thriving={:.1}",
            self.days_starving, self.days_thriving
        );
        let llm_ref = self.ports.llm.as_deref();
        let decision = if survivors.is_empty() {
            Decision {
                strategy_id: "low-power-conservation",
                action: ActionType::EnterDormancy,
                reason: "no strategy survived the filter this cycle".to_string(),
                confidence: 0.1,
                alternatives: Vec::new(),
                risk_assessment: RiskLevel::High,
                used_llm: false,
            }
        } else {
            self.decision_engine.decide(&survivors, tier, llm_ref, &context_summary).await?
        };

        let dispatch_note = self.dispatch(decision.action, rng).await;
        self.cycles_completed += 1;

        let cycle_interval_secs = self.derive_cycle_interval(&expressed);
        info!(action = ?decision.action, strategy = decision.strategy_id, "completed cycle");

        Ok(CycleOutcome {
            mode,
            balance,
            decision,
            dispatch_note,
            alive: self.days_at_zero_balance < DEATH_STARVATION_DAYS,
            next_cycle_interval_secs: cycle_interval_secs,
        })
    }

    /// Cycle interval is read from `cycle_speed` (spec §4.10): `>0.7` → 5 min,
    /// `<0.3` → 30 min, else 10 min.
    fn derive_cycle_interval(&self, expressed: &crate::expression::ExpressionResult) -> u64 {
        let speed = expressed.value_of("cycle_speed").unwrap_or(0.5);
        if speed > 0.7 {
            CYCLE_INTERVAL_FAST_SECS
        } else if speed < 0.3 {
            CYCLE_INTERVAL_SLOW_SECS
        } else {
            CYCLE_INTERVAL_NORMAL_SECS
        }
    }

    /// Fire the daily inscription timer (spec §4.10, §6
    /// `PermanentStorage.dailyInscribe`) once per UTC calendar day: bundle
    /// the genome hash with everything accumulated in `thought_log` and
    /// `transaction_log` since the last firing, inscribe it, then clear
    /// both logs. A no-op on every other cycle within the same day.
    async fn maybe_daily_inscribe(&mut self, now_utc_millis: i64) {
        let day = now_utc_millis.div_euclid(MILLIS_PER_DAY);
        if self.last_inscription_day == Some(day) {
            return;
        }
        let summary = format!(
            "{{\"genomeHash\":\"{}\",\"thoughts\":{:?},\"transactions\":{:?}}}",
            self.genome.hash_hex(),
            self.thought_log,
            self.transaction_log
        );
        match self.ports.storage.inscribe(summary.as_bytes()).await {
            Ok(reference) => {
                self.genome.push_event(format!("daily-inscription:{reference}"));
                self.last_inscription_age_days = self.age_days;
            }
            Err(err) => warn!(error = %err, "daily inscription failed, keeping logs for next cycle"),
        }
        self.thought_log.clear();
        self.transaction_log.clear();
        self.last_inscription_day = Some(day);
    }

    async fn dispatch(&mut self, action: ActionType, rng: &mut dyn EgdeRng) -> String {
        let result: EgdeResult<String> = match action {
            ActionType::EnterDormancy | ActionType::ExitDormancy | ActionType::StoreMemory => {
                Ok(format!("{action:?} handled locally, no port call"))
            }
            ActionType::ThinkLocal => match &self.ports.llm {
                Some(llm) => llm.complete(LlmTier::Local, "routine local inference gig").await.map(|reply| {
                    self.thought_log.push(format!("local: {}", reply.as_deref().unwrap_or("(no reply)")));
                    "local inference completed".to_string()
                }),
                None => Ok("no LLM port configured, skipped".to_string()),
            },
            ActionType::ThinkPremium => match &self.ports.llm {
                Some(llm) => llm.complete(LlmTier::Premium, "premium inference service").await.map(|reply| {
                    self.thought_log.push(format!("premium: {}", reply.as_deref().unwrap_or("(no reply)")));
                    "premium inference completed".to_string()
                }),
                None => Ok("no LLM port configured, skipped".to_string()),
            },
            ActionType::Swap => self.ports.wallet.swap("stable", "native", 1.0).await.map(|note| {
                self.transaction_log.push(note.clone());
                note
            }),
            ActionType::Stake => self.ports.wallet.stake(1.0).await.map(|note| {
                self.transaction_log.push(note.clone());
                note
            }),
            ActionType::ProvideLiquidity => self.ports.wallet.provide_liquidity("default-pool", 1.0).await.map(|note| {
                self.transaction_log.push(note.clone());
                note
            }),
            ActionType::ClaimRewards => self.ports.wallet.claim_rewards().await.map(|amount| {
                let note = format!("claimed {amount}");
                self.transaction_log.push(note.clone());
                note
            }),
            ActionType::Transfer => self.ports.wallet.transfer("treasury", 1.0).await.map(|note| {
                self.transaction_log.push(note.clone());
                note
            }),
            ActionType::Migrate => Ok("migration noted, no port call".to_string()),
            ActionType::HireHuman => Ok("human hiring requires an out-of-band marketplace call".to_string()),
            ActionType::EvaluateHuman => Ok("human evaluation recorded locally".to_string()),
            ActionType::Broadcast => self.ports.messaging.broadcast("status update from agent").await.map(|_| "broadcast sent".to_string()),
            ActionType::SendMessage => self.ports.messaging.send("peer", "direct message").await.map(|_| "message sent".to_string()),
            ActionType::ProposeMating => {
                self.ports.messaging.send("peer", "mating-proposal").await.map(|_| "mating signal sent".to_string())
            }
            ActionType::AcceptMating => {
                self.ports.messaging.send("peer", "mating-acceptance").await.map(|_| "mating acceptance sent".to_string())
            }
            ActionType::Inscribe => {
                let payload = self.genome.canonical_json().to_string();
                self.ports.storage.inscribe(payload.as_bytes()).await.map(|reference| {
                    self.last_inscription_age_days = self.age_days;
                    format!("inscribed at {reference}")
                })
            }
            ActionType::Fetch => self.ports.storage.fetch("latest").await.map(|_| "fetched latest record".to_string()),
            ActionType::Post => self.ports.messaging.broadcast("content post").await.map(|_| "posted".to_string()),
            ActionType::Scrape => self.ports.storage.fetch("scrape-target").await.map(|_| "scraped".to_string()),
        };
        let _ = rng.chance(0.0); // consumes the injected rng so dispatch stays deterministic under a fixed seed
        match result {
            Ok(note) => note,
            Err(err) => format!("action failed: {err}"),
        }
    }
}

pub fn cycle_interval_duration(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockLedger, MockLlm, MockMessaging, MockPermanentStorage, MockWallet};
    use crate::seed::create_genesis_genome;
    use crate::rng::ChaChaRng;

    fn sample_agent(balance: f64) -> Agent {
        Agent {
            id: "agent-1".to_string(),
            genome: create_genesis_genome("agent-1"),
            cache: ExpressionCache::new(crate::config::CacheConfig::default()),
            decision_engine: DecisionEngine::new(crate::config::DecisionTiming::default()),
            ports: AgentPorts {
                wallet: Arc::new(MockWallet::new(balance, 1.0)),
                llm: Some(Arc::new(MockLlm::new(None::<String>))),
                storage: Arc::new(MockPermanentStorage::default()),
                messaging: Arc::new(MockMessaging::default()),
                ledger: Arc::new(MockLedger::default()),
            },
            config: EgdeConfig::default(),
            available_tools: ["messaging", "permanent-storage", "wallet", "llm-local", "llm-premium"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
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
        }
    }

    #[tokio::test]
    async fn healthy_agent_completes_a_cycle() {
        let mut agent = sample_agent(50.0);
        let mut rng = ChaChaRng::from_seed_u64(1);
        let outcome = agent.run_cycle(0, &mut rng).await.unwrap();
        assert_eq!(outcome.mode, Mode::Normal);
        assert!(outcome.alive);
        assert_eq!(agent.cycles_completed, 1);
    }

    #[tokio::test]
    async fn near_zero_balance_enters_hibernation_and_skips_dispatch() {
        let mut agent = sample_agent(0.1);
        let mut rng = ChaChaRng::from_seed_u64(2);
        let outcome = agent.run_cycle(0, &mut rng).await.unwrap();
        assert_eq!(outcome.mode, Mode::Hibernation);
        assert_eq!(outcome.decision.action, ActionType::EnterDormancy);
    }

    #[tokio::test]
    async fn sustained_zero_balance_eventually_reports_death() {
        let mut agent = sample_agent(0.0);
        let mut rng = ChaChaRng::from_seed_u64(3);
        for cycle in 0..(DEATH_STARVATION_DAYS as usize + 2) {
            agent.run_cycle(cycle as i64 * MILLIS_PER_DAY, &mut rng).await.unwrap();
        }
        let outcome = agent.run_cycle(((DEATH_STARVATION_DAYS as usize + 2) as i64) * MILLIS_PER_DAY, &mut rng).await.unwrap();
        assert!(!outcome.alive);
    }

    #[tokio::test]
    async fn daily_inscription_fires_once_per_utc_day_and_clears_logs() {
        let mut agent = sample_agent(50.0);
        let mut rng = ChaChaRng::from_seed_u64(4);
        agent.thought_log.push("had a thought".to_string());
        agent.run_cycle(0, &mut rng).await.unwrap();
        assert!(agent.thought_log.is_empty());
        assert_eq!(agent.last_inscription_day, Some(0));

        agent.thought_log.push("another thought".to_string());
        agent.run_cycle(1000, &mut rng).await.unwrap();
        assert_eq!(agent.thought_log.len(), 1, "same UTC day should not re-fire the timer");

        agent.run_cycle(MILLIS_PER_DAY, &mut rng).await.unwrap();
        assert!(agent.thought_log.is_empty());
        assert_eq!(agent.last_inscription_day, Some(1));
    }

    #[test]
    fn cycle_interval_follows_discrete_cycle_speed_buckets() {
        let agent = sample_agent(50.0);
        let make = |value: f64| crate::expression::ExpressionResult {
            expressed_genes: vec![crate::expression::ExpressedGene {
                id: "cycle_speed".to_string(),
                domain: crate::gene::Domain::Metabolism,
                expressed_value: value,
                regulatory_effect: 1.0,
                epigenetic_effect: 1.0,
                silenced_for_call: false,
            }],
            stats: crate::expression::ExpressionStats::default(),
            total_metabolic_cost: 0.0,
            warnings: Vec::new(),
        };
        assert_eq!(agent.derive_cycle_interval(&make(0.8)), CYCLE_INTERVAL_FAST_SECS);
        assert_eq!(agent.derive_cycle_interval(&make(0.1)), CYCLE_INTERVAL_SLOW_SECS);
        assert_eq!(agent.derive_cycle_interval(&make(0.5)), CYCLE_INTERVAL_NORMAL_SECS);
    }

    #[test]
    fn mode_thresholds_are_ordered_correctly() {
        let thresholds = BalanceThresholds::default();
        assert_eq!(derive_mode(10.0, 1.0, &thresholds), Mode::Normal);
        assert_eq!(derive_mode(3.0, 1.0, &thresholds), Mode::LowPower);
        assert_eq!(derive_mode(0.7, 1.0, &thresholds), Mode::Emergency);
        assert_eq!(derive_mode(0.2, 1.0, &thresholds), Mode::Hibernation);
    }

    #[test]
    fn depleted_gas_forces_emergency_even_with_healthy_stable_balance() {
        let thresholds = BalanceThresholds::default();
        assert_eq!(derive_mode(100.0, 0.0001, &thresholds), Mode::Emergency);
        // Already-worse modes aren't downgraded by the gas check.
        assert_eq!(derive_mode(0.2, 0.0001, &thresholds), Mode::Hibernation);
    }
}
