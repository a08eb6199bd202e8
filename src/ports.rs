//! External-world seams (spec §4.10, §5 "Non-goals"): every side effect an
//! agent can cause goes through one of these traits. The survival loop and
//! decision engine depend on the traits, never on a concrete client, so
//! tests and the demo binary can wire in-memory mocks instead of real
//! chains, LLM providers, or storage backends.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::EgdeResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Balance {
    pub stable: f64,
    pub native: f64,
}

#[async_trait]
pub trait WalletPort: Send + Sync {
    async fn balance(&self) -> EgdeResult<Balance>;
    async fn transfer(&self, to: &str, amount: f64) -> EgdeResult<String>;
    async fn swap(&self, from_asset: &str, to_asset: &str, amount: f64) -> EgdeResult<String>;
    async fn stake(&self, amount: f64) -> EgdeResult<String>;
    async fn provide_liquidity(&self, pool: &str, amount: f64) -> EgdeResult<String>;
    async fn claim_rewards(&self) -> EgdeResult<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmTier {
    Local,
    Premium,
}

#[async_trait]
pub trait LlmPort: Send + Sync {
    /// `None` on a model refusal or empty completion; callers treat that the
    /// same as a timeout (fall back to the rule-based default).
    async fn complete(&self, tier: LlmTier, prompt: &str) -> EgdeResult<Option<String>>;
}

#[async_trait]
pub trait PermanentStoragePort: Send + Sync {
    async fn inscribe(&self, data: &[u8]) -> EgdeResult<String>;
    async fn fetch(&self, reference: &str) -> EgdeResult<Vec<u8>>;
}

#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send(&self, to: &str, payload: &str) -> EgdeResult<()>;
    async fn broadcast(&self, payload: &str) -> EgdeResult<()>;
    /// Drains and returns messages addressed to `agent_id` since the last
    /// call.
    async fn inbox(&self, agent_id: &str) -> EgdeResult<Vec<(String, String)>>;
}

#[async_trait]
pub trait LedgerPort: Send + Sync {
    async fn record_cooperation(&self, agent_a: &str, agent_b: &str, outcome: f64) -> EgdeResult<()>;
    async fn cooperation_history(&self, agent_a: &str, agent_b: &str) -> EgdeResult<Vec<f64>>;
}

/// An in-memory [`WalletPort`] for tests and the demo binary: balances live
/// in a mutex-guarded map, every action is logged but never touches a real
/// chain.
pub struct MockWallet {
    stable: Mutex<f64>,
    native: Mutex<f64>,
}

impl MockWallet {
    pub fn new(stable: f64, native: f64) -> Self {
        Self { stable: Mutex::new(stable), native: Mutex::new(native) }
    }
}

#[async_trait]
impl WalletPort for MockWallet {
    async fn balance(&self) -> EgdeResult<Balance> {
        Ok(Balance { stable: *self.stable.lock().unwrap(), native: *self.native.lock().unwrap() })
    }

    async fn transfer(&self, _to: &str, amount: f64) -> EgdeResult<String> {
        *self.stable.lock().unwrap() -= amount;
        Ok(format!("mock-transfer-{amount}"))
    }

    async fn swap(&self, _from_asset: &str, _to_asset: &str, amount: f64) -> EgdeResult<String> {
        Ok(format!("mock-swap-{amount}"))
    }

    async fn stake(&self, amount: f64) -> EgdeResult<String> {
        *self.stable.lock().unwrap() -= amount;
        Ok(format!("mock-stake-{amount}"))
    }

    async fn provide_liquidity(&self, _pool: &str, amount: f64) -> EgdeResult<String> {
        *self.stable.lock().unwrap() -= amount;
        Ok(format!("mock-lp-{amount}"))
    }

    async fn claim_rewards(&self) -> EgdeResult<f64> {
        let reward = 0.1;
        *self.stable.lock().unwrap() += reward;
        Ok(reward)
    }
}

/// A deterministic mock LLM: echoes a canned, canonically-formatted reply
/// rather than calling out to a provider. Useful for exercising the
/// decision engine's parsing path without network access.
pub struct MockLlm {
    pub canned_reply: Option<String>,
}

impl MockLlm {
    pub fn new(canned_reply: impl Into<Option<String>>) -> Self {
        Self { canned_reply: canned_reply.into() }
    }
}

#[async_trait]
impl LlmPort for MockLlm {
    async fn complete(&self, _tier: LlmTier, _prompt: &str) -> EgdeResult<Option<String>> {
        Ok(self.canned_reply.clone())
    }
}

#[derive(Default)]
pub struct MockPermanentStorage {
    records: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl PermanentStoragePort for MockPermanentStorage {
    async fn inscribe(&self, data: &[u8]) -> EgdeResult<String> {
        let mut records = self.records.lock().unwrap();
        let reference = format!("mock-ref-{}", records.len());
        records.insert(reference.clone(), data.to_vec());
        Ok(reference)
    }

    async fn fetch(&self, reference: &str) -> EgdeResult<Vec<u8>> {
        self.records
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| crate::error::EgdeError::PortFailure {
                port: "permanent-storage",
                source: anyhow::anyhow!("unknown reference: {reference}"),
            })
    }
}

#[derive(Default)]
pub struct MockMessaging {
    inboxes: Mutex<HashMap<String, Vec<(String, String)>>>,
}

#[async_trait]
impl MessagingPort for MockMessaging {
    async fn send(&self, to: &str, payload: &str) -> EgdeResult<()> {
        self.inboxes.lock().unwrap().entry(to.to_string()).or_default().push(("direct".to_string(), payload.to_string()));
        Ok(())
    }

    async fn broadcast(&self, payload: &str) -> EgdeResult<()> {
        let mut inboxes = self.inboxes.lock().unwrap();
        for messages in inboxes.values_mut() {
            messages.push(("broadcast".to_string(), payload.to_string()));
        }
        Ok(())
    }

    async fn inbox(&self, agent_id: &str) -> EgdeResult<Vec<(String, String)>> {
        Ok(self.inboxes.lock().unwrap().remove(agent_id).unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MockLedger {
    history: Mutex<HashMap<(String, String), Vec<f64>>>,
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[async_trait]
impl LedgerPort for MockLedger {
    async fn record_cooperation(&self, agent_a: &str, agent_b: &str, outcome: f64) -> EgdeResult<()> {
        self.history.lock().unwrap().entry(pair_key(agent_a, agent_b)).or_default().push(outcome);
        Ok(())
    }

    async fn cooperation_history(&self, agent_a: &str, agent_b: &str) -> EgdeResult<Vec<f64>> {
        Ok(self.history.lock().unwrap().get(&pair_key(agent_a, agent_b)).cloned().unwrap_or_default())
    }
}
