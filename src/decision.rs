//! The decision engine (spec §4.9): turns a filtered strategy list into a
//! single chosen action, consulting an LLM port when one is configured and
//! falling back to the highest-priority survivor otherwise.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::DecisionTiming;
use crate::error::{EgdeError, EgdeResult};
use crate::ports::{LlmPort, LlmTier};
use crate::strategy::{ActionType, FilteredStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub(crate) fn from_score(risk: f64) -> Self {
        if risk < 0.33 {
            RiskLevel::Low
        } else if risk < 0.66 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

/// A candidate the decision engine considered but did not choose.
#[derive(Debug, Clone)]
pub struct Alternative {
    pub strategy_id: &'static str,
    pub action: ActionType,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub strategy_id: &'static str,
    pub action: ActionType,
    pub reason: String,
    pub confidence: f64,
    pub alternatives: Vec<Alternative>,
    pub risk_assessment: RiskLevel,
    pub used_llm: bool,
}

pub struct DecisionEngine {
    timing: DecisionTiming,
    last_decision_at: Option<Instant>,
}

impl DecisionEngine {
    pub fn new(timing: DecisionTiming) -> Self {
        Self { timing, last_decision_at: None }
    }

    fn check_rate_limit(&self) -> EgdeResult<()> {
        if let Some(last) = self.last_decision_at {
            let elapsed = last.elapsed();
            let min_interval = Duration::from_secs(self.timing.min_decision_interval_secs);
            if elapsed < min_interval {
                return Err(EgdeError::RateLimited { retry_after_secs: (min_interval - elapsed).as_secs() });
            }
        }
        Ok(())
    }

    /// Filter → top 7 → prompt → bounded LLM call → parse → map to action,
    /// falling back to the top-priority survivor whenever the LLM is absent,
    /// times out, refuses, or replies in an unparseable shape.
    pub async fn decide(
        &mut self,
        survivors: &[FilteredStrategy],
        tier: LlmTier,
        llm: Option<&dyn LlmPort>,
        context_summary: &str,
    ) -> EgdeResult<Decision> {
        self.check_rate_limit()?;
        self.last_decision_at = Some(Instant::now());

        if survivors.is_empty() {
            return Err(EgdeError::InvariantViolated("no strategy survived the filter".to_string()));
        }

        let top = &survivors[..survivors.len().min(7)];

        let decision = match llm {
            Some(llm) => {
                let prompt = build_prompt(top, context_summary);
                let budget = Duration::from_secs(self.timing.max_deliberation_time_secs);
                match tokio::time::timeout(budget, llm.complete(tier, &prompt)).await {
                    Ok(Ok(Some(reply))) => match parse_reply(&reply).and_then(|parsed| resolve(top, &parsed)) {
                        Some(decision) => decision,
                        None => {
                            debug!(reply = %reply, "unparseable or unknown strategy in LLM reply, falling back");
                            fallback_decision(top)
                        }
                    },
                    Ok(Ok(None)) => {
                        debug!("LLM returned an empty completion, falling back");
                        fallback_decision(top)
                    }
                    Ok(Err(err)) => {
                        warn!(error = %err, "LLM port failed, falling back");
                        fallback_decision(top)
                    }
                    Err(_) => {
                        warn!("LLM deliberation exceeded the time budget, falling back");
                        fallback_decision(top)
                    }
                }
            }
            None => fallback_decision(top),
        };

        Ok(decision)
    }
}

/// Remaining candidates besides `chosen_id`, capped at 3, in their original
/// priority order (spec §4.9 `alternatives[]`).
fn alternatives(top: &[FilteredStrategy], chosen_id: &str) -> Vec<Alternative> {
    top.iter()
        .filter(|s| s.strategy.id != chosen_id)
        .take(3)
        .map(|s| Alternative { strategy_id: s.strategy.id, action: s.strategy.action, confidence: s.estimated_success })
        .collect()
}

fn fallback_decision(top: &[FilteredStrategy]) -> Decision {
    let chosen = &top[0];
    Decision {
        strategy_id: chosen.strategy.id,
        action: chosen.strategy.action,
        reason: "rule-based fallback: highest-priority surviving strategy".to_string(),
        confidence: 0.4,
        alternatives: alternatives(top, chosen.strategy.id),
        risk_assessment: RiskLevel::from_score(chosen.strategy.risk),
        used_llm: false,
    }
}

fn build_prompt(top: &[FilteredStrategy], context_summary: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str("You are an autonomous agent choosing one strategy for this cycle.\n");
    prompt.push_str(context_summary);
    prompt.push_str("\n\nAvailable strategies, ranked by priority:\n");
    for (i, s) in top.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {} (id={}, risk={:.2}, success~{:.2})\n",
            i + 1,
            s.strategy.name,
            s.strategy.id,
            s.strategy.risk,
            s.estimated_success
        ));
    }
    prompt.push_str(
        "\nReply in exactly this block:\nSTRATEGY_ID: <id from the list above>\nACTION: <action for that strategy>\nCONFIDENCE: <0-1>\nREASONING: <one short sentence>\nRISK_ASSESSMENT: <low|medium|high>\n",
    );
    prompt
}

struct ParsedReply {
    strategy_id: String,
    reason: String,
    confidence: Option<f64>,
    risk_assessment: Option<RiskLevel>,
}

/// Tolerant parser for the canonical `KEY: value` reply shape (spec §4.9):
/// case-insensitive keys, optional space after the colon, extra lines
/// ignored. `STRATEGY` is accepted as an alias for `STRATEGY_ID`.
fn parse_reply(text: &str) -> Option<ParsedReply> {
    let mut strategy_id = None;
    let mut reason = String::new();
    let mut confidence = None;
    let mut risk_assessment = None;
    for line in text.lines() {
        let line = line.trim();
        let Some(colon) = line.find(':') else { continue };
        let key = line[..colon].trim().to_ascii_uppercase();
        let value = line[colon + 1..].trim().to_string();
        match key.as_str() {
            "STRATEGY" | "STRATEGY_ID" => strategy_id = Some(value),
            "REASON" | "REASONING" => reason = value,
            "CONFIDENCE" => confidence = value.parse::<f64>().ok().map(|c| c.clamp(0.0, 1.0)),
            "RISK_ASSESSMENT" => {
                risk_assessment = match value.to_ascii_lowercase().as_str() {
                    "low" => Some(RiskLevel::Low),
                    "medium" => Some(RiskLevel::Medium),
                    "high" => Some(RiskLevel::High),
                    _ => None,
                }
            }
            _ => {}
        }
    }
    strategy_id.map(|id| ParsedReply { strategy_id: id, reason, confidence, risk_assessment })
}

fn resolve(top: &[FilteredStrategy], parsed: &ParsedReply) -> Option<Decision> {
    let matched = top.iter().find(|s| s.strategy.id.eq_ignore_ascii_case(&parsed.strategy_id))?;
    Some(Decision {
        strategy_id: matched.strategy.id,
        action: matched.strategy.action,
        reason: if parsed.reason.is_empty() { "LLM choice".to_string() } else { parsed.reason.clone() },
        confidence: parsed.confidence.unwrap_or(matched.estimated_success),
        alternatives: alternatives(top, matched.strategy.id),
        risk_assessment: parsed.risk_assessment.unwrap_or_else(|| RiskLevel::from_score(matched.strategy.risk)),
        used_llm: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockLlm;
    use crate::strategy::{Category, Strategy, TimeHorizon};

    fn sample_survivors() -> Vec<FilteredStrategy> {
        vec![
            FilteredStrategy {
                strategy: Strategy {
                    id: "local-inference-gig",
                    name: "Local Inference Gig",
                    category: Category::Income,
                    required_genes: &[],
                    required_tools: &[],
                    risk: 0.2,
                    complexity: 0.2,
                    typical_payoff: 0.5,
                    time_horizon: TimeHorizon::Short,
                    action: ActionType::ThinkLocal,
                },
                genome_match: 0.9,
                estimated_success: 0.8,
                priority: 0.9,
            },
            FilteredStrategy {
                strategy: Strategy {
                    id: "broadcast-signal",
                    name: "Broadcast Signal",
                    category: Category::Social,
                    required_genes: &[],
                    required_tools: &[],
                    risk: 0.1,
                    complexity: 0.1,
                    typical_payoff: 0.0,
                    time_horizon: TimeHorizon::Immediate,
                    action: ActionType::Broadcast,
                },
                genome_match: 0.7,
                estimated_success: 0.6,
                priority: 0.5,
            },
        ]
    }

    #[tokio::test]
    async fn no_llm_port_falls_back_to_top_priority() {
        let mut engine = DecisionEngine::new(DecisionTiming::default());
        let decision = engine.decide(&sample_survivors(), LlmTier::Local, None, "ctx").await.unwrap();
        assert_eq!(decision.strategy_id, "local-inference-gig");
        assert!(!decision.used_llm);
    }

    #[tokio::test]
    async fn llm_reply_selects_named_strategy() {
        let mut engine = DecisionEngine::new(DecisionTiming::default());
        let llm = MockLlm::new("STRATEGY: broadcast-signal\nREASON: need allies\n".to_string());
        let decision = engine.decide(&sample_survivors(), LlmTier::Local, Some(&llm), "ctx").await.unwrap();
        assert_eq!(decision.strategy_id, "broadcast-signal");
        assert!(decision.used_llm);
        assert_eq!(decision.reason, "need allies");
    }

    #[tokio::test]
    async fn unparseable_reply_falls_back() {
        let mut engine = DecisionEngine::new(DecisionTiming::default());
        let llm = MockLlm::new("I am not sure what to do.".to_string());
        let decision = engine.decide(&sample_survivors(), LlmTier::Local, Some(&llm), "ctx").await.unwrap();
        assert!(!decision.used_llm);
        assert_eq!(decision.strategy_id, "local-inference-gig");
    }

    #[tokio::test]
    async fn reply_naming_unknown_strategy_falls_back() {
        let mut engine = DecisionEngine::new(DecisionTiming::default());
        let llm = MockLlm::new("STRATEGY: not-a-real-strategy\nREASON: whatever\n".to_string());
        let decision = engine.decide(&sample_survivors(), LlmTier::Local, Some(&llm), "ctx").await.unwrap();
        assert!(!decision.used_llm);
    }

    #[tokio::test]
    async fn empty_survivors_is_an_invariant_violation() {
        let mut engine = DecisionEngine::new(DecisionTiming::default());
        let result = engine.decide(&[], LlmTier::Local, None, "ctx").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn fallback_decision_lists_remaining_candidates_as_alternatives() {
        let mut engine = DecisionEngine::new(DecisionTiming::default());
        let decision = engine.decide(&sample_survivors(), LlmTier::Local, None, "ctx").await.unwrap();
        assert_eq!(decision.alternatives.len(), 1);
        assert_eq!(decision.alternatives[0].strategy_id, "broadcast-signal");
        assert_eq!(decision.risk_assessment, RiskLevel::Low);
    }

    #[tokio::test]
    async fn llm_reply_can_override_risk_assessment() {
        let mut engine = DecisionEngine::new(DecisionTiming::default());
        let llm = MockLlm::new(
            "STRATEGY_ID: broadcast-signal\nREASONING: need allies\nRISK_ASSESSMENT: high\n".to_string(),
        );
        let decision = engine.decide(&sample_survivors(), LlmTier::Local, Some(&llm), "ctx").await.unwrap();
        assert_eq!(decision.risk_assessment, RiskLevel::High);
    }

    #[tokio::test]
    async fn second_decision_before_interval_is_rate_limited() {
        let mut engine = DecisionEngine::new(DecisionTiming { min_decision_interval_secs: 60, max_deliberation_time_secs: 5 });
        engine.decide(&sample_survivors(), LlmTier::Local, None, "ctx").await.unwrap();
        let result = engine.decide(&sample_survivors(), LlmTier::Local, None, "ctx").await;
        assert!(matches!(result, Err(EgdeError::RateLimited { .. })));
    }
}
