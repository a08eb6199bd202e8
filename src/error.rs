//! Error kinds for the genome engine.
//!
//! These map one-to-one onto the symbolic kinds in the specification: most
//! are fatal and propagate with `?`; `ConvergenceWarning` and
//! `InvalidCondition` are attached to an [`crate::expression::ExpressionResult`]
//! instead of being returned as `Err`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EgdeError {
    #[error("genome invariant violated: {0}")]
    InvariantViolated(String),

    #[error("genome record version {found} is incompatible (expected {expected})")]
    IncompatibleGenome { found: u32, expected: u32 },

    #[error("breeding refused: inbreeding (jaccard similarity {similarity:.3} exceeds 0.8)")]
    Inbreeding { similarity: f64 },

    #[error("{port} port failed: {source}")]
    PortFailure {
        port: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("rate limited: next decision available in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

pub type EgdeResult<T> = Result<T, EgdeError>;

/// Non-fatal condition raised mid-pipeline and attached to a result rather
/// than returned as an `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// The regulatory fixed-point iteration hit the round cap without
    /// converging below the threshold.
    ConvergenceWarning { gene_id: String, rounds: u32 },
    /// An `activationCondition` string failed to parse; treated as `true`.
    InvalidCondition { gene_id: String, condition: String },
}
