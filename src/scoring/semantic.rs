//! Semantic inference collaborator.
//!
//! The host application plugs in a [`SemanticService`]; this module wraps it
//! with a per-attempt timeout, a bounded number of attempts and cooperative
//! cancellation. Any failure is reported as a [`ScoringError`], which the
//! scorer turns into a degraded static-only result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Errors from the semantic inference call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Semantic service unavailable: {0}")]
    Unavailable(String),

    #[error("Semantic service timed out after {0:?}")]
    Timeout(Duration),

    #[error("Semantic scoring cancelled")]
    Cancelled,

    #[error("Semantic score out of range: {field}={value}")]
    OutOfRange { field: &'static str, value: u8 },
}

/// The three sub-scores returned by the inference service, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticScores {
    pub domain_trust: u8,
    pub sentiment: u8,
    pub entity_legitimacy: u8,
}

impl SemanticScores {
    pub fn new(domain_trust: u8, sentiment: u8, entity_legitimacy: u8) -> Self {
        Self {
            domain_trust,
            sentiment,
            entity_legitimacy,
        }
    }

    /// Rejects any component above 100.
    pub fn validate(&self) -> Result<Self, ScoringError> {
        for (field, value) in [
            ("domainTrust", self.domain_trust),
            ("sentiment", self.sentiment),
            ("entityLegitimacy", self.entity_legitimacy),
        ] {
            if value > 100 {
                return Err(ScoringError::OutOfRange { field, value });
            }
        }
        Ok(*self)
    }
}

/// Deployment hints forwarded to the inference service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringContext {
    pub tech_stack: Option<String>,
    pub deployment_env: Option<String>,
}

/// Black-box inference service producing semantic sub-scores.
#[async_trait]
pub trait SemanticService: Send + Sync {
    /// Scores `text` (a URL or free text).
    async fn analyze(
        &self,
        text: &str,
        context: &ScoringContext,
    ) -> Result<SemanticScores, ScoringError>;

    /// Service name for logs.
    fn name(&self) -> &str;
}

/// Service that always returns the same scores.
#[derive(Debug, Clone, Copy)]
pub struct FixedSemanticService {
    scores: SemanticScores,
}

impl FixedSemanticService {
    pub fn new(scores: SemanticScores) -> Self {
        Self { scores }
    }
}

#[async_trait]
impl SemanticService for FixedSemanticService {
    async fn analyze(
        &self,
        _text: &str,
        _context: &ScoringContext,
    ) -> Result<SemanticScores, ScoringError> {
        Ok(self.scores)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Service used when no inference backend is configured. Every call fails,
/// so scoring always runs degraded.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSemanticService;

#[async_trait]
impl SemanticService for UnavailableSemanticService {
    async fn analyze(
        &self,
        _text: &str,
        _context: &ScoringContext,
    ) -> Result<SemanticScores, ScoringError> {
        Err(ScoringError::Unavailable("no semantic service configured".into()))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Retry and timeout policy for the inference call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2500),
            max_attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

/// Calls `service` under `policy`, giving up early if `cancel` fires.
///
/// Backoff is linear: attempt `n` waits `n * backoff` before the next try.
pub(crate) async fn analyze_with_retry(
    service: &dyn SemanticService,
    text: &str,
    context: &ScoringContext,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<SemanticScores, ScoringError> {
    let attempts = policy.max_attempts.max(1);
    let mut last_error = ScoringError::Unavailable("no attempt made".into());

    for attempt in 1..=attempts {
        let call = tokio::time::timeout(policy.timeout, service.analyze(text, context));
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(ScoringError::Cancelled),
            outcome = call => outcome,
        };

        match outcome {
            Ok(Ok(scores)) => match scores.validate() {
                Ok(scores) => {
                    debug!(service = service.name(), attempt, "semantic.ok");
                    return Ok(scores);
                }
                Err(e) => last_error = e,
            },
            Ok(Err(e)) => last_error = e,
            Err(_) => last_error = ScoringError::Timeout(policy.timeout),
        }

        warn!(
            service = service.name(),
            attempt,
            max_attempts = attempts,
            error = %last_error,
            "semantic.attempt_failed"
        );

        if attempt < attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ScoringError::Cancelled),
                _ = tokio::time::sleep(policy.backoff * attempt) => {}
            }
        }
    }

    Err(last_error)
}
