//! Risk scoring and the mandatory gate in front of rendering and sealing.
//!
//! Two signal families are combined:
//! - **Static heuristics** over URL payloads ([`heuristics`])
//! - **Semantic sub-scores** from an external inference service ([`semantic`])
//!
//! ```text
//! finalScore = 0.40 * domainTrust + 0.25 * sentiment
//!            + 0.20 * entityLegitimacy + 0.15 * urlHeuristic
//! ```
//!
//! A payload scoring strictly below [`BLOCK_THRESHOLD`] is blocked. The only
//! way to obtain a [`ClearedPayload`], which symbol encoding and hashing
//! require, is through [`Scorer::evaluate`].

pub mod heuristics;
pub mod semantic;

pub use heuristics::{UrlHeuristic, UrlHeuristics};
pub use semantic::{
    FixedSemanticService, RetryPolicy, ScoringContext, ScoringError, SemanticScores,
    SemanticService, UnavailableSemanticService,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::audit::{AuditSink, ThreatLogEntry, TracingAuditSink};
use crate::config::ScoringConfig;
use crate::payload::{Payload, PayloadKind};

/// Scores strictly below this are blocked.
pub const BLOCK_THRESHOLD: f64 = 65.0;

/// Weights in percent: domain trust, sentiment, entity legitimacy, URL heuristic.
const WEIGHTS: [u32; 4] = [40, 25, 20, 15];

pub const THREAT_SEMANTIC_UNAVAILABLE: &str = "semantic_unavailable";
pub const THREAT_UNTRUSTED_DOMAIN: &str = "untrusted_domain";
pub const THREAT_NEGATIVE_SENTIMENT: &str = "negative_sentiment";
pub const THREAT_UNVERIFIED_ENTITY: &str = "unverified_entity";

/// True if `final_score` must be blocked. NaN is blocked.
#[allow(clippy::neg_cmp_op_on_partial_ord)]
pub fn is_blocked(final_score: f64) -> bool {
    !(final_score >= BLOCK_THRESHOLD)
}

/// Coarse risk bucket derived from the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(final_score: f64) -> Self {
        if final_score >= 85.0 {
            Self::Safe
        } else if final_score >= BLOCK_THRESHOLD {
            Self::Low
        } else if final_score >= 45.0 {
            Self::Medium
        } else if final_score >= 25.0 {
            Self::High
        } else {
            Self::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scoring one payload.
///
/// Semantic sub-scores are `None` when the service was skipped (non-URL kinds)
/// or unavailable (`degraded`). They are never filled with a stand-in value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub domain_trust: Option<u8>,
    pub sentiment: Option<u8>,
    pub entity_legitimacy: Option<u8>,
    pub url_heuristic: u8,
    pub final_score: f64,
    pub risk_level: RiskLevel,
    pub threat_types: BTreeSet<String>,
    pub degraded: bool,
}

impl ScoreResult {
    /// Full result from static and semantic signals.
    pub fn combined(url: UrlHeuristic, semantic: SemanticScores) -> Self {
        let weighted = WEIGHTS[0] * u32::from(semantic.domain_trust)
            + WEIGHTS[1] * u32::from(semantic.sentiment)
            + WEIGHTS[2] * u32::from(semantic.entity_legitimacy)
            + WEIGHTS[3] * u32::from(url.score);
        // One division of an exact integer: no accumulated rounding.
        let final_score = f64::from(weighted) / 100.0;

        let mut threat_types = url.threats;
        if semantic.domain_trust < 50 {
            threat_types.insert(THREAT_UNTRUSTED_DOMAIN.to_string());
        }
        if semantic.sentiment < 40 {
            threat_types.insert(THREAT_NEGATIVE_SENTIMENT.to_string());
        }
        if semantic.entity_legitimacy < 50 {
            threat_types.insert(THREAT_UNVERIFIED_ENTITY.to_string());
        }

        Self {
            domain_trust: Some(semantic.domain_trust),
            sentiment: Some(semantic.sentiment),
            entity_legitimacy: Some(semantic.entity_legitimacy),
            url_heuristic: url.score,
            final_score,
            risk_level: RiskLevel::from_score(final_score),
            threat_types,
            degraded: false,
        }
    }

    /// Static-only result used when the semantic service could not answer.
    pub fn degraded(url: UrlHeuristic) -> Self {
        let final_score = f64::from(url.score);
        let mut threat_types = url.threats;
        threat_types.insert(THREAT_SEMANTIC_UNAVAILABLE.to_string());
        Self {
            domain_trust: None,
            sentiment: None,
            entity_legitimacy: None,
            url_heuristic: url.score,
            final_score,
            risk_level: RiskLevel::from_score(final_score),
            threat_types,
            degraded: true,
        }
    }

    /// Synthetic result for kinds that cannot be fetched or resolved.
    pub fn not_applicable() -> Self {
        Self {
            domain_trust: None,
            sentiment: None,
            entity_legitimacy: None,
            url_heuristic: 100,
            final_score: 100.0,
            risk_level: RiskLevel::Safe,
            threat_types: BTreeSet::new(),
            degraded: false,
        }
    }

    pub fn is_blocked(&self) -> bool {
        is_blocked(self.final_score)
    }
}

/// A payload that passed the gate, bound to the score that cleared it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearedPayload {
    payload: Payload,
    score: ScoreResult,
}

impl ClearedPayload {
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn score(&self) -> &ScoreResult {
        &self.score
    }

    pub fn into_parts(self) -> (Payload, ScoreResult) {
        (self.payload, self.score)
    }

    #[cfg(test)]
    pub(crate) fn for_tests(payload: Payload) -> Self {
        Self {
            payload,
            score: ScoreResult::not_applicable(),
        }
    }
}

/// A payload rejected by the gate.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskBlocked {
    pub payload: Payload,
    pub score: ScoreResult,
    pub threat: ThreatLogEntry,
}

/// Gate decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Cleared(ClearedPayload),
    Blocked(RiskBlocked),
}

impl Verdict {
    pub fn score(&self) -> &ScoreResult {
        match self {
            Verdict::Cleared(c) => &c.score,
            Verdict::Blocked(b) => &b.score,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Blocked(_))
    }

    pub fn cleared(self) -> Option<ClearedPayload> {
        match self {
            Verdict::Cleared(c) => Some(c),
            Verdict::Blocked(_) => None,
        }
    }
}

/// Scores payloads and enforces the block threshold.
pub struct Scorer {
    service: Arc<dyn SemanticService>,
    heuristics: UrlHeuristics,
    retry: RetryPolicy,
    audit: Arc<dyn AuditSink>,
}

impl Scorer {
    /// Creates a scorer with default settings and a tracing audit sink.
    pub fn new(service: Arc<dyn SemanticService>) -> Self {
        Self::with_config(service, &ScoringConfig::default(), Arc::new(TracingAuditSink))
    }

    pub fn with_config(
        service: Arc<dyn SemanticService>,
        config: &ScoringConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            service,
            heuristics: UrlHeuristics::with_extras(
                &config.extra_shorteners,
                &config.extra_suspicious_tlds,
            ),
            retry: config.retry_policy(),
            audit,
        }
    }

    /// Scores `payload` without recording anything.
    pub async fn score(&self, payload: &Payload, context: Option<&ScoringContext>) -> ScoreResult {
        self.score_cancellable(payload, context, &CancellationToken::new())
            .await
    }

    /// Like [`Scorer::score`], falling back to static-only scoring as soon as
    /// `cancel` fires.
    pub async fn score_cancellable(
        &self,
        payload: &Payload,
        context: Option<&ScoringContext>,
        cancel: &CancellationToken,
    ) -> ScoreResult {
        if payload.kind() != PayloadKind::Url {
            return ScoreResult::not_applicable();
        }

        let url = self.heuristics.evaluate(payload.value());
        let default_context = ScoringContext::default();
        let context = context.unwrap_or(&default_context);

        match semantic::analyze_with_retry(
            self.service.as_ref(),
            payload.value(),
            context,
            &self.retry,
            cancel,
        )
        .await
        {
            Ok(scores) => ScoreResult::combined(url, scores),
            Err(e) => {
                warn!(
                    service = self.service.name(),
                    error = %e,
                    url_heuristic = url.score,
                    "scoring.degraded"
                );
                ScoreResult::degraded(url)
            }
        }
    }

    /// Scores `payload`, records the result and applies the gate.
    ///
    /// # Arguments
    /// * `payload` - Value to score
    /// * `context` - Optional hints forwarded to the semantic service
    ///
    /// # Returns
    /// `Verdict::Cleared` with the only value downstream stages accept, or
    /// `Verdict::Blocked` after a threat log entry has been recorded.
    pub async fn evaluate(&self, payload: Payload, context: Option<&ScoringContext>) -> Verdict {
        self.evaluate_cancellable(payload, context, &CancellationToken::new())
            .await
    }

    pub async fn evaluate_cancellable(
        &self,
        payload: Payload,
        context: Option<&ScoringContext>,
        cancel: &CancellationToken,
    ) -> Verdict {
        let score = self.score_cancellable(&payload, context, cancel).await;
        self.audit.record_score(&payload, &score);

        if score.is_blocked() {
            let threat = ThreatLogEntry::new(&payload, score.risk_level);
            warn!(
                incident_id = %threat.incident_id,
                risk_level = %score.risk_level,
                final_score = score.final_score,
                "scoring.blocked"
            );
            self.audit.record_threat(&threat);
            Verdict::Blocked(RiskBlocked {
                payload,
                score,
                threat,
            })
        } else {
            debug!(
                final_score = score.final_score,
                risk_level = %score.risk_level,
                "scoring.cleared"
            );
            Verdict::Cleared(ClearedPayload { payload, score })
        }
    }
}
