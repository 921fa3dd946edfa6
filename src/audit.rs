//! Audit records and the sink that receives them.
//!
//! The pipeline only produces records; storage belongs to the host. Two sinks
//! ship with the crate: [`TracingAuditSink`] writes structured log lines and
//! [`MemoryAuditLog`] keeps everything in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::hash::ContentHash;
use crate::payload::Payload;
use crate::scoring::{RiskLevel, ScoreResult};

/// Number of payload characters kept in a threat log entry.
pub const THREAT_PREFIX_CHARS: usize = 32;

/// Record written when a payload is blocked by the risk gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatLogEntry {
    pub incident_id: Uuid,
    pub payload_prefix: String,
    pub risk_level: RiskLevel,
    pub timestamp: DateTime<Utc>,
}

impl ThreatLogEntry {
    /// Opens a new incident for `payload`.
    pub fn new(payload: &Payload, risk_level: RiskLevel) -> Self {
        Self {
            incident_id: Uuid::new_v4(),
            payload_prefix: payload.prefix(THREAT_PREFIX_CHARS),
            risk_level,
            timestamp: Utc::now(),
        }
    }
}

/// Receives the records produced by the pipeline.
pub trait AuditSink: Send + Sync {
    /// Called for every scored payload, blocked or not.
    fn record_score(&self, payload: &Payload, score: &ScoreResult);

    /// Called once per sealed payload.
    fn record_hash(&self, payload: &Payload, hash: &ContentHash);

    /// Called when the gate blocks a payload.
    fn record_threat(&self, entry: &ThreatLogEntry);
}

/// Sink that writes each record as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record_score(&self, payload: &Payload, score: &ScoreResult) {
        info!(
            kind = %payload.kind(),
            final_score = score.final_score,
            risk_level = %score.risk_level,
            degraded = score.degraded,
            "audit.score"
        );
    }

    fn record_hash(&self, payload: &Payload, hash: &ContentHash) {
        info!(kind = %payload.kind(), hash = %hash, "audit.hash");
    }

    fn record_threat(&self, entry: &ThreatLogEntry) {
        warn!(
            incident_id = %entry.incident_id,
            risk_level = %entry.risk_level,
            payload_prefix = %entry.payload_prefix,
            timestamp = %entry.timestamp,
            "audit.threat"
        );
    }
}

/// Sink that keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    scores: Mutex<Vec<(Payload, ScoreResult)>>,
    hashes: Mutex<Vec<(Payload, ContentHash)>>,
    threats: Mutex<Vec<ThreatLogEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scores(&self) -> Vec<(Payload, ScoreResult)> {
        lock(&self.scores).clone()
    }

    pub fn hashes(&self) -> Vec<(Payload, ContentHash)> {
        lock(&self.hashes).clone()
    }

    pub fn threats(&self) -> Vec<ThreatLogEntry> {
        lock(&self.threats).clone()
    }

    /// Recomputes every stored hash and returns the payloads that no longer
    /// match.
    pub fn tampered(&self) -> Vec<Payload> {
        lock(&self.hashes)
            .iter()
            .filter(|(payload, hash)| !hash.matches(payload))
            .map(|(payload, _)| payload.clone())
            .collect()
    }
}

/// A poisoned lock only means another writer panicked mid-push; the vector
/// itself is still usable.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AuditSink for MemoryAuditLog {
    fn record_score(&self, payload: &Payload, score: &ScoreResult) {
        lock(&self.scores).push((payload.clone(), score.clone()));
    }

    fn record_hash(&self, payload: &Payload, hash: &ContentHash) {
        lock(&self.hashes).push((payload.clone(), *hash));
    }

    fn record_threat(&self, entry: &ThreatLogEntry) {
        lock(&self.threats).push(entry.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ClearedPayload;

    #[test]
    fn test_threat_entry_truncates_prefix() {
        let long = format!("https://example.com/{}", "a".repeat(100));
        let payload = Payload::url(long).unwrap();
        let entry = ThreatLogEntry::new(&payload, RiskLevel::High);
        assert_eq!(entry.payload_prefix.chars().count(), THREAT_PREFIX_CHARS);
        assert!(entry.payload_prefix.starts_with("https://example.com/"));
    }

    #[test]
    fn test_incident_ids_are_unique() {
        let payload = Payload::url("http://bit.ly/x").unwrap();
        let a = ThreatLogEntry::new(&payload, RiskLevel::High);
        let b = ThreatLogEntry::new(&payload, RiskLevel::High);
        assert_ne!(a.incident_id, b.incident_id);
    }

    #[test]
    fn test_threat_entry_serde_field_names() {
        let payload = Payload::url("http://bit.ly/x").unwrap();
        let entry = ThreatLogEntry::new(&payload, RiskLevel::Critical);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("incidentId").is_some());
        assert_eq!(json["payloadPrefix"], "http://bit.ly/x");
        assert_eq!(json["riskLevel"], "critical");
    }

    #[test]
    fn test_memory_log_detects_tampering() {
        let log = MemoryAuditLog::new();
        let payload = Payload::text("invoice #42").unwrap();
        let hash = ContentHash::of(&ClearedPayload::for_tests(payload.clone()));
        log.record_hash(&payload, &hash);

        let forged = Payload::text("invoice #43").unwrap();
        log.record_hash(&forged, &hash);

        assert_eq!(log.hashes().len(), 2);
        assert_eq!(log.tampered(), vec![forged]);
    }
}
