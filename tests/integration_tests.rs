//! Integration tests for Glyphlock
//!
//! Every test drives the public API the way a host application would:
//! payload in, `PipelineOutcome` out.
//!
//! Covered:
//! - Risk gate (cleared, blocked, exact threshold, degraded)
//! - Rendering that still scans
//! - Concealment of the rendered symbol in a cover image
//! - Content hash independence from styling

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

use glyphlock::qr::{DotShape, EyeShape, Gradient, Color, Silhouette, ShapeTransform};
use glyphlock::{
    read_symbol, reveal, ErrorCorrection, FixedSemanticService, GlyphlockConfig, MemoryAuditLog,
    Payload, Pipeline, RenderedImage, RiskLevel, ScoringContext, ScoringError, SealRequest,
    SemanticScores, SemanticService, StyleSpec, WifiSecurity,
};

fn pipeline_with(scores: SemanticScores) -> (Pipeline, Arc<MemoryAuditLog>) {
    let audit = Arc::new(MemoryAuditLog::new());
    let pipeline = Pipeline::with_config(
        Arc::new(FixedSemanticService::new(scores)),
        &GlyphlockConfig::default(),
        audit.clone(),
    );
    (pipeline, audit)
}

fn cover(side: u32) -> RenderedImage {
    RenderedImage::from_rgba(RgbaImage::from_fn(side, side, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    }))
}

/// Service that never answers within the timeout.
struct SlowService;

#[async_trait]
impl SemanticService for SlowService {
    async fn analyze(
        &self,
        _text: &str,
        _context: &ScoringContext,
    ) -> Result<SemanticScores, ScoringError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(SemanticScores::new(100, 100, 100))
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// Test a trusted URL goes all the way through and the symbol scans
#[tokio::test]
async fn test_trusted_url_sealed_and_scannable() {
    let (pipeline, audit) = pipeline_with(SemanticScores::new(95, 90, 92));
    let payload = Payload::url("https://glyphlock.io").unwrap();

    let record = pipeline
        .seal(SealRequest::new(payload.clone()))
        .await
        .unwrap()
        .sealed()
        .unwrap();

    assert_eq!(record.score.url_heuristic, 100);
    assert!((record.score.final_score - 93.9).abs() < 1e-9);
    assert_eq!(record.score.risk_level, RiskLevel::Safe);
    assert_eq!(read_symbol(&record.symbol).unwrap(), "https://glyphlock.io");
    assert!(record.hash.matches(&payload));
    assert!(audit.tampered().is_empty());
}

/// Test a phishing-looking URL is blocked with a threat log entry
#[tokio::test]
async fn test_phishing_url_blocked() {
    let (pipeline, audit) = pipeline_with(SemanticScores::new(45, 40, 45));
    let outcome = pipeline
        .seal(SealRequest::new(Payload::url("http://bit.ly/fakephish").unwrap()))
        .await
        .unwrap();

    assert!(outcome.is_blocked());
    let score = outcome.score();
    assert_eq!(score.url_heuristic, 55);
    assert!((score.final_score - 45.25).abs() < 1e-9);
    assert!(score.threat_types.contains("url_shortener"));
    assert!(score.threat_types.contains("insecure_scheme"));

    let threats = audit.threats();
    assert_eq!(threats.len(), 1);
    assert_eq!(threats[0].payload_prefix, "http://bit.ly/fakephish");
    assert!(audit.hashes().is_empty());
}

/// Test a final score of exactly 65 is allowed
#[tokio::test]
async fn test_exact_threshold_is_allowed() {
    // 0.4*50 + 0.25*60 + 0.2*75 + 0.15*100 = 65.0
    let (pipeline, _) = pipeline_with(SemanticScores::new(50, 60, 75));
    let outcome = pipeline
        .seal(SealRequest::new(Payload::url("https://example.com").unwrap()))
        .await
        .unwrap();
    assert!(!outcome.is_blocked());
    assert_eq!(outcome.score().final_score, 65.0);
}

/// Test a hanging semantic service degrades instead of blocking forever
#[tokio::test(start_paused = true)]
async fn test_slow_service_degrades() {
    let audit = Arc::new(MemoryAuditLog::new());
    let pipeline = Pipeline::with_config(Arc::new(SlowService), &GlyphlockConfig::default(), audit.clone());

    let outcome = pipeline
        .seal(SealRequest::new(Payload::url("http://203.0.113.9/login").unwrap()))
        .await
        .unwrap();

    let score = outcome.score();
    assert!(score.degraded);
    assert_eq!(score.sentiment, None);
    assert!(score.threat_types.contains("semantic_unavailable"));
    // Static-only: insecure scheme and IP literal.
    assert_eq!(score.final_score, 50.0);
    assert!(outcome.is_blocked());
}

/// Test styling never changes the content hash
#[tokio::test]
async fn test_hash_independent_of_style() {
    let (pipeline, _) = pipeline_with(SemanticScores::new(90, 90, 90));
    let payload = Payload::text("same value, different looks").unwrap();

    let plain = pipeline
        .seal(SealRequest::new(payload.clone()))
        .await
        .unwrap()
        .sealed()
        .unwrap();

    let fancy_style = StyleSpec {
        dot_shape: DotShape::Heart,
        eye_shape: EyeShape::Circular,
        gradient: Some(Gradient::linear(30.0, Color::rgb(200, 0, 80), Color::rgb(0, 0, 0))),
        transform: ShapeTransform {
            silhouette: Silhouette::Circle,
            ..Default::default()
        },
        ..Default::default()
    };
    let fancy = pipeline
        .seal(
            SealRequest::new(payload)
                .with_style(fancy_style)
                .with_error_correction(ErrorCorrection::High),
        )
        .await
        .unwrap()
        .sealed()
        .unwrap();

    assert_ne!(plain.symbol, fancy.symbol);
    assert_eq!(plain.hash, fancy.hash);
}

/// Test the concealed symbol can be revealed and still scans
#[tokio::test]
async fn test_conceal_reveal_scan() {
    let (pipeline, _) = pipeline_with(SemanticScores::new(90, 90, 90));
    let wifi = Payload::wifi("Office", Some("s3cret;pass"), WifiSecurity::Wpa, false).unwrap();
    let style = StyleSpec {
        module_px: 4,
        ..Default::default()
    };

    let record = pipeline
        .seal(
            SealRequest::new(wifi.clone())
                .with_style(style)
                .with_cover(cover(320)),
        )
        .await
        .unwrap()
        .sealed()
        .unwrap();

    let concealed = record.concealed.expect("cover was supplied");
    assert!(concealed.result.bits_used <= concealed.result.capacity_bits);
    assert_eq!(concealed.result.capacity_bits, 320 * 320 * 3);

    let png = concealed.image.to_png_bytes().unwrap();
    let received = RenderedImage::from_png_bytes(&png).unwrap();
    let symbol = reveal(&received).unwrap();
    assert_eq!(symbol, record.symbol);
    assert_eq!(read_symbol(&symbol).unwrap(), wifi.value());
}

/// Test a cover too small for the symbol fails before anything is hashed
#[tokio::test]
async fn test_cover_too_small() {
    let (pipeline, audit) = pipeline_with(SemanticScores::new(90, 90, 90));
    let err = pipeline
        .seal(SealRequest::new(Payload::text("hi").unwrap()).with_cover(cover(8)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        glyphlock::PipelineError::Stego(glyphlock::StegoError::InsufficientCapacity { .. })
    ));
    assert!(audit.hashes().is_empty());
}

/// Test configuration from a TOML file reaches the pipeline
#[tokio::test]
async fn test_config_file_drives_pipeline() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[scoring]
extra_shorteners = ["go.example"]

[render]
default_error_correction = "h"
"#
    )
    .unwrap();
    let config = GlyphlockConfig::load(file.path()).unwrap();

    let audit = Arc::new(MemoryAuditLog::new());
    let pipeline = Pipeline::with_config(
        Arc::new(FixedSemanticService::new(SemanticScores::new(90, 90, 90))),
        &config,
        audit,
    );
    let record = pipeline
        .seal(SealRequest::new(Payload::url("https://go.example/x").unwrap()))
        .await
        .unwrap()
        .sealed()
        .unwrap();

    assert_eq!(record.error_correction, ErrorCorrection::High);
    assert!(record.score.threat_types.contains("url_shortener"));
    assert_eq!(record.score.url_heuristic, 85);
}

/// Test non-URL kinds skip the semantic service entirely
#[tokio::test(start_paused = true)]
async fn test_non_url_kinds_skip_semantic_scoring() {
    let audit = Arc::new(MemoryAuditLog::new());
    let pipeline = Pipeline::with_config(Arc::new(SlowService), &GlyphlockConfig::default(), audit);

    let payload = Payload::location(48.8584, 2.2945).unwrap();
    let record = pipeline
        .seal(SealRequest::new(payload))
        .await
        .unwrap()
        .sealed()
        .unwrap();
    assert!(!record.score.degraded);
    assert_eq!(record.score.domain_trust, None);
    assert_eq!(record.score.final_score, 100.0);
}
