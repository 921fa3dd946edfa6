//! # Glyphlock - QR security pipeline
//!
//! Glyphlock turns a payload (URL, text, contact, Wi-Fi credentials, ...) into
//! a styled QR symbol, but only after the payload has been scored for risk.
//!
//! ## Overview
//!
//! - Payloads are **scored** from URL heuristics plus semantic sub-scores
//!   supplied by an external inference service
//! - Anything scoring below **65** is **blocked**: it is never rendered or
//!   hashed, and a threat log entry is emitted
//! - Cleared payloads are **encoded** with the `qrcode` crate and **rendered**
//!   with custom dot shapes, eye shapes, gradients, logos and silhouettes
//! - The rendered symbol can be **concealed** in a cover image with LSB
//!   steganography
//! - The payload value is **sealed** with SHA-256 for the audit trail
//!
//! ## Guarantees
//!
//! - **Typed gate**: symbol encoding and hashing accept only a
//!   [`ClearedPayload`], which only [`Scorer::evaluate`] can produce
//! - **Never safe by default**: an unreachable or slow semantic service yields
//!   a `degraded` static-only score, not a perfect one
//! - **Style-independent hash**: styling never changes the content hash
//! - **No partial embedding**: capacity is checked before any pixel is written
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use glyphlock::{FixedSemanticService, Payload, Pipeline, SealRequest, SemanticScores};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let service = FixedSemanticService::new(SemanticScores::new(95, 90, 92));
//! let pipeline = Pipeline::new(Arc::new(service));
//!
//! let payload = Payload::url("https://glyphlock.io").unwrap();
//! let outcome = pipeline.seal(SealRequest::new(payload)).await.unwrap();
//!
//! let record = outcome.sealed().expect("payload should clear the gate");
//! println!("sealed {} as {}", record.payload.value(), record.hash);
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`scoring`]: Risk scoring and the block gate
//! - [`qr`]: Symbol encoding, styled rendering and reading
//! - [`stego`]: LSB concealment in cover images
//! - [`hash`]: Content hash of payload values
//! - [`audit`]: Threat log entries and audit sinks
//! - [`pipeline`]: All of the above in order
//! - [`config`]: TOML configuration

pub mod audit;
pub mod config;
pub mod hash;
pub mod payload;
pub mod pipeline;
pub mod qr;
pub mod raster;
pub mod scoring;
pub mod stego;

// Re-export commonly used types at the crate root
pub use audit::{AuditSink, MemoryAuditLog, ThreatLogEntry, TracingAuditSink};
pub use config::{ConfigError, GlyphlockConfig, RenderConfig, ScoringConfig};
pub use hash::{ContentHash, ParseHashError};
pub use payload::{CalendarEvent, ContactCard, Payload, PayloadError, PayloadKind, WifiSecurity};
pub use pipeline::{Pipeline, PipelineError, PipelineOutcome, SealRequest, SealedRecord};
pub use qr::{
    read_symbol, render, AssetMap, AssetSource, BitMatrix, ErrorCorrection, QrError, RenderError,
    Renderer, StyleSpec,
};
pub use raster::{RasterFormat, RenderedImage};
pub use scoring::{
    ClearedPayload, FixedSemanticService, RiskBlocked, RiskLevel, ScoreResult, Scorer,
    ScoringContext, ScoringError, SemanticScores, SemanticService, UnavailableSemanticService,
    Verdict, BLOCK_THRESHOLD,
};
pub use stego::{conceal, reveal, EncodedCover, StegoError, StegoResult, DELIMITER};
