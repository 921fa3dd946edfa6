//! End-to-end sealing of one payload.
//!
//! This module orchestrates the stages in a fixed order:
//! 1. Score the payload and apply the risk gate
//! 2. Encode the cleared value into a module matrix
//! 3. Render the matrix with the requested style
//! 4. Optionally conceal the rendered symbol in a cover image
//! 5. Hash the payload value and hand the hash to the audit sink
//!
//! A blocked payload stops after step 1 and comes back as
//! [`PipelineOutcome::Blocked`]; nothing is rendered or hashed for it.

use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::audit::{AuditSink, TracingAuditSink};
use crate::config::GlyphlockConfig;
use crate::hash::ContentHash;
use crate::payload::Payload;
use crate::qr::{
    render_in_background, AssetMap, BitMatrix, ErrorCorrection, QrError, RenderError, Renderer,
    StyleSpec,
};
use crate::raster::RenderedImage;
use crate::scoring::{RiskBlocked, ScoreResult, Scorer, ScoringContext, SemanticService, Verdict};
use crate::stego::{conceal_in_background, EncodedCover, StegoError};

/// Errors from the stages after the gate.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Symbol error: {0}")]
    Symbol(#[from] QrError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Concealment error: {0}")]
    Stego(#[from] StegoError),
}

/// Everything needed to seal one payload.
#[derive(Debug, Clone)]
pub struct SealRequest {
    pub payload: Payload,
    pub style: StyleSpec,
    /// Falls back to the configured default when `None`.
    pub error_correction: Option<ErrorCorrection>,
    pub context: Option<ScoringContext>,
    /// When set, the rendered symbol is hidden in this image.
    pub cover: Option<RenderedImage>,
    pub assets: AssetMap,
}

impl SealRequest {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            style: StyleSpec::default(),
            error_correction: None,
            context: None,
            cover: None,
            assets: AssetMap::new(),
        }
    }

    pub fn with_style(mut self, style: StyleSpec) -> Self {
        self.style = style;
        self
    }

    pub fn with_error_correction(mut self, ec: ErrorCorrection) -> Self {
        self.error_correction = Some(ec);
        self
    }

    pub fn with_context(mut self, context: ScoringContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_cover(mut self, cover: RenderedImage) -> Self {
        self.cover = Some(cover);
        self
    }

    pub fn with_assets(mut self, assets: AssetMap) -> Self {
        self.assets = assets;
        self
    }
}

/// Output of a payload that passed the gate.
#[derive(Debug, Clone)]
pub struct SealedRecord {
    pub payload: Payload,
    pub score: ScoreResult,
    pub error_correction: ErrorCorrection,
    /// The styled symbol.
    pub symbol: RenderedImage,
    /// The cover carrying the symbol, when a cover was supplied.
    pub concealed: Option<EncodedCover>,
    pub hash: ContentHash,
}

#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Sealed(Box<SealedRecord>),
    Blocked(RiskBlocked),
}

impl PipelineOutcome {
    pub fn score(&self) -> &ScoreResult {
        match self {
            PipelineOutcome::Sealed(record) => &record.score,
            PipelineOutcome::Blocked(blocked) => &blocked.score,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, PipelineOutcome::Blocked(_))
    }

    pub fn sealed(self) -> Option<SealedRecord> {
        match self {
            PipelineOutcome::Sealed(record) => Some(*record),
            PipelineOutcome::Blocked(_) => None,
        }
    }
}

/// Scorer, renderer and audit sink wired together.
pub struct Pipeline {
    scorer: Scorer,
    renderer: Renderer,
    default_ec: ErrorCorrection,
    audit: Arc<dyn AuditSink>,
}

impl Pipeline {
    /// Default configuration, audit records go to `tracing`.
    pub fn new(service: Arc<dyn SemanticService>) -> Self {
        Self::with_config(service, &GlyphlockConfig::default(), Arc::new(TracingAuditSink))
    }

    pub fn with_config(
        service: Arc<dyn SemanticService>,
        config: &GlyphlockConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            scorer: Scorer::with_config(service, &config.scoring, Arc::clone(&audit)),
            renderer: Renderer::new(config.render.clone()),
            default_ec: config.render.default_error_correction,
            audit,
        }
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Runs every stage for `request`.
    ///
    /// # Arguments
    /// * `request` - Payload plus style, error correction, context and cover
    ///
    /// # Returns
    /// `PipelineOutcome::Sealed` with the symbol, optional cover and hash, or
    /// `PipelineOutcome::Blocked` when the payload scored below the threshold.
    /// Render and concealment failures come back as [`PipelineError`].
    pub async fn seal(&self, request: SealRequest) -> Result<PipelineOutcome, PipelineError> {
        self.seal_cancellable(request, &CancellationToken::new())
            .await
    }

    /// Like [`Pipeline::seal`]; cancelling only cuts the semantic call short,
    /// which degrades the score instead of aborting.
    pub async fn seal_cancellable(
        &self,
        request: SealRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let SealRequest {
            payload,
            style,
            error_correction,
            context,
            cover,
            assets,
        } = request;

        // Step 1: Gate
        let cleared = match self
            .scorer
            .evaluate_cancellable(payload, context.as_ref(), cancel)
            .await
        {
            Verdict::Cleared(cleared) => cleared,
            Verdict::Blocked(blocked) => return Ok(PipelineOutcome::Blocked(blocked)),
        };

        // Step 2: Symbol
        let ec = error_correction.unwrap_or(self.default_ec);
        let matrix = BitMatrix::encode(&cleared, ec)?;

        // Step 3: Render
        let symbol =
            render_in_background(self.renderer.clone(), matrix, style, ec, assets).await?;

        // Step 4: Conceal
        let concealed = match cover {
            Some(cover) => Some(conceal_in_background(cover, symbol.clone()).await?),
            None => None,
        };

        // Step 5: Seal
        let hash = ContentHash::of(&cleared);
        let (payload, score) = cleared.into_parts();
        self.audit.record_hash(&payload, &hash);

        info!(
            kind = %payload.kind(),
            final_score = score.final_score,
            hash = %hash,
            width = symbol.width(),
            concealed = concealed.is_some(),
            "pipeline.sealed"
        );

        Ok(PipelineOutcome::Sealed(Box::new(SealedRecord {
            payload,
            score,
            error_correction: ec,
            symbol,
            concealed,
            hash,
        })))
    }
}
