//! Upload → classify → normalize orchestrator.
//!
//! The only failures surfaced here are upload validation and the remote call.
//! Whatever text comes back is normalized into a usable record.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::normalizer::normalize_outcome;
use super::prompt::DIAGNOSIS_PROMPT;
use super::types::{ColorCategory, DiagnosticRecord, EncodedImage, ImageClassifier, MatchTier};
use super::upload::prepare_image;
use super::{DiagnosisError, NormalizeIssue};

/// Result of one analysis, with the record and how it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub model: String,
    pub tier: MatchTier,
    pub category: ColorCategory,
    pub issues: Vec<NormalizeIssue>,
    pub elapsed_ms: u64,
    pub record: DiagnosticRecord,
}

/// Nasal photo analyzer backed by any `ImageClassifier`.
pub struct NasalImageAnalyzer {
    classifier: Arc<dyn ImageClassifier>,
}

impl NasalImageAnalyzer {
    pub fn new(classifier: Arc<dyn ImageClassifier>) -> Self {
        Self { classifier }
    }

    /// Validate, encode and analyze raw image bytes.
    pub fn analyze(&self, bytes: &[u8], mime_type: &str) -> Result<AnalysisReport, DiagnosisError> {
        let image = prepare_image(bytes, mime_type)?;
        self.analyze_encoded(&image)
    }

    /// Analyze an already-encoded image.
    pub fn analyze_encoded(&self, image: &EncodedImage) -> Result<AnalysisReport, DiagnosisError> {
        let model = self.classifier.model_name().to_string();
        let _span = tracing::info_span!(
            "nasal_image_analysis",
            model = %model,
            image_size = image.byte_len,
            mime = %image.mime_type,
        )
        .entered();
        let start = Instant::now();

        let raw = self
            .classifier
            .classify_image(image, DIAGNOSIS_PROMPT)
            .map_err(|e| {
                tracing::warn!(error = %e, "Image classification failed");
                e
            })?;

        let outcome = normalize_outcome(&raw);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            tier = ?outcome.tier(),
            category = %outcome.category(),
            response_len = raw.len(),
            elapsed_ms,
            "Nasal image analysis complete"
        );

        Ok(AnalysisReport {
            analysis_id: Uuid::new_v4(),
            analyzed_at: Utc::now(),
            model,
            tier: outcome.tier(),
            category: outcome.category(),
            issues: outcome.issues(),
            elapsed_ms,
            record: outcome.into_record(),
        })
    }
}
