//! Two-tier normalization of the model's answer into a `DiagnosticRecord`.
//!
//! Tier 1 (`structured_match`): the answer parsed as JSON. Each missing field
//! is filled from the fallback template of the colour category detected in
//! `color_analysis.description`.
//!
//! Tier 2 (`fallback_match`): the answer is not usable JSON. The whole record
//! comes from the template of the colour detected in the raw text, plus a
//! location phrase when one can be found.
//!
//! Neither tier can fail. Problems are reported as `NormalizeIssue`s on the
//! outcome and in the logs, never to the user.

use serde::Serialize;

use super::fallback::{self, FallbackEntry};
use super::location::extract_location;
use super::parser::{parse_analysis, RawAnalysis, TcmAssessment};
use super::types::{ColorCategory, DiagnosticRecord, MatchTier, Presence, RecordField};
use super::NormalizeIssue;

/// Joins western-medicine recommendations.
pub const RECOMMENDATION_DELIMITER: &str = "、";
/// Joins TCM recommendations.
pub const TCM_RECOMMENDATION_DELIMITER: &str = "；";
/// Prefix for the joined TCM recommendations.
pub const TCM_RECOMMENDATION_LABEL: &str = "推荐：";
/// Joins syndrome, differentiation and recommendations.
pub const TCM_PART_SEPARATOR: &str = "，";

/// Result of normalizing one answer, tagged by the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum NormalizeOutcome {
    StructuredMatch {
        record: DiagnosticRecord,
        category: ColorCategory,
        /// Fields sourced from the category template instead of the answer.
        defaulted: Vec<RecordField>,
        category_matched: bool,
    },
    FallbackMatch {
        record: DiagnosticRecord,
        category: ColorCategory,
        reason: NormalizeIssue,
        category_matched: bool,
        location_extracted: bool,
    },
}

impl NormalizeOutcome {
    pub fn record(&self) -> &DiagnosticRecord {
        match self {
            Self::StructuredMatch { record, .. } | Self::FallbackMatch { record, .. } => record,
        }
    }

    pub fn into_record(self) -> DiagnosticRecord {
        match self {
            Self::StructuredMatch { record, .. } | Self::FallbackMatch { record, .. } => record,
        }
    }

    pub fn category(&self) -> ColorCategory {
        match self {
            Self::StructuredMatch { category, .. } | Self::FallbackMatch { category, .. } => {
                *category
            }
        }
    }

    pub fn tier(&self) -> MatchTier {
        match self {
            Self::StructuredMatch { .. } => MatchTier::Structured,
            Self::FallbackMatch { .. } => MatchTier::Fallback,
        }
    }

    /// Everything that was recovered from while producing the record.
    pub fn issues(&self) -> Vec<NormalizeIssue> {
        let mut issues = Vec::new();
        match self {
            Self::StructuredMatch {
                defaulted,
                category_matched,
                ..
            } => {
                if !defaulted.is_empty() {
                    issues.push(NormalizeIssue::PartialResponse(defaulted.clone()));
                    // The category only matters when a template field was used.
                    if !category_matched {
                        issues.push(NormalizeIssue::NoMatchableCategory);
                    }
                }
            }
            Self::FallbackMatch {
                reason,
                category_matched,
                ..
            } => {
                issues.push(reason.clone());
                if !category_matched {
                    issues.push(NormalizeIssue::NoMatchableCategory);
                }
            }
        }
        issues
    }
}

/// Normalize the model's raw answer. Total: always returns a usable record.
pub fn normalize(raw: &str) -> DiagnosticRecord {
    normalize_outcome(raw).into_record()
}

/// Normalize and keep the tier/category metadata.
pub fn normalize_outcome(raw: &str) -> NormalizeOutcome {
    let outcome = match parse_analysis(raw) {
        Ok(analysis) => structured_match(&analysis),
        Err(reason) => fallback_match(raw, reason),
    };

    match &outcome {
        NormalizeOutcome::StructuredMatch { defaulted, category, .. } => {
            if defaulted.is_empty() {
                tracing::debug!(category = %category, "Model answer fully structured");
            } else {
                tracing::debug!(
                    category = %category,
                    defaulted = ?defaulted,
                    "Model answer partially structured; missing fields filled from template"
                );
            }
        }
        NormalizeOutcome::FallbackMatch {
            category,
            reason,
            location_extracted,
            ..
        } => {
            // Raw text is health data: log its size, never its content.
            tracing::warn!(
                category = %category,
                location_extracted,
                raw_len = raw.len(),
                reason = %reason,
                "Model answer unusable; using fallback template"
            );
        }
    }

    outcome
}

/// Tier 1: build a record from a parsed answer, defaulting per field.
pub fn structured_match(analysis: &RawAnalysis) -> NormalizeOutcome {
    let detected = analysis.color_description().and_then(fallback::detect_category);
    let category = detected.unwrap_or(ColorCategory::Clear);
    let template = fallback::entry(category);

    let presence = analysis
        .presence
        .as_deref()
        .map(Presence::from_wire)
        .unwrap_or_default();
    let location = match presence {
        Presence::Found => analysis.location.clone(),
        Presence::NotFound => None,
    };

    let western = analysis.western_medicine.as_ref();
    let recommendations = western
        .filter(|w| !w.recommendations.is_empty())
        .map(|w| w.recommendations.join(RECOMMENDATION_DELIMITER));

    let mut filler = TemplateFiller::new(template);
    let record = DiagnosticRecord {
        presence,
        location,
        color_description: filler.fill(
            analysis.color_description().map(str::to_string),
            RecordField::ColorDescription,
        ),
        condition: filler.fill(
            western.and_then(|w| w.condition.clone()),
            RecordField::Condition,
        ),
        primary_recommendation: filler
            .fill(recommendations.clone(), RecordField::PrimaryRecommendation),
        pathology_basis: filler.fill(
            western.and_then(|w| w.pathology_basis.clone()),
            RecordField::PathologyBasis,
        ),
        traditional_assessment: filler.fill(
            analysis.tcm.as_ref().and_then(compose_traditional),
            RecordField::TraditionalAssessment,
        ),
        physical_care_note: filler.fill(recommendations, RecordField::PhysicalCareNote),
    };

    NormalizeOutcome::StructuredMatch {
        record,
        category,
        defaulted: filler.defaulted,
        category_matched: detected.is_some(),
    }
}

/// Tier 2: the whole record comes from the template matched in the raw text.
pub fn fallback_match(raw: &str, reason: NormalizeIssue) -> NormalizeOutcome {
    let detected = fallback::detect_category(raw);
    let category = detected.unwrap_or(ColorCategory::Clear);
    let mut record = fallback::entry(category).to_record();

    let location = extract_location(raw);
    let location_extracted = location.is_some();
    if location_extracted {
        record.presence = Presence::Found;
        record.location = location;
    }

    NormalizeOutcome::FallbackMatch {
        record,
        category,
        reason,
        category_matched: detected.is_some(),
        location_extracted,
    }
}

/// `syndrome，differentiation，推荐：a；b`, skipping missing parts.
fn compose_traditional(tcm: &TcmAssessment) -> Option<String> {
    let mut parts: Vec<String> = Vec::with_capacity(3);
    if let Some(syndrome) = &tcm.syndrome {
        parts.push(syndrome.clone());
    }
    if let Some(differentiation) = &tcm.differentiation {
        parts.push(differentiation.clone());
    }
    if !tcm.recommendations.is_empty() {
        parts.push(format!(
            "{TCM_RECOMMENDATION_LABEL}{}",
            tcm.recommendations.join(TCM_RECOMMENDATION_DELIMITER)
        ));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(TCM_PART_SEPARATOR))
    }
}

/// Takes parsed values, falling back to a template and recording which fields it filled.
struct TemplateFiller {
    template: &'static FallbackEntry,
    defaulted: Vec<RecordField>,
}

impl TemplateFiller {
    fn new(template: &'static FallbackEntry) -> Self {
        Self {
            template,
            defaulted: Vec::new(),
        }
    }

    fn fill(&mut self, parsed: Option<String>, field: RecordField) -> String {
        match parsed.filter(|value| !value.trim().is_empty()) {
            Some(value) => value,
            None => {
                self.defaulted.push(field);
                self.template.field(field).to_string()
            }
        }
    }
}
