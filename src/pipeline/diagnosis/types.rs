use serde::{Deserialize, Serialize};

use super::gemini::ClassifierError;

/// Whether nasal secretion was detected in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Found,
    #[default]
    NotFound,
}

impl Presence {
    /// Interpret the model's `presence` value. Only `"found"` counts as found.
    pub fn from_wire(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("found") {
            Self::Found
        } else {
            Self::NotFound
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::NotFound => "not_found",
        }
    }
}

/// Coarse colour bucket used only to pick a fallback template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorCategory {
    Clear,
    Yellow,
    Green,
    Red,
}

impl ColorCategory {
    /// Scan order for keyword matching. First hit wins; `Clear` is also the default.
    pub const SCAN_ORDER: [ColorCategory; 4] = [
        ColorCategory::Yellow,
        ColorCategory::Green,
        ColorCategory::Red,
        ColorCategory::Clear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Red => "red",
        }
    }
}

impl std::fmt::Display for ColorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized diagnosis shown to the user.
///
/// Every field except `location` is always non-empty. `location` is only
/// set when `presence` is `Found`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticRecord {
    pub presence: Presence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub color_description: String,
    pub condition: String,
    pub primary_recommendation: String,
    pub pathology_basis: String,
    pub traditional_assessment: String,
    pub physical_care_note: String,
}

/// Record fields that can be sourced from the fallback table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    ColorDescription,
    Condition,
    PrimaryRecommendation,
    PathologyBasis,
    TraditionalAssessment,
    PhysicalCareNote,
}

/// Which tier of the normalizer produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Structured,
    Fallback,
}

/// An image ready for the classifier: base64 payload plus MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub base64_data: String,
    /// Size of the decoded image in bytes.
    pub byte_len: usize,
}

/// Remote multimodal model abstraction (allows mocking).
///
/// Returns the model's free-form text. Callers treat it as untrusted.
pub trait ImageClassifier: Send + Sync {
    fn classify_image(&self, image: &EncodedImage, prompt: &str) -> Result<String, ClassifierError>;

    /// Model identifier for logging and reports.
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_from_wire_values() {
        assert_eq!(Presence::from_wire("found"), Presence::Found);
        assert_eq!(Presence::from_wire(" FOUND "), Presence::Found);
        assert_eq!(Presence::from_wire("not_found"), Presence::NotFound);
        assert_eq!(Presence::from_wire("maybe"), Presence::NotFound);
        assert_eq!(Presence::from_wire(""), Presence::NotFound);
    }

    #[test]
    fn presence_serializes_as_wire_value() {
        assert_eq!(serde_json::to_string(&Presence::Found).unwrap(), "\"found\"");
        assert_eq!(serde_json::to_string(&Presence::NotFound).unwrap(), "\"not_found\"");
        assert_eq!(Presence::default(), Presence::NotFound);
    }

    #[test]
    fn scan_order_puts_clear_last() {
        assert_eq!(ColorCategory::SCAN_ORDER[0], ColorCategory::Yellow);
        assert_eq!(ColorCategory::SCAN_ORDER[3], ColorCategory::Clear);
    }

    #[test]
    fn record_skips_absent_location() {
        let record = DiagnosticRecord {
            presence: Presence::NotFound,
            location: None,
            color_description: "c".into(),
            condition: "c".into(),
            primary_recommendation: "r".into(),
            pathology_basis: "p".into(),
            traditional_assessment: "t".into(),
            physical_care_note: "n".into(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("location"));
        assert!(json.contains("\"colorDescription\":\"c\""));
        assert!(json.contains("\"presence\":\"not_found\""));
    }
}
