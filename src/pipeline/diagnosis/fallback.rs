//! Fallback knowledge base: pre-authored records per colour category.
//!
//! Used whenever the model's answer is missing a field or cannot be parsed at
//! all. The table is a `static` and never mutated; callers get owned copies.

use super::types::{ColorCategory, DiagnosticRecord, Presence, RecordField};

/// Pre-authored template for one colour category.
#[derive(Debug, PartialEq, Eq)]
pub struct FallbackEntry {
    pub category: ColorCategory,
    pub color: &'static str,
    pub condition: &'static str,
    pub recommendation: &'static str,
    pub pathology_basis: &'static str,
    pub traditional: &'static str,
    pub physical_care: &'static str,
}

impl FallbackEntry {
    /// Owned record built from the template. Presence is `NotFound` and no location.
    pub fn to_record(&self) -> DiagnosticRecord {
        DiagnosticRecord {
            presence: Presence::NotFound,
            location: None,
            color_description: self.color.to_string(),
            condition: self.condition.to_string(),
            primary_recommendation: self.recommendation.to_string(),
            pathology_basis: self.pathology_basis.to_string(),
            traditional_assessment: self.traditional.to_string(),
            physical_care_note: self.physical_care.to_string(),
        }
    }

    /// Template text for a single record field.
    pub fn field(&self, field: RecordField) -> &'static str {
        match field {
            RecordField::ColorDescription => self.color,
            RecordField::Condition => self.condition,
            RecordField::PrimaryRecommendation => self.recommendation,
            RecordField::PathologyBasis => self.pathology_basis,
            RecordField::TraditionalAssessment => self.traditional,
            RecordField::PhysicalCareNote => self.physical_care,
        }
    }
}

const CILIARY_BASIS: &str =
    "鼻腔黏膜的炎症反应，纤毛摆动频率从正常8-12Hz降至4-6Hz，黏液清除效率降低60%";
const PHYSICAL_CARE: &str = "移走鼻涕，减轻堵塞，通气";

static FALLBACK_TABLE: [FallbackEntry; 4] = [
    FallbackEntry {
        category: ColorCategory::Clear,
        color: "清澈透明",
        condition: "过敏性鼻炎",
        recommendation: "佩戴口罩、避免过敏源、定期冲洗",
        pathology_basis: CILIARY_BASIS,
        traditional: "鼻渊，肺气虚弱，脾虚湿阻，肾阳不足",
        physical_care: PHYSICAL_CARE,
    },
    FallbackEntry {
        category: ColorCategory::Yellow,
        color: "黄色",
        condition: "轻度感染",
        recommendation: "补充水分、定期护理、观察症状变化",
        pathology_basis: CILIARY_BASIS,
        traditional: "风热犯肺，湿浊壅塞",
        physical_care: PHYSICAL_CARE,
    },
    FallbackEntry {
        category: ColorCategory::Green,
        color: "绿色",
        condition: "细菌感染",
        recommendation: "建议就医，可能需要抗生素",
        pathology_basis: CILIARY_BASIS,
        traditional: "风热犯肺，湿浊壅塞",
        physical_care: PHYSICAL_CARE,
    },
    FallbackEntry {
        category: ColorCategory::Red,
        color: "带血",
        condition: "毛细血管破裂",
        recommendation: "减少冲洗频率、避免鼻腔干燥",
        pathology_basis: CILIARY_BASIS,
        traditional: "风热犯肺，肺经热盛",
        physical_care: PHYSICAL_CARE,
    },
];

/// Look up the template for a category.
pub fn entry(category: ColorCategory) -> &'static FallbackEntry {
    match category {
        ColorCategory::Clear => &FALLBACK_TABLE[0],
        ColorCategory::Yellow => &FALLBACK_TABLE[1],
        ColorCategory::Green => &FALLBACK_TABLE[2],
        ColorCategory::Red => &FALLBACK_TABLE[3],
    }
}

/// All templates, in table order.
pub fn entries() -> &'static [FallbackEntry] {
    &FALLBACK_TABLE
}

/// Keyword hints per category. Chinese and English sets are both kept:
/// the model is asked to answer in Chinese but does not always comply.
fn keywords(category: ColorCategory) -> &'static [&'static str] {
    match category {
        ColorCategory::Yellow => &["黄", "yellow"],
        ColorCategory::Green => &["绿", "green"],
        ColorCategory::Red => &["血", "red", "blood"],
        ColorCategory::Clear => &["清", "透明", "clear"],
    }
}

/// Word endings accepted after an English keyword ("reddish", "bloody").
const ENGLISH_SUFFIXES: &[&str] = &["", "ish", "dish", "y", "ness"];

/// Scan text for colour hints in `ColorCategory::SCAN_ORDER`.
///
/// Case-insensitive. Returns `None` when nothing matches so the caller can
/// report it before defaulting to `Clear`.
pub fn detect_category(text: &str) -> Option<ColorCategory> {
    let lowered = text.to_lowercase();
    ColorCategory::SCAN_ORDER
        .into_iter()
        .find(|category| keywords(*category).iter().any(|kw| contains_keyword(&lowered, kw)))
}

/// Chinese keywords match anywhere. English keywords must start a word and
/// end it or carry one of `ENGLISH_SUFFIXES`, so "scattered" is not "red".
fn contains_keyword(text: &str, keyword: &str) -> bool {
    if !keyword.is_ascii() {
        return text.contains(keyword);
    }
    text.match_indices(keyword).any(|(start, _)| {
        let starts_word = text[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_ascii_alphabetic());
        let tail: String = text[start + keyword.len()..]
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        starts_word && ENGLISH_SUFFIXES.contains(&tail.as_str())
    })
}

/// `detect_category`, defaulting to `Clear`.
pub fn category_for(text: &str) -> ColorCategory {
    detect_category(text).unwrap_or(ColorCategory::Clear)
}
