use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use super::NormalizeIssue;

/// The model's answer, as requested by `DIAGNOSIS_PROMPT`.
///
/// Every field is optional. A field with the wrong JSON type, or a blank
/// string, reads as absent rather than failing the whole parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawAnalysis {
    #[serde(default, deserialize_with = "lenient_text")]
    pub presence: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_section")]
    pub color_analysis: Option<ColorAnalysis>,
    #[serde(default, deserialize_with = "lenient_section")]
    pub western_medicine: Option<WesternMedicine>,
    #[serde(default, deserialize_with = "lenient_section")]
    pub tcm: Option<TcmAssessment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ColorAnalysis {
    #[serde(default, deserialize_with = "lenient_text")]
    pub hex: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub rgb: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub transparency: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub viscosity: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub volume: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WesternMedicine {
    #[serde(default, deserialize_with = "lenient_text")]
    pub condition: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub pathology_basis: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub recommendations: Vec<String>,
}

/// Traditional Chinese medicine section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TcmAssessment {
    #[serde(default, deserialize_with = "lenient_text")]
    pub syndrome: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub differentiation: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub recommendations: Vec<String>,
}

impl RawAnalysis {
    /// `color_analysis.description`, if the model gave one.
    pub fn color_description(&self) -> Option<&str> {
        self.color_analysis.as_ref()?.description.as_deref()
    }
}

/// Strict structured parse of the model's raw text.
///
/// Fails with `MalformedResponse` when the text is not JSON or the top-level
/// value is not an object. Missing or mistyped fields are not errors here.
pub fn parse_analysis(raw: &str) -> Result<RawAnalysis, NormalizeIssue> {
    let body = unwrap_code_fence(raw);
    if body.is_empty() {
        return Err(NormalizeIssue::MalformedResponse("empty response".into()));
    }

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| NormalizeIssue::MalformedResponse(e.to_string()))?;

    if !value.is_object() {
        return Err(NormalizeIssue::MalformedResponse(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }

    serde_json::from_value(value).map_err(|e| NormalizeIssue::MalformedResponse(e.to_string()))
}

/// Unwrap a response that is exactly one Markdown code fence.
///
/// Text with anything around the fence is returned as-is (trimmed) and will
/// fail the JSON parse.
fn unwrap_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };
    if inner.contains("```") {
        return trimmed;
    }

    // Drop a language tag such as `json` on the opening line.
    let inner = match inner.split_once('\n') {
        Some((tag, rest)) if !tag.contains('{') && !tag.contains('[') => rest,
        _ => strip_inline_tag(inner),
    };
    inner.trim()
}

/// Drop a tag written on the same line as the body, as in a one-line `json{...}` fence.
fn strip_inline_tag(inner: &str) -> &str {
    let tagless = inner
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .trim_start();
    if tagless.starts_with(['{', '[']) {
        tagless
    } else {
        inner
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Non-blank string, trimmed. Anything else is `None`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => non_blank(&s),
        _ => None,
    })
}

/// Nested object section. Non-objects read as absent.
fn lenient_section<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

/// String array; items that are not non-blank strings are skipped.
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().and_then(non_blank))
            .collect(),
        _ => vec![],
    })
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_response() -> &'static str {
        r##"{
  "presence": "found",
  "location": "鼻孔内缘，左侧鼻翼附近",
  "color_analysis": {
    "hex": "#d4c04a",
    "rgb": "rgb(212, 192, 74)",
    "description": "粘稠黄色，伴有絮状物",
    "transparency": "微混",
    "viscosity": "稠厚",
    "volume": "少量"
  },
  "western_medicine": {
    "condition": "急性细菌性鼻窦炎",
    "pathology_basis": "中性粒细胞>75%+肺炎链球菌阳性",
    "recommendations": ["0.9%盐水冲洗，每日3次，每次10ml", "口服阿莫西林7天"]
  },
  "tcm": {
    "syndrome": "风热犯肺证",
    "differentiation": "舌红苔黄，脉浮数",
    "recommendations": ["桑菊饮加减：桑叶6g，菊花9g", "按摩迎香穴、印堂穴，每次3分钟，每日2次"]
  }
}"##
    }

    #[test]
    fn parse_full_response() {
        let analysis = parse_analysis(full_response()).unwrap();
        assert_eq!(analysis.presence.as_deref(), Some("found"));
        assert_eq!(analysis.location.as_deref(), Some("鼻孔内缘，左侧鼻翼附近"));

        let color = analysis.color_analysis.as_ref().unwrap();
        assert_eq!(color.hex.as_deref(), Some("#d4c04a"));
        assert_eq!(color.viscosity.as_deref(), Some("稠厚"));
        assert_eq!(analysis.color_description(), Some("粘稠黄色，伴有絮状物"));

        let western = analysis.western_medicine.as_ref().unwrap();
        assert_eq!(western.condition.as_deref(), Some("急性细菌性鼻窦炎"));
        assert_eq!(western.recommendations.len(), 2);

        let tcm = analysis.tcm.as_ref().unwrap();
        assert_eq!(tcm.syndrome.as_deref(), Some("风热犯肺证"));
        assert_eq!(tcm.recommendations.len(), 2);
    }

    #[test]
    fn parse_empty_object() {
        let analysis = parse_analysis("{}").unwrap();
        assert_eq!(analysis, RawAnalysis::default());
    }

    #[test]
    fn parse_invalid_json_is_malformed() {
        let result = parse_analysis("抱歉，我无法解析。");
        assert!(matches!(result, Err(NormalizeIssue::MalformedResponse(_))));

        let result = parse_analysis(r#"{"presence": "found", "location": "#);
        assert!(matches!(result, Err(NormalizeIssue::MalformedResponse(_))));
    }

    #[test]
    fn parse_non_object_is_malformed() {
        for input in ["[1, 2]", "\"found\"", "42", "null"] {
            let err = parse_analysis(input).unwrap_err();
            assert!(
                matches!(&err, NormalizeIssue::MalformedResponse(msg) if msg.contains("expected a JSON object")),
                "{input}: {err}"
            );
        }
    }

    #[test]
    fn parse_blank_is_malformed() {
        assert!(parse_analysis("").is_err());
        assert!(parse_analysis("   \n ").is_err());
    }

    #[test]
    fn wrong_types_read_as_absent() {
        let analysis = parse_analysis(
            r#"{"presence": true, "location": 3, "color_analysis": "yellow", "western_medicine": {"condition": ["x"], "recommendations": "drink water"}, "tcm": null}"#,
        )
        .unwrap();
        assert!(analysis.presence.is_none());
        assert!(analysis.location.is_none());
        assert!(analysis.color_analysis.is_none());
        let western = analysis.western_medicine.unwrap();
        assert!(western.condition.is_none());
        assert!(western.recommendations.is_empty());
        assert!(analysis.tcm.is_none());
    }

    #[test]
    fn blank_strings_read_as_absent_and_values_are_trimmed() {
        let analysis = parse_analysis(
            r#"{"location": "   ", "color_analysis": {"description": "  黄色  "}}"#,
        )
        .unwrap();
        assert!(analysis.location.is_none());
        assert_eq!(analysis.color_description(), Some("黄色"));
    }

    #[test]
    fn lenient_list_skips_bad_items() {
        let analysis = parse_analysis(
            r#"{"tcm": {"recommendations": ["按摩迎香穴", 7, null, "", {"a": 1}, " 多饮水 "]}}"#,
        )
        .unwrap();
        assert_eq!(
            analysis.tcm.unwrap().recommendations,
            vec!["按摩迎香穴".to_string(), "多饮水".to_string()]
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let analysis =
            parse_analysis(r#"{"presence": "not_found", "confidence": 0.3, "notes": "n/a"}"#).unwrap();
        assert_eq!(analysis.presence.as_deref(), Some("not_found"));
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let fenced = format!("```json\n{}\n```", full_response());
        let analysis = parse_analysis(&fenced).unwrap();
        assert_eq!(analysis.presence.as_deref(), Some("found"));

        let bare_fence = "```\n{\"presence\": \"found\"}\n```";
        assert_eq!(parse_analysis(bare_fence).unwrap().presence.as_deref(), Some("found"));
    }

    #[test]
    fn prose_around_json_is_malformed() {
        let wrapped = format!("这是分析结果：\n{}", full_response());
        assert!(parse_analysis(&wrapped).is_err());

        let fenced_with_prose = format!("```json\n{}\n```\n以上仅供参考。", full_response());
        assert!(parse_analysis(&fenced_with_prose).is_err());
    }

    #[test]
    fn unwrap_code_fence_leaves_plain_text() {
        assert_eq!(unwrap_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(unwrap_code_fence("```"), "```");
        assert_eq!(unwrap_code_fence("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn one_line_fence_with_tag_is_unwrapped() {
        assert_eq!(unwrap_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(unwrap_code_fence("```JSON {\"a\":1} ```"), "{\"a\":1}");
        let analysis = parse_analysis(r#"```json{"presence":"found","location":"左侧鼻孔"}```"#).unwrap();
        assert_eq!(analysis.presence.as_deref(), Some("found"));
        assert_eq!(analysis.location.as_deref(), Some("左侧鼻孔"));
    }
}
