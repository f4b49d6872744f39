use std::sync::LazyLock;

use regex::Regex;

/// Location phrases a free-text answer may contain, tried in order.
/// Each captures up to the next sentence boundary or line end.
static LOCATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // 位置：鼻孔内缘
        Regex::new(r"位置[：:]([^。\n]*)").expect("valid regex"),
        // Location: left nostril rim
        Regex::new(r"(?i)location[：:]([^.\n]*)").expect("valid regex"),
        // 鼻涕主要集中在左侧鼻孔; the 在 of 存在 is not a location marker
        Regex::new(r"鼻涕(?:.*?[^存\n])?在([^。\n]*)").expect("valid regex"),
    ]
});

/// Best-effort location extraction from an unstructured answer.
///
/// Returns the first non-blank capture, trimmed.
pub fn extract_location(text: &str) -> Option<String> {
    LOCATION_PATTERNS.iter().find_map(|pattern| {
        let captured = pattern.captures(text)?.get(1)?.as_str().trim();
        (!captured.is_empty()).then(|| captured.to_string())
    })
}
