use super::types::{DiagnosticRecord, Presence};

/// Plain-text rendering of a record with the product's Chinese section labels.
///
/// Location is shown only for a positive detection.
pub fn render_text(record: &DiagnosticRecord) -> String {
    let mut lines = Vec::with_capacity(12);

    lines.push("【鼻涕检测】".to_string());
    let verdict = match record.presence {
        Presence::Found => "已检测到鼻涕",
        Presence::NotFound => "未检测到鼻涕",
    };
    lines.push(format!("检测结果：{verdict}"));
    if let (Presence::Found, Some(location)) = (record.presence, &record.location) {
        lines.push(format!("位置：{location}"));
    }

    lines.push(format!("颜色特征：{}", record.color_description));
    lines.push(format!("可能症状：{}", record.condition));
    lines.push(String::new());
    lines.push("【护理建议】".to_string());
    lines.push(format!("基本建议：{}", record.primary_recommendation));
    lines.push(format!("西医解释：{}", record.pathology_basis));
    lines.push(format!("中医辨证：{}", record.traditional_assessment));
    lines.push(format!("物理疗法：{}", record.physical_care_note));

    lines.join("\n")
}
