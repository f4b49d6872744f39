pub mod types;
pub mod prompt;
pub mod parser;
pub mod fallback;
pub mod location;
pub mod normalizer;
pub mod gemini;
pub mod upload;
pub mod render;
pub mod analyzer;


pub use types::*;
pub use prompt::*;
pub use parser::*;
pub use fallback::*;
pub use location::*;
pub use normalizer::*;
pub use gemini::*;
pub use upload::*;
pub use render::*;
pub use analyzer::*;

use serde::Serialize;
use thiserror::Error;

/// Problems recovered from while normalizing a model answer.
///
/// Never returned as `Err`: they are carried on `NormalizeOutcome` and logged.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeIssue {
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Model response is missing fields: {0:?}")]
    PartialResponse(Vec<RecordField>),

    #[error("No colour keyword matched; using the clear template")]
    NoMatchableCategory,
}

/// Failures of the upload → classify path. Normalization itself never fails.
#[derive(Error, Debug)]
pub enum DiagnosisError {
    #[error("No image was provided")]
    EmptyImage,

    #[error("Unsupported file type '{0}' — upload a JPG or PNG image")]
    UnsupportedFormat(String),

    #[error("Image too large ({0} bytes) — maximum is 20 MB")]
    ImageTooLarge(usize),

    #[error("Invalid image data URL: {0}")]
    InvalidDataUrl(String),

    #[error("Image data is not valid base64: {0}")]
    InvalidImageData(String),

    #[error("Image classifier failed: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiagnosisError {
    /// Patient-facing message shown in place of a result.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyImage | Self::Io(_) => "未找到图片文件",
            Self::UnsupportedFormat(_) => "仅支持JPG/PNG图片格式",
            Self::InvalidDataUrl(_) | Self::InvalidImageData(_) => "无法解析图片数据",
            Self::ImageTooLarge(_) => "图片过大，请上传20MB以内的图片",
            Self::Classifier(err) => err.user_message(),
        }
    }
}
