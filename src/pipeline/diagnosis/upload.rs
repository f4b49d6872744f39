use std::path::Path;

use base64::Engine as _;

use super::types::EncodedImage;
use super::DiagnosisError;

/// Maximum decoded image size accepted for analysis.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Validate raw image bytes and encode them for the classifier.
pub fn prepare_image(bytes: &[u8], mime_type: &str) -> Result<EncodedImage, DiagnosisError> {
    let mime_type = check_mime(mime_type)?;
    check_size(bytes.len())?;

    Ok(EncodedImage {
        mime_type,
        base64_data: base64::engine::general_purpose::STANDARD.encode(bytes),
        byte_len: bytes.len(),
    })
}

/// Parse a browser-style `data:image/png;base64,...` URL.
pub fn from_data_url(url: &str) -> Result<EncodedImage, DiagnosisError> {
    let (header, payload) = url
        .trim()
        .split_once(',')
        .ok_or_else(|| DiagnosisError::InvalidDataUrl("missing ',' separator".into()))?;

    let header = header
        .strip_prefix("data:")
        .ok_or_else(|| DiagnosisError::InvalidDataUrl("missing 'data:' prefix".into()))?;
    let mut params = header.split(';');
    let mime_type = params.next().unwrap_or_default();
    if !mime_type.starts_with("image/") {
        return Err(DiagnosisError::UnsupportedFormat(mime_type.to_string()));
    }
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(DiagnosisError::InvalidDataUrl("payload is not base64".into()));
    }

    let payload = payload.trim();
    if payload.is_empty() {
        return Err(DiagnosisError::InvalidDataUrl("empty payload".into()));
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| DiagnosisError::InvalidImageData(e.to_string()))?;
    let mime_type = check_mime(mime_type)?;
    check_size(decoded.len())?;

    Ok(EncodedImage {
        mime_type,
        base64_data: payload.to_string(),
        byte_len: decoded.len(),
    })
}

/// MIME type guessed from the file extension.
pub fn mime_from_path(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Read an image file from disk and prepare it.
pub fn load_image(path: &Path) -> Result<EncodedImage, DiagnosisError> {
    let bytes = std::fs::read(path)?;
    prepare_image(&bytes, &mime_from_path(path))
}

fn check_mime(mime_type: &str) -> Result<String, DiagnosisError> {
    let normalized = mime_type.trim().to_ascii_lowercase();
    if normalized.starts_with("image/") && normalized.len() > "image/".len() {
        Ok(normalized)
    } else {
        Err(DiagnosisError::UnsupportedFormat(mime_type.to_string()))
    }
}

fn check_size(len: usize) -> Result<(), DiagnosisError> {
    if len == 0 {
        return Err(DiagnosisError::EmptyImage);
    }
    if len > MAX_IMAGE_BYTES {
        return Err(DiagnosisError::ImageTooLarge(len));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_encodes_standard_base64() {
        let image = prepare_image(b"hello", "image/png").unwrap();
        assert_eq!(image.base64_data, "aGVsbG8=");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.byte_len, 5);
    }

    #[test]
    fn prepare_normalizes_mime_case() {
        let image = prepare_image(b"x", " Image/JPEG ").unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[test]
    fn prepare_rejects_non_images() {
        for mime in ["application/pdf", "text/plain", "", "image/"] {
            assert!(
                matches!(prepare_image(b"x", mime), Err(DiagnosisError::UnsupportedFormat(_))),
                "{mime}"
            );
        }
    }

    #[test]
    fn prepare_rejects_empty_and_oversized() {
        assert!(matches!(prepare_image(b"", "image/png"), Err(DiagnosisError::EmptyImage)));

        let big = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(matches!(
            prepare_image(&big, "image/png"),
            Err(DiagnosisError::ImageTooLarge(n)) if n == MAX_IMAGE_BYTES + 1
        ));
    }

    #[test]
    fn data_url_round_trip() {
        let image = from_data_url("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.base64_data, "aGVsbG8=");
        assert_eq!(image.byte_len, 5);
    }

    #[test]
    fn data_url_errors() {
        assert!(matches!(
            from_data_url("aGVsbG8="),
            Err(DiagnosisError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            from_data_url("blob:image/png,aGVsbG8="),
            Err(DiagnosisError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            from_data_url("data:application/pdf;base64,aGVsbG8="),
            Err(DiagnosisError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            from_data_url("data:image/png,rawbytes"),
            Err(DiagnosisError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            from_data_url("data:image/png;base64,"),
            Err(DiagnosisError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            from_data_url("data:image/png;base64,@@@"),
            Err(DiagnosisError::InvalidImageData(_))
        ));
    }

    #[test]
    fn mime_guessed_from_extension() {
        assert_eq!(mime_from_path(Path::new("nose.JPG")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("nose.png")), "image/png");
        assert_eq!(mime_from_path(Path::new("notes")), "application/octet-stream");
    }

    #[test]
    fn load_image_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nose.png");
        std::fs::write(&path, b"\x89PNG fake").unwrap();

        let image = load_image(&path).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.byte_len, 9);
    }

    #[test]
    fn load_image_missing_file_is_io_error() {
        let result = load_image(Path::new("/nonexistent/nose.png"));
        assert!(matches!(result, Err(DiagnosisError::Io(_))));
    }
}
