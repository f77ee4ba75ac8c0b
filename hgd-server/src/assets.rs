//! Uploaded image decoding
//!
//! Browsers submit images as `data:image/<kind>;base64,<payload>` strings
//! (FileReader.readAsDataURL). A bare base64 payload is accepted as well.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Maximum accepted request body, sized for base64-encoded photos
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("Image data is empty")]
    Empty,

    #[error("Malformed data URL: {0}")]
    MalformedDataUrl(String),

    #[error("Image data is not valid base64: {0}")]
    InvalidBase64(String),
}

/// Decoded image bytes plus the file extension to store them under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

/// Decode a data URL or bare base64 string
pub fn decode_image(data: &str) -> Result<DecodedImage, AssetError> {
    let data = data.trim();
    if data.is_empty() {
        return Err(AssetError::Empty);
    }

    let (extension, payload) = match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| AssetError::MalformedDataUrl("missing ',' separator".into()))?;
            if !header.ends_with(";base64") {
                return Err(AssetError::MalformedDataUrl(
                    "only base64-encoded data URLs are supported".into(),
                ));
            }
            let mime = header.trim_end_matches(";base64");
            (extension_for_mime(mime), payload)
        }
        None => ("jpg", data),
    };

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(AssetError::Empty);
    }

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| AssetError::InvalidBase64(e.to_string()))?;

    Ok(DecodedImage { bytes, extension })
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_png_data_url() {
        let decoded = decode_image("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(decoded.bytes, b"hello");
        assert_eq!(decoded.extension, "png");
    }

    #[test]
    fn test_decode_jpeg_and_bare_payload_default_to_jpg() {
        assert_eq!(
            decode_image("data:image/jpeg;base64,aGVsbG8=").unwrap().extension,
            "jpg"
        );
        let bare = decode_image("aGVs\nbG8=").unwrap();
        assert_eq!(bare.bytes, b"hello");
        assert_eq!(bare.extension, "jpg");
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert_eq!(decode_image("  "), Err(AssetError::Empty));
        assert_eq!(decode_image("data:image/png;base64,"), Err(AssetError::Empty));
        assert!(matches!(
            decode_image("data:image/png;base64"),
            Err(AssetError::MalformedDataUrl(_))
        ));
        assert!(matches!(
            decode_image("data:text/plain,hello"),
            Err(AssetError::MalformedDataUrl(_))
        ));
        assert!(matches!(
            decode_image("data:image/png;base64,@@@"),
            Err(AssetError::InvalidBase64(_))
        ));
    }
}
