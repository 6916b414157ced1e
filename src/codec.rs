use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{MockupError, MockupResult};

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

const IMAGE_PREFIX: &str = "image/";

// extension -> declared media type
const EXTENSION_MIME: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
];

/// Wraps raw bytes into a `data:{mime};base64,...` payload.
///
/// Anything that does not declare an `image/*` type is rejected before it can
/// reach the model.
pub fn encode_to_data_payload(bytes: &[u8], mime: &str) -> MockupResult<String> {
    if !mime.starts_with(IMAGE_PREFIX) {
        return Err(MockupError::UnsupportedMediaKind(mime.to_string()));
    }
    Ok(wrap_envelope(mime, &B64.encode(bytes)))
}

pub fn wrap_envelope(mime: &str, b64: &str) -> String {
    format!("data:{mime};base64,{b64}")
}

/// Returns the base-64 body of a data URL, or the input when it has no envelope.
pub fn strip_envelope(payload: &str) -> &str {
    if payload.starts_with("data:") {
        if let Some(idx) = payload.find(',') {
            return &payload[(idx + 1)..];
        }
    }
    payload
}

pub fn envelope_mime(payload: &str) -> Option<&str> {
    let header = payload.strip_prefix("data:")?;
    let end = header.find(',')?;
    let mime = header[..end].split(';').next()?;
    if mime.is_empty() {
        None
    } else {
        Some(mime)
    }
}

pub fn decode_payload(payload: &str) -> MockupResult<Vec<u8>> {
    B64.decode(strip_envelope(payload).trim())
        .map_err(|e| MockupError::InvalidPayload(format!("base64 decode: {e}")))
}

pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    // PNG
    if bytes.len() >= 8 && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Some("image/png");
    }
    // JPEG
    if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        return Some("image/jpeg");
    }
    // WEBP (RIFF....WEBP)
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.len() >= 6 && (&bytes[0..6] == b"GIF87a" || &bytes[0..6] == b"GIF89a") {
        return Some("image/gif");
    }
    None
}

pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    EXTENSION_MIME
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Reads a local file and turns it into a logo/image payload.
///
/// The declared type comes from the file extension, then from the leading
/// bytes when the extension is unknown.
pub async fn load_image_file(path: &Path) -> MockupResult<String> {
    let bytes = tokio::fs::read(path).await?;
    let mime = mime_from_path(path)
        .or_else(|| sniff_image_mime(&bytes))
        .unwrap_or("application/octet-stream");
    match encode_to_data_payload(&bytes, mime) {
        Ok(payload) => {
            debug!(path = %path.display(), mime, size = bytes.len(), "image file accepted");
            Ok(payload)
        }
        Err(e) => {
            warn!(path = %path.display(), mime, "rejected non-image file");
            Err(e)
        }
    }
}
