//! Image-data references shared by the loader, client and controller.

use base64::Engine;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Prefix of the filename offered when downloading a result.
pub const DOWNLOAD_PREFIX: &str = "Pixly-Result-";

/// Why a `data:` URL could not be turned into an image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataUrlError {
    /// The value does not start with `data:`.
    #[error("not a data URL")]
    NotDataUrl,
    /// The URL carries no `;base64,` marker.
    #[error("data URL is not base64 encoded")]
    NotBase64,
    /// The MIME type is not a supported image format.
    #[error("unsupported image type '{0}'")]
    UnsupportedType(String),
    /// The payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    Payload(#[from] base64::DecodeError),
}

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format.
    WebP,
    /// GIF format.
    Gif,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Attempts to detect format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Parses a MIME type such as `image/jpeg`.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// An encoded image held in memory: usable for preview, submission and download.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("format", &self.format)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl ImageData {
    /// Wraps already-encoded image bytes.
    pub fn new(bytes: Vec<u8>, format: ImageFormat) -> Self {
        Self { bytes, format }
    }

    /// Wraps image bytes, detecting the format from magic bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        let format = ImageFormat::from_magic_bytes(&bytes)?;
        Some(Self::new(bytes, format))
    }

    /// Parses a `data:<mime>;base64,<payload>` URL.
    ///
    /// Whitespace inside the payload and missing padding are tolerated.
    pub fn from_data_url(url: &str) -> Result<Self, DataUrlError> {
        let rest = url.strip_prefix("data:").ok_or(DataUrlError::NotDataUrl)?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or(DataUrlError::NotBase64)?;
        let format = ImageFormat::from_mime_type(mime)
            .ok_or_else(|| DataUrlError::UnsupportedType(mime.to_string()))?;
        let bytes = decode_base64_lenient(payload)?;
        Ok(Self::new(bytes, format))
    }

    /// Raw image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the reference, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Image format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// MIME type of the image.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.to_base64())
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, &self.bytes)
    }
}

/// Filename offered for downloading a result generated now.
pub fn download_filename() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    download_filename_at(millis)
}

/// Filename offered for downloading a result generated at `unix_millis`.
pub fn download_filename_at(unix_millis: u128) -> String {
    format!("{DOWNLOAD_PREFIX}{unix_millis}.png")
}

/// Decodes base64 that may carry whitespace or lack padding.
pub(crate) fn decode_base64_lenient(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let cleaned: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
        return Ok(data);
    }

    base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(cleaned.trim_end_matches('='))
}
