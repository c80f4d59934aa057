//! Local file loader: turns user-selected files into image references.

use crate::error::{PixlyError, Result};
use crate::image::{ImageData, ImageFormat};
use crate::model::ImageField;
use std::path::Path;

/// Reads `path` without blocking and converts it into an image reference.
pub async fn load_file(field: ImageField, path: impl AsRef<Path>) -> Result<ImageData> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PixlyError::FileRead {
            field,
            reason: format!("{}: {e}", path.display()),
        })?;

    let name = path.file_name().and_then(|n| n.to_str());
    load_bytes(field, bytes, name)
}

/// Converts already-read file contents into an image reference.
///
/// The format is detected from magic bytes, falling back to the extension
/// of `name_hint`.
pub fn load_bytes(field: ImageField, bytes: Vec<u8>, name_hint: Option<&str>) -> Result<ImageData> {
    if bytes.is_empty() {
        return Err(PixlyError::FileRead {
            field,
            reason: "file is empty".into(),
        });
    }

    let format = ImageFormat::from_magic_bytes(&bytes)
        .or_else(|| {
            name_hint
                .and_then(|name| Path::new(name).extension())
                .and_then(|ext| ext.to_str())
                .and_then(ImageFormat::from_extension)
        })
        .ok_or_else(|| PixlyError::FileRead {
            field,
            reason: "not a recognized image (expected PNG, JPEG, WebP or GIF)".into(),
        })?;

    Ok(ImageData::new(bytes, format))
}
