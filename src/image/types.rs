//! Core types for image editing.

use crate::error::{EditError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
    /// GIF format (first frame is used by the provider).
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

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Attempts to map a MIME type (e.g. `image/jpeg`) to a format.
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

        // GIF87a / GIF89a
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

/// A single edit instruction sent to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    /// Base64 payload of the source image.
    pub image_base64: String,
    /// MIME type of the source image.
    pub mime_type: String,
    /// Natural-language instruction.
    pub prompt: String,
}

impl EditRequest {
    /// Creates a new edit request.
    pub fn new(
        image_base64: impl Into<String>,
        mime_type: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            image_base64: image_base64.into(),
            mime_type: mime_type.into(),
            prompt: prompt.into(),
        }
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
}

/// An edited image as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "edited image should be displayed or saved"]
pub struct EditedImage {
    /// Base64 payload exactly as returned by the provider.
    pub base64: String,
    /// MIME type reported by the provider.
    pub mime_type: String,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl EditedImage {
    /// Creates a new edited image.
    pub fn new(
        base64: impl Into<String>,
        mime_type: impl Into<String>,
        metadata: GenerationMetadata,
    ) -> Self {
        Self {
            base64: base64.into(),
            mime_type: mime_type.into(),
            metadata,
        }
    }

    /// Returns the image as a data URL suitable for display.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }

    /// Decodes the base64 payload into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.base64.trim())
            .map_err(|e| EditError::Decode(e.to_string()))
    }

    /// Returns the format, from the MIME type or failing that the payload.
    pub fn format(&self) -> ImageFormat {
        ImageFormat::from_mime_type(&self.mime_type)
            .or_else(|| {
                self.decode()
                    .ok()
                    .and_then(|data| ImageFormat::from_magic_bytes(&data))
            })
            .unwrap_or_default()
    }

    /// Approximate size of the decoded image in bytes.
    pub fn size(&self) -> usize {
        decoded_len(&self.base64)
    }

    /// Decodes the image and writes it to the given path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = self.decode()?;
        std::fs::write(path, data)?;
        Ok(())
    }
}

/// Number of bytes a padded base64 string decodes to.
pub(crate) fn decoded_len(b64: &str) -> usize {
    let b64 = b64.trim();
    let padding = b64.bytes().rev().take_while(|&b| b == b'=').count();
    (b64.len() / 4 * 3).saturating_sub(padding)
}
