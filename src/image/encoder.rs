//! Turns selected files into base64 payloads ready for an edit request.

use crate::error::{EditError, Result};
use crate::image::types::ImageFormat;
use base64::Engine;
use std::fmt;
use std::path::Path;

/// A parsed `data:<mime>;base64,<data>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// MIME type from the header.
    pub mime_type: String,
    /// Base64 payload after the comma.
    pub base64: String,
}

impl DataUrl {
    /// Builds a data URL from raw bytes.
    pub fn encode(mime_type: impl Into<String>, data: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            base64: base64::engine::general_purpose::STANDARD.encode(data),
        }
    }

    /// Parses a data URL.
    ///
    /// The input must split into exactly a header and a payload around a
    /// single `,`, and the header must carry a MIME type between `:` and `;`.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parts = input.split(',');
        let (header, payload) = match (parts.next(), parts.next(), parts.next()) {
            (Some(header), Some(payload), None) => (header, payload),
            _ => return Err(EditError::Decode("Invalid data URL format".into())),
        };

        let mime_type = header
            .split_once(':')
            .and_then(|(_, rest)| rest.split_once(';'))
            .map(|(mime, _)| mime.trim())
            .filter(|mime| !mime.is_empty())
            .ok_or_else(|| {
                EditError::Decode("Could not determine MIME type from data URL".into())
            })?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            base64: payload.trim().to_string(),
        })
    }

    /// Decodes the payload into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.base64)
            .map_err(|e| EditError::Decode(e.to_string()))
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// An image selected by the user, encoded and ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Display name of the source (file name or a label).
    pub file_name: String,
    /// Size of the raw image in bytes.
    pub size_bytes: usize,
    /// Base64 payload.
    pub base64: String,
    /// Detected MIME type.
    pub mime_type: String,
    /// Data URL used for previews.
    pub preview_url: String,
}

impl UploadedImage {
    /// Encodes raw bytes, detecting the MIME type from their magic bytes or
    /// failing that by guessing from the extension of `file_name`.
    ///
    /// Any `image/*` type is accepted; anything else is a `Validation` error.
    pub fn from_bytes(file_name: impl Into<String>, data: &[u8]) -> Result<Self> {
        let file_name = file_name.into();
        if data.is_empty() {
            return Err(EditError::Validation(format!("{file_name} is empty")));
        }
        let mime_type = match ImageFormat::from_magic_bytes(data) {
            Some(format) => format.mime_type().to_string(),
            None => mime_guess::from_path(&file_name)
                .iter()
                .find(|mime| mime.type_() == mime_guess::mime::IMAGE)
                .map(|mime| mime.essence_str().to_string())
                .ok_or_else(|| {
                    EditError::Validation(format!("{file_name} is not an image file"))
                })?,
        };

        let url = DataUrl::encode(mime_type, data).to_string();
        let parsed = DataUrl::parse(&url)?;

        Ok(Self {
            file_name,
            size_bytes: data.len(),
            base64: parsed.base64,
            mime_type: parsed.mime_type,
            preview_url: url,
        })
    }

    /// Accepts an already encoded image given as a data URL.
    pub fn from_data_url(file_name: impl Into<String>, url: &str) -> Result<Self> {
        let parsed = DataUrl::parse(url)?;
        if !parsed.mime_type.starts_with("image/") {
            return Err(EditError::Validation(format!(
                "{} is not an image MIME type",
                parsed.mime_type
            )));
        }
        if parsed.base64.is_empty() {
            return Err(EditError::Decode("Data URL carries no image data".into()));
        }
        let size_bytes = parsed.decode()?.len();
        let preview_url = parsed.to_string();

        Ok(Self {
            file_name: file_name.into(),
            size_bytes,
            base64: parsed.base64,
            mime_type: parsed.mime_type,
            preview_url,
        })
    }

    /// Decodes the payload back into the original bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.base64)
            .map_err(|e| EditError::Decode(e.to_string()))
    }

    /// Returns the detected format, if it is one we know.
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime_type(&self.mime_type)
    }
}

/// Reads an image file and encodes it.
pub async fn read_image(path: impl AsRef<Path>) -> Result<UploadedImage> {
    let path = path.as_ref();
    let data = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let image = UploadedImage::from_bytes(file_name, &data)?;
    tracing::debug!(
        file = %image.file_name,
        mime_type = %image.mime_type,
        size_bytes = image.size_bytes,
        "encoded image"
    );
    Ok(image)
}
