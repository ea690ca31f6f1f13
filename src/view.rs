//! Terminal rendering of a session.
//!
//! [`EditorView::render`] is a pure function of [`UiState`]; nothing here
//! mutates state or talks to the network.

use crate::controller::{Phase, UiState};
use serde::Serialize;
use std::fmt;

/// Hint shown in the upload pane before anything is selected.
pub const UPLOAD_HINT: &str = "Open an image to get started (PNG, JPG, WEBP, GIF, ...)";
/// Placeholder of an empty image pane.
pub const EMPTY_PANE_MESSAGE: &str = "Your image will appear here";
/// Placeholder of the edited pane while a request is in flight.
pub const LOADING_MESSAGE: &str = "AI is thinking...";

const DATA_URL_PREVIEW_LEN: usize = 48;

/// Upload pane: the selected image or a hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UploadPane {
    /// Nothing selected.
    Empty {
        /// Hint text.
        hint: &'static str,
    },
    /// An image is selected.
    Preview {
        /// Source name.
        file_name: String,
        /// Detected MIME type.
        mime_type: String,
        /// Raw size in bytes.
        size_bytes: usize,
    },
}

/// The generate control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerateButton {
    /// False while loading or while an input is missing.
    pub enabled: bool,
    /// Button label.
    pub label: &'static str,
}

/// One of the two image panes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImagePane {
    /// An image to display.
    Image {
        /// Pane title.
        title: &'static str,
        /// Displayable data URL. Shortened in text output, full in JSON.
        data_url: String,
        /// MIME type of the image.
        mime_type: String,
        /// Size in bytes.
        size_bytes: usize,
    },
    /// Nothing to display yet.
    Placeholder {
        /// Pane title.
        title: &'static str,
        /// True if the placeholder shows the loading indicator.
        loading: bool,
        /// Placeholder text.
        message: &'static str,
    },
}

impl ImagePane {
    /// Returns the data URL if the pane holds an image.
    pub fn data_url(&self) -> Option<&str> {
        match self {
            Self::Image { data_url, .. } => Some(data_url),
            Self::Placeholder { .. } => None,
        }
    }
}

/// Everything a frontend needs to draw the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorView {
    /// Workflow phase.
    pub phase: Phase,
    /// Upload target and preview.
    pub upload: UploadPane,
    /// Prompt text.
    pub prompt: String,
    /// Generate control.
    pub generate: GenerateButton,
    /// Loading indicator.
    pub loading: bool,
    /// Error banner text.
    pub error_banner: Option<String>,
    /// Original image pane.
    pub original: ImagePane,
    /// Edited image pane.
    pub edited: ImagePane,
}

impl EditorView {
    /// Derives the view from the session state.
    pub fn render(state: &UiState) -> Self {
        let upload = match &state.uploaded_image {
            Some(image) => UploadPane::Preview {
                file_name: image.file_name.clone(),
                mime_type: image.mime_type.clone(),
                size_bytes: image.size_bytes,
            },
            None => UploadPane::Empty { hint: UPLOAD_HINT },
        };

        let original = match &state.uploaded_image {
            Some(image) => ImagePane::Image {
                title: "Original",
                data_url: image.preview_url.clone(),
                mime_type: image.mime_type.clone(),
                size_bytes: image.size_bytes,
            },
            None => ImagePane::Placeholder {
                title: "Original",
                loading: false,
                message: EMPTY_PANE_MESSAGE,
            },
        };

        let edited = match &state.result_image {
            Some(image) => ImagePane::Image {
                title: "Edited",
                data_url: image.to_data_url(),
                mime_type: image.mime_type.clone(),
                size_bytes: image.size(),
            },
            None if state.is_loading => ImagePane::Placeholder {
                title: "Edited",
                loading: true,
                message: LOADING_MESSAGE,
            },
            None => ImagePane::Placeholder {
                title: "Edited",
                loading: false,
                message: EMPTY_PANE_MESSAGE,
            },
        };

        Self {
            phase: state.phase,
            upload,
            prompt: state.prompt.clone(),
            generate: GenerateButton {
                enabled: state.can_generate(),
                label: if state.is_loading {
                    "Generating..."
                } else {
                    "Generate Image"
                },
            },
            loading: state.is_loading,
            error_banner: state.error_message.clone(),
            original,
            edited,
        }
    }
}

fn shorten(url: &str) -> String {
    if url.chars().count() <= DATA_URL_PREVIEW_LEN {
        return url.to_string();
    }
    let head: String = url.chars().take(DATA_URL_PREVIEW_LEN).collect();
    format!("{head}...")
}

impl fmt::Display for ImagePane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image {
                title,
                data_url,
                mime_type,
                size_bytes,
            } => write!(
                f,
                "{title}: {mime_type}, {size_bytes} bytes\n  {}",
                shorten(data_url)
            ),
            Self::Placeholder { title, message, .. } => write!(f, "{title}: {message}"),
        }
    }
}

impl fmt::Display for EditorView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.upload {
            UploadPane::Empty { hint } => writeln!(f, "1. Upload an image: {hint}")?,
            UploadPane::Preview {
                file_name,
                mime_type,
                size_bytes,
            } => writeln!(
                f,
                "1. Upload an image: {file_name} ({mime_type}, {size_bytes} bytes)"
            )?,
        }

        if self.prompt.is_empty() {
            writeln!(f, "2. Describe your edit: (empty)")?;
        } else {
            writeln!(f, "2. Describe your edit: {}", self.prompt)?;
        }

        let state = if self.generate.enabled {
            "ready"
        } else {
            "disabled"
        };
        writeln!(f, "[{}] ({state})", self.generate.label)?;

        if let Some(ref banner) = self.error_banner {
            writeln!(f, "! {banner}")?;
        }

        writeln!(f, "{}", self.original)?;
        write!(f, "{}", self.edited)
    }
}
