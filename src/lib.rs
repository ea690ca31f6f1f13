#![warn(missing_docs)]
//! gemini-edit - edit images with natural-language prompts via Google Gemini.
//!
//! The crate is split along the path an edit takes:
//!
//! - [`image::encoder`] turns a selected file into a base64 payload with a
//!   detected MIME type.
//! - [`ImageEditor`] sends that payload and a prompt to a provider;
//!   [`GeminiEditor`] is the Gemini implementation.
//! - [`EditorController`] holds the session state and exposes the
//!   select / prompt / generate actions.
//! - [`EditorView`] renders that state for a terminal or as JSON.
//!
//! # Quick Start
//!
//! ```no_run
//! use gemini_edit::{EditorController, EditorView, GeminiEditor};
//!
//! #[tokio::main]
//! async fn main() -> gemini_edit::Result<()> {
//!     let editor = GeminiEditor::builder().build()?;
//!     let controller = EditorController::new(editor);
//!
//!     controller.select_image("photo.jpg").await?;
//!     controller.set_prompt("add a hat");
//!     let edited = controller.generate().await?;
//!
//!     println!("{}", EditorView::render(&controller.state()));
//!     edited.save("photo-edited.png")?;
//!     Ok(())
//! }
//! ```
//!
//! The API key is read from `GEMINI_API_KEY` or `GOOGLE_API_KEY` unless set on
//! the builder. Without one, every edit fails with [`EditError::Config`].

pub mod controller;
mod error;
pub mod image;
pub mod view;

// Re-export error types at crate root
pub use error::{EditError, Result};

pub use controller::{EditorController, Phase, UiState};
pub use image::providers::{GeminiEditor, GeminiEditorBuilder, GeminiModel};
pub use image::{
    read_image, DataUrl, EditRequest, EditedImage, GenerationMetadata, ImageEditor, ImageFormat,
    UploadedImage,
};
pub use view::EditorView;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::controller::{EditorController, UiState};
    pub use crate::error::{EditError, Result};
    pub use crate::image::providers::GeminiEditor;
    pub use crate::image::{EditRequest, EditedImage, ImageEditor, UploadedImage};
    pub use crate::view::EditorView;
}
