//! Session state and the actions that change it.
//!
//! [`EditorController`] owns the single [`UiState`] of a session. The state
//! lives in a [`tokio::sync::watch`] channel, so any number of views can
//! [`subscribe`](EditorController::subscribe) and re-render on each change
//! while the controller stays the only writer.

use crate::error::{EditError, Result};
use crate::image::{read_image, EditRequest, EditedImage, ImageEditor, UploadedImage};
use serde::Serialize;
use std::path::Path;
use tokio::sync::watch;

/// Banner text when generate is triggered without both inputs.
pub const MISSING_INPUT_MESSAGE: &str = "Please upload an image and provide a prompt.";

const BUSY_MESSAGE: &str = "An edit is already in progress.";

/// Where the session is in the edit workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing selected yet.
    #[default]
    Idle,
    /// An image is selected, the prompt is still empty.
    ImageSelected,
    /// Both an image and a prompt are present.
    PromptEntered,
    /// A request is in flight.
    Generating,
    /// The last request produced an image.
    Success,
    /// The last action failed; see [`UiState::error_message`].
    Error,
}

/// Everything the view needs to render a session.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Currently selected source image.
    pub uploaded_image: Option<UploadedImage>,
    /// Edit instruction as typed.
    pub prompt: String,
    /// Image returned by the last successful request.
    pub result_image: Option<EditedImage>,
    /// True while a request is in flight.
    pub is_loading: bool,
    /// User-facing message of the last failure.
    pub error_message: Option<String>,
    /// Current workflow phase.
    pub phase: Phase,
}

impl UiState {
    /// Returns true if the prompt has non-whitespace content.
    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    /// Returns true if a generate action would be accepted.
    pub fn can_generate(&self) -> bool {
        !self.is_loading && self.uploaded_image.is_some() && self.has_prompt()
    }

    /// Returns the edited image as a data URL, if there is one.
    pub fn result_data_url(&self) -> Option<String> {
        self.result_image.as_ref().map(EditedImage::to_data_url)
    }

    fn input_phase(&self) -> Phase {
        match (self.uploaded_image.is_some(), self.has_prompt()) {
            (true, true) => Phase::PromptEntered,
            (true, false) => Phase::ImageSelected,
            (false, _) => Phase::Idle,
        }
    }

    fn fail(&mut self, message: String) {
        self.result_image = None;
        self.error_message = Some(message);
        self.phase = Phase::Error;
    }
}

/// Drives one editing session against an [`ImageEditor`].
pub struct EditorController<E> {
    editor: E,
    state: watch::Sender<UiState>,
}

impl<E: ImageEditor> EditorController<E> {
    /// Creates a controller with an empty session.
    pub fn new(editor: E) -> Self {
        let (state, _) = watch::channel(UiState::default());
        Self { editor, state }
    }

    /// Returns the underlying editor.
    pub fn editor(&self) -> &E {
        &self.editor
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> UiState {
        self.state.borrow().clone()
    }

    /// Returns a receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state.subscribe()
    }

    /// Reads and encodes an image file, making it the current selection.
    ///
    /// Refused if a request is in flight, including one that started while
    /// the file was being read.
    pub async fn select_image(&self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_idle()?;
        match read_image(path).await {
            Ok(image) => self.select_uploaded(image),
            Err(e) => Err(self.fail_selection(e)),
        }
    }

    /// Makes an image given as a data URL the current selection.
    pub fn select_data_url(&self, file_name: impl Into<String>, url: &str) -> Result<()> {
        self.ensure_idle()?;
        match UploadedImage::from_data_url(file_name, url) {
            Ok(image) => self.select_uploaded(image),
            Err(e) => Err(self.fail_selection(e)),
        }
    }

    /// Replaces the selection with an already encoded image.
    ///
    /// Clears any previous result and error. While a request is in flight
    /// the selection is refused with `Validation` and the state left alone.
    pub fn select_uploaded(&self, image: UploadedImage) -> Result<()> {
        let applied = self.state.send_if_modified(|s| {
            if s.is_loading {
                return false;
            }
            tracing::debug!(file = %image.file_name, mime_type = %image.mime_type, "image selected");
            s.uploaded_image = Some(image);
            s.result_image = None;
            s.error_message = None;
            s.phase = s.input_phase();
            true
        });
        if !applied {
            tracing::warn!("image selection refused: {BUSY_MESSAGE}");
            return Err(EditError::Validation(BUSY_MESSAGE.into()));
        }
        Ok(())
    }

    /// Updates the prompt text. Never touches the network.
    pub fn set_prompt(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_modify(|s| {
            s.prompt = text;
            if s.phase != Phase::Generating {
                s.phase = s.input_phase();
            }
        });
    }

    /// Sends the current image and prompt to the editor.
    ///
    /// Without both inputs the session moves to [`Phase::Error`] and no
    /// request is made. While a request is already in flight the call is
    /// refused and the state left alone. Otherwise exactly one request is
    /// sent and its outcome stored; the loading flag is cleared either way.
    pub async fn generate(&self) -> Result<EditedImage> {
        let mut prepared: Result<EditRequest> = Err(EditError::Validation(BUSY_MESSAGE.into()));
        self.state.send_if_modified(|s| {
            if s.is_loading {
                return false;
            }
            let request = match s.uploaded_image.as_ref() {
                Some(image) if s.has_prompt() => Some(EditRequest::new(
                    image.base64.clone(),
                    image.mime_type.clone(),
                    s.prompt.clone(),
                )),
                _ => None,
            };
            match request {
                Some(request) => {
                    prepared = Ok(request);
                    s.is_loading = true;
                    s.result_image = None;
                    s.error_message = None;
                    s.phase = Phase::Generating;
                }
                None => {
                    prepared = Err(EditError::Validation(MISSING_INPUT_MESSAGE.into()));
                    s.fail(MISSING_INPUT_MESSAGE.into());
                }
            }
            true
        });

        let request = match prepared {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("generate refused: {e}");
                return Err(e);
            }
        };

        let outcome = self.editor.edit(&request).await;

        self.state.send_modify(|s| {
            s.is_loading = false;
            match &outcome {
                Ok(image) => {
                    s.result_image = Some(image.clone());
                    s.error_message = None;
                    s.phase = Phase::Success;
                }
                Err(e) => s.fail(format!("Generation failed: {}", e.user_message())),
            }
        });

        if let Err(ref e) = outcome {
            tracing::warn!(provider = self.editor.name(), "edit failed: {e}");
        }
        outcome
    }

    /// Discards the selection, prompt, and result.
    pub fn clear(&self) -> Result<()> {
        self.ensure_idle()?;
        self.state.send_replace(UiState::default());
        Ok(())
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.state.borrow().is_loading {
            return Err(EditError::Validation(BUSY_MESSAGE.into()));
        }
        Ok(())
    }

    fn fail_selection(&self, e: EditError) -> EditError {
        tracing::warn!("image selection failed: {e}");
        let message = e.user_message();
        self.state.send_modify(|s| s.fail(message));
        e
    }
}
