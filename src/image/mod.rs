//! Image encoding, edit requests, and providers.

pub mod encoder;
mod provider;
pub mod providers;
mod types;

pub use encoder::{read_image, DataUrl, UploadedImage};
pub use provider::ImageEditor;
pub use types::{EditRequest, EditedImage, GenerationMetadata, ImageFormat};
