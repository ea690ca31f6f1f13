//! Image editor trait.

use crate::error::Result;
use crate::image::types::{EditRequest, EditedImage};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for providers that edit an image according to a text prompt.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    /// Sends one edit request and returns the first image in the response.
    ///
    /// Exactly one attempt is made; failures are returned as-is.
    async fn edit(&self, request: &EditRequest) -> Result<EditedImage>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;

    /// Checks if the provider is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}

#[async_trait]
impl<T: ImageEditor + ?Sized> ImageEditor for Arc<T> {
    async fn edit(&self, request: &EditRequest) -> Result<EditedImage> {
        (**self).edit(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    async fn health_check(&self) -> Result<()> {
        (**self).health_check().await
    }
}
