//! Generation client trait.

use crate::error::Result;
use crate::image::ImageData;
use crate::model::Configuration;
use async_trait::async_trait;

/// Turns a [`Configuration`] into one generated image.
///
/// Implementations own the translation to and from the provider's wire
/// format. Every failure is reported as [`PixlyError::Generation`], and
/// `generate` never retries.
///
/// [`PixlyError::Generation`]: crate::PixlyError::Generation
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generates an image for `config`. Requires a product image.
    async fn generate(&self, config: &Configuration) -> Result<ImageData>;

    /// Returns true when a provider credential is available.
    fn credential_configured(&self) -> bool;

    /// Returns the name of this client for display.
    fn name(&self) -> &str;

    /// Checks if the provider is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}
