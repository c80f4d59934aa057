#![warn(missing_docs)]
//! Pixly - product-photo content generation.
//!
//! This crate collects product-photo parameters into a [`Configuration`],
//! forwards them to a generative-image provider through a
//! [`GenerationClient`], and tracks one generation attempt at a time with a
//! [`Controller`].
//!
//! # Quick Start
//!
//! ```no_run
//! use pixly::{Attempt, Controller, FieldEdit, GeminiClient, ImageField, Settings, Style};
//!
//! #[tokio::main]
//! async fn main() -> pixly::Result<()> {
//!     let settings = Settings::from_env();
//!     let controller = Controller::new(GeminiClient::from_settings(&settings));
//!
//!     controller.load_image(ImageField::Product, "bottle.png").await?;
//!     controller.set_field(FieldEdit::Style(Style::Fancy));
//!     controller.set_field(FieldEdit::Branding("Acme".into()));
//!
//!     if controller.generate().await == Attempt::Completed {
//!         if let Some(image) = controller.result() {
//!             image.save(pixly::download_filename())?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`model`]: configuration value and field edits
//! - [`loader`]: local files to image references
//! - [`client`]: provider boundary and the Gemini implementation
//! - [`controller`]: the generation lifecycle
//!
//! # Features
//!
//! - `cli` (default): the `pixly` command-line interface

pub mod client;
pub mod controller;
mod error;
pub mod image;
pub mod loader;
pub mod model;
mod settings;

// Re-export error types at crate root
pub use error::{PixlyError, ProviderError, Result};

pub use client::{build_prompt, GeminiClient, GeminiClientBuilder, GeminiModel, GenerationClient};
pub use controller::{Attempt, Controller, IgnoreReason, LifecycleState, Notice, SessionView};
pub use image::{download_filename, DataUrlError, ImageData, ImageFormat};
pub use model::{
    AspectRatio, Configuration, FieldEdit, Gender, ImageField, Resolution, Style, SubjectType,
};
pub use settings::{Settings, API_KEY_ENV_VARS, DEFAULT_TIMEOUT};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::{GeminiClient, GenerationClient};
    pub use crate::controller::{Attempt, Controller, LifecycleState, Notice};
    pub use crate::error::{PixlyError, Result};
    pub use crate::image::ImageData;
    pub use crate::model::{Configuration, FieldEdit, ImageField};
    pub use crate::settings::Settings;
}
