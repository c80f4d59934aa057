//! Generation client: the boundary to the image-generation provider.

mod gemini;
pub mod prompt;
mod provider;

pub use gemini::{GeminiClient, GeminiClientBuilder, GeminiModel};
pub use prompt::build_prompt;
pub use provider::GenerationClient;
