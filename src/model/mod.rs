//! Generation configuration model.

mod config;
mod types;

pub use config::{Configuration, FieldEdit, MAX_QUANTITY, MIN_QUANTITY};
pub use types::{AspectRatio, Choice, Gender, ImageField, Resolution, Style, SubjectType};
