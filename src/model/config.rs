//! The generation configuration and its field-level edits.

use crate::error::{PixlyError, Result};
use crate::image::ImageData;
use crate::model::types::{AspectRatio, Gender, ImageField, Resolution, Style, SubjectType};
use serde::{Deserialize, Serialize};

/// Smallest accepted quantity.
pub const MIN_QUANTITY: u8 = 1;
/// Largest accepted quantity.
pub const MAX_QUANTITY: u8 = 10;

/// Everything needed to request one product photo.
///
/// Invariants, re-established by every edit:
/// - `no_model == true` implies `gender == None`
/// - `gender.is_some()` implies `no_model == false`
/// - `quantity` lies in `MIN_QUANTITY..=MAX_QUANTITY`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ConfigurationRepr")]
pub struct Configuration {
    #[serde(with = "data_url")]
    product_image: Option<ImageData>,
    #[serde(with = "data_url")]
    background_image: Option<ImageData>,
    subject_type: SubjectType,
    gender: Option<Gender>,
    no_model: bool,
    additional_prompt: String,
    style: Style,
    quantity: u8,
    ratio: AspectRatio,
    resolution: Resolution,
    branding: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            product_image: None,
            background_image: None,
            subject_type: SubjectType::default(),
            gender: None,
            no_model: true,
            additional_prompt: String::new(),
            style: Style::default(),
            quantity: MIN_QUANTITY,
            ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            branding: String::new(),
        }
    }
}

impl Configuration {
    /// Creates a configuration with session-start defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one field edit, replacing that field entirely.
    pub fn set_field(&mut self, edit: FieldEdit) {
        match edit {
            FieldEdit::ProductImage(image) => self.product_image = image,
            FieldEdit::BackgroundImage(image) => self.background_image = image,
            FieldEdit::SubjectType(subject) => self.subject_type = subject,
            FieldEdit::Gender(gender) => {
                self.gender = gender;
                if gender.is_some() {
                    self.no_model = false;
                }
            }
            FieldEdit::NoModel(no_model) => {
                self.no_model = no_model;
                if no_model {
                    self.gender = None;
                }
            }
            FieldEdit::AdditionalPrompt(text) => self.additional_prompt = text,
            FieldEdit::Style(style) => self.style = style,
            FieldEdit::Quantity(n) => self.quantity = clamp_quantity(n),
            FieldEdit::Ratio(ratio) => self.ratio = ratio,
            FieldEdit::Resolution(resolution) => self.resolution = resolution,
            FieldEdit::Branding(text) => self.branding = text,
        }
    }

    /// Builder-style [`set_field`](Self::set_field).
    pub fn with(mut self, edit: FieldEdit) -> Self {
        self.set_field(edit);
        self
    }

    /// Returns true when the configuration may be submitted.
    pub fn is_ready(&self) -> bool {
        self.product_image.is_some()
    }

    /// The image stored in `field`.
    pub fn image(&self, field: ImageField) -> Option<&ImageData> {
        match field {
            ImageField::Product => self.product_image.as_ref(),
            ImageField::Background => self.background_image.as_ref(),
        }
    }

    /// Product photo.
    pub fn product_image(&self) -> Option<&ImageData> {
        self.product_image.as_ref()
    }

    /// Background reference.
    pub fn background_image(&self) -> Option<&ImageData> {
        self.background_image.as_ref()
    }

    /// Subject type.
    pub fn subject_type(&self) -> SubjectType {
        self.subject_type
    }

    /// Model gender, if a model is requested.
    pub fn gender(&self) -> Option<Gender> {
        self.gender
    }

    /// Whether "no model" is selected.
    pub fn no_model(&self) -> bool {
        self.no_model
    }

    /// Free-text prompt addition.
    pub fn additional_prompt(&self) -> &str {
        &self.additional_prompt
    }

    /// Visual style.
    pub fn style(&self) -> Style {
        self.style
    }

    /// Requested quantity, always within `MIN_QUANTITY..=MAX_QUANTITY`.
    pub fn quantity(&self) -> u8 {
        self.quantity
    }

    /// Output aspect ratio.
    pub fn ratio(&self) -> AspectRatio {
        self.ratio
    }

    /// Output resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Branding text.
    pub fn branding(&self) -> &str {
        &self.branding
    }
}

fn clamp_quantity(n: i64) -> u8 {
    // Bounds fit in u8 after the clamp.
    n.clamp(i64::from(MIN_QUANTITY), i64::from(MAX_QUANTITY)) as u8
}

/// A single field-level edit. Each edit replaces one field wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    /// Set or clear the product photo.
    ProductImage(Option<ImageData>),
    /// Set or clear the background reference.
    BackgroundImage(Option<ImageData>),
    /// Set the subject type.
    SubjectType(SubjectType),
    /// Select a model gender. `Some` clears "no model".
    Gender(Option<Gender>),
    /// Toggle "no model". `true` clears the gender.
    NoModel(bool),
    /// Replace the additional prompt.
    AdditionalPrompt(String),
    /// Set the style.
    Style(Style),
    /// Set the quantity; out-of-range values are clamped.
    Quantity(i64),
    /// Set the aspect ratio.
    Ratio(AspectRatio),
    /// Set the resolution.
    Resolution(Resolution),
    /// Replace the branding text.
    Branding(String),
}

impl FieldEdit {
    /// Edit that stores `image` in the given image field.
    pub fn image(field: ImageField, image: Option<ImageData>) -> Self {
        match field {
            ImageField::Product => Self::ProductImage(image),
            ImageField::Background => Self::BackgroundImage(image),
        }
    }

    /// Name of the edited field.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::ProductImage(_) => "productImage",
            Self::BackgroundImage(_) => "backgroundImage",
            Self::SubjectType(_) => "subjectType",
            Self::Gender(_) => "gender",
            Self::NoModel(_) => "noModel",
            Self::AdditionalPrompt(_) => "additionalPrompt",
            Self::Style(_) => "style",
            Self::Quantity(_) => "quantity",
            Self::Ratio(_) => "ratio",
            Self::Resolution(_) => "resolution",
            Self::Branding(_) => "branding",
        }
    }

    /// Parses a string-keyed edit event.
    ///
    /// Field names are accepted in camelCase or snake_case. Image fields take
    /// a data URL (empty clears the field); `gender` accepts `none` to clear.
    pub fn parse(name: &str, value: &str) -> Result<Self> {
        let invalid = |reason: String| PixlyError::InvalidField {
            field: name.to_string(),
            reason,
        };

        let edit = match name.trim() {
            "productImage" | "product_image" => Self::ProductImage(parse_image(value).map_err(invalid)?),
            "backgroundImage" | "background_image" => {
                Self::BackgroundImage(parse_image(value).map_err(invalid)?)
            }
            "subjectType" | "subject_type" => Self::SubjectType(value.parse().map_err(invalid)?),
            "gender" => match value.trim().to_lowercase().as_str() {
                "" | "none" => Self::Gender(None),
                _ => Self::Gender(Some(value.parse().map_err(invalid)?)),
            },
            "noModel" | "no_model" => Self::NoModel(parse_bool(value).map_err(invalid)?),
            "additionalPrompt" | "additional_prompt" => Self::AdditionalPrompt(value.to_string()),
            "style" => Self::Style(value.parse().map_err(invalid)?),
            "quantity" => Self::Quantity(
                value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("'{value}' is not an integer")))?,
            ),
            "ratio" | "aspect_ratio" | "aspectRatio" => Self::Ratio(value.parse().map_err(invalid)?),
            "resolution" => Self::Resolution(value.parse().map_err(invalid)?),
            "branding" => Self::Branding(value.to_string()),
            other => return Err(invalid(format!("unknown field '{other}'"))),
        };
        Ok(edit)
    }
}

fn parse_image(value: &str) -> std::result::Result<Option<ImageData>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    ImageData::from_data_url(value)
        .map(Some)
        .map_err(|e| e.to_string())
}

fn parse_bool(value: &str) -> std::result::Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        other => Err(format!("'{other}' is not a boolean")),
    }
}

/// Wire shape accepted when deserializing; normalized into [`Configuration`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConfigurationRepr {
    #[serde(with = "data_url")]
    product_image: Option<ImageData>,
    #[serde(with = "data_url")]
    background_image: Option<ImageData>,
    subject_type: SubjectType,
    gender: Option<Gender>,
    no_model: Option<bool>,
    additional_prompt: String,
    style: Style,
    quantity: i64,
    ratio: AspectRatio,
    resolution: Resolution,
    branding: String,
}

impl Default for ConfigurationRepr {
    fn default() -> Self {
        Self {
            product_image: None,
            background_image: None,
            subject_type: SubjectType::default(),
            gender: None,
            no_model: None,
            additional_prompt: String::new(),
            style: Style::default(),
            quantity: i64::from(MIN_QUANTITY),
            ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            branding: String::new(),
        }
    }
}

impl From<ConfigurationRepr> for Configuration {
    fn from(repr: ConfigurationRepr) -> Self {
        let mut config = Configuration::new()
            .with(FieldEdit::ProductImage(repr.product_image))
            .with(FieldEdit::BackgroundImage(repr.background_image))
            .with(FieldEdit::SubjectType(repr.subject_type))
            .with(FieldEdit::AdditionalPrompt(repr.additional_prompt))
            .with(FieldEdit::Style(repr.style))
            .with(FieldEdit::Quantity(repr.quantity))
            .with(FieldEdit::Ratio(repr.ratio))
            .with(FieldEdit::Resolution(repr.resolution))
            .with(FieldEdit::Branding(repr.branding));

        // An explicit `noModel: true` wins over a conflicting gender.
        config.set_field(FieldEdit::Gender(repr.gender));
        match repr.no_model {
            Some(no_model) => config.set_field(FieldEdit::NoModel(no_model)),
            None if repr.gender.is_none() => config.set_field(FieldEdit::NoModel(true)),
            None => {}
        }
        config
    }
}

/// Serializes optional images as data URLs.
mod data_url {
    use crate::image::ImageData;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        image: &Option<ImageData>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match image {
            Some(image) => serializer.serialize_some(&image.to_data_url()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<ImageData>, D::Error> {
        let url: Option<String> = Option::deserialize(deserializer)?;
        match url.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(url) => ImageData::from_data_url(url)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageFormat;

    fn png() -> ImageData {
        ImageData::new(
            vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4],
            ImageFormat::Png,
        )
    }

    fn assert_invariants(config: &Configuration) {
        if config.no_model() {
            assert_eq!(config.gender(), None);
        }
        if config.gender().is_some() {
            assert!(!config.no_model());
        }
        assert!((MIN_QUANTITY..=MAX_QUANTITY).contains(&config.quantity()));
    }

    #[test]
    fn test_defaults() {
        let config = Configuration::new();
        assert!(config.product_image().is_none());
        assert!(config.background_image().is_none());
        assert_eq!(config.subject_type(), SubjectType::ProductOnly);
        assert_eq!(config.gender(), None);
        assert!(config.no_model());
        assert_eq!(config.additional_prompt(), "");
        assert_eq!(config.style(), Style::SoftAesthetic);
        assert_eq!(config.quantity(), 1);
        assert_eq!(config.ratio().as_str(), "1:1");
        assert_eq!(config.resolution(), Resolution::Hd);
        assert_eq!(config.branding(), "");
        assert!(!config.is_ready());
    }

    #[test]
    fn test_gender_and_no_model_are_exclusive() {
        let mut config = Configuration::new();

        config.set_field(FieldEdit::Gender(Some(Gender::Female)));
        assert_eq!(config.gender(), Some(Gender::Female));
        assert!(!config.no_model());

        config.set_field(FieldEdit::NoModel(true));
        assert_eq!(config.gender(), None);
        assert!(config.no_model());

        config.set_field(FieldEdit::Gender(Some(Gender::Male)));
        assert_eq!(config.gender(), Some(Gender::Male));
        assert!(!config.no_model());
    }

    #[test]
    fn test_invariants_hold_for_every_edit_sequence() {
        let edits = [
            FieldEdit::Gender(Some(Gender::Female)),
            FieldEdit::Gender(None),
            FieldEdit::NoModel(true),
            FieldEdit::NoModel(false),
            FieldEdit::Gender(Some(Gender::Male)),
            FieldEdit::Quantity(0),
            FieldEdit::Quantity(11),
        ];

        // All sequences of length 3.
        for a in &edits {
            for b in &edits {
                for c in &edits {
                    let mut config = Configuration::new();
                    for edit in [a, b, c] {
                        config.set_field(edit.clone());
                        assert_invariants(&config);
                    }
                }
            }
        }
    }

    #[test]
    fn test_quantity_is_clamped() {
        let mut config = Configuration::new();
        for (input, stored) in [(-5, 1), (0, 1), (1, 1), (7, 7), (10, 10), (11, 10), (i64::MAX, 10)] {
            config.set_field(FieldEdit::Quantity(input));
            assert_eq!(config.quantity(), stored, "quantity {input}");
        }
    }

    #[test]
    fn test_last_write_wins() {
        let config = Configuration::new()
            .with(FieldEdit::Branding("First".into()))
            .with(FieldEdit::Branding("Second".into()))
            .with(FieldEdit::Style(Style::Retro))
            .with(FieldEdit::Style(Style::Fancy));
        assert_eq!(config.branding(), "Second");
        assert_eq!(config.style(), Style::Fancy);
    }

    #[test]
    fn test_image_fields_and_readiness() {
        let mut config = Configuration::new();
        config.set_field(FieldEdit::image(ImageField::Background, Some(png())));
        assert!(!config.is_ready());
        assert!(config.image(ImageField::Background).is_some());

        config.set_field(FieldEdit::image(ImageField::Product, Some(png())));
        assert!(config.is_ready());

        config.set_field(FieldEdit::ProductImage(None));
        assert!(!config.is_ready());
    }

    #[test]
    fn test_parse_edits() {
        assert_eq!(
            FieldEdit::parse("subjectType", "Full Model").unwrap(),
            FieldEdit::SubjectType(SubjectType::FullModel)
        );
        assert_eq!(
            FieldEdit::parse("gender", "none").unwrap(),
            FieldEdit::Gender(None)
        );
        assert_eq!(
            FieldEdit::parse("no_model", "yes").unwrap(),
            FieldEdit::NoModel(true)
        );
        assert_eq!(
            FieldEdit::parse("quantity", "42").unwrap(),
            FieldEdit::Quantity(42)
        );
        assert_eq!(
            FieldEdit::parse("ratio", "3:4").unwrap(),
            FieldEdit::Ratio(AspectRatio::StandardPortrait)
        );
        assert_eq!(
            FieldEdit::parse("productImage", &png().to_data_url()).unwrap(),
            FieldEdit::ProductImage(Some(png()))
        );
        assert_eq!(
            FieldEdit::parse("backgroundImage", "").unwrap(),
            FieldEdit::BackgroundImage(None)
        );
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        let err = FieldEdit::parse("ratio", "21:9").unwrap_err();
        assert!(matches!(err, PixlyError::InvalidField { ref field, .. } if field == "ratio"));

        assert!(FieldEdit::parse("quantity", "many").is_err());
        assert!(FieldEdit::parse("noModel", "maybe").is_err());
        assert!(FieldEdit::parse("theme", "Pink Soft").is_err());
    }

    #[test]
    fn test_parse_bad_data_url_is_a_field_error() {
        let err = FieldEdit::parse("productImage", "not-a-url").unwrap_err();
        match err {
            PixlyError::InvalidField { field, reason } => {
                assert_eq!(field, "productImage");
                assert_eq!(reason, "not a data URL");
            }
            other => panic!("expected InvalidField, got {other:?}"),
        }

        let err = FieldEdit::parse("backgroundImage", "data:image/png;base64,!!!").unwrap_err();
        assert!(err.provider_error().is_none());
    }

    #[test]
    fn test_field_name_matches_parse_key() {
        let edit = FieldEdit::parse("additional_prompt", "on marble").unwrap();
        assert_eq!(edit.field_name(), "additionalPrompt");
        assert!(FieldEdit::parse(edit.field_name(), "on marble").is_ok());
    }

    #[test]
    fn test_serde_round_trip() {
        let config = Configuration::new()
            .with(FieldEdit::ProductImage(Some(png())))
            .with(FieldEdit::Gender(Some(Gender::Female)))
            .with(FieldEdit::Quantity(4))
            .with(FieldEdit::Ratio(AspectRatio::Landscape))
            .with(FieldEdit::Branding("Acme".into()));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["noModel"], false);
        assert_eq!(json["gender"], "Female");
        assert_eq!(json["ratio"], "16:9");
        assert_eq!(json["subjectType"], "Product Only");
        assert!(json["productImage"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert!(json["backgroundImage"].is_null());

        let back: Configuration = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_deserialize_normalizes() {
        let config: Configuration = serde_json::from_str(
            r#"{ "gender": "Male", "noModel": true, "quantity": 99, "style": "Retro" }"#,
        )
        .unwrap();
        assert_eq!(config.gender(), None);
        assert!(config.no_model());
        assert_eq!(config.quantity(), 10);
        assert_eq!(config.style(), Style::Retro);

        let config: Configuration = serde_json::from_str(r#"{ "gender": "Female" }"#).unwrap();
        assert_eq!(config.gender(), Some(Gender::Female));
        assert!(!config.no_model());

        let config: Configuration = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Configuration::new());
    }

    #[test]
    fn test_deserialize_rejects_unknown_ratio() {
        assert!(serde_json::from_str::<Configuration>(r#"{ "ratio": "21:9" }"#).is_err());
    }
}
