//! Option enums of the generation configuration.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A closed set of user-selectable options with display labels.
pub trait Choice: Copy + Sized + 'static {
    /// Every option, in display order.
    const ALL: &'static [Self];

    /// Label shown to the user (and used on the wire).
    fn label(&self) -> &'static str;
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parses a choice from its label, ignoring case, spaces, dashes and underscores.
fn parse_choice<T: Choice>(s: &str, what: &str) -> Result<T, String> {
    let wanted = normalize(s);
    T::ALL
        .iter()
        .copied()
        .find(|c| normalize(c.label()) == wanted)
        .ok_or_else(|| {
            let valid: Vec<&str> = T::ALL.iter().map(|c| c.label()).collect();
            format!("unknown {what} '{s}'. Valid values: {}", valid.join(", "))
        })
}

macro_rules! impl_choice_traits {
    ($ty:ty, $what:literal) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_choice(s, $what)
            }
        }
    };
}

/// How the product is presented in the shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SubjectType {
    /// The product alone.
    #[default]
    #[serde(rename = "Product Only")]
    ProductOnly,
    /// The product held in a hand.
    #[serde(rename = "Handheld")]
    Handheld,
    /// A full model presenting the product.
    #[serde(rename = "Full Model")]
    FullModel,
    /// Point-of-view shot from the user's eyes.
    #[serde(rename = "POV")]
    Pov,
}

impl Choice for SubjectType {
    const ALL: &'static [Self] = &[Self::ProductOnly, Self::Handheld, Self::FullModel, Self::Pov];

    fn label(&self) -> &'static str {
        match self {
            Self::ProductOnly => "Product Only",
            Self::Handheld => "Handheld",
            Self::FullModel => "Full Model",
            Self::Pov => "POV",
        }
    }
}

impl_choice_traits!(SubjectType, "subject type");

/// Gender of the human model, when one is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Female model.
    Female,
    /// Male model.
    Male,
}

impl Choice for Gender {
    const ALL: &'static [Self] = &[Self::Female, Self::Male];

    fn label(&self) -> &'static str {
        match self {
            Self::Female => "Female",
            Self::Male => "Male",
        }
    }
}

impl_choice_traits!(Gender, "gender");

/// Visual style of the generated photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Style {
    /// Vintage film look.
    Retro,
    /// Soft pastel lighting.
    #[default]
    #[serde(rename = "Soft Aesthetic")]
    SoftAesthetic,
    /// Luxurious premium look.
    Fancy,
}

impl Choice for Style {
    const ALL: &'static [Self] = &[Self::Retro, Self::SoftAesthetic, Self::Fancy];

    fn label(&self) -> &'static str {
        match self {
            Self::Retro => "Retro",
            Self::SoftAesthetic => "Soft Aesthetic",
            Self::Fancy => "Fancy",
        }
    }
}

impl_choice_traits!(Style, "style");

/// Output resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// High definition.
    #[default]
    #[serde(rename = "HD")]
    Hd,
    /// Standard definition.
    Standard,
}

impl Choice for Resolution {
    const ALL: &'static [Self] = &[Self::Hd, Self::Standard];

    fn label(&self) -> &'static str {
        match self {
            Self::Hd => "HD",
            Self::Standard => "Standard",
        }
    }
}

impl_choice_traits!(Resolution, "resolution");

/// The fixed set of output aspect ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1 square aspect ratio.
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// 9:16 portrait (tall) aspect ratio.
    #[serde(rename = "9:16")]
    Portrait,
    /// 16:9 landscape (widescreen) aspect ratio.
    #[serde(rename = "16:9")]
    Landscape,
    /// 4:3 standard landscape aspect ratio.
    #[serde(rename = "4:3")]
    Standard,
    /// 3:4 standard portrait aspect ratio.
    #[serde(rename = "3:4")]
    StandardPortrait,
}

impl AspectRatio {
    /// Returns the aspect ratio as a string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
            Self::Standard => "4:3",
            Self::StandardPortrait => "3:4",
        }
    }
}

impl Choice for AspectRatio {
    const ALL: &'static [Self] = &[
        Self::Square,
        Self::Portrait,
        Self::Landscape,
        Self::Standard,
        Self::StandardPortrait,
    ];

    fn label(&self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| {
                format!("unsupported ratio '{s}'. Valid values: 1:1, 9:16, 16:9, 4:3, 3:4")
            })
    }
}

/// The two image slots of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ImageField {
    /// The product photo (required for generation).
    #[serde(rename = "productImage")]
    Product,
    /// Optional background reference.
    #[serde(rename = "backgroundImage")]
    Background,
}

impl ImageField {
    /// Field name as used in edit events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "productImage",
            Self::Background => "backgroundImage",
        }
    }
}

impl std::fmt::Display for ImageField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
