//! Prompt construction from a configuration.

use crate::model::{Configuration, Gender, Resolution, Style, SubjectType};

/// Builds the text instruction sent alongside the reference images.
///
/// The product image is always the first reference; the background image,
/// when present, is the second.
pub fn build_prompt(config: &Configuration) -> String {
    let mut lines = vec![
        "Create a professional product photo for affiliate marketing content, \
         featuring the product shown in the first reference image."
            .to_string(),
        "Keep the product's shape, colors, labels and proportions exactly as in the reference."
            .to_string(),
    ];

    lines.push(subject_line(config));

    lines.push(match config.style() {
        Style::Retro => "Style: retro, with vintage film tones, warm colors and subtle grain.",
        Style::SoftAesthetic => {
            "Style: soft aesthetic, with a pastel palette and diffused natural light."
        }
        Style::Fancy => "Style: fancy, in a luxurious premium setting with dramatic lighting.",
    }
    .to_string());

    lines.push(if config.background_image().is_some() {
        "Place the product in the scene shown in the second reference image.".to_string()
    } else {
        "Use a clean background that complements the product.".to_string()
    });

    let branding = config.branding().trim();
    if !branding.is_empty() {
        lines.push(format!(
            "Include the brand text \"{branding}\" legibly and tastefully in the composition."
        ));
    }

    let detail = match config.resolution() {
        Resolution::Hd => "high-definition with sharp detail",
        Resolution::Standard => "standard resolution",
    };
    lines.push(format!(
        "Output: {} aspect ratio, {detail}.",
        config.ratio().as_str()
    ));

    if config.quantity() > 1 {
        lines.push(format!(
            "This image is one of {} variations; give it a distinctive composition.",
            config.quantity()
        ));
    }

    let extra = config.additional_prompt().trim();
    if !extra.is_empty() {
        lines.push(format!("Additional instructions: {extra}"));
    }

    lines.join("\n")
}

fn subject_line(config: &Configuration) -> String {
    let person = match config.gender() {
        Some(Gender::Female) => "a female model",
        Some(Gender::Male) => "a male model",
        None => "a model",
    };

    match config.subject_type() {
        SubjectType::ProductOnly => "Show the product on its own, with no people in the frame.".into(),
        SubjectType::Handheld if config.no_model() => {
            "Show the product held in a hand; only the hand is visible, no face or body.".into()
        }
        SubjectType::Handheld => {
            format!("Show the product held in the hand of {person}, framed from the chest up.")
        }
        SubjectType::FullModel if config.no_model() => {
            "Show the product presented on a mannequin or stand; no human model.".into()
        }
        SubjectType::FullModel => {
            format!("Show {person} presenting the product, with the full body in frame.")
        }
        SubjectType::Pov if config.no_model() => {
            "Shoot from a first-person point of view, as if the viewer is holding the product."
                .into()
        }
        SubjectType::Pov => format!(
            "Shoot from a first-person point of view of {person} holding the product; \
             only their hands are visible."
        ),
    }
}
