//! Image style presets and prompt building.

use crate::error::CoreError;

pub const STYLE_PRODUCT_PHOTOGRAPHY: &str = "product_photography";
pub const STYLE_LIFESTYLE: &str = "lifestyle";
pub const STYLE_ARTISTIC: &str = "artistic";
pub const STYLE_RUSTIC: &str = "rustic";

/// Style applied when a submission does not name one.
pub const DEFAULT_STYLE: &str = STYLE_PRODUCT_PHOTOGRAPHY;

/// All valid style names.
pub const VALID_STYLES: &[&str] = &[
    STYLE_PRODUCT_PHOTOGRAPHY,
    STYLE_LIFESTYLE,
    STYLE_ARTISTIC,
    STYLE_RUSTIC,
];

/// Validate that `style` is one of the known presets.
pub fn validate_style(style: &str) -> Result<(), CoreError> {
    if VALID_STYLES.contains(&style) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown style '{style}'. Must be one of: {VALID_STYLES:?}"
        )))
    }
}

/// Prompt prefix for a style. Unknown styles fall back to a generic prefix
/// so the generation call still carries a quality hint.
fn prompt_prefix(style: &str) -> &'static str {
    match style {
        STYLE_PRODUCT_PHOTOGRAPHY => {
            "Professional product photography, clean background, studio lighting, high quality: "
        }
        STYLE_LIFESTYLE => "Lifestyle photography, natural lighting, authentic setting: ",
        STYLE_ARTISTIC => "Artistic food photography, creative composition: ",
        STYLE_RUSTIC => "Rustic style, natural materials, warm tones: ",
        _ => "High quality food photography: ",
    }
}

/// Build the full generation prompt for a user prompt and style.
pub fn build_generation_prompt(prompt: &str, style: &str) -> String {
    format!("{}{}", prompt_prefix(style), prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_styles_validate() {
        for style in VALID_STYLES {
            assert!(validate_style(style).is_ok());
        }
    }

    #[test]
    fn unknown_style_rejected() {
        assert!(validate_style("noir").is_err());
    }

    #[test]
    fn prompt_carries_style_prefix() {
        let built = build_generation_prompt("sourdough loaf", STYLE_RUSTIC);
        assert!(built.starts_with("Rustic style"));
        assert!(built.ends_with("sourdough loaf"));
    }
}
