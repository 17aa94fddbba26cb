use crate::document::image::ImageRef;
use crate::layout::block::Color;

pub const NAVY: Color = Color::rgb(0x1B, 0x2A, 0x4A);
pub const ORANGE: Color = Color::rgb(0xE8, 0x94, 0x3A);
pub const DARK_GRAY: Color = Color::rgb(0x33, 0x33, 0x33);
pub const MED_GRAY: Color = Color::rgb(0x66, 0x66, 0x66);
pub const LIGHT_GRAY: Color = Color::rgb(0xF5, 0xF5, 0xF5);
pub const BORDER_GRAY: Color = Color::rgb(0xCC, 0xCC, 0xCC);

/// Issuer identity printed on every proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Brand {
    pub company_name: String,
    /// FROM block lines under the company name.
    pub contact_lines: Vec<String>,
    pub footer_text: String,
    pub logo: Option<ImageRef>,
    pub currency_symbol: String,
}

impl Default for Brand {
    fn default() -> Self {
        Self {
            company_name: "Proposey".to_string(),
            contact_lines: Vec::new(),
            footer_text: "Confidential and Proprietary".to_string(),
            logo: None,
            currency_symbol: "$".to_string(),
        }
    }
}
