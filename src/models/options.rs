//! Print options accepted by the conversion endpoint and their resolution
//! into concrete page settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

pub const DEFAULT_MARGIN: &str = "20mm";

#[derive(Debug, Error, PartialEq)]
pub enum OptionsError {
    #[error("Unknown paper format: {0}")]
    UnknownFormat(String),

    #[error("Failed to parse {field} value: {value}")]
    InvalidLength { field: &'static str, value: String },
}

/// Options as supplied by the caller. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    /// Paper format name (A0-A6, Letter, Legal, Tabloid, Ledger). Default: A4
    #[serde(default)]
    pub format: Option<String>,
    /// Top margin, e.g. "20mm", "1in", "2.5cm", "40px" (default: 20mm)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub margin_top: Option<Length>,
    /// Right margin (default: 20mm)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub margin_right: Option<Length>,
    /// Bottom margin (default: 20mm)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub margin_bottom: Option<Length>,
    /// Left margin (default: 20mm)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub margin_left: Option<Length>,
    /// Print background graphics (default: true)
    #[serde(default)]
    pub print_background: Option<bool>,
}

/// A length as sent on the wire: either a CSS-like string or a pixel count.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Length {
    Text(String),
    Pixels(f64),
}

impl Length {
    /// Convert to inches. Unit-less values are CSS pixels (96 per inch).
    pub fn to_inches(&self, field: &'static str) -> Result<f64, OptionsError> {
        let invalid = || OptionsError::InvalidLength {
            field,
            value: self.to_string(),
        };

        let inches = match self {
            Length::Pixels(px) => px / 96.0,
            Length::Text(text) => {
                let text = text.trim();
                let lower = text.to_ascii_lowercase();
                let (number, per_inch) = if let Some(n) = lower.strip_suffix("px") {
                    (n, 96.0)
                } else if let Some(n) = lower.strip_suffix("in") {
                    (n, 1.0)
                } else if let Some(n) = lower.strip_suffix("cm") {
                    (n, 2.54)
                } else if let Some(n) = lower.strip_suffix("mm") {
                    (n, 25.4)
                } else {
                    (lower.as_str(), 96.0)
                };
                let value: f64 = number.trim().parse().map_err(|_| invalid())?;
                value / per_inch
            }
        };

        if inches.is_finite() && inches >= 0.0 {
            Ok(inches)
        } else {
            Err(invalid())
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Length::Text(t) if t.trim().is_empty())
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Text(t) => f.write_str(t),
            Length::Pixels(px) => write!(f, "{px}"),
        }
    }
}

/// Named paper sizes, dimensions in inches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaperFormat {
    Letter,
    Legal,
    Tabloid,
    Ledger,
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
    A6,
}

impl PaperFormat {
    /// (width, height) in inches
    pub fn dimensions(self) -> (f64, f64) {
        match self {
            PaperFormat::Letter => (8.5, 11.0),
            PaperFormat::Legal => (8.5, 14.0),
            PaperFormat::Tabloid => (11.0, 17.0),
            PaperFormat::Ledger => (17.0, 11.0),
            PaperFormat::A0 => (33.1, 46.8),
            PaperFormat::A1 => (23.4, 33.1),
            PaperFormat::A2 => (16.54, 23.4),
            PaperFormat::A3 => (11.7, 16.54),
            PaperFormat::A4 => (8.27, 11.7),
            PaperFormat::A5 => (5.83, 8.27),
            PaperFormat::A6 => (4.13, 5.83),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PaperFormat::Letter => "Letter",
            PaperFormat::Legal => "Legal",
            PaperFormat::Tabloid => "Tabloid",
            PaperFormat::Ledger => "Ledger",
            PaperFormat::A0 => "A0",
            PaperFormat::A1 => "A1",
            PaperFormat::A2 => "A2",
            PaperFormat::A3 => "A3",
            PaperFormat::A4 => "A4",
            PaperFormat::A5 => "A5",
            PaperFormat::A6 => "A6",
        }
    }
}

impl FromStr for PaperFormat {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "letter" => Ok(PaperFormat::Letter),
            "legal" => Ok(PaperFormat::Legal),
            "tabloid" => Ok(PaperFormat::Tabloid),
            "ledger" => Ok(PaperFormat::Ledger),
            "a0" => Ok(PaperFormat::A0),
            "a1" => Ok(PaperFormat::A1),
            "a2" => Ok(PaperFormat::A2),
            "a3" => Ok(PaperFormat::A3),
            "a4" => Ok(PaperFormat::A4),
            "a5" => Ok(PaperFormat::A5),
            "a6" => Ok(PaperFormat::A6),
            _ => Err(OptionsError::UnknownFormat(s.to_string())),
        }
    }
}

/// Page margins in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Fully resolved settings handed to the renderer's PDF export.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfSettings {
    pub format: PaperFormat,
    pub paper_width: f64,
    pub paper_height: f64,
    pub margins: Margins,
    pub print_background: bool,
    /// CSS `@page size` wins over `format` when the document declares one.
    pub prefer_css_page_size: bool,
}

impl Default for PdfSettings {
    fn default() -> Self {
        let format = PaperFormat::default();
        let (paper_width, paper_height) = format.dimensions();
        // Must equal what DEFAULT_MARGIN resolves to.
        let margin = 20.0 / 25.4;

        PdfSettings {
            format,
            paper_width,
            paper_height,
            margins: Margins {
                top: margin,
                right: margin,
                bottom: margin,
                left: margin,
            },
            print_background: true,
            prefer_css_page_size: true,
        }
    }
}

impl RenderOptions {
    /// Resolve into concrete settings, filling in defaults for anything
    /// absent or blank.
    pub fn resolve(&self) -> Result<PdfSettings, OptionsError> {
        let format = match self.format.as_deref().map(str::trim) {
            None | Some("") => PaperFormat::default(),
            Some(name) => name.parse()?,
        };
        let (paper_width, paper_height) = format.dimensions();

        let margins = Margins {
            top: margin(&self.margin_top, "marginTop")?,
            right: margin(&self.margin_right, "marginRight")?,
            bottom: margin(&self.margin_bottom, "marginBottom")?,
            left: margin(&self.margin_left, "marginLeft")?,
        };

        Ok(PdfSettings {
            format,
            paper_width,
            paper_height,
            margins,
            print_background: self.print_background != Some(false),
            prefer_css_page_size: true,
        })
    }
}

fn margin(value: &Option<Length>, field: &'static str) -> Result<f64, OptionsError> {
    match value {
        Some(length) if !length.is_blank() => length.to_inches(field),
        _ => Length::Text(DEFAULT_MARGIN.to_string()).to_inches(field),
    }
}
