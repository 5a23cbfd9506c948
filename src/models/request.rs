use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use super::options::{Length, PdfSettings, RenderOptions};
use crate::error::ApiError;

/// Request body for HTML to PDF conversion
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ConversionRequest {
    /// HTML document to render (required, non-empty)
    #[serde(default)]
    pub html: Option<String>,
    /// Suggested download filename (default: document_<timestamp>.pdf)
    #[serde(default)]
    pub filename: Option<String>,
    /// Print options; every field is optional
    #[serde(default)]
    pub options: Option<RenderOptions>,
}

/// Form-encoded request body. Options use bracketed keys, as in
/// `options[format]=Letter&options[marginTop]=1in`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversionForm {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, rename = "options[format]")]
    pub format: Option<String>,
    #[serde(default, rename = "options[marginTop]")]
    pub margin_top: Option<Length>,
    #[serde(default, rename = "options[marginRight]")]
    pub margin_right: Option<Length>,
    #[serde(default, rename = "options[marginBottom]")]
    pub margin_bottom: Option<Length>,
    #[serde(default, rename = "options[marginLeft]")]
    pub margin_left: Option<Length>,
    #[serde(default, rename = "options[printBackground]")]
    pub print_background: Option<bool>,
}

impl From<ConversionForm> for ConversionRequest {
    fn from(form: ConversionForm) -> Self {
        Self {
            html: form.html,
            filename: form.filename,
            options: Some(RenderOptions {
                format: form.format,
                margin_top: form.margin_top,
                margin_right: form.margin_right,
                margin_bottom: form.margin_bottom,
                margin_left: form.margin_left,
                print_background: form.print_background,
            }),
        }
    }
}

/// A request that passed validation, ready for the renderer.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub html: String,
    pub filename: String,
    pub settings: PdfSettings,
}

impl ConversionRequest {
    /// Validate the request and resolve its options.
    ///
    /// Nothing here touches the renderer, so a rejected request never
    /// acquires a surface.
    pub fn into_job(self, now: DateTime<Utc>) -> Result<ConversionJob, ApiError> {
        let html = match self.html {
            Some(html) if !html.is_empty() => html,
            _ => return Err(ApiError::MissingHtml),
        };

        let settings = self.options.unwrap_or_default().resolve()?;

        let filename = match self.filename {
            Some(name) if !name.trim().is_empty() => name,
            _ => default_filename(now),
        };

        Ok(ConversionJob {
            html,
            filename,
            settings,
        })
    }
}

pub fn default_filename(now: DateTime<Utc>) -> String {
    format!("document_{}.pdf", now.timestamp_millis())
}

/// Rendered document plus the name it should be downloaded as.
#[derive(Debug, Clone)]
pub struct PdfArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
}
