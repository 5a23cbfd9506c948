use axum::{
    async_trait,
    extract::{Form, FromRequest, Request, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::models::{ConversionForm, ConversionRequest, PdfArtifact};
use crate::services::Converter;

pub const PROCESSING_TIME_HEADER: HeaderName = HeaderName::from_static("x-processing-time");

/// RFC 5987 `attr-char`: everything else is percent-encoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Failure description
    pub error: String,
}

/// Body of a conversion request: JSON, or a form-encoded body whose
/// options use bracketed keys (`options[format]=Letter`).
#[derive(Debug)]
pub struct ConversionPayload(pub ConversionRequest);

#[async_trait]
impl<S> FromRequest<S> for ConversionPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(req.headers()) {
            let Form(form) = Form::<ConversionForm>::from_request(req, state)
                .await
                .map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
            Ok(Self(form.into()))
        } else {
            let Json(request) = Json::<ConversionRequest>::from_request(req, state)
                .await
                .map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
            Ok(Self(request))
        }
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

/// Convert HTML to PDF
///
/// Renders the submitted HTML in a fresh browser tab and returns the PDF
/// as an attachment.
#[utoipa::path(
    post,
    path = "/convert",
    request_body(
        content = ConversionRequest,
        description = "JSON body. Form-encoded bodies with `options[...]` keys are also accepted"
    ),
    responses(
        (status = 200, description = "Rendered PDF document", content_type = "application/pdf", body = Vec<u8>,
            headers(
                ("Content-Disposition" = String, description = "attachment; filename=\"...\""),
                ("X-Processing-Time" = u64, description = "Elapsed processing time in milliseconds"),
            )),
        (status = 400, description = "Missing HTML or invalid options", body = ErrorResponse),
        (status = 500, description = "Rendering failed", body = ErrorResponse),
    ),
    tag = "Conversion"
)]
pub async fn handle_convert(
    State(converter): State<Arc<Converter>>,
    ConversionPayload(request): ConversionPayload,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    tracing::info!("New HTML to PDF conversion request");

    let job = request.into_job(chrono::Utc::now()).inspect_err(|e| {
        tracing::info!(%e, "Rejected conversion request");
    })?;

    tracing::debug!(
        format = job.settings.format.name(),
        margins = ?job.settings.margins,
        print_background = job.settings.print_background,
        prefer_css_page_size = job.settings.prefer_css_page_size,
        html_bytes = job.html.len(),
        "PDF configuration"
    );

    let artifact = match converter.convert(job).await {
        Ok(artifact) => artifact,
        Err(e) => {
            tracing::error!(
                %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Conversion failed"
            );
            return Err(e.into());
        }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::info!(
        bytes = artifact.bytes.len(),
        filename = %artifact.filename,
        elapsed_ms,
        "PDF generated"
    );

    Ok(pdf_response(artifact, elapsed_ms))
}

fn pdf_response(artifact: PdfArtifact, elapsed_ms: u64) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&artifact.filename),
            ),
            (header::CONTENT_LENGTH, artifact.bytes.len().to_string()),
            (PROCESSING_TIME_HEADER, elapsed_ms.to_string()),
        ],
        artifact.bytes,
    )
        .into_response()
}

/// `attachment` disposition with an ASCII-safe `filename`, plus an encoded
/// `filename*` when the name had to be altered.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    if fallback == filename {
        format!("attachment; filename=\"{fallback}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            utf8_percent_encode(filename, ATTR_CHAR)
        )
    }
}
