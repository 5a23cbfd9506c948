//! Assertion helpers for tests.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use super::app::TestResponse;

/// Assert response has expected status code
pub fn assert_status(response: &TestResponse, expected: StatusCode) {
    assert_eq!(
        response.status,
        expected,
        "Expected status {}, got {}. Body: {}",
        expected,
        response.status,
        response.text()
    );
}

/// Assert response is OK (200)
pub fn assert_ok(response: &TestResponse) {
    assert_status(response, StatusCode::OK);
}

/// Assert response is a downloadable PDF with the expected headers
pub fn assert_pdf(response: &TestResponse) {
    assert_ok(response);
    assert!(
        response.is_pdf(),
        "Expected PDF body, got {} bytes starting with {:?}",
        response.body.len(),
        &response.body[..8.min(response.body.len())]
    );

    assert_eq!(response.header("content-type"), Some("application/pdf"));

    let disposition = response
        .header("content-disposition")
        .expect("Expected Content-Disposition header");
    assert!(
        disposition.starts_with("attachment; filename=\"") && disposition.contains(".pdf"),
        "Unexpected Content-Disposition: {disposition}"
    );

    let length = response
        .header("content-length")
        .expect("Expected Content-Length header");
    assert_eq!(length, response.body.len().to_string());

    let elapsed = response
        .header("x-processing-time")
        .expect("Expected X-Processing-Time header");
    assert!(
        elapsed.parse::<u64>().is_ok(),
        "X-Processing-Time should be numeric, got {elapsed}"
    );
}

/// Assert a JSON error body with the given status; returns the message
pub fn assert_error(response: &TestResponse, expected: StatusCode) -> String {
    assert_status(response, expected);
    let json: serde_json::Value = response.json();
    json["error"]
        .as_str()
        .unwrap_or_else(|| panic!("Expected error message in {json}"))
        .to_string()
}
