//! Response construction.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Content type of every greeting.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// `200 OK` with a UTF-8 plain-text body.
pub fn plain_text(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8))],
        body,
    )
        .into_response()
}
