//! Response construction.
//!
//! # Design Decisions
//! - Failures carry no body; every 500 looks the same to the caller
//! - Successful bodies are plain text, matching what HTTP clients sniff

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// A 500 with an empty body.
pub fn server_error() -> Response {
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// A 200 with a `text/plain` body.
pub fn plain_text(body: impl Into<Body>) -> Response {
    let mut response = Response::new(body.into());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
