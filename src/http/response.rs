//! Fallback responses of the connection layer
//!
//! Everything a resource provider produces goes through
//! [`crate::servlet::HttpResponse`]; these builders cover the cases where no
//! provider ran at all.

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use std::io;

/// Body type of every response the server emits
pub type ResponseBody = BoxBody<Bytes, io::Error>;

/// Wrap a complete buffer as a [`ResponseBody`]
pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<ResponseBody> {
    build_plain_response(413, "413 Payload Too Large")
}

/// Build 400 Bad Request response
pub fn build_400_response() -> Response<ResponseBody> {
    build_plain_response(400, "400 Bad Request")
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<ResponseBody> {
    build_plain_response(500, "500 Internal Server Error")
}

fn build_plain_response(status: u16, text: &'static str) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(full_body(text))
        .unwrap_or_else(|e| {
            crate::logger::log_error(&format!("Failed to build {status} response: {e}"));
            Response::new(full_body(text))
        })
}
