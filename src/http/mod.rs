//! HTTP protocol helpers
//!
//! Wire-level pieces shared by the server shell and the resource providers:
//! multipart parsing, parameter and cookie decoding, MIME types, cache
//! validation and the plain fallback responses of the connection layer.

pub mod cache;
pub mod cookie;
pub mod mime;
pub mod multipart;
pub mod params;
pub mod response;

pub use cookie::Cookie;
pub use multipart::{MultipartHeadersPart, Part};
pub use response::{build_400_response, build_413_response, build_500_response, full_body, ResponseBody};
