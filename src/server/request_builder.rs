//! Wire request to servlet request
//!
//! Runs on a blocking worker since file parts are written to disk.

use crate::error::{MultipartError, RequestError};
use crate::http::{cookie, multipart, params};
use crate::servlet::{HttpRequest, UploadedFile};
use hyper::body::Bytes;
use hyper::header::{CONTENT_TYPE, COOKIE};
use hyper::http::request::Parts;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

/// Build the servlet request from the head and the fully read body
///
/// Multipart file parts are stored under `temp_dir`; parts with an empty
/// file name (a file input left blank) are skipped.
pub fn build_request(
    parts: &Parts,
    body: Bytes,
    remote_addr: SocketAddr,
    temp_dir: &Path,
) -> Result<HttpRequest, RequestError> {
    let mut request = HttpRequest::new(parts.method.clone(), parts.uri.path());
    request.set_query(parts.uri.query().map(ToString::to_string));
    if let Some(query) = parts.uri.query() {
        request.set_get_params(params::parse_query(query));
    }
    request.set_version(parts.version);
    request.set_remote_addr(remote_addr);

    let cookies: HashMap<String, String> = parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| cookie::parse_cookie_header(v).into_iter())
        .collect();
    request.set_cookies(cookies);

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if is_multipart(content_type) {
        let boundary = multipart::parse_boundary(content_type).ok_or(MultipartError::MissingBoundary)?;
        let mut fields = HashMap::new();
        for part in multipart::split_parts(&body, &boundary)? {
            match part.headers.file_name() {
                Some("") => {}
                Some(_) => {
                    let file = UploadedFile::create(&part.headers, &part.data, temp_dir)?;
                    request.add_uploaded_file(file);
                }
                None => {
                    fields.insert(
                        part.headers.name().to_string(),
                        String::from_utf8_lossy(&part.data).into_owned(),
                    );
                }
            }
        }
        request.set_post_params(fields);
    } else if params::is_form_urlencoded(content_type) {
        request.set_post_params(params::parse_query(&String::from_utf8_lossy(&body)));
    }

    request.set_headers(parts.headers.clone());
    request.set_body(body);
    Ok(request)
}

fn is_multipart(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|t| t.trim().eq_ignore_ascii_case("multipart/form-data"))
}
