//! Query string and form body decoding

use std::collections::HashMap;
use url::form_urlencoded;

/// Decode `a=1&b=two%20words` pairs; a repeated key keeps its last value
pub fn parse_query(query: &str) -> HashMap<String, String> {
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Whether a request `Content-Type` announces an url-encoded form body
pub fn is_form_urlencoded(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
}
