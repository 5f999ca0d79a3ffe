//! Cookie header parsing and `Set-Cookie` formatting

use std::collections::HashMap;

/// A cookie to be sent with a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    /// Seconds; `Some(0)` removes the cookie on the client
    pub max_age: Option<i64>,
    pub http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            max_age: None,
            http_only: false,
        }
    }

    /// Render as a `Set-Cookie` header value
    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if let Some(path) = &self.path {
            out.push_str("; Path=");
            out.push_str(path);
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

/// Parse a request `Cookie: a=1; b=2` header
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().trim_matches('"').to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_header() {
        let cookies = parse_cookie_header("JSESSIONID=abc; theme=\"dark\" ;broken; =x");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies.get("JSESSIONID").map(String::as_str), Some("abc"));
        assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
    }

    #[test]
    fn test_set_cookie_value() {
        let mut cookie = Cookie::new("JSESSIONID", "abc");
        cookie.path = Some("/".to_string());
        cookie.http_only = true;
        assert_eq!(cookie.to_header_value(), "JSESSIONID=abc; Path=/; HttpOnly");

        cookie.max_age = Some(0);
        assert!(cookie.to_header_value().contains("Max-Age=0"));
    }
}
