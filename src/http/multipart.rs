//! Multipart/form-data support
//!
//! Parses the header block of a single body part and splits a complete
//! `multipart/form-data` body into parts.

use crate::error::MultipartError;
use hyper::body::Bytes;
use memchr::memmem;

const HEADER_CONTENT_DISPOSITION: &str = "content-disposition";
const HEADER_CONTENT_TYPE: &str = "content-type";

/// Parsed header block of one multipart part
///
/// `file_name` is `None` for ordinary form fields and `content_type` is `None`
/// when the part declares no type, which is distinct from an empty type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartHeadersPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
}

impl MultipartHeadersPart {
    /// Parse a header block such as
    /// `Content-Disposition: form-data; name="f"; filename="a.pdf"\nContent-Type: application/pdf`
    ///
    /// Field and parameter names are matched case-insensitively, values may
    /// be quoted. The disposition type token is ignored.
    pub fn parse(block: &str) -> Result<Self, MultipartError> {
        let mut disposition = None;
        let mut content_type = None;

        for line in block.lines() {
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let field = field.trim();
            if field.eq_ignore_ascii_case(HEADER_CONTENT_DISPOSITION) {
                disposition = Some(value.trim());
            } else if field.eq_ignore_ascii_case(HEADER_CONTENT_TYPE) {
                content_type = Some(value.trim().to_string());
            }
        }

        let disposition = disposition.ok_or(MultipartError::MissingDisposition)?;

        let mut name = None;
        let mut file_name = None;
        // First segment is the disposition type (form-data, attachment, ...)
        for param in split_parameters(disposition).into_iter().skip(1) {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.eq_ignore_ascii_case("name") {
                name = Some(unquote(value));
            } else if key.eq_ignore_ascii_case("filename") {
                file_name = Some(unquote(value));
            }
        }

        Ok(Self {
            name: name.ok_or(MultipartError::MissingName)?,
            file_name,
            content_type,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// A part with a `filename` parameter carries file content
    pub const fn is_file(&self) -> bool {
        self.file_name.is_some()
    }
}

/// Split on `;` outside of double quotes
fn split_parameters(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(value[start..].trim());
    params
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

/// One part of a multipart body
#[derive(Debug, Clone)]
pub struct Part {
    pub headers: MultipartHeadersPart,
    pub data: Bytes,
}

/// Extract the boundary from a `multipart/form-data; boundary=...` content type
pub fn parse_boundary(content_type: &str) -> Option<String> {
    let mut params = split_parameters(content_type).into_iter();
    let media_type = params.next()?;
    if !media_type.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    params
        .filter_map(|p| p.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| unquote(value))
        .filter(|b| !b.is_empty())
}

/// Split a complete multipart body into parts
pub fn split_parts(body: &Bytes, boundary: &str) -> Result<Vec<Part>, MultipartError> {
    let delimiter = format!("--{boundary}");
    let separator = format!("\r\n--{boundary}");
    let delimiter_finder = memmem::Finder::new(delimiter.as_bytes());
    let separator_finder = memmem::Finder::new(separator.as_bytes());
    let header_end_finder = memmem::Finder::new(b"\r\n\r\n");

    let first = delimiter_finder
        .find(body)
        .ok_or(MultipartError::Malformed("opening boundary not found"))?;
    let mut pos = first + delimiter.len();
    let mut parts = Vec::new();

    loop {
        let rest = &body[pos..];
        if rest.starts_with(b"--") {
            return Ok(parts);
        }
        let rest = rest
            .strip_prefix(b"\r\n")
            .ok_or(MultipartError::Malformed("boundary not followed by CRLF"))?;
        let content_start = body.len() - rest.len();

        let header_len = header_end_finder
            .find(rest)
            .ok_or(MultipartError::Malformed("part headers not terminated"))?;
        let headers = String::from_utf8_lossy(&rest[..header_len]);
        let headers = MultipartHeadersPart::parse(&headers)?;

        let data_start = content_start + header_len + 4;
        let data_len = separator_finder
            .find(&body[data_start..])
            .ok_or(MultipartError::Malformed("closing boundary not found"))?;

        parts.push(Part {
            headers,
            data: body.slice(data_start..data_start + data_len),
        });
        pos = data_start + data_len + separator.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attachment_header() {
        let headers = MultipartHeadersPart::parse(
            "Content-Disposition: attachment; name=\"FIELDNAME\"; filename=\"FILE.PDF\"\nContent-type: application/pdf",
        )
        .unwrap();

        assert_eq!(headers.file_name(), Some("FILE.PDF"));
        assert_eq!(headers.name(), "FIELDNAME");
        assert_eq!(headers.content_type(), Some("application/pdf"));
        assert!(headers.is_file());
    }

    #[test]
    fn test_parse_attachment_header_case_insensitive() {
        let upper = MultipartHeadersPart::parse(
            "CONTENT-DISPOSITION: attachment; NAME=\"FIELDNAME\"; FILENAME=\"FILE.PDF\"\nContent-TYPE: application/pdf",
        )
        .unwrap();
        let lower = MultipartHeadersPart::parse(
            "content-disposition: attachment; name=\"FIELDNAME\"; filename=\"FILE.PDF\"\ncontent-type: application/pdf",
        )
        .unwrap();

        assert_eq!(upper, lower);
        assert_eq!(upper.file_name(), Some("FILE.PDF"));
        assert_eq!(upper.name(), "FIELDNAME");
        assert_eq!(upper.content_type(), Some("application/pdf"));
    }

    #[test]
    fn test_parse_form_data_text() {
        let headers = MultipartHeadersPart::parse("Content-Disposition: form-data; name=\"text\"").unwrap();

        assert_eq!(headers.name(), "text");
        assert_eq!(headers.file_name(), None);
        assert_eq!(headers.content_type(), None);
        assert!(!headers.is_file());
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_unquoted_values() {
        let headers = MultipartHeadersPart::parse(
            "Content-Disposition:form-data ;  name = field ;filename=\"a; b.txt\"\r\nContent-Type: text/plain\r\n",
        )
        .unwrap();

        assert_eq!(headers.name(), "field");
        assert_eq!(headers.file_name(), Some("a; b.txt"));
        assert_eq!(headers.content_type(), Some("text/plain"));
    }

    #[test]
    fn test_parse_empty_content_type_is_not_absent() {
        let headers =
            MultipartHeadersPart::parse("Content-Disposition: form-data; name=\"x\"\nContent-Type:").unwrap();
        assert_eq!(headers.content_type(), Some(""));
    }

    #[test]
    fn test_parse_missing_disposition_or_name() {
        assert_eq!(
            MultipartHeadersPart::parse("Content-Type: text/plain"),
            Err(MultipartError::MissingDisposition)
        );
        assert_eq!(
            MultipartHeadersPart::parse("Content-Disposition: form-data; filename=\"a\""),
            Err(MultipartError::MissingName)
        );
    }

    #[test]
    fn test_parse_boundary() {
        assert_eq!(
            parse_boundary("multipart/form-data; boundary=----abc123"),
            Some("----abc123".to_string())
        );
        assert_eq!(
            parse_boundary("Multipart/Form-Data; BOUNDARY=\"quoted\""),
            Some("quoted".to_string())
        );
        assert_eq!(parse_boundary("multipart/form-data"), None);
        assert_eq!(parse_boundary("text/plain; boundary=x"), None);
    }

    #[test]
    fn test_split_parts() {
        let body = Bytes::from_static(
            b"--XYZ\r\n\
Content-Disposition: form-data; name=\"text\"\r\n\r\n\
hello\r\n\
--XYZ\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
Content-Type: text/plain\r\n\r\n\
line1\r\nline2\r\n\
--XYZ--\r\n",
        );

        let parts = split_parts(&body, "XYZ").unwrap();
        assert_eq!(parts.len(), 2);

        assert_eq!(parts[0].headers.name(), "text");
        assert_eq!(&parts[0].data[..], b"hello");

        assert_eq!(parts[1].headers.file_name(), Some("a.txt"));
        assert_eq!(parts[1].headers.content_type(), Some("text/plain"));
        assert_eq!(&parts[1].data[..], b"line1\r\nline2");
    }

    #[test]
    fn test_split_parts_malformed() {
        let body = Bytes::from_static(b"no boundary here");
        assert!(split_parts(&body, "XYZ").is_err());

        let body = Bytes::from_static(b"--XYZ\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nunterminated");
        assert_eq!(
            split_parts(&body, "XYZ").unwrap_err(),
            MultipartError::Malformed("closing boundary not found")
        );
    }
}
