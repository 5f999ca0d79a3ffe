//! Demo servlets

use super::escape_html;
use crate::error::ServletError;
use crate::servlet::{HttpRequest, HttpResponse, Servlet, ServletConfig};
use hyper::Method;
use serde_json::Value;
use std::fmt::Write as _;
use std::time::Duration;

/// Landing page linking the other demos
///
/// Links point at the paths used by the sample configuration.
pub struct Index;

impl Servlet for Index {
    fn service(&self, request: &mut HttpRequest, response: &mut HttpResponse) -> Result<(), ServletError> {
        let context = request
            .servlet_context()
            .map(|c| c.context_path().to_string())
            .filter(|path| !path.is_empty())
            .unwrap_or_else(|| "/".to_string());

        response.set_content_type("text/html; charset=utf-8");
        response.print(&format!(
            "<!DOCTYPE html>\n<html><head><title>Servlet demo</title></head><body>\n\
             <h1>Servlet demo</h1>\n<p>You asked for <code>{path}</code> in context <code>{context}</code></p>\n<ul>\n\
             <li><a href=\"/app/counter\">Session counter</a></li>\n\
             <li><a href=\"/app/upload\">File upload</a></li>\n\
             <li><a href=\"/app/chunked\">Chunked response</a></li>\n\
             <li><a href=\"/secured/index.html?login=demo\">Secured area</a></li>\n\
             <li><a href=\"/about.html\">Static page</a></li>\n\
             </ul>\n</body></html>\n",
            path = escape_html(request.path()),
            context = escape_html(&context),
        ));
        Ok(())
    }
}

/// Counts visits per session; `?invalidate` ends the session
pub struct SessionCounter;

impl Servlet for SessionCounter {
    fn service(&self, request: &mut HttpRequest, response: &mut HttpResponse) -> Result<(), ServletError> {
        let invalidate = request.parameter("invalidate").is_some();
        let session = request
            .get_session(true)?
            .ok_or_else(|| ServletError::execution("session counter needs a servlet context"))?;

        response.set_content_type("text/html; charset=utf-8");
        if invalidate {
            session.invalidate();
            response.print("<html><body><p>Session invalidated.</p></body></html>\n");
            return Ok(());
        }

        let count = session.attribute("count").and_then(Value::as_u64).unwrap_or(0) + 1;
        session.set_attribute("count", count);
        response.print(&format!(
            "<html><body><p>Visits in this session: {count}</p>\
             <p>Session id: <code>{}</code></p></body></html>\n",
            escape_html(session.id())
        ));
        Ok(())
    }
}

/// Upload form on GET, summary of the received parts on POST
pub struct Upload;

impl Servlet for Upload {
    fn service(&self, request: &mut HttpRequest, response: &mut HttpResponse) -> Result<(), ServletError> {
        response.set_content_type("text/html; charset=utf-8");

        if request.method() != Method::POST {
            response.print(
                "<html><body><form method=\"post\" enctype=\"multipart/form-data\">\n\
                 <input type=\"text\" name=\"description\">\n\
                 <input type=\"file\" name=\"file\" multiple>\n\
                 <button type=\"submit\">Upload</button>\n\
                 </form></body></html>\n",
            );
            return Ok(());
        }

        let mut page = String::from("<html><body><h1>Received</h1>\n");
        if let Some(description) = request.post_parameter("description") {
            let _ = writeln!(page, "<p>Description: {}</p>", escape_html(description));
        }
        page.push_str("<ul>\n");
        for file in request.uploaded_files() {
            let _ = writeln!(
                page,
                "<li>{}: {} ({} bytes, {})</li>",
                escape_html(file.field_name()),
                escape_html(file.file_name()),
                file.size(),
                escape_html(file.content_type().unwrap_or("unknown type"))
            );
        }
        page.push_str("</ul></body></html>\n");
        response.print(&page);
        Ok(())
    }
}

const DEFAULT_CHUNK_DELAY_MS: u64 = 200;
const CHUNK_COUNT: usize = 5;

/// Streams a few lines, flushing and pausing between them
///
/// The pause comes from the `chunk_delay_ms` context init parameter.
pub struct ChunkedWithDelay {
    delay: Duration,
}

impl Default for ChunkedWithDelay {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_CHUNK_DELAY_MS),
        }
    }
}

impl Servlet for ChunkedWithDelay {
    fn init(&mut self, config: &ServletConfig) -> Result<(), ServletError> {
        if let Some(value) = config.init_parameter("chunk_delay_ms") {
            let millis = value.trim().parse::<u64>().map_err(|e| ServletError::Initialization {
                class: config.class_name().to_string(),
                reason: format!("chunk_delay_ms '{value}': {e}"),
            })?;
            self.delay = Duration::from_millis(millis);
        }
        Ok(())
    }

    fn service(&self, _request: &mut HttpRequest, response: &mut HttpResponse) -> Result<(), ServletError> {
        response.set_content_type("text/plain; charset=utf-8");
        for i in 1..=CHUNK_COUNT {
            response.print(&format!("chunk {i} of {CHUNK_COUNT}\n"));
            response.flush()?;
            if i < CHUNK_COUNT {
                std::thread::sleep(self.delay);
            }
        }
        Ok(())
    }
}
