//! Servlet response
//!
//! Output is buffered until [`HttpResponse::flush`]. The first flush commits
//! the status line and headers to the [`ResponseSink`]; later flushes only
//! send body chunks. Status and header changes after commit are ignored.

use crate::http::Cookie;
use crate::logger;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, LOCATION, SET_COOKIE};
use hyper::StatusCode;
use std::io::{self, Write};

/// Committed status and headers
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Transport side of a response
pub trait ResponseSink: Send {
    /// Called exactly once, on commit
    fn send_head(&mut self, head: ResponseHead) -> io::Result<()>;

    fn send_chunk(&mut self, chunk: Bytes) -> io::Result<()>;
}

/// Response under construction by a servlet
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    buffer: Vec<u8>,
    committed: Option<ResponseHead>,
    sink: Option<Box<dyn ResponseSink>>,
    // Body sent while no sink is attached
    detached_body: Vec<u8>,
    bytes_sent: usize,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpResponse {
    /// Response that keeps its committed output in memory
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            buffer: Vec::new(),
            committed: None,
            sink: None,
            detached_body: Vec::new(),
            bytes_sent: 0,
        }
    }

    /// Response streaming its committed output to `sink`
    pub fn with_sink(sink: Box<dyn ResponseSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new()
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        if self.is_committed() {
            logger::log_debug(&format!("Ignoring status {status} on committed response"));
            return;
        }
        match StatusCode::from_u16(status) {
            Ok(code) => self.status = code,
            Err(_) => logger::log_warning(&format!("Ignoring invalid status code {status}")),
        }
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn contains_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// Replace every value of `name`
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = self.header_pair(name, value) {
            self.headers.insert(name, value);
        }
    }

    /// Append a value, keeping existing ones
    pub fn add_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = self.header_pair(name, value) {
            self.headers.append(name, value);
        }
    }

    fn header_pair(&self, name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
        if self.is_committed() {
            logger::log_debug(&format!("Ignoring header '{name}' on committed response"));
            return None;
        }
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => Some((name, value)),
            _ => {
                logger::log_warning(&format!("Ignoring invalid header '{name}: {value}'"));
                None
            }
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    pub fn set_content_type(&mut self, content_type: &str) {
        self.set_header(CONTENT_TYPE.as_str(), content_type);
    }

    pub fn add_cookie(&mut self, cookie: &Cookie) {
        self.add_header(SET_COOKIE.as_str(), &cookie.to_header_value());
    }

    /// 302 to `location`
    pub fn send_redirect(&mut self, location: &str) {
        self.set_status(302);
        self.set_header(LOCATION.as_str(), location);
    }

    /// Append text to the body buffer
    pub fn print(&mut self, text: &str) {
        self.buffer.extend_from_slice(text.as_bytes());
    }

    pub fn print_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Buffered, not yet flushed body bytes
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop buffered output; fails once anything was committed
    pub fn reset_buffer(&mut self) -> bool {
        if self.is_committed() {
            return false;
        }
        self.buffer.clear();
        true
    }

    pub const fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    /// Status and headers as they were committed
    pub const fn committed_head(&self) -> Option<&ResponseHead> {
        self.committed.as_ref()
    }

    /// Body sent so far when no sink is attached
    pub fn sent_body(&self) -> &[u8] {
        &self.detached_body
    }

    pub const fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    /// Commit on first call, then send buffered body bytes
    pub fn flush(&mut self) -> io::Result<()> {
        if self.committed.is_none() {
            let head = ResponseHead {
                status: self.status,
                headers: self.headers.clone(),
            };
            if let Some(sink) = self.sink.as_mut() {
                sink.send_head(head.clone())?;
            }
            self.committed = Some(head);
        }

        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::take(&mut self.buffer);
        self.bytes_sent += chunk.len();
        match self.sink.as_mut() {
            Some(sink) => sink.send_chunk(Bytes::from(chunk)),
            None => {
                self.detached_body.extend_from_slice(&chunk);
                Ok(())
            }
        }
    }
}

impl Write for HttpResponse {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Self::flush(self)
    }
}
