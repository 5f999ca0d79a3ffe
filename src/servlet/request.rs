//! Servlet request
//!
//! Built by the server shell from the parsed hyper request. Owns the decoded
//! parameters, cookies, uploaded files and, once asked for, the session.

use crate::logger;
use crate::servlet::{HttpSession, ServletContext, UploadedFile, SESSION_COOKIE_NAME};
use chrono::Utc;
use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::{Method, Version};
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct HttpRequest {
    method: Method,
    path: String,
    query: Option<String>,
    version: Version,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    get_params: HashMap<String, String>,
    post_params: HashMap<String, String>,
    cookies: HashMap<String, String>,
    body: Bytes,
    uploaded_files: Vec<UploadedFile>,
    session: Option<HttpSession>,
    context: Option<Arc<ServletContext>>,
    attributes: HashMap<String, Value>,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            remote_addr: None,
            get_params: HashMap::new(),
            post_params: HashMap::new(),
            cookies: HashMap::new(),
            body: Bytes::new(),
            uploaded_files: Vec::new(),
            session: None,
            context: None,
            attributes: HashMap::new(),
        }
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request path as sent, without query string
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn set_query(&mut self, query: Option<String>) {
        self.query = query;
    }

    pub const fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn set_headers(&mut self, headers: HeaderMap) {
        self.headers = headers;
    }

    /// First value of a header, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub const fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn set_remote_addr(&mut self, addr: SocketAddr) {
        self.remote_addr = Some(addr);
    }

    /// Query string parameter
    pub fn get_parameter(&self, name: &str) -> Option<&str> {
        self.get_params.get(name).map(String::as_str)
    }

    /// Form body parameter, urlencoded or multipart
    pub fn post_parameter(&self, name: &str) -> Option<&str> {
        self.post_params.get(name).map(String::as_str)
    }

    /// Form value first, query value otherwise
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.post_parameter(name).or_else(|| self.get_parameter(name))
    }

    pub fn set_get_params(&mut self, params: HashMap<String, String>) {
        self.get_params = params;
    }

    pub fn set_post_params(&mut self, params: HashMap<String, String>) {
        self.post_params = params;
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn set_cookies(&mut self, cookies: HashMap<String, String>) {
        self.cookies = cookies;
    }

    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: Bytes) {
        self.body = body;
    }

    pub fn uploaded_files(&self) -> &[UploadedFile] {
        &self.uploaded_files
    }

    pub fn uploaded_files_mut(&mut self) -> &mut [UploadedFile] {
        &mut self.uploaded_files
    }

    pub fn uploaded_file(&self, field_name: &str) -> Option<&UploadedFile> {
        self.uploaded_files.iter().find(|f| f.field_name() == field_name)
    }

    pub fn add_uploaded_file(&mut self, file: UploadedFile) {
        self.uploaded_files.push(file);
    }

    /// Delete every temporary upload still held; returns how many this call released
    pub fn release_uploaded_files(&mut self) -> usize {
        self.uploaded_files
            .iter_mut()
            .map(UploadedFile::destroy)
            .filter(|released| *released)
            .count()
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn set_servlet_context(&mut self, context: Arc<ServletContext>) {
        self.context = Some(context);
    }

    pub const fn servlet_context(&self) -> Option<&Arc<ServletContext>> {
        self.context.as_ref()
    }

    /// Session attached so far, without touching storage
    pub const fn session(&self) -> Option<&HttpSession> {
        self.session.as_ref()
    }

    /// Session of this request
    ///
    /// Looks up the `JSESSIONID` cookie in the bound context's storage on
    /// first call. With `create` set, a new session is started when none is
    /// found. Without a bound context there is never a session.
    pub fn get_session(&mut self, create: bool) -> io::Result<Option<&mut HttpSession>> {
        if self.session.is_none() {
            let Some(context) = self.context.as_ref() else {
                logger::log_debug("Session requested outside a servlet context");
                return Ok(None);
            };

            let existing = match self.cookies.get(SESSION_COOKIE_NAME) {
                Some(id) => context
                    .session_storage()
                    .load(id)?
                    .filter(|s| !s.is_invalidated() && !s.is_expired_at(Utc::now())),
                None => None,
            };

            self.session = match existing {
                Some(mut session) => {
                    session.touch();
                    Some(session)
                }
                None if create => Some(HttpSession::new(context.session_timeout_secs())),
                None => None,
            };
        }
        Ok(self.session.as_mut())
    }
}
