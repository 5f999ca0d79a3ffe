//! Static file provider
//!
//! Serves files below a document root for paths no servlet claims. Handles
//! index files for directories, `ETag` validation and HEAD requests.

use crate::error::LoadError;
use crate::http::{cache, mime};
use crate::logger;
use crate::resource::ResourceProvider;
use crate::servlet::{HttpRequest, HttpResponse};
use hyper::header::{ALLOW, CACHE_CONTROL, CONTENT_LENGTH, ETAG, IF_NONE_MATCH};
use hyper::Method;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Browser cache lifetime for static content
const STATIC_MAX_AGE: u32 = 3600;

pub struct StaticResourceProvider {
    root: PathBuf,
    index_files: Vec<String>,
}

impl StaticResourceProvider {
    /// Provider for `dir`; fails when the directory does not exist
    pub fn new(dir: &str, index_files: Vec<String>) -> io::Result<Self> {
        let root = Path::new(dir).canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("static directory '{dir}' is not a directory"),
            ));
        }
        Ok(Self { root, index_files })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path to an existing file below the root
    fn resolve_file(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        // Only plain names; rejects `..`, roots and prefixes before touching the filesystem
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            logger::log_warning(&format!("Path traversal attempt blocked: {path}"));
            return None;
        }

        let mut file_path = self.root.join(relative);
        if file_path.is_dir() {
            file_path = self
                .index_files
                .iter()
                .map(|index| file_path.join(index))
                .find(|candidate| candidate.is_file())?;
        }

        // Symlinks may still point outside the root
        let canonical = file_path.canonicalize().ok()?;
        if !canonical.starts_with(&self.root) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {} -> {}",
                path,
                canonical.display()
            ));
            return None;
        }
        canonical.is_file().then_some(canonical)
    }
}

impl ResourceProvider for StaticResourceProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    fn can_load(&self, path: &str) -> bool {
        self.resolve_file(path).is_some()
    }

    fn load(&self, path: &str, request: &mut HttpRequest, response: &mut HttpResponse) -> Result<(), LoadError> {
        let file = self
            .resolve_file(path)
            .ok_or_else(|| LoadError::Unresolvable(path.to_string()))?;

        let is_head = request.method() == Method::HEAD;
        if !is_head && request.method() != Method::GET {
            response.set_status(405);
            response.set_header(ALLOW.as_str(), "GET, HEAD");
            response.flush()?;
            return Ok(());
        }

        let metadata = fs::metadata(&file)?;
        let etag = cache::file_etag(metadata.len(), metadata.modified().ok());
        response.set_header(ETAG.as_str(), &etag);
        response.set_header(
            CACHE_CONTROL.as_str(),
            &cache::CachePolicy::Public(STATIC_MAX_AGE).to_header_value(),
        );

        if cache::check_etag_match(request.header(IF_NONE_MATCH.as_str()), &etag) {
            response.set_status(304);
            response.flush()?;
            return Ok(());
        }

        response.set_status(200);
        response.set_content_type(mime::content_type_for(&file));
        response.set_header(CONTENT_LENGTH.as_str(), &metadata.len().to_string());
        if !is_head {
            response.print_bytes(&fs::read(&file)?);
        }
        response.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;

    fn fixture() -> (tempfile::TempDir, StaticResourceProvider) {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        fs::create_dir_all(public.join("docs")).unwrap();
        fs::write(public.join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(public.join("style.CSS"), "body{}").unwrap();
        fs::write(public.join("docs/readme.txt"), "read me").unwrap();
        fs::write(dir.path().join("secret.txt"), "top secret").unwrap();

        let provider =
            StaticResourceProvider::new(public.to_str().unwrap(), vec!["index.html".to_string()]).unwrap();
        (dir, provider)
    }

    fn get(provider: &StaticResourceProvider, path: &str) -> HttpResponse {
        let mut request = HttpRequest::new(Method::GET, path);
        let mut response = HttpResponse::new();
        provider.load(path, &mut request, &mut response).unwrap();
        response
    }

    #[test]
    fn test_missing_root() {
        assert!(StaticResourceProvider::new("/nonexistent/static-root", Vec::new()).is_err());
    }

    #[test]
    fn test_can_load() {
        let (_dir, provider) = fixture();
        assert!(provider.can_load("/"));
        assert!(provider.can_load("/docs/readme.txt"));
        assert!(!provider.can_load("/docs"));
        assert!(!provider.can_load("/missing.txt"));
    }

    #[test]
    fn test_traversal_is_rejected() {
        let (_dir, provider) = fixture();
        assert!(!provider.can_load("/../secret.txt"));
        assert!(!provider.can_load("/docs/../../secret.txt"));
        assert!(!provider.can_load("//etc/passwd"));
    }

    #[test]
    fn test_serves_file_with_headers() {
        let (_dir, provider) = fixture();
        let response = get(&provider, "/style.CSS");

        let head = response.committed_head().unwrap();
        assert_eq!(head.status, StatusCode::OK);
        assert_eq!(head.headers["content-type"], "text/css");
        assert_eq!(head.headers["content-length"], "6");
        assert_eq!(head.headers["cache-control"], "public, max-age=3600");
        assert!(head.headers.contains_key("etag"));
        assert_eq!(response.sent_body(), b"body{}");
    }

    #[test]
    fn test_index_file() {
        let (_dir, provider) = fixture();
        assert_eq!(get(&provider, "/").sent_body(), b"<h1>home</h1>");
    }

    #[test]
    fn test_etag_not_modified() {
        let (_dir, provider) = fixture();
        let first = get(&provider, "/docs/readme.txt");
        let etag = first.committed_head().unwrap().headers["etag"].clone();

        let mut request = HttpRequest::new(Method::GET, "/docs/readme.txt");
        let mut headers = hyper::HeaderMap::new();
        headers.insert(IF_NONE_MATCH, etag);
        request.set_headers(headers);
        let mut response = HttpResponse::new();
        provider.load("/docs/readme.txt", &mut request, &mut response).unwrap();

        assert_eq!(response.committed_head().unwrap().status, StatusCode::NOT_MODIFIED);
        assert!(response.sent_body().is_empty());
    }

    #[test]
    fn test_head_has_no_body() {
        let (_dir, provider) = fixture();
        let mut request = HttpRequest::new(Method::HEAD, "/docs/readme.txt");
        let mut response = HttpResponse::new();
        provider.load("/docs/readme.txt", &mut request, &mut response).unwrap();

        assert_eq!(response.committed_head().unwrap().headers["content-length"], "7");
        assert!(response.sent_body().is_empty());
    }

    #[test]
    fn test_post_not_allowed() {
        let (_dir, provider) = fixture();
        let mut request = HttpRequest::new(Method::POST, "/docs/readme.txt");
        let mut response = HttpResponse::new();
        provider.load("/docs/readme.txt", &mut request, &mut response).unwrap();

        let head = response.committed_head().unwrap();
        assert_eq!(head.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(head.headers["allow"], "GET, HEAD");
    }
}
