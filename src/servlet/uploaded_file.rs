//! Uploaded files
//!
//! File parts of a multipart request are stored in temporary files that live
//! until the request finishes. Release is explicit and idempotent.

use crate::http::MultipartHeadersPart;
use crate::logger;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A multipart part holding file content
#[derive(Debug)]
pub struct UploadedFile {
    field_name: String,
    file_name: String,
    content_type: Option<String>,
    size: u64,
    file: Option<NamedTempFile>,
}

impl UploadedFile {
    /// Write a part's content to a new temporary file under `temp_dir`
    pub fn create(headers: &MultipartHeadersPart, data: &[u8], temp_dir: &Path) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(temp_dir)?;
        file.write_all(data)?;
        file.flush()?;

        Ok(Self {
            field_name: headers.name().to_string(),
            file_name: headers.file_name().unwrap_or_default().to_string(),
            content_type: headers.content_type().map(ToString::to_string),
            size: data.len() as u64,
            file: Some(file),
        })
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Client-side file name as sent in the `filename` parameter
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Temporary location, `None` once released or moved
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(NamedTempFile::path)
    }

    pub fn open(&self) -> io::Result<File> {
        let path = self.path().ok_or_else(released_error)?;
        File::open(path)
    }

    pub fn read_to_vec(&self) -> io::Result<Vec<u8>> {
        let path = self.path().ok_or_else(released_error)?;
        std::fs::read(path)
    }

    /// Keep the content at `destination`; the temporary file is consumed
    ///
    /// On failure the temporary file stays in place, so the caller may retry
    /// elsewhere and release still deletes it.
    pub fn move_to(&mut self, destination: &Path) -> io::Result<PathBuf> {
        let file = self.file.take().ok_or_else(released_error)?;
        match file.persist(destination) {
            Ok(_) => Ok(destination.to_path_buf()),
            Err(err) => {
                // Cross-device rename; fall back to copying
                let file = err.file;
                match std::fs::copy(file.path(), destination) {
                    Ok(_) => Ok(destination.to_path_buf()),
                    Err(e) => {
                        self.file = Some(file);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Delete the temporary file
    ///
    /// Returns true when this call released it, false when it was already
    /// released or moved.
    pub fn destroy(&mut self) -> bool {
        let Some(file) = self.file.take() else {
            return false;
        };
        let path = file.path().to_path_buf();
        if let Err(e) = file.close() {
            logger::log_warning(&format!(
                "Unable to delete uploaded file '{}': {e}",
                path.display()
            ));
        }
        true
    }

    pub const fn is_released(&self) -> bool {
        self.file.is_none()
    }
}

fn released_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, "uploaded file was already released")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> MultipartHeadersPart {
        MultipartHeadersPart::parse(
            "Content-Disposition: form-data; name=\"doc\"; filename=\"report.pdf\"\nContent-Type: application/pdf",
        )
        .unwrap()
    }

    #[test]
    fn test_create_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let file = UploadedFile::create(&headers(), b"%PDF-1.4", dir.path()).unwrap();

        assert_eq!(file.field_name(), "doc");
        assert_eq!(file.file_name(), "report.pdf");
        assert_eq!(file.content_type(), Some("application/pdf"));
        assert_eq!(file.size(), 8);
        assert_eq!(file.read_to_vec().unwrap(), b"%PDF-1.4");
        assert!(file.path().unwrap().starts_with(dir.path()));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = UploadedFile::create(&headers(), b"data", dir.path()).unwrap();
        let path = file.path().unwrap().to_path_buf();
        assert!(path.exists());

        assert!(file.destroy());
        assert!(!path.exists());
        assert!(file.is_released());

        assert!(!file.destroy());
        assert!(file.read_to_vec().is_err());
    }

    #[test]
    fn test_move_to_consumes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = UploadedFile::create(&headers(), b"kept", dir.path()).unwrap();
        let temp_path = file.path().unwrap().to_path_buf();
        let destination = dir.path().join("kept.pdf");

        file.move_to(&destination).unwrap();
        assert_eq!(std::fs::read(&destination).unwrap(), b"kept");
        assert!(!temp_path.exists());
        assert!(!file.destroy());
        assert!(destination.exists());
    }

    #[test]
    fn test_failed_move_keeps_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = UploadedFile::create(&headers(), b"keep me", dir.path()).unwrap();
        let temp_path = file.path().unwrap().to_path_buf();

        let missing = dir.path().join("no-such-dir").join("report.pdf");
        assert!(file.move_to(&missing).is_err());
        assert!(!file.is_released());
        assert_eq!(file.path(), Some(temp_path.as_path()));
        assert_eq!(file.read_to_vec().unwrap(), b"keep me");

        let target = dir.path().join("report.pdf");
        assert_eq!(file.move_to(&target).unwrap(), target);
        assert!(file.is_released());
        assert_eq!(std::fs::read(&target).unwrap(), b"keep me");
        assert!(!temp_path.exists());
    }
}
