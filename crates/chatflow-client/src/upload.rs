//! File upload to the chat server's HTTP endpoint.
//!
//! Validation happens before any network call. The `Display` text of every
//! [`UploadError`] is the notice shown to the user.

use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use chatflow_shared::constants::{ALLOWED_MIME_TYPES, MAX_UPLOAD_SIZE, ZIP_MIME_TYPE};
use chatflow_shared::FileShare;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File size must be less than 16MB")]
    TooLarge { size: u64 },

    #[error("File type not supported")]
    UnsupportedType { mime: String },

    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The server refused the upload; carries its error text.
    #[error("{0}")]
    Rejected(String),

    #[error("File upload failed. Please check your connection.")]
    Network(#[from] reqwest::Error),
}

/// Names assigned by the server for a stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    pub original_name: String,
}

impl UploadedFile {
    /// Payload announcing this file on the channel.
    pub fn share(&self) -> FileShare {
        FileShare {
            text: format!("Shared a file: {}", self.original_name),
            filename: self.filename.clone(),
            original_name: self.original_name.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "zip" => ZIP_MIME_TYPE,
        _ => "application/octet-stream",
    }
}

pub fn validate_upload(size: u64, mime: &str, allow_zip: bool) -> Result<(), UploadError> {
    if size > MAX_UPLOAD_SIZE {
        return Err(UploadError::TooLarge { size });
    }
    let allowed = ALLOWED_MIME_TYPES.contains(&mime) || (allow_zip && mime == ZIP_MIME_TYPE);
    if !allowed {
        return Err(UploadError::UnsupportedType {
            mime: mime.to_string(),
        });
    }
    Ok(())
}

/// Interpret the endpoint's reply.
pub fn parse_upload_response(status: u16, body: &str) -> Result<UploadedFile, UploadError> {
    if (200..300).contains(&status) {
        return serde_json::from_str(body).map_err(|e| {
            warn!(error = %e, "Malformed upload response");
            UploadError::Rejected("File upload failed".to_string())
        });
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "File upload failed".to_string());
    Err(UploadError::Rejected(message))
}

#[derive(Debug, Clone)]
pub struct UploadClient {
    http: reqwest::Client,
    endpoint: String,
    allow_zip: bool,
}

impl UploadClient {
    pub fn new(http_base: &str, allow_zip: bool) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/upload", http_base.trim_end_matches('/')),
            allow_zip,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn upload(&self, path: &Path) -> Result<UploadedFile, UploadError> {
        let read_err = |source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        };

        let size = tokio::fs::metadata(path).await.map_err(read_err)?.len();
        let mime = mime_for_path(path);
        validate_upload(size, mime, self.allow_zip)?;

        let bytes = tokio::fs::read(path).await.map_err(read_err)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        debug!(file = %name, size, mime, "Uploading file");
        let part = Part::bytes(bytes).file_name(name).mime_str(mime)?;
        let form = Form::new().part("file", part);

        let resp = self.http.post(&self.endpoint).multipart(form).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        let uploaded = parse_upload_response(status, &body)?;
        info!(filename = %uploaded.filename, "File uploaded");
        Ok(uploaded)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn test_validation_limits() {
        assert!(validate_upload(1024, "image/png", false).is_ok());
        assert!(validate_upload(MAX_UPLOAD_SIZE, "application/pdf", false).is_ok());

        let err = validate_upload(MAX_UPLOAD_SIZE + 1, "image/png", false).unwrap_err();
        assert_eq!(err.to_string(), "File size must be less than 16MB");

        let err = validate_upload(10, "application/x-msdownload", false).unwrap_err();
        assert_eq!(err.to_string(), "File type not supported");
    }

    #[test]
    fn test_zip_only_when_enabled() {
        assert!(validate_upload(10, ZIP_MIME_TYPE, false).is_err());
        assert!(validate_upload(10, ZIP_MIME_TYPE, true).is_ok());
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_for_path(Path::new("a/photo.JPG")), "image/jpeg");
        assert_eq!(
            mime_for_path(Path::new("notes.docx")),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(mime_for_path(Path::new("Makefile")), "application/octet-stream");
    }

    #[test]
    fn test_response_parsing() {
        let ok = parse_upload_response(200, r#"{"filename":"f1.pdf","original_name":"r.pdf"}"#).unwrap();
        assert_eq!(ok.share().text, "Shared a file: r.pdf");
        assert_eq!(ok.share().filename, "f1.pdf");

        let err = parse_upload_response(400, r#"{"error":"No file selected"}"#).unwrap_err();
        assert_eq!(err.to_string(), "No file selected");

        let err = parse_upload_response(500, "<html>oops</html>").unwrap_err();
        assert_eq!(err.to_string(), "File upload failed");
    }

    #[tokio::test]
    async fn test_unsupported_file_never_hits_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool.exe");
        std::fs::write(&path, b"MZ").unwrap();

        // nothing listens on the discard port
        let client = UploadClient::new("http://127.0.0.1:9", false);
        let err = client.upload(&path).await.unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType { .. }));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let client = UploadClient::new("http://127.0.0.1:9", false);
        let err = client.upload(Path::new("/definitely/not/here.txt")).await.unwrap_err();
        assert!(matches!(err, UploadError::Read { .. }));
    }

    #[tokio::test]
    async fn test_upload_posts_multipart() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            // multipart bodies end with the closing boundary
            while !request.ends_with(b"--\r\n") {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let body = r#"{"filename":"abc123.txt","original_name":"notes.txt"}"#;
            let reply = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            sock.write_all(reply.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"hello upload").unwrap();

        let client = UploadClient::new(&format!("http://{addr}/"), false);
        assert_eq!(client.endpoint(), format!("http://{addr}/upload"));
        let uploaded = client.upload(&path).await.unwrap();
        assert_eq!(uploaded.filename, "abc123.txt");
        assert_eq!(uploaded.original_name, "notes.txt");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /upload HTTP/1.1"));
        assert!(request.contains(r#"name="file"; filename="notes.txt""#));
        assert!(request.contains("hello upload"));
    }

    #[tokio::test]
    async fn test_connection_failure_message() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"x").unwrap();

        let err = UploadClient::new(&format!("http://{addr}"), false)
            .upload(&path)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "File upload failed. Please check your connection."
        );
    }
}
