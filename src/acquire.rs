//! Candidate acquisition: local files and direct image URLs.

use std::path::Path;
use std::time::Duration;

use log::info;
use thiserror::Error;

use crate::config::DEFAULT_DOWNLOAD_TIMEOUT_SECS;
use crate::extractor::ImageBytes;

/// Sent with downloads; some image hosts reject the default client string.
pub const USER_AGENT: &str = "Mozilla/5.0";

#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Download of {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Download of {url} failed with status {status}")]
    Status { url: String, status: u16 },
}

/// Whether `location` should be downloaded rather than read from disk.
pub fn is_url(location: &str) -> bool {
    let location = location.trim_start().to_ascii_lowercase();
    location.starts_with("http://") || location.starts_with("https://")
}

/// Fetches candidate bytes from a path or URL.
#[derive(Debug, Clone)]
pub struct Acquirer {
    timeout: Duration,
}

impl Default for Acquirer {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        }
    }
}

impl Acquirer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn fetch(&self, location: &str) -> Result<ImageBytes, AcquireError> {
        let location = location.trim();
        if is_url(location) {
            self.download(location)
        } else {
            read_local(location)
        }
    }

    fn download(&self, url: &str) -> Result<ImageBytes, AcquireError> {
        let http = |source: reqwest::Error| AcquireError::Http {
            url: url.to_string(),
            source,
        };

        info!("downloading {url}");
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .map_err(http)?;
        let response = client.get(url).send().map_err(http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(http)?;
        Ok(ImageBytes::new(url, bytes.to_vec()))
    }
}

fn read_local(location: &str) -> Result<ImageBytes, AcquireError> {
    let path = Path::new(location);
    if !path.is_file() {
        return Err(AcquireError::NotFound(location.to_string()));
    }
    let bytes = std::fs::read(path).map_err(|source| AcquireError::Read {
        path: location.to_string(),
        source,
    })?;
    Ok(ImageBytes::new(location, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_url() {
        assert!(is_url("http://example.com/cat.png"));
        assert!(is_url("  HTTPS://example.com/cat.png"));
        assert!(!is_url("images/cat.png"));
        assert!(!is_url("httpfoo.png"));
    }

    #[test]
    fn test_fetch_local_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cat.png");
        std::fs::write(&path, b"bytes").unwrap();

        let location = path.to_str().unwrap();
        let image = Acquirer::default().fetch(location).unwrap();
        assert_eq!(image.bytes, b"bytes");
        assert_eq!(image.source, location);
    }

    #[test]
    fn test_fetch_missing_file() {
        let err = Acquirer::default().fetch("/nonexistent/cat.png").unwrap_err();
        assert!(matches!(err, AcquireError::NotFound(_)));
    }
}
