//! Error types for the download module.
//!
//! Every failure of a page fetch or a photo download is a [`DownloadError`].
//! The recovery protocol only cares about its [`ErrorKind`]: whether the
//! network or the local file system let us down.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification used when presenting an error to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connect, timeout, transport or HTTP status failure.
    Network,
    /// The destination file could not be created or written.
    File,
}

impl ErrorKind {
    /// Returns a short label for prompts and logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Network => "network error",
            Self::File => "file error",
        }
    }
}

/// Errors that can occur while fetching the album page or a photo.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error (create file, write, flush).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::timeout(url);
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Classifies the error for the recovery prompt.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::File,
            Self::Network { .. }
            | Self::Timeout { .. }
            | Self::HttpStatus { .. }
            | Self::InvalidUrl { .. } => ErrorKind::Network,
        }
    }
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs the
// url or path the source error doesn't carry.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_timeout_display() {
        let error = DownloadError::timeout("https://example.com/a.jpg");
        assert!(error.to_string().contains("timeout"));
        assert!(error.to_string().contains("https://example.com/a.jpg"));
    }

    #[test]
    fn test_download_error_http_status_display() {
        let error = DownloadError::http_status("https://example.com/a.jpg", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("https://example.com/a.jpg"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_download_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = DownloadError::io(PathBuf::from("/tmp/a.jpg"), io_error);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/a.jpg"), "Expected path in: {msg}");
    }

    #[test]
    fn test_download_error_kind_splits_network_and_file() {
        let io_error = std::io::Error::other("disk full");
        assert_eq!(DownloadError::io("/tmp/a.jpg", io_error).kind(), ErrorKind::File);
        assert_eq!(
            DownloadError::http_status("https://example.com/a.jpg", 500).kind(),
            ErrorKind::Network
        );
        assert_eq!(
            DownloadError::timeout("https://example.com/a.jpg").kind(),
            ErrorKind::Network
        );
        assert_eq!(DownloadError::invalid_url("nope").kind(), ErrorKind::Network);
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(ErrorKind::Network.label(), "network error");
        assert_eq!(ErrorKind::File.label(), "file error");
    }
}
