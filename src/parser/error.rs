//! Error types for album page extraction.

use thiserror::Error;

/// Errors that can occur while extracting photo URLs from an album page.
///
/// Each variant is independently recoverable: the caller decides whether a
/// failed extraction means "zero photos" or aborts the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The page carries no storage base path.
    #[error(
        "album storage location not found in page\n  Suggestion: Check that the URL points to an album page, not a gallery or profile"
    )]
    StorageNotFound,

    /// The page carries a storage path but no photo list.
    #[error(
        "photo list not found in page\n  Suggestion: The album may be private or empty, or the page layout has changed"
    )]
    AssetListNotFound,

    /// The storage token is present but is not an absolute http(s) URL.
    #[error("invalid album storage location '{storage}': {reason}")]
    InvalidStorage {
        /// The storage token as found in the page.
        storage: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ParseError {
    /// Creates an `InvalidStorage` error.
    #[must_use]
    pub fn invalid_storage(storage: &str, reason: &str) -> Self {
        Self::InvalidStorage {
            storage: storage.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_errors_have_distinct_messages() {
        let storage = ParseError::StorageNotFound.to_string();
        let list = ParseError::AssetListNotFound.to_string();
        assert!(storage.contains("storage"), "{storage}");
        assert!(list.contains("photo list"), "{list}");
        assert_ne!(storage, list);
    }

    #[test]
    fn test_invalid_storage_message_contains_token() {
        let err = ParseError::invalid_storage("ftp://x", "scheme 'ftp' is not supported");
        let msg = err.to_string();
        assert!(msg.contains("ftp://x"), "{msg}");
        assert!(msg.contains("scheme"), "{msg}");
    }
}
