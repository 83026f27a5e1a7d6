//! Photo URL extraction from album page script data.
//!
//! Album pages embed their photo list in a script block:
//!
//! ```text
//! var storage = "http://img.example.com/d1/album/";
//! var photos = [{ photoID: "1", fileName: "IMG_0001.jpg" }, { ... }];
//! ```
//!
//! The storage base path is joined with every file name found inside the
//! photo list. All patterns are case-insensitive and the list may span lines.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use super::error::ParseError;
use crate::asset::AssetDescriptor;

/// `storage: '...'` or `var storage = "..."`.
#[allow(clippy::expect_used)]
static STORAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bstorage\s*[:=]\s*["']([^"']+)["']"#).expect("storage regex is valid") // Static pattern, safe to panic
});

/// `photos = [ ... ]`, non-greedy up to the first closing bracket.
#[allow(clippy::expect_used)]
static ASSET_LIST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bphotos\s*[:=]\s*\[(.*?)\]").expect("photo list regex is valid") // Static pattern, safe to panic
});

/// `file: '...'` or `fileName: "..."` inside one record.
#[allow(clippy::expect_used)]
static FILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?im)\bfile(?:name)?\s*:\s*["']([^"'\r\n]+)["']"#)
        .expect("file name regex is valid") // Static pattern, safe to panic
});

/// Extracts the ordered photo list from decoded album page text.
///
/// Pure and deterministic: the same text always yields the same list. An
/// album whose photo list holds no file records yields an empty list, not an
/// error. Duplicate records are kept.
///
/// # Errors
///
/// - [`ParseError::StorageNotFound`] if the page has no storage base path
/// - [`ParseError::InvalidStorage`] if that path is not an absolute http(s) URL
/// - [`ParseError::AssetListNotFound`] if the page has no photo list
///
/// # Examples
///
/// ```
/// use album_downloader::parser::extract_assets;
///
/// let page = "storage: 'http://cdn/x'; photos=[{file:'a.jpg'},{file:'b.jpg'}]";
/// let assets = extract_assets(page).unwrap();
/// let urls: Vec<_> = assets.iter().map(|a| a.source_url()).collect();
/// assert_eq!(urls, ["http://cdn/x/a.jpg", "http://cdn/x/b.jpg"]);
/// ```
#[tracing::instrument(skip(page_text), fields(page_len = page_text.len()))]
pub fn extract_assets(page_text: &str) -> Result<Vec<AssetDescriptor>, ParseError> {
    let storage = STORAGE_PATTERN
        .captures(page_text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .ok_or(ParseError::StorageNotFound)?;
    let storage = normalize_storage(storage)?;
    debug!(storage = %storage, "found album storage");

    let list = ASSET_LIST_PATTERN
        .captures(page_text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or(ParseError::AssetListNotFound)?;

    let assets: Vec<AssetDescriptor> = FILE_PATTERN
        .captures_iter(list)
        .filter_map(|caps| caps.get(1))
        .map(|file| {
            trace!(file = file.as_str(), "found photo record");
            AssetDescriptor::new(format!("{storage}{}", file.as_str()))
        })
        .collect();

    debug!(count = assets.len(), "extracted photo list");
    Ok(assets)
}

/// Validates the storage base path and makes it end with `/`.
fn normalize_storage(raw: &str) -> Result<String, ParseError> {
    let parsed = Url::parse(raw).map_err(|e| ParseError::invalid_storage(raw, &e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ParseError::invalid_storage(
                raw,
                &format!("scheme '{scheme}' is not supported"),
            ));
        }
    }
    if parsed.host().is_none() {
        return Err(ParseError::invalid_storage(raw, "URL has no host"));
    }

    if raw.ends_with('/') {
        Ok(raw.to_string())
    } else {
        Ok(format!("{raw}/"))
    }
}
