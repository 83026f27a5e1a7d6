//! Filename extraction, sanitization, and unique path resolution for photos.

use std::path::{Component, Path, PathBuf};

use tracing::debug;
use url::Url;

/// Name used when a URL carries no usable last path segment.
pub(crate) const FALLBACK_FILENAME: &str = "asset.bin";

/// Upper bound for the `(n)` suffix search.
const MAX_UNIQUE_SUFFIX: u32 = 100_000;

/// Derives the local file name of a photo from its source URL.
///
/// Uses the percent-decoded last path segment; falls back to
/// [`FALLBACK_FILENAME`] when the URL has no such segment. Strings that are
/// not absolute URLs are treated as plain paths.
#[must_use]
pub fn file_name_from_url(source_url: &str) -> String {
    let last = match Url::parse(source_url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => source_url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .map(str::to_string),
    };

    let Some(last) = last.filter(|segment| !segment.is_empty()) else {
        return FALLBACK_FILENAME.to_string();
    };

    let decoded = urlencoding::decode(&last).map_or_else(
        |e| {
            debug!(segment = %last, error = %e, "URL decoding failed, using raw segment");
            last.clone()
        },
        std::borrow::Cow::into_owned,
    );

    let sanitized = sanitize_filename(&decoded);
    if sanitized.trim_matches('_').is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        sanitized
    }
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Resolves a path that does not exist yet by inserting `(n)` before the extension.
///
/// `photo.jpg` becomes `photo(1).jpg`, then `photo(2).jpg`, taking the
/// smallest `n` whose path is free. A path that does not exist is returned
/// unchanged.
#[must_use]
pub fn unique_path(desired: &Path) -> PathBuf {
    if !desired.exists() {
        return desired.to_path_buf();
    }

    let dir = desired.parent().unwrap_or_else(|| Path::new(""));
    let stem = desired
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = desired
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for n in 1..MAX_UNIQUE_SUFFIX {
        let candidate = dir.join(format!("{stem}({n}){ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }

    // Fallback (extremely unlikely)
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    dir.join(format!("{stem}({timestamp}){ext}"))
}
