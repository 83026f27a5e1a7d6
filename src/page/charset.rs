//! Character encoding resolution for the album page body.

use encoding_rs::{Encoding, UTF_8};
use tracing::warn;

/// Extracts the `charset` parameter of a `Content-Type` header value.
pub(crate) fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then_some(value)
    })
}

/// Resolves a declared charset label, defaulting to UTF-8.
pub(crate) fn resolve_encoding(label: Option<&str>) -> &'static Encoding {
    let Some(label) = label else {
        return UTF_8;
    };
    Encoding::for_label(label.as_bytes()).unwrap_or_else(|| {
        warn!(charset = label, "unknown page charset, decoding as UTF-8");
        UTF_8
    })
}

/// Decodes the complete page body at once.
///
/// A byte order mark overrides the declared charset. Malformed sequences are
/// replaced with U+FFFD.
pub(crate) fn decode_page(body: &[u8], charset: Option<&str>) -> String {
    let encoding = resolve_encoding(charset);
    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        warn!(
            encoding = used.name(),
            "page contains malformed byte sequences, replaced"
        );
    }
    text.into_owned()
}
