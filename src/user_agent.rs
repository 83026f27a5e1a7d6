//! Shared User-Agent string for page and photo requests.
//!
//! Single source for the project URL and UA format so album page traffic and
//! photo traffic identify the tool the same way.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/album-downloader";

/// Default User-Agent for every request the tool makes.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("album-downloader/{version} (+{PROJECT_UA_URL})")
}
