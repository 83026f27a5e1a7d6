//! Album page download and decoding.

mod charset;
mod fetcher;
mod session;

pub use fetcher::{FetchOutcome, PAGE_STATUS_LABEL, PageFetcher};
pub use session::FetchPhase;
