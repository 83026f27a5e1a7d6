//! Album page parsing.
//!
//! Turns the decoded text of an album page into the ordered list of photos
//! it embeds. No I/O happens here; the page is fetched by [`crate::page`].
//!
//! # Example
//!
//! ```
//! use album_downloader::parser::{ParseError, extract_assets};
//!
//! let page = "<html>no album here</html>";
//! assert_eq!(extract_assets(page), Err(ParseError::StorageNotFound));
//! ```

mod error;
mod extract;

pub use error::ParseError;
pub use extract::extract_assets;
