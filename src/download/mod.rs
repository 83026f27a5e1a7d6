//! Photo download: HTTP client, per-file sessions and the sequential queue.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use album_downloader::asset::AssetDescriptor;
//! use album_downloader::download::{HttpClient, SequentialDownloader};
//! use album_downloader::surface::{NullPromptSink, NullStatusSink};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = SequentialDownloader::new(
//!     HttpClient::new(),
//!     Arc::new(NullStatusSink),
//!     Arc::new(NullPromptSink),
//! );
//! let assets = vec![AssetDescriptor::new("https://img.example.com/album/IMG_0001.jpg")];
//! let report = downloader.run(assets, "./photos")?.wait().await?;
//! println!("saved {} photos", report.completed.len());
//! # Ok(())
//! # }
//! ```

mod client;
pub(crate) mod constants;
mod error;
mod filename;
mod sequential;
mod session;

pub use client::HttpClient;
pub(crate) use client::declared_length;
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::{DownloadError, ErrorKind};
pub use filename::{file_name_from_url, unique_path};
pub use sequential::{DownloadReport, DownloaderSnapshot, QUEUE_STATUS_LABEL, SequentialDownloader};
pub use session::DownloaderPhase;

// Note: no module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
