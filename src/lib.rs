//! Album Downloader Library
//!
//! Downloads every photo of a web photo album: fetches the album page,
//! extracts the photo list embedded in its script data and saves the photos
//! one after another into a directory.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`page`] - Album page fetcher (download and charset decoding)
//! - [`parser`] - Photo list extraction from page text
//! - [`asset`] - Photo descriptors and target assignment
//! - [`download`] - HTTP client, filename utilities and the sequential downloader
//! - [`surface`] - Status and prompt collaborators supplied by the front end
//! - [`control`] - Completion signals and the busy error shared by the components
//! - [`pipeline`] - Fetch, extract and download in one run

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod asset;
pub mod control;
pub mod download;
pub mod page;
pub mod parser;
pub mod pipeline;
pub mod surface;
mod user_agent;

// Re-export commonly used types
pub use asset::{AssetDescriptor, assign_targets};
pub use control::{Busy, Finished, SignalLost};
pub use download::{
    DownloadError, DownloadReport, DownloaderPhase, DownloaderSnapshot, ErrorKind, HttpClient,
    SequentialDownloader,
};
pub use page::{FetchOutcome, FetchPhase, PageFetcher};
pub use parser::{ParseError, extract_assets};
pub use pipeline::{AlbumPipeline, PipelineError, PipelineReport};
pub use surface::{
    ErrorButtons, NullPromptSink, NullStatusSink, PromptChoice, PromptSink, QuestionButtons,
    StatusSink,
};
