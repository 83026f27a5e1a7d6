//! Album pipeline: fetch the page, extract the photo list, download it.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::asset::{AssetDescriptor, assign_targets};
use crate::control::{Busy, RunSlot, SignalLost, unless_cancelled};
use crate::download::{DownloadReport, HttpClient, SequentialDownloader};
use crate::page::{FetchOutcome, PageFetcher};
use crate::parser::{ParseError, extract_assets};
use crate::surface::{PromptSink, StatusSink};

/// Errors that end a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The page could not be parsed and parse errors are not tolerated.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The pipeline or one of its components is already running.
    #[error(transparent)]
    Busy(#[from] Busy),

    /// A stage ended without reporting its result.
    #[error("album pipeline interrupted: {0}")]
    Interrupted(#[from] SignalLost),
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// The album page that was requested.
    pub page_url: String,
    /// Photos listed on the page.
    pub assets_found: usize,
    /// Per-photo results.
    pub download: DownloadReport,
    /// The page fetch failed and the operator chose Cancel.
    pub page_unavailable: bool,
    /// The run ended early.
    pub aborted: bool,
}

impl PipelineReport {
    fn without_download(page_url: &str, assets_found: usize) -> Self {
        Self {
            page_url: page_url.to_string(),
            assets_found,
            download: DownloadReport::default(),
            page_unavailable: false,
            aborted: false,
        }
    }
}

/// What the fetch and extract stages produced.
#[derive(Debug)]
enum Extracted {
    Assets(Vec<AssetDescriptor>),
    /// The operator gave up on the page.
    Unavailable,
    Aborted,
}

/// Runs fetch, extraction and download in sequence.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use std::sync::Arc;
///
/// use album_downloader::download::HttpClient;
/// use album_downloader::pipeline::AlbumPipeline;
/// use album_downloader::surface::{NullPromptSink, NullStatusSink};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pipeline = AlbumPipeline::new(
///     HttpClient::new(),
///     Arc::new(NullStatusSink),
///     Arc::new(NullPromptSink),
/// );
/// let report = pipeline
///     .run("https://photos.example.com/album/1234", Path::new("./photos"))
///     .await?;
/// println!("{} of {} photos saved", report.download.completed.len(), report.assets_found);
/// # Ok(())
/// # }
/// ```
pub struct AlbumPipeline {
    fetcher: PageFetcher,
    downloader: SequentialDownloader,
    prompt: Arc<dyn PromptSink>,
    tolerate_parse_errors: bool,
    slot: RunSlot,
}

/// Frees the pipeline slot even if the run future is dropped.
struct SlotGuard<'a>(&'a RunSlot);

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}

impl AlbumPipeline {
    /// Creates a pipeline whose fetcher and downloader share `client` and the sinks.
    #[must_use]
    pub fn new(
        client: HttpClient,
        status: Arc<dyn StatusSink>,
        prompt: Arc<dyn PromptSink>,
    ) -> Self {
        Self {
            fetcher: PageFetcher::new(client.clone(), Arc::clone(&status), Arc::clone(&prompt)),
            downloader: SequentialDownloader::new(client, status, Arc::clone(&prompt)),
            prompt,
            tolerate_parse_errors: true,
            slot: RunSlot::default(),
        }
    }

    /// Whether a page that cannot be parsed counts as an empty album (the
    /// default) or fails the run.
    #[must_use]
    pub fn tolerate_parse_errors(mut self, tolerate: bool) -> Self {
        self.tolerate_parse_errors = tolerate;
        self
    }

    /// The page fetcher, for observing its phase.
    #[must_use]
    pub fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    /// The photo downloader, for observing its phase and cursor.
    #[must_use]
    pub fn downloader(&self) -> &SequentialDownloader {
        &self.downloader
    }

    /// Downloads every photo of the album at `url` into `target_dir`.
    ///
    /// An aborted run is not an error: it returns a report with `aborted` set.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Busy`] if a run is already in progress
    /// - [`PipelineError::Parse`] if the page cannot be parsed and parse
    ///   errors are not tolerated
    /// - [`PipelineError::Interrupted`] if a stage's task died
    #[instrument(skip(self, target_dir), fields(dir = %target_dir.display()))]
    pub async fn run(&self, url: &str, target_dir: &Path) -> Result<PipelineReport, PipelineError> {
        let token = self.slot.claim("album pipeline")?;
        let _guard = SlotGuard(&self.slot);

        let extracted = match self.fetch_assets(url, &token).await? {
            Extracted::Assets(assets) => assets,
            Extracted::Unavailable => {
                return Ok(PipelineReport {
                    page_unavailable: true,
                    ..PipelineReport::without_download(url, 0)
                });
            }
            Extracted::Aborted => {
                return Ok(PipelineReport {
                    aborted: true,
                    ..PipelineReport::without_download(url, 0)
                });
            }
        };
        let assets_found = extracted.len();
        if token.is_cancelled() {
            debug!("aborted before download");
            return Ok(PipelineReport {
                aborted: true,
                ..PipelineReport::without_download(url, assets_found)
            });
        }

        let assets = assign_targets(&extracted, target_dir);
        let finished = self.downloader.run(assets, target_dir)?;
        if token.is_cancelled() {
            self.downloader.abort();
        }
        let download = finished.wait().await?;

        let aborted = download.aborted || token.is_cancelled();
        info!(
            assets_found,
            completed = download.completed.len(),
            aborted,
            "album finished"
        );
        Ok(PipelineReport {
            page_url: url.to_string(),
            assets_found,
            download,
            page_unavailable: false,
            aborted,
        })
    }

    /// Fetches and parses the album page without downloading anything.
    ///
    /// Returns `None` when the fetch was aborted or cancelled.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    #[instrument(skip(self))]
    pub async fn extract_only(
        &self,
        url: &str,
    ) -> Result<Option<Vec<AssetDescriptor>>, PipelineError> {
        let token = self.slot.claim("album pipeline")?;
        let _guard = SlotGuard(&self.slot);
        match self.fetch_assets(url, &token).await? {
            Extracted::Assets(assets) => Ok(Some(assets)),
            Extracted::Unavailable | Extracted::Aborted => Ok(None),
        }
    }

    /// Requests cancellation of the run in progress. Idempotent.
    ///
    /// An abort that lands between stages keeps the next stage from starting.
    pub fn abort(&self) {
        if self.slot.cancel() {
            debug!("album pipeline abort requested");
        }
        self.fetcher.abort();
        self.downloader.abort();
    }

    async fn fetch_assets(
        &self,
        url: &str,
        token: &CancellationToken,
    ) -> Result<Extracted, PipelineError> {
        let finished = self.fetcher.fetch(url)?;
        if token.is_cancelled() {
            self.fetcher.abort();
        }
        let page = match finished.wait().await? {
            FetchOutcome::Fetched(page) => page,
            FetchOutcome::Aborted => {
                debug!("album page fetch aborted");
                return Ok(Extracted::Aborted);
            }
            FetchOutcome::Cancelled => {
                info!("album page not available");
                return Ok(Extracted::Unavailable);
            }
        };

        match extract_assets(&page) {
            Ok(assets) => {
                info!(count = assets.len(), "photos found");
                Ok(Extracted::Assets(assets))
            }
            Err(error) => {
                warn!(error = %error, "album page could not be parsed");
                let message = format!("Could not read the photo list of {url}.\n{error}");
                if unless_cancelled(token, self.prompt.error(&message))
                    .await
                    .is_none()
                {
                    return Ok(Extracted::Aborted);
                }
                if self.tolerate_parse_errors {
                    Ok(Extracted::Assets(Vec::new()))
                } else {
                    Err(error.into())
                }
            }
        }
    }
}

impl std::fmt::Debug for AlbumPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbumPipeline")
            .field("fetcher", &self.fetcher)
            .field("downloader", &self.downloader)
            .field("tolerate_parse_errors", &self.tolerate_parse_errors)
            .finish_non_exhaustive()
    }
}
