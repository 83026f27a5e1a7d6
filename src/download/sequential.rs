//! Sequential photo downloader.
//!
//! Photos are downloaded strictly one after another: at most one request and
//! one open output file exist at any time. Name collisions and transfer
//! failures are settled with the operator through the [`PromptSink`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use super::client::HttpClient;
use super::filename::unique_path;
use super::session::{DownloadSession, DownloaderPhase, OpenMode, Step};
use crate::asset::AssetDescriptor;
use crate::control::{Busy, Finished, RunSlot, SessionEnd, unless_cancelled};
use crate::surface::{ErrorButtons, PromptChoice, PromptSink, QuestionButtons, StatusSink};

/// Label of the queue-wide progress operation.
pub const QUEUE_STATUS_LABEL: &str = "Downloading photos";

/// Phase and queue position of the downloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DownloaderSnapshot {
    /// Current phase.
    pub phase: DownloaderPhase,
    /// Index of the photo being (or about to be) downloaded; `None` when idle.
    pub cursor: Option<usize>,
}

impl DownloaderSnapshot {
    const IDLE: Self = Self {
        phase: DownloaderPhase::Idle,
        cursor: None,
    };
}

/// What happened to each photo of a queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadReport {
    /// Files written, in queue order.
    pub completed: Vec<PathBuf>,
    /// Source URLs skipped because the destination existed.
    pub skipped: Vec<String>,
    /// Source URLs the operator ignored after an error.
    pub ignored: Vec<String>,
    /// The queue ended early, by abort request or the operator's Abort.
    pub aborted: bool,
}

#[derive(Debug)]
enum AssetOutcome {
    Completed(PathBuf),
    Skipped,
    Ignored,
    Aborted,
}

#[derive(Debug)]
enum Destination {
    Write(PathBuf, OpenMode),
    Skip,
    Aborted,
}

/// Downloads a queue of photos into a directory, one at a time.
///
/// Cloning yields another handle to the same downloader; only one queue runs
/// at a time.
#[derive(Clone)]
pub struct SequentialDownloader {
    inner: Arc<Inner>,
}

struct Inner {
    client: HttpClient,
    status: Arc<dyn StatusSink>,
    prompt: Arc<dyn PromptSink>,
    slot: RunSlot,
    snapshot: watch::Sender<DownloaderSnapshot>,
}

impl SequentialDownloader {
    /// Creates an idle downloader.
    #[must_use]
    pub fn new(
        client: HttpClient,
        status: Arc<dyn StatusSink>,
        prompt: Arc<dyn PromptSink>,
    ) -> Self {
        let (snapshot, _) = watch::channel(DownloaderSnapshot::IDLE);
        Self {
            inner: Arc::new(Inner {
                client,
                status,
                prompt,
                slot: RunSlot::default(),
                snapshot,
            }),
        }
    }

    /// Starts downloading `assets` into `target_dir` and returns the finished signal.
    ///
    /// An empty queue finishes immediately and never leaves `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`Busy`] if a queue is already running.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn run(
        &self,
        assets: Vec<AssetDescriptor>,
        target_dir: impl Into<PathBuf>,
    ) -> Result<Finished<DownloadReport>, Busy> {
        if assets.is_empty() {
            if self.inner.slot.is_active() {
                return Err(Busy {
                    component: "downloader",
                });
            }
            debug!("nothing to download");
            return Ok(Finished::ready(DownloadReport::default()));
        }

        let token = self.inner.slot.claim("downloader")?;
        let target_dir = target_dir.into();
        self.inner.publish(DownloaderPhase::PreparingRequest, Some(0));

        let (tx, finished) = Finished::channel();
        let inner = Arc::clone(&self.inner);
        let span = info_span!("download_queue", count = assets.len(), dir = %target_dir.display());
        tokio::spawn(
            async move {
                let report = inner.run_queue(&assets, &target_dir, &token).await;
                inner.snapshot.send_replace(DownloaderSnapshot::IDLE);
                inner.slot.release();
                // The caller may have dropped the signal.
                let _ = tx.send(report);
            }
            .instrument(span),
        );
        Ok(finished)
    }

    /// Requests cancellation of the queue. Idempotent.
    pub fn abort(&self) {
        if self.inner.slot.cancel() {
            debug!(snapshot = ?self.snapshot(), "download abort requested");
        }
    }

    /// Current phase and cursor.
    #[must_use]
    pub fn snapshot(&self) -> DownloaderSnapshot {
        *self.inner.snapshot.borrow()
    }

    /// Watches phase and cursor changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DownloaderSnapshot> {
        self.inner.snapshot.subscribe()
    }
}

impl std::fmt::Debug for SequentialDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialDownloader")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn publish(&self, phase: DownloaderPhase, cursor: Option<usize>) {
        self.snapshot.send_replace(DownloaderSnapshot { phase, cursor });
    }

    fn set_phase(&self, phase: DownloaderPhase) {
        self.snapshot.send_modify(|snapshot| snapshot.phase = phase);
    }

    async fn run_queue(
        &self,
        assets: &[AssetDescriptor],
        target_dir: &Path,
        token: &CancellationToken,
    ) -> DownloadReport {
        let total = assets.len();
        let mut report = DownloadReport::default();
        self.status
            .begin_operation(0, total as u64, Some(QUEUE_STATUS_LABEL));

        for (index, asset) in assets.iter().enumerate() {
            if token.is_cancelled() {
                report.aborted = true;
                break;
            }
            self.publish(DownloaderPhase::PreparingRequest, Some(index));
            self.status.set_status_text(Some(&format!(
                "Downloading {asset} ({}/{total})",
                index + 1
            )));

            match self.download_one(asset, target_dir, token).await {
                AssetOutcome::Completed(path) => report.completed.push(path),
                AssetOutcome::Skipped => report.skipped.push(asset.source_url().to_string()),
                AssetOutcome::Ignored => report.ignored.push(asset.source_url().to_string()),
                AssetOutcome::Aborted => {
                    report.aborted = true;
                    break;
                }
            }
            self.status.step_progress_bar(1);
        }

        self.status.end_operation();
        info!(
            completed = report.completed.len(),
            skipped = report.skipped.len(),
            ignored = report.ignored.len(),
            aborted = report.aborted,
            "download queue finished"
        );
        report
    }

    async fn download_one(
        &self,
        asset: &AssetDescriptor,
        target_dir: &Path,
        token: &CancellationToken,
    ) -> AssetOutcome {
        let (path, mut mode) = match self.resolve_destination(asset, target_dir, token).await {
            Destination::Write(path, mode) => (path, mode),
            Destination::Skip => {
                info!(url = asset.source_url(), "photo skipped, destination exists");
                return AssetOutcome::Skipped;
            }
            Destination::Aborted => return AssetOutcome::Aborted,
        };
        let fresh_file = mode == OpenMode::CreateNew;

        loop {
            let error = match self.attempt(asset.source_url(), &path, &mut mode, token).await {
                Ok(bytes) => {
                    info!(path = %path.display(), bytes, "photo saved");
                    return AssetOutcome::Completed(path);
                }
                Err(SessionEnd::Aborted) => return AssetOutcome::Aborted,
                Err(SessionEnd::Failed(error)) => error,
            };
            warn!(url = asset.source_url(), error = %error, "photo download failed");
            if token.is_cancelled() {
                return AssetOutcome::Aborted;
            }

            let message = format!(
                "Failed to download {asset} ({}).\n{error}",
                error.kind().label()
            );
            let choice = unless_cancelled(
                token,
                self.prompt
                    .error_choice(&message, ErrorButtons::AbortRetryIgnore),
            )
            .await;
            match choice {
                Some(PromptChoice::Retry) => {
                    debug!(url = asset.source_url(), "retrying photo");
                    self.set_phase(DownloaderPhase::PreparingRequest);
                }
                Some(PromptChoice::Ignore) => {
                    // `mode` turns to Truncate once this run has created the file.
                    if fresh_file && mode == OpenMode::Truncate {
                        discard_partial(&path).await;
                    }
                    return AssetOutcome::Ignored;
                }
                Some(_) => {
                    info!("download queue aborted by operator");
                    return AssetOutcome::Aborted;
                }
                None => return AssetOutcome::Aborted,
            }
        }
    }

    /// Picks the file to write, asking the operator when it already exists.
    async fn resolve_destination(
        &self,
        asset: &AssetDescriptor,
        target_dir: &Path,
        token: &CancellationToken,
    ) -> Destination {
        let path = destination_path(asset, target_dir);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Destination::Write(path, OpenMode::CreateNew);
        }

        let message = format!(
            "The file {} already exists.\nOverwrite it (Yes), save under a new name (No) or skip this photo (Cancel)?",
            path.display()
        );
        let choice = unless_cancelled(
            token,
            self.prompt.question(&message, QuestionButtons::YesNoCancel),
        )
        .await;
        match choice {
            None => Destination::Aborted,
            Some(PromptChoice::Yes) => {
                debug!(path = %path.display(), "overwriting existing file");
                Destination::Write(path, OpenMode::Truncate)
            }
            Some(PromptChoice::No) => {
                let renamed = unique_path(&path);
                debug!(from = %path.display(), to = %renamed.display(), "saving under a new name");
                Destination::Write(renamed, OpenMode::CreateNew)
            }
            Some(_) => Destination::Skip,
        }
    }

    /// One GET of the photo into `path`. Once the file has been opened,
    /// later attempts truncate it instead of creating it.
    async fn attempt(
        &self,
        url: &str,
        path: &Path,
        mode: &mut OpenMode,
        token: &CancellationToken,
    ) -> Result<u64, SessionEnd> {
        let mut session = DownloadSession::open(url, path, *mode)
            .await
            .map_err(SessionEnd::Failed)?;
        *mode = OpenMode::Truncate;
        let result = self.drive(&mut session, token).await;
        session.dispose().await;
        result
    }

    async fn drive(
        &self,
        session: &mut DownloadSession,
        token: &CancellationToken,
    ) -> Result<u64, SessionEnd> {
        loop {
            self.set_phase(session.phase());
            let Some(event) = unless_cancelled(token, session.next_event(&self.client)).await
            else {
                debug!(phase = ?session.phase(), "photo download aborted");
                return Err(SessionEnd::Aborted);
            };
            match session.apply(event).await.map_err(SessionEnd::Failed)? {
                Step::Continue => {}
                Step::Complete(bytes) => return Ok(bytes),
            }
        }
    }
}

/// Removes a file this run created for a photo the operator ignored.
async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial photo file"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial photo file"),
    }
}

/// Absolute destination of `asset`: its own target (joined onto
/// `target_dir` when relative), or `target_dir/<file name>`.
fn destination_path(asset: &AssetDescriptor, target_dir: &Path) -> PathBuf {
    let path = match asset.target_path() {
        Some(target) if target.is_absolute() => target.to_path_buf(),
        Some(target) => target_dir.join(target),
        None => target_dir.join(asset.file_name()),
    };
    std::path::absolute(&path).unwrap_or(path)
}
