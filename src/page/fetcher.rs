//! Album page fetcher.
//!
//! [`PageFetcher::fetch`] claims the fetcher, marks it `Started` and hands the
//! request to a spawned task, so the caller always gets the [`Finished`]
//! signal back before any network call is made.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use super::session::{FetchPhase, FetchSession, Step};
use crate::control::{Busy, Finished, RunSlot, SessionEnd, unless_cancelled};
use crate::download::HttpClient;
use crate::surface::{ErrorButtons, PromptChoice, PromptSink, StatusSink};

/// Status text shown while the album page downloads.
pub const PAGE_STATUS_LABEL: &str = "Downloading album page";

/// How a page fetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The decoded page text.
    Fetched(String),
    /// The run was aborted; treat as "no photos", not as a failure.
    Aborted,
    /// The operator chose Cancel after an error.
    Cancelled,
}

impl FetchOutcome {
    /// Returns the page text, if the fetch produced one.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Fetched(text) => Some(text),
            Self::Aborted | Self::Cancelled => None,
        }
    }
}

/// Downloads the album page and decodes it to text.
///
/// Cloning yields another handle to the same fetcher; only one fetch runs at
/// a time.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use album_downloader::download::HttpClient;
/// use album_downloader::page::PageFetcher;
/// use album_downloader::surface::{NullPromptSink, NullStatusSink};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = PageFetcher::new(
///     HttpClient::new(),
///     Arc::new(NullStatusSink),
///     Arc::new(NullPromptSink),
/// );
/// let finished = fetcher.fetch("https://photos.example.com/album/1234")?;
/// if let Some(page) = finished.wait().await?.into_text() {
///     println!("{} characters", page.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PageFetcher {
    inner: Arc<Inner>,
}

struct Inner {
    client: HttpClient,
    status: Arc<dyn StatusSink>,
    prompt: Arc<dyn PromptSink>,
    slot: RunSlot,
    phase: watch::Sender<FetchPhase>,
}

impl PageFetcher {
    /// Creates an idle fetcher.
    #[must_use]
    pub fn new(
        client: HttpClient,
        status: Arc<dyn StatusSink>,
        prompt: Arc<dyn PromptSink>,
    ) -> Self {
        let (phase, _) = watch::channel(FetchPhase::Idle);
        Self {
            inner: Arc::new(Inner {
                client,
                status,
                prompt,
                slot: RunSlot::default(),
                phase,
            }),
        }
    }

    /// Starts fetching `url` and returns its finished signal.
    ///
    /// The fetch runs on a spawned task; the signal fires exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`Busy`] if a fetch is already in progress.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn fetch(&self, url: impl Into<String>) -> Result<Finished<FetchOutcome>, Busy> {
        let token = self.inner.slot.claim("page fetcher")?;
        let url = url.into();
        self.inner.set_phase(FetchPhase::Started);

        let (tx, finished) = Finished::channel();
        let inner = Arc::clone(&self.inner);
        let span = info_span!("fetch_page", url = %url);
        tokio::spawn(
            async move {
                let outcome = inner.run(&url, &token).await;
                inner.set_phase(FetchPhase::Idle);
                inner.slot.release();
                // The caller may have dropped the signal.
                let _ = tx.send(outcome);
            }
            .instrument(span),
        );
        Ok(finished)
    }

    /// Requests cancellation of the fetch in progress. Idempotent.
    pub fn abort(&self) {
        if self.inner.slot.cancel() {
            debug!(phase = ?self.phase(), "page fetch abort requested");
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> FetchPhase {
        *self.inner.phase.borrow()
    }

    /// Watches phase changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FetchPhase> {
        self.inner.phase.subscribe()
    }
}

impl std::fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn set_phase(&self, phase: FetchPhase) {
        self.phase.send_replace(phase);
    }

    async fn run(&self, url: &str, token: &CancellationToken) -> FetchOutcome {
        self.status.set_status_text(Some(PAGE_STATUS_LABEL));
        let outcome = loop {
            let error = match self.attempt(url, token).await {
                Ok(text) => {
                    info!(chars = text.len(), "album page downloaded");
                    break FetchOutcome::Fetched(text);
                }
                Err(SessionEnd::Aborted) => break FetchOutcome::Aborted,
                Err(SessionEnd::Failed(error)) => error,
            };
            warn!(error = %error, "album page download failed");
            if token.is_cancelled() {
                break FetchOutcome::Aborted;
            }

            let message = format!(
                "Failed to download the album page ({}).\n{error}",
                error.kind().label()
            );
            let choice = unless_cancelled(
                token,
                self.prompt.error_choice(&message, ErrorButtons::RetryCancel),
            )
            .await;
            match choice {
                None => break FetchOutcome::Aborted,
                Some(PromptChoice::Retry) => {
                    debug!("retrying album page");
                    self.set_phase(FetchPhase::Started);
                }
                Some(_) => break FetchOutcome::Cancelled,
            }
        };
        self.status.end_operation();
        debug!(?outcome, "page fetch finished");
        outcome
    }

    /// One GET of the page, from request to decoded text.
    async fn attempt(&self, url: &str, token: &CancellationToken) -> Result<String, SessionEnd> {
        let mut session = FetchSession::open(url);
        let result = self.drive(&mut session, token).await;
        session.dispose();
        result
    }

    async fn drive(
        &self,
        session: &mut FetchSession,
        token: &CancellationToken,
    ) -> Result<String, SessionEnd> {
        loop {
            self.set_phase(session.phase());
            let Some(event) = unless_cancelled(token, session.next_event(&self.client)).await
            else {
                debug!(phase = ?session.phase(), "page fetch aborted");
                return Err(SessionEnd::Aborted);
            };
            match session
                .apply(event, self.status.as_ref())
                .map_err(SessionEnd::Failed)?
            {
                Step::Continue => {}
                Step::Complete(text) => return Ok(text),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::surface::{NullPromptSink, NullStatusSink};

    fn fetcher() -> PageFetcher {
        PageFetcher::new(
            HttpClient::new(),
            Arc::new(NullStatusSink),
            Arc::new(NullPromptSink),
        )
    }

    #[test]
    fn test_into_text() {
        assert_eq!(
            FetchOutcome::Fetched("page".into()).into_text(),
            Some("page".to_string())
        );
        assert_eq!(FetchOutcome::Aborted.into_text(), None);
        assert_eq!(FetchOutcome::Cancelled.into_text(), None);
    }

    #[test]
    fn test_new_fetcher_is_idle() {
        assert_eq!(fetcher().phase(), FetchPhase::Idle);
    }

    #[test]
    fn test_abort_when_idle_is_noop() {
        let fetcher = fetcher();
        fetcher.abort();
        fetcher.abort();
        assert_eq!(fetcher.phase(), FetchPhase::Idle);
    }

    #[tokio::test]
    async fn test_fetch_returns_before_network_call() {
        let fetcher = fetcher();
        let finished = fetcher.fetch("not a url").unwrap();
        assert_eq!(fetcher.phase(), FetchPhase::Started);
        assert!(fetcher.fetch("not a url").is_err());
        // Invalid URL fails, the null prompt answers Cancel.
        assert_eq!(finished.wait().await.unwrap(), FetchOutcome::Cancelled);
        assert_eq!(fetcher.phase(), FetchPhase::Idle);
    }
}
