//! One attempt at fetching the album page, as an explicit state machine.
//!
//! The fetcher drives a session by pulling the next transport event and
//! feeding it back through [`FetchSession::apply`]. Dropping or disposing the
//! session releases the in-flight request or response stream.

use reqwest::Response;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, trace};

use super::charset::{charset_from_content_type, decode_page};
use super::fetcher::PAGE_STATUS_LABEL;
use crate::download::constants::MAX_PAGE_PREALLOC;
use crate::download::{DownloadError, HttpClient, declared_length};
use crate::surface::StatusSink;

/// Lifecycle of a page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    /// No fetch in progress.
    Idle,
    /// A fetch was requested; the request is about to be sent.
    Started,
    /// Waiting for the response headers.
    RequestSent,
    /// Reading the response body.
    ReceivingBody,
}

/// Transport events delivered to a session.
#[derive(Debug)]
pub(crate) enum FetchEvent {
    Headers(Result<Response, DownloadError>),
    Chunk(Result<Option<Vec<u8>>, DownloadError>),
}

/// What the driver does after an event was applied.
#[derive(Debug)]
pub(crate) enum Step {
    Continue,
    Complete(String),
}

#[derive(Debug)]
enum State {
    RequestSent,
    ReceivingBody {
        response: Response,
        body: Vec<u8>,
        content_length: Option<u64>,
        charset: Option<String>,
    },
    Closed,
}

#[derive(Debug)]
pub(crate) struct FetchSession {
    url: String,
    state: State,
}

impl FetchSession {
    pub(crate) fn open(url: &str) -> Self {
        Self {
            url: url.to_string(),
            state: State::RequestSent,
        }
    }

    pub(crate) fn phase(&self) -> FetchPhase {
        match self.state {
            State::RequestSent => FetchPhase::RequestSent,
            State::ReceivingBody { .. } => FetchPhase::ReceivingBody,
            State::Closed => FetchPhase::Idle,
        }
    }

    /// Waits for the next transport event. A closed session never yields one.
    pub(crate) async fn next_event(&mut self, client: &HttpClient) -> FetchEvent {
        match &mut self.state {
            State::RequestSent => FetchEvent::Headers(client.get(&self.url).await),
            State::ReceivingBody { response, .. } => FetchEvent::Chunk(
                response
                    .chunk()
                    .await
                    .map(|chunk| chunk.map(Vec::from))
                    .map_err(|e| DownloadError::network(&self.url, e)),
            ),
            State::Closed => std::future::pending().await,
        }
    }

    /// Applies one event to the session.
    ///
    /// Events that do not fit the current state are discarded.
    pub(crate) fn apply(
        &mut self,
        event: FetchEvent,
        status: &dyn StatusSink,
    ) -> Result<Step, DownloadError> {
        match event {
            FetchEvent::Headers(response) if matches!(self.state, State::RequestSent) => {
                self.on_headers(response?, status);
                Ok(Step::Continue)
            }
            FetchEvent::Chunk(chunk) if matches!(self.state, State::ReceivingBody { .. }) => {
                Ok(self.on_chunk(chunk?, status))
            }
            event => {
                trace!(?event, "discarding event that does not fit the session state");
                Ok(Step::Continue)
            }
        }
    }

    fn on_headers(&mut self, response: Response, status: &dyn StatusSink) {
        let content_length = declared_length(&response);
        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_from_content_type)
            .map(str::to_string);
        let capacity = content_length.map_or(0, |len| {
            usize::try_from(len).map_or(MAX_PAGE_PREALLOC, |len| len.min(MAX_PAGE_PREALLOC))
        });
        if let Some(len) = content_length {
            status.begin_operation(0, len, Some(PAGE_STATUS_LABEL));
        }
        debug!(?content_length, ?charset, "receiving album page");
        self.state = State::ReceivingBody {
            response,
            body: Vec::with_capacity(capacity),
            content_length,
            charset,
        };
    }

    fn on_chunk(&mut self, chunk: Option<Vec<u8>>, status: &dyn StatusSink) -> Step {
        if let Some(bytes) = chunk {
            if let State::ReceivingBody {
                body,
                content_length,
                ..
            } = &mut self.state
            {
                body.extend_from_slice(&bytes);
                if content_length.is_some() {
                    status.step_progress_bar(bytes.len() as u64);
                }
                trace!(received = body.len(), "page chunk");
            }
            return Step::Continue;
        }

        match std::mem::replace(&mut self.state, State::Closed) {
            State::ReceivingBody { body, charset, .. } => {
                let text = decode_page(&body, charset.as_deref());
                debug!(bytes = body.len(), chars = text.len(), "album page received");
                Step::Complete(text)
            }
            other => {
                self.state = other;
                Step::Continue
            }
        }
    }

    /// Releases whatever the session still holds.
    pub(crate) fn dispose(mut self) {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::RequestSent => debug!(url = %self.url, "pending page request cancelled"),
            State::ReceivingBody { body, .. } => {
                debug!(url = %self.url, received = body.len(), "page response stream closed");
            }
            State::Closed => {}
        }
    }
}
