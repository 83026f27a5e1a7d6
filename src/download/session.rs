//! One attempt at downloading one photo into one file.
//!
//! A session owns the output file from the moment it is opened and the
//! response once headers arrive. [`DownloadSession::dispose`] is the single
//! place both are released, whichever way the attempt ended.

use std::path::{Path, PathBuf};

use reqwest::Response;
use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, trace};

use super::client::HttpClient;
use super::constants::FILE_BUFFER_SIZE;
use super::error::DownloadError;

/// Lifecycle of the downloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloaderPhase {
    /// No queue in progress.
    Idle,
    /// Resolving the destination of the photo at the cursor.
    PreparingRequest,
    /// Waiting for the response headers.
    RequestSent,
    /// Streaming the body into the destination file.
    Downloading,
}

/// How the destination file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenMode {
    /// Fails if the file exists.
    CreateNew,
    /// Creates or truncates.
    Truncate,
}

#[derive(Debug)]
pub(crate) enum TransferEvent {
    Headers(Result<Response, DownloadError>),
    Chunk(Result<Option<Vec<u8>>, DownloadError>),
}

#[derive(Debug)]
pub(crate) enum Step {
    Continue,
    /// Body fully written and flushed; carries the byte count.
    Complete(u64),
}

#[derive(Debug)]
enum State {
    RequestSent,
    Downloading { response: Response, bytes: u64 },
    Closed,
}

#[derive(Debug)]
pub(crate) struct DownloadSession {
    url: String,
    path: PathBuf,
    file: BufWriter<File>,
    state: State,
}

impl DownloadSession {
    /// Opens the destination file. The request goes out on the first
    /// [`next_event`](Self::next_event).
    pub(crate) async fn open(url: &str, path: &Path, mode: OpenMode) -> Result<Self, DownloadError> {
        let mut options = OpenOptions::new();
        options.write(true);
        match mode {
            OpenMode::CreateNew => {
                options.create_new(true);
            }
            OpenMode::Truncate => {
                options.create(true).truncate(true);
            }
        }
        let file = options
            .open(path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        debug!(path = %path.display(), ?mode, "destination opened");

        Ok(Self {
            url: url.to_string(),
            path: path.to_path_buf(),
            file: BufWriter::with_capacity(FILE_BUFFER_SIZE, file),
            state: State::RequestSent,
        })
    }

    pub(crate) fn phase(&self) -> DownloaderPhase {
        match self.state {
            State::RequestSent => DownloaderPhase::RequestSent,
            State::Downloading { .. } => DownloaderPhase::Downloading,
            State::Closed => DownloaderPhase::Idle,
        }
    }

    /// Waits for the next transport event. A closed session never yields one.
    pub(crate) async fn next_event(&mut self, client: &HttpClient) -> TransferEvent {
        match &mut self.state {
            State::RequestSent => TransferEvent::Headers(client.get(&self.url).await),
            State::Downloading { response, .. } => TransferEvent::Chunk(
                response
                    .chunk()
                    .await
                    .map(|chunk| chunk.map(Vec::from))
                    .map_err(|e| DownloadError::network(&self.url, e)),
            ),
            State::Closed => std::future::pending().await,
        }
    }

    /// Applies one event. Events that do not fit the current state are discarded.
    pub(crate) async fn apply(&mut self, event: TransferEvent) -> Result<Step, DownloadError> {
        match event {
            TransferEvent::Headers(response) if matches!(self.state, State::RequestSent) => {
                let response = response?;
                debug!(content_length = ?response.content_length(), "photo response received");
                self.state = State::Downloading { response, bytes: 0 };
                Ok(Step::Continue)
            }
            TransferEvent::Chunk(chunk) if matches!(self.state, State::Downloading { .. }) => {
                match chunk? {
                    Some(data) => {
                        self.file
                            .write_all(&data)
                            .await
                            .map_err(|e| DownloadError::io(&self.path, e))?;
                        if let State::Downloading { bytes, .. } = &mut self.state {
                            *bytes += data.len() as u64;
                            trace!(bytes = *bytes, "photo chunk written");
                        }
                        Ok(Step::Continue)
                    }
                    None => {
                        self.file
                            .flush()
                            .await
                            .map_err(|e| DownloadError::io(&self.path, e))?;
                        let bytes = match std::mem::replace(&mut self.state, State::Closed) {
                            State::Downloading { bytes, .. } => bytes,
                            State::RequestSent | State::Closed => 0,
                        };
                        Ok(Step::Complete(bytes))
                    }
                }
            }
            event => {
                trace!(?event, "discarding event that does not fit the session state");
                Ok(Step::Continue)
            }
        }
    }

    /// Releases the response and the file. Bytes already written stay on disk.
    pub(crate) async fn dispose(mut self) {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::RequestSent => debug!(url = %self.url, "pending photo request cancelled"),
            State::Downloading { bytes, .. } => {
                debug!(url = %self.url, bytes, "photo response stream closed");
            }
            State::Closed => {}
        }
        if let Err(e) = self.file.flush().await {
            debug!(path = %self.path.display(), error = %e, "flush on dispose failed");
        }
    }
}
