//! Terminal implementations of the status and prompt surfaces.

use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex, PoisonError};

use album_downloader::surface::{
    ErrorButtons, PromptChoice, PromptSink, QuestionButtons, StatusSink,
};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use crate::cli::{ErrorPolicy, ExistsPolicy};

/// Consecutive automatic retries of the same failure under `--on-error retry`.
const MAX_AUTO_RETRIES: u32 = 3;

/// Progress bar on stderr driven by [`StatusSink`] calls.
///
/// Bounded operations get a bar; status text without bounds gets a spinner.
#[derive(Debug, Default)]
pub(crate) struct ProgressStatusSink {
    bar: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl ProgressStatusSink {
    pub(crate) fn new(hidden: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            hidden,
        }
    }

    fn with_bar(&self, f: impl FnOnce(&mut Option<ProgressBar>)) {
        if self.hidden {
            return;
        }
        let mut bar = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut bar);
    }

    /// Runs `f` with the bar cleared from the terminal.
    pub(crate) fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        let bar = self
            .bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

impl StatusSink for ProgressStatusSink {
    fn begin_operation(&self, min: u64, max: u64, label: Option<&str>) {
        self.with_bar(|slot| {
            if let Some(previous) = slot.take() {
                previous.finish_and_clear();
            }
            let bar = if max > min {
                ProgressBar::new(max - min).with_style(bar_style())
            } else {
                ProgressBar::new_spinner().with_style(spinner_style())
            };
            bar.set_message(label.unwrap_or_default().to_string());
            *slot = Some(bar);
        });
    }

    fn step_progress_bar(&self, delta: u64) {
        self.with_bar(|slot| {
            if let Some(bar) = slot {
                bar.inc(delta);
            }
        });
    }

    fn set_status_text(&self, label: Option<&str>) {
        self.with_bar(|slot| {
            let bar = slot.get_or_insert_with(|| ProgressBar::new_spinner().with_style(spinner_style()));
            bar.set_message(label.unwrap_or("Ready").to_string());
            bar.tick();
        });
    }

    fn end_operation(&self) {
        self.with_bar(|slot| {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        });
    }
}

/// One selectable answer of a terminal prompt.
struct Answer {
    key: char,
    label: &'static str,
    choice: PromptChoice,
}

const RETRY_CANCEL: &[Answer] = &[
    Answer { key: 'r', label: "[r]etry", choice: PromptChoice::Retry },
    Answer { key: 'c', label: "[c]ancel", choice: PromptChoice::Cancel },
];

const ABORT_RETRY_IGNORE: &[Answer] = &[
    Answer { key: 'a', label: "[a]bort", choice: PromptChoice::Abort },
    Answer { key: 'r', label: "[r]etry", choice: PromptChoice::Retry },
    Answer { key: 'i', label: "[i]gnore", choice: PromptChoice::Ignore },
];

const YES_NO_CANCEL: &[Answer] = &[
    Answer { key: 'y', label: "[y]es", choice: PromptChoice::Yes },
    Answer { key: 'n', label: "[n]o", choice: PromptChoice::No },
    Answer { key: 'c', label: "[c]ancel", choice: PromptChoice::Cancel },
];

/// Prompt surface that answers from the configured policies and asks on
/// stdin for `ask`.
pub(crate) struct TerminalPromptSink {
    on_exists: ExistsPolicy,
    on_error: ErrorPolicy,
    progress: Arc<ProgressStatusSink>,
    last_retry: Mutex<Option<(String, u32)>>,
}

impl TerminalPromptSink {
    pub(crate) fn new(
        on_exists: ExistsPolicy,
        on_error: ErrorPolicy,
        progress: Arc<ProgressStatusSink>,
    ) -> Self {
        Self {
            on_exists,
            on_error,
            progress,
            last_retry: Mutex::new(None),
        }
    }

    /// Answers Retry for the same failure at most [`MAX_AUTO_RETRIES`] times in a row.
    fn auto_retry(&self, message: &str, give_up: PromptChoice) -> PromptChoice {
        let mut last = self.last_retry.lock().unwrap_or_else(PoisonError::into_inner);
        let attempts = match last.as_ref() {
            Some((previous, attempts)) if previous == message => attempts + 1,
            _ => 1,
        };
        if attempts > MAX_AUTO_RETRIES {
            warn!(attempts = MAX_AUTO_RETRIES, "giving up after automatic retries");
            *last = None;
            return give_up;
        }
        *last = Some((message.to_string(), attempts));
        PromptChoice::Retry
    }

    /// Prints `message` and reads one answer from stdin on a blocking thread.
    ///
    /// End of input or a read error picks `fallback`.
    async fn ask(&self, message: &str, answers: &'static [Answer], fallback: PromptChoice) -> PromptChoice {
        let options = answers
            .iter()
            .map(|answer| answer.label)
            .collect::<Vec<_>>()
            .join(" / ");
        let prompt = format!("{message}\n{options}: ");

        loop {
            self.progress.suspend(|| {
                let mut stderr = io::stderr().lock();
                let _ = write!(stderr, "{prompt}");
                let _ = stderr.flush();
            });

            let line = tokio::task::spawn_blocking(|| {
                let mut line = String::new();
                io::stdin().lock().read_line(&mut line).map(|read| (read > 0).then_some(line))
            })
            .await;

            let line = match line {
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => {
                    debug!("stdin closed, using default answer");
                    return fallback;
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "failed to read answer from stdin");
                    return fallback;
                }
                Err(e) => {
                    warn!(error = %e, "prompt reader task failed");
                    return fallback;
                }
            };

            let key = line.trim().chars().next().map(|c| c.to_ascii_lowercase());
            if let Some(answer) = answers.iter().find(|answer| Some(answer.key) == key) {
                return answer.choice;
            }
        }
    }
}

#[async_trait]
impl PromptSink for TerminalPromptSink {
    async fn error(&self, message: &str) {
        self.progress.suspend(|| eprintln!("error: {message}"));
    }

    async fn error_choice(&self, message: &str, buttons: ErrorButtons) -> PromptChoice {
        match (buttons, self.on_error) {
            (ErrorButtons::RetryCancel, ErrorPolicy::Ask) => {
                self.ask(message, RETRY_CANCEL, PromptChoice::Cancel).await
            }
            (ErrorButtons::RetryCancel, ErrorPolicy::Retry) => {
                self.auto_retry(message, PromptChoice::Cancel)
            }
            (ErrorButtons::RetryCancel, ErrorPolicy::Ignore | ErrorPolicy::Abort) => {
                PromptChoice::Cancel
            }
            (ErrorButtons::AbortRetryIgnore, ErrorPolicy::Ask) => {
                self.ask(message, ABORT_RETRY_IGNORE, PromptChoice::Abort).await
            }
            (ErrorButtons::AbortRetryIgnore, ErrorPolicy::Retry) => {
                self.auto_retry(message, PromptChoice::Ignore)
            }
            (ErrorButtons::AbortRetryIgnore, ErrorPolicy::Ignore) => PromptChoice::Ignore,
            (ErrorButtons::AbortRetryIgnore, ErrorPolicy::Abort) => PromptChoice::Abort,
        }
    }

    async fn question(&self, message: &str, buttons: QuestionButtons) -> PromptChoice {
        match (buttons, self.on_exists) {
            (QuestionButtons::YesNoCancel, ExistsPolicy::Ask) => {
                self.ask(message, YES_NO_CANCEL, PromptChoice::Cancel).await
            }
            (QuestionButtons::YesNoCancel, ExistsPolicy::Overwrite) => PromptChoice::Yes,
            (QuestionButtons::YesNoCancel, ExistsPolicy::Rename) => PromptChoice::No,
            (QuestionButtons::YesNoCancel, ExistsPolicy::Skip) => PromptChoice::Cancel,
        }
    }
}
