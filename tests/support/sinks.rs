//! Test doubles for the status and prompt surfaces.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use album_downloader::surface::{
    ErrorButtons, PromptChoice, PromptSink, QuestionButtons, StatusSink,
};
use async_trait::async_trait;
use tokio::sync::Notify;

/// Answers prompts from a queue and records every message it was shown.
///
/// Once the queue is empty it gives up like the null prompt: Cancel for
/// Retry/Cancel and questions, Abort for Abort/Retry/Ignore.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<PromptChoice>>,
    messages: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(answers: impl IntoIterator<Item = PromptChoice>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into_iter().collect()),
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    fn record(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn next_answer(&self) -> Option<PromptChoice> {
        self.answers.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl PromptSink for ScriptedPrompt {
    async fn error(&self, message: &str) {
        self.record(message);
    }

    async fn error_choice(&self, message: &str, buttons: ErrorButtons) -> PromptChoice {
        self.record(message);
        self.next_answer().unwrap_or(match buttons {
            ErrorButtons::RetryCancel => PromptChoice::Cancel,
            ErrorButtons::AbortRetryIgnore => PromptChoice::Abort,
        })
    }

    async fn question(&self, message: &str, _buttons: QuestionButtons) -> PromptChoice {
        self.record(message);
        self.next_answer().unwrap_or(PromptChoice::Cancel)
    }
}

/// A prompt nobody ever answers.
#[derive(Debug, Default)]
pub struct PendingPrompt {
    asked: Notify,
    messages: Mutex<Vec<String>>,
}

impl PendingPrompt {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Resolves once a choice has been requested.
    pub async fn wait_until_asked(&self) {
        self.asked.notified().await;
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    async fn hang(&self, message: &str) -> PromptChoice {
        self.messages.lock().unwrap().push(message.to_string());
        self.asked.notify_one();
        std::future::pending().await
    }
}

#[async_trait]
impl PromptSink for PendingPrompt {
    async fn error(&self, message: &str) {
        self.hang(message).await;
    }

    async fn error_choice(&self, message: &str, _buttons: ErrorButtons) -> PromptChoice {
        self.hang(message).await
    }

    async fn question(&self, message: &str, _buttons: QuestionButtons) -> PromptChoice {
        self.hang(message).await
    }
}

/// One call received by [`RecordingStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Begin {
        min: u64,
        max: u64,
        label: Option<String>,
    },
    Step(u64),
    Text(Option<String>),
    End,
}

/// Records every status call in order.
#[derive(Debug, Default)]
pub struct RecordingStatus {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingStatus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Sum of all progress steps.
    pub fn stepped(&self) -> u64 {
        self.events()
            .iter()
            .map(|event| match event {
                StatusEvent::Step(delta) => *delta,
                _ => 0,
            })
            .sum()
    }

    fn push(&self, event: StatusEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl StatusSink for RecordingStatus {
    fn begin_operation(&self, min: u64, max: u64, label: Option<&str>) {
        self.push(StatusEvent::Begin {
            min,
            max,
            label: label.map(str::to_string),
        });
    }

    fn step_progress_bar(&self, delta: u64) {
        self.push(StatusEvent::Step(delta));
    }

    fn set_status_text(&self, label: Option<&str>) {
        self.push(StatusEvent::Text(label.map(str::to_string)));
    }

    fn end_operation(&self) {
        self.push(StatusEvent::End);
    }
}
