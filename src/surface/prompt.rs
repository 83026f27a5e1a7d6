//! Prompt surface: errors and questions that need a human answer.

use async_trait::async_trait;

/// Button sets offered with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorButtons {
    /// Offered when the album page fetch fails.
    RetryCancel,
    /// Offered when a single photo download fails.
    AbortRetryIgnore,
}

/// Button sets offered with a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionButtons {
    /// Offered when the destination file already exists.
    YesNoCancel,
}

/// The operator's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    /// Try the failed operation again.
    Retry,
    /// Give up on the operation; also the answer to a declined question.
    Cancel,
    /// Stop the whole queue.
    Abort,
    /// Skip the failed photo and continue.
    Ignore,
    /// Accept the question (overwrite).
    Yes,
    /// Reject the question (save under a new name).
    No,
}

/// Surfaces errors and questions to a human and returns the chosen answer.
///
/// Calls may take as long as the human needs. Callers race every call
/// against their cancellation token, so an implementation never has to
/// watch for aborts itself; it is simply dropped when one arrives.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Arc<dyn PromptSink>`. Rust 2024 native async traits are not
/// object-safe, so `async_trait` is required.
#[async_trait]
pub trait PromptSink: Send + Sync {
    /// Shows an error that only needs acknowledging.
    async fn error(&self, message: &str);

    /// Shows an error and asks how to proceed.
    async fn error_choice(&self, message: &str, buttons: ErrorButtons) -> PromptChoice;

    /// Asks a question.
    async fn question(&self, message: &str, buttons: QuestionButtons) -> PromptChoice;
}

/// Prompt sink for unattended use.
///
/// Acknowledges errors, gives up on failures (Cancel / Abort) and declines
/// questions (Cancel).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPromptSink;

#[async_trait]
impl PromptSink for NullPromptSink {
    async fn error(&self, _message: &str) {}

    async fn error_choice(&self, _message: &str, buttons: ErrorButtons) -> PromptChoice {
        match buttons {
            ErrorButtons::RetryCancel => PromptChoice::Cancel,
            ErrorButtons::AbortRetryIgnore => PromptChoice::Abort,
        }
    }

    async fn question(&self, _message: &str, _buttons: QuestionButtons) -> PromptChoice {
        PromptChoice::Cancel
    }
}
