//! Collaborator surfaces the engine reports to.
//!
//! - [`StatusSink`] - progress notifications
//! - [`PromptSink`] - errors and questions answered by a human
//!
//! Both are passed into each component at construction; nothing in the crate
//! reaches for a global.

mod prompt;
mod status;

pub use prompt::{ErrorButtons, NullPromptSink, PromptChoice, PromptSink, QuestionButtons};
pub use status::{NullStatusSink, StatusSink};
