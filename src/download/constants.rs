//! Constants for the download module (timeouts, buffer sizes).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large photos and videos).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Capacity of the buffered writer in front of each output file.
pub(crate) const FILE_BUFFER_SIZE: usize = 64 * 1024;

/// Upper bound for the page buffer pre-allocated from a declared content length.
pub(crate) const MAX_PAGE_PREALLOC: usize = 1024 * 1024;
