//! Helpers shared by the integration tests.

#![allow(dead_code)]

pub mod sinks;
pub mod socket_guard;
pub mod stalling;
