//! Test infrastructure for ifupdown addon modules
//!
//! Provides:
//! - A recording in-memory link layer
//! - Interface stanza fixtures
//! - Call and drift-report verification helpers

pub mod fixtures;
mod mock;
mod verification;

pub use fixtures::*;
pub use mock::{kernel_kind_for_mode, FailureInjection, LinkCall, MockLink, MockLinkLayer};
pub use verification::*;
