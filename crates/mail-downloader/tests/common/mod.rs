//! Shared test utilities for mail-downloader integration tests.
//!
//! This module provides:
//! - `TestHarness` for running the output stage against a temp directory
//! - `MessageBuilder` for writing RFC 822 messages without fixtures on disk

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{FakeRenderer, TestHarness};
