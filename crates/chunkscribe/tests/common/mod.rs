//! Shared test utilities for chunkscribe integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with a temp workspace, a filesystem
//!   object store and an in-memory database
//! - Deterministic stand-ins for ffprobe and ffmpeg

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::TestHarness;
