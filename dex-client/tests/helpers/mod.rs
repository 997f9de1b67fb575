//! Test Helper Utilities
//!
//! Shared utilities for testing dex-client against a local backend stub

#![allow(dead_code)]

pub mod stub_backend;

pub use stub_backend::{spawn_stub, unreachable_url, StubOptions, ASH_EMAIL, ASH_PASSWORD};
