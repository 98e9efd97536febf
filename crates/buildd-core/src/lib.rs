//! Core types for the buildd build daemon
//!
//! This crate provides the data model shared by the queue client, the build
//! executor and the main loop: package jobs taken from wanna-build, signing
//! keys picked from the GPG keyring, and build outcomes.

pub mod build;
pub mod error;
pub mod key;
pub mod package;
pub mod version;

pub use build::{BuildOutcome, Verdict};
pub use error::{Error, Result};
pub use key::{select_active_key, Key, MIN_KEY_VALIDITY_SECS};
pub use package::PackageJob;
