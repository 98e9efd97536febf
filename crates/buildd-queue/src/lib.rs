//! wanna-build queue client for the buildd build daemon
//!
//! The queue is shared by every build daemon of the fleet. Jobs are claimed
//! with an optimistic `take`; losing that race is ordinary control flow and
//! never surfaces as an error.

pub mod client;
pub mod error;
pub mod parse;
pub mod transport;

pub use client::QueueClient;
pub use error::{QueueError, Result};
pub use transport::{QueueTransport, WannaBuildSsh};
