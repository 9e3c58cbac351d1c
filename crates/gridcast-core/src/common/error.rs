//! Error types for the distributed stencil runner.
//!
//! This module defines the central `Error` enum, which captures all
//! reportable failure cases across the broker, the workers, and the shared
//! codec.
//!
//! ## Error Cases
//! - `Config`: a malformed roster entry, a non-positive thread total, or a
//!   bad CLI value. Always fatal at startup, before anything is launched.
//! - `Protocol`: the lock-step request/reply cadence was broken, or a reply
//!   did not mirror the shape of its request. Treated as a bug in the
//!   implementation, never as a recoverable runtime condition.
//! - `Transport`: a connect/send/receive failure on a worker link. Surfaced
//!   to the caller; this crate never retries on its own.
//! - `Codec`: a frame that could not be decoded (bad magic, truncated body,
//!   dimension overflow).
//! - `Launch`: the remote execution session for a roster entry could not be
//!   established or the worker command could not be started.
//! - `Channel`: an internal channel between tasks closed unexpectedly.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the gridcast workspace.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid roster or runtime configuration.
    #[error("Config error: {reason}")]
    Config { reason: String },

    /// The strict request/reply alternation was violated, or a reply did not
    /// mirror its request.
    #[error("Protocol violation: {context}")]
    Protocol { context: String },

    /// Socket-level failure talking to a worker.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A wire frame could not be decoded.
    #[error("Codec error: {context}")]
    Codec { context: String },

    /// A remote worker process could not be launched.
    #[error("Launch error: {context}")]
    Launch { context: String },

    /// Internal channel send/receive failure (e.g., closed channel).
    #[error("Channel error: {context}")]
    Channel { context: String },
}
