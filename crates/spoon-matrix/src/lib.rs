//! Matrix transport for spoon
//!
//! Implements [`spoon_app::Transport`] over the Matrix client-server HTTP
//! API (v3): password login, joined-room listing, plain-text sends and the
//! `/sync` long poll.
//!
//! # Components
//!
//! - [`MatrixTransport`]: reqwest-based transport
//! - [`TransportConfig`]: long-poll timeout and retry settings
//! - [`RetryPolicy`]: exponential backoff for transient sync failures

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod api;
mod client;
mod retry;

pub use client::{MatrixTransport, TransportConfig};
pub use retry::RetryPolicy;
