// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! This crate provides a low level RPC interface to Ethereum compatible
//! nodes over a persistent WebSocket connection.
//!
//! A single background task owns the connection: it allocates request ids,
//! correlates responses, routes subscription notifications, resets the
//! transport when a request goes stale, and reconnects with a backoff
//! policy. Callers interact through a cheaply cloneable [`RpcClient`]
//! handle; requests submitted while the connection is down wait in the
//! send queue until it comes back up, and a connection reset fails every
//! outstanding request with [`Error::Reset`].

mod macros;

pub mod client;

// Expose the most common things at the top level:
pub use client::{ClientEvent, RpcClient, RpcClientBuilder, RpcParams, RpcSubscription};

/// This encapsulates any errors that could be emitted in this crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The connection was lost or reset (including resets triggered by a
    /// request timeout). Every request that was outstanding at that moment
    /// receives this error exactly once; the connection then reconnects in
    /// the background.
    #[error("RPC error: the connection was reset")]
    Reset,
    /// The server replied with an error object, carried here verbatim.
    #[error("RPC error: server error: {0}")]
    Server(serde_json::Value),
    /// An error coming from the underlying transport.
    #[error("RPC error: transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync + 'static>),
    /// Cannot deserialize the response.
    #[error("RPC error: cannot deserialize response: {0}")]
    Deserialization(serde_json::Error),
    /// The background task or the reply channel went away.
    #[error("RPC error: the connection handle was dropped")]
    ClientDropped,
    /// The requested URL is insecure.
    #[error("RPC error: insecure URL: {0}")]
    InsecureUrl(String),
}
