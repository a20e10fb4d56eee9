// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! The RPC connection: a cheaply cloneable [`RpcClient`] handle in front
//! of a background task which owns the transport, correlates replies and
//! routes subscription notifications.

mod background;
mod rpc_client;

pub mod transport;

crate::macros::cfg_mock_transport! {
    pub mod mock_transport;
}


pub use rpc_client::{
    ClientEvent, RetryPolicy, RpcClient, RpcClientBuilder, RpcParams, RpcSubscription, rpc_params,
};

// The backoff iterators accepted by [`RpcClientBuilder::retry_policy`].
pub use finito::{ExponentialBackoff, FibonacciBackoff, FixedInterval};
