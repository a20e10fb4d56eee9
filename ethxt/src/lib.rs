// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! ethxt is a library for interacting with contracts on Ethereum
//! compatible chains. Using it looks something like this:
//!
//! ```rust,no_run
//! use ethxt::{Abi, EthClient};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), ethxt::Error> {
//! let client = EthClient::from_url("wss://mainnet.example/ws")?;
//! let abi = Abi::from_json(r#"[
//!     {"type": "function", "name": "balanceOf",
//!      "inputs": [{"name": "owner", "type": "address"}],
//!      "outputs": [{"name": "balance", "type": "uint256"}]}
//! ]"#)?;
//!
//! let balance = client
//!     .call(
//!         "0x6b175474e89094c44da98b954eedeac495271d0f",
//!         &abi,
//!         "balanceOf",
//!         &json!({ "owner": "0x0000000000000000000000000000000000000001" }),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! The heavy lifting lives in the two crates re-exported here:
//! [`abi`] (contract descriptors and the ABI codec) and [`rpcs`] (the
//! connection core: request multiplexing, subscriptions, reconnection).

pub mod client;

// Expose a few of the most common types at root,
// but leave most types behind their respective modules.
pub use client::EthClient;
pub use ethxt_abi::{Abi, DecodedEvent};
pub use ethxt_rpcs::{RpcClient, RpcParams, RpcSubscription, rpc_params};

/// Re-export of the [`ethxt_abi`] crate.
pub use ethxt_abi as abi;
/// Re-export of the [`ethxt_rpcs`] crate.
pub use ethxt_rpcs as rpcs;

/// This encapsulates any errors that could be emitted here.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An ABI descriptor or codec error.
    #[error("ABI error: {0}")]
    Abi(#[from] ethxt_abi::Error),
    /// An RPC error.
    #[error("{0}")]
    Rpc(#[from] ethxt_rpcs::Error),
    /// Other error.
    #[error("Other error: {0}")]
    Other(String),
}
