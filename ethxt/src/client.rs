// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! The client: a [`RpcClient`] connection plus contract-call helpers
//! which bridge the ABI codec and the RPC connection.

use crate::Error;
use ethxt_abi::{Abi, utils};
use ethxt_rpcs::{RpcClient, RpcParams, RpcSubscription};
use serde_json::{Value, json};

/// A client for Ethereum compatible nodes. Cheaply cloneable; all clones
/// share one underlying connection.
#[derive(Debug, Clone)]
pub struct EthClient {
    rpc: RpcClient,
}

impl EthClient {
    /// Create a client pointed at some WebSocket URL.
    ///
    /// Errors if an insecure URL is provided. In this case, use
    /// [`EthClient::from_insecure_url`] instead.
    #[cfg(feature = "ws")]
    #[cfg_attr(docsrs, doc(cfg(feature = "ws")))]
    pub fn from_url(url: impl AsRef<str>) -> Result<Self, Error> {
        Ok(EthClient {
            rpc: RpcClient::from_url(url)?,
        })
    }

    /// Create a client pointed at some WebSocket URL, allowing insecure
    /// URLs without SSL encryption (ws:// URLs).
    #[cfg(feature = "ws")]
    #[cfg_attr(docsrs, doc(cfg(feature = "ws")))]
    pub fn from_insecure_url(url: impl AsRef<str>) -> Result<Self, Error> {
        Ok(EthClient {
            rpc: RpcClient::from_insecure_url(url)?,
        })
    }

    /// Construct a client from an existing [`RpcClient`].
    pub fn from_rpc_client(rpc: RpcClient) -> Self {
        EthClient { rpc }
    }

    /// The underlying RPC connection, for anything not covered by the
    /// helpers here.
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Call a contract function via `eth_call` against the latest block:
    /// the arguments are ABI-encoded into the call data, and the returned
    /// bytes are decoded against the function's outputs.
    ///
    /// An error object from the node is surfaced verbatim as
    /// [`ethxt_rpcs::Error::Server`], without any decoding.
    pub async fn call(
        &self,
        to: &str,
        abi: &Abi,
        function: &str,
        args: &Value,
    ) -> Result<Value, Error> {
        let data = abi.encode_function_data(function, args)?;
        let params = json!([
            { "to": to, "data": utils::to_hex_prefixed(&data) },
            "latest",
        ]);

        let result = self.rpc.request_raw("eth_call", params).await?;
        let Some(result_hex) = result.as_str() else {
            return Err(Error::Other(format!(
                "eth_call result is not a hex string: {result}"
            )));
        };

        let bytes = utils::parse_hex(result_hex)?;
        Ok(abi.decode_function_result(function, &bytes)?)
    }

    /// Subscribe via `eth_subscribe`, getting back a stream of
    /// notifications.
    pub async fn subscribe(&self, params: RpcParams) -> Result<RpcSubscription, Error> {
        Ok(self.rpc.subscribe(params).await?)
    }
}
