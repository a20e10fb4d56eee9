// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! This module exposes a channel-backed transport, which is useful for
//! testing: the "server" side of every connection is scripted by the test.
//!
//! ```rust,ignore
//! # async fn example() {
//! use ethxt_rpcs::client::{mock_transport, RpcClient, rpc_params};
//! use serde_json::json;
//!
//! let (connector, mut server) = mock_transport::mock_connection();
//! let client = RpcClient::builder().build_with(connector);
//!
//! // Drive the server side by hand:
//! let mut conn = server.next_connection().await;
//! let request = conn.next_request().await.unwrap();
//! conn.send_json(json!({ "jsonrpc": "2.0", "id": request["id"], "result": 1 }));
//! # }
//! ```

use super::transport::{Connect, TransportFuture, TransportReceiver, TransportSender};
use crate::Error;
use serde_json::Value;
use tokio::sync::mpsc;

/// Create a connector and the scripted server side backing it. Every
/// `connect` call yields a fresh [`MockConnection`] on the server.
pub fn mock_connection() -> (MockConnector, MockServer) {
    let (accepts_tx, accepts_rx) = mpsc::unbounded_channel();
    (
        MockConnector { accepts: accepts_tx },
        MockServer {
            accepts: accepts_rx,
        },
    )
}

/// The client side: hand this to
/// [`RpcClientBuilder::build_with`](crate::RpcClientBuilder::build_with).
pub struct MockConnector {
    accepts: mpsc::UnboundedSender<MockConnection>,
}

impl Connect for MockConnector {
    fn connect(
        &self,
    ) -> TransportFuture<'_, Result<(Box<dyn TransportSender>, Box<dyn TransportReceiver>), Error>>
    {
        Box::pin(async move {
            let (to_server, from_client) = mpsc::unbounded_channel();
            let (to_client, from_server) = mpsc::unbounded_channel();
            self.accepts
                .send(MockConnection {
                    from_client,
                    to_client,
                })
                .map_err(|_| transport_gone())?;
            Ok((
                Box::new(MockSender { inner: to_server }) as Box<dyn TransportSender>,
                Box::new(MockReceiver { inner: from_server }) as Box<dyn TransportReceiver>,
            ))
        })
    }
}

/// The server side: yields one [`MockConnection`] per accepted connect.
pub struct MockServer {
    accepts: mpsc::UnboundedReceiver<MockConnection>,
}

impl MockServer {
    /// Wait for the client to connect (or reconnect).
    pub async fn next_connection(&mut self) -> MockConnection {
        self.accepts
            .recv()
            .await
            .expect("the connector side was dropped")
    }
}

/// One accepted connection. Dropping it severs the transport, which the
/// client observes as a connection loss.
pub struct MockConnection {
    from_client: mpsc::UnboundedReceiver<String>,
    to_client: mpsc::UnboundedSender<String>,
}

impl MockConnection {
    /// The next frame the client sent, parsed as JSON. `None` once the
    /// client side is gone.
    pub async fn next_request(&mut self) -> Option<Value> {
        let frame = self.from_client.recv().await?;
        Some(serde_json::from_str(&frame).expect("client always sends JSON frames"))
    }

    /// Push a JSON frame to the client.
    pub fn send_json(&self, value: Value) {
        self.send_text(value.to_string());
    }

    /// Push a raw text frame to the client.
    pub fn send_text(&self, frame: String) {
        let _ = self.to_client.send(frame);
    }
}

struct MockSender {
    inner: mpsc::UnboundedSender<String>,
}

impl TransportSender for MockSender {
    fn send_text(&mut self, msg: String) -> TransportFuture<'_, Result<(), Error>> {
        let result = self.inner.send(msg).map_err(|_| transport_gone());
        Box::pin(async move { result })
    }
}

struct MockReceiver {
    inner: mpsc::UnboundedReceiver<String>,
}

impl TransportReceiver for MockReceiver {
    fn next_message(&mut self) -> TransportFuture<'_, Option<Result<String, Error>>> {
        Box::pin(async move { self.inner.recv().await.map(Ok) })
    }
}

fn transport_gone() -> Error {
    Error::Transport("mock connection closed".into())
}
