// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! The user-facing handle to a connection, plus its builder.

use super::background::{BackgroundTask, FrontendMessage};
use super::transport::Connect;
use crate::Error;
use futures::Stream;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::Poll;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// A reconnect backoff policy: anything that can repeatedly hand out a
/// fresh sequence of delays. Implemented for every cloneable
/// `Iterator<Item = Duration>`, notably the [`finito`] backoff iterators
/// re-exported from [`crate::client`].
pub trait RetryPolicy: Send + Sync + 'static {
    /// Begin a fresh sequence of reconnect delays.
    fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send>;
}

impl<T> RetryPolicy for T
where
    T: Iterator<Item = Duration> + Clone + Send + Sync + 'static,
{
    fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        Box::new(self.clone())
    }
}

/// Connection lifecycle notifications, delivered if a channel was handed
/// to [`RpcClientBuilder::event_sender`]. Useful to re-establish
/// subscriptions after a reconnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A connection was established (initially or after a reset).
    Connected,
    /// The connection was lost; outstanding requests were failed with
    /// [`Error::Reset`] and a reconnect attempt is underway.
    Disconnected,
}

/// A builder for [`RpcClient`].
pub struct RpcClientBuilder {
    connect_timeout: Duration,
    request_timeout: Duration,
    retry_policy: Box<dyn RetryPolicy>,
    events: Option<mpsc::UnboundedSender<ClientEvent>>,
}

impl Default for RpcClientBuilder {
    fn default() -> Self {
        RpcClientBuilder {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
            retry_policy: Box::new(
                finito::ExponentialBackoff::from_millis(100).max_delay(Duration::from_secs(10)),
            ),
            events: None,
        }
    }
}

impl RpcClientBuilder {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// How long a single connect attempt may take (default: 5 seconds).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// How long a request may stay unanswered before the whole connection
    /// is reset (default: 60 seconds).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The backoff policy applied between reconnect attempts.
    pub fn retry_policy(mut self, policy: impl RetryPolicy) -> Self {
        self.retry_policy = Box::new(policy);
        self
    }

    /// A channel to notify about connection transitions.
    pub fn event_sender(mut self, sender: mpsc::UnboundedSender<ClientEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Build a client connecting to the given WebSocket URL.
    ///
    /// Errors if an insecure URL is provided. In this case, use
    /// [`RpcClientBuilder::build_insecure`] instead.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a `tokio` runtime context.
    #[cfg(feature = "ws")]
    #[cfg_attr(docsrs, doc(cfg(feature = "ws")))]
    pub fn build(self, url: impl AsRef<str>) -> Result<RpcClient, Error> {
        let connector = super::transport::WsConnector::new(url)?;
        Ok(self.build_with(connector))
    }

    /// Build a client connecting to the given WebSocket URL, allowing
    /// insecure URLs without SSL encryption (ws:// URLs).
    ///
    /// # Panics
    ///
    /// Panics when called outside of a `tokio` runtime context.
    #[cfg(feature = "ws")]
    #[cfg_attr(docsrs, doc(cfg(feature = "ws")))]
    pub fn build_insecure(self, url: impl AsRef<str>) -> Result<RpcClient, Error> {
        let connector = super::transport::WsConnector::new_insecure(url)?;
        Ok(self.build_with(connector))
    }

    /// Build a client on top of an arbitrary [`Connect`] implementation.
    /// The connection is established lazily by the background task, so
    /// this returns at once.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a `tokio` runtime context.
    pub fn build_with(self, connector: impl Connect) -> RpcClient {
        let (to_back, from_front) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));

        let task = BackgroundTask::new(
            Arc::new(connector),
            from_front,
            connected.clone(),
            self.events,
            self.connect_timeout,
            self.request_timeout,
            self.retry_policy,
        );
        tokio::spawn(task.run());

        RpcClient {
            inner: Arc::new(ClientInner { to_back, connected }),
        }
    }
}

/// A handle to the connection, used to make RPC requests. Cheaply
/// cloneable; the connection itself lives on a background task and is
/// shut down once every handle is dropped.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    to_back: mpsc::UnboundedSender<FrontendMessage>,
    connected: Arc<AtomicBool>,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl RpcClient {
    /// Configure a client with [`RpcClientBuilder`].
    pub fn builder() -> RpcClientBuilder {
        RpcClientBuilder::new()
    }

    /// Create a default client pointed at some WebSocket URL.
    ///
    /// Errors if an insecure URL is provided. In this case, use
    /// [`RpcClient::from_insecure_url`] instead.
    #[cfg(feature = "ws")]
    #[cfg_attr(docsrs, doc(cfg(feature = "ws")))]
    pub fn from_url(url: impl AsRef<str>) -> Result<Self, Error> {
        RpcClient::builder().build(url)
    }

    /// Create a default client pointed at some WebSocket URL, allowing
    /// insecure URLs without SSL encryption (ws:// URLs).
    #[cfg(feature = "ws")]
    #[cfg_attr(docsrs, doc(cfg(feature = "ws")))]
    pub fn from_insecure_url(url: impl AsRef<str>) -> Result<Self, Error> {
        RpcClient::builder().build_insecure(url)
    }

    /// Make an RPC request, given a method name and some parameters, and
    /// deserialize the response.
    ///
    /// See [`RpcParams`] and the [`rpc_params!`] macro for an example of
    /// how to construct the parameters.
    pub async fn request<Res: DeserializeOwned>(
        &self,
        method: &str,
        params: RpcParams,
    ) -> Result<Res, Error> {
        let result = self.request_raw(method, params.build()).await?;
        serde_json::from_value(result).map_err(Error::Deserialization)
    }

    /// Make an RPC request and hand back the raw `result` value.
    pub async fn request_raw(&self, method: &str, params: Value) -> Result<Value, Error> {
        let (sender, receiver) = oneshot::channel();
        self.send_to_back(FrontendMessage::Request {
            method: method.to_owned(),
            params,
            sender,
        })?;
        receiver.await.map_err(|_| Error::ClientDropped)?
    }

    /// Send several requests as one frame and return their results in
    /// batch order.
    ///
    /// Note that every entry of the batch shares a single request id on
    /// the wire (replies are correlated through the id of the first
    /// element), which deviates from strict JSON-RPC 2.0.
    pub async fn request_batch(
        &self,
        calls: Vec<(String, RpcParams)>,
    ) -> Result<Vec<Value>, Error> {
        let (sender, receiver) = oneshot::channel();
        self.send_to_back(FrontendMessage::Batch {
            calls: calls
                .into_iter()
                .map(|(method, params)| (method, params.build()))
                .collect(),
            sender,
        })?;
        receiver.await.map_err(|_| Error::ClientDropped)?
    }

    /// Subscribe via `eth_subscribe`, getting back a stream of
    /// notifications. The subscription lives until it is dropped or the
    /// connection resets.
    pub async fn subscribe(&self, params: RpcParams) -> Result<RpcSubscription, Error> {
        let (sender, receiver) = oneshot::channel();
        self.send_to_back(FrontendMessage::Subscribe {
            params: params.build(),
            sender,
        })?;
        let (id, notifications) = receiver.await.map_err(|_| Error::ClientDropped)??;
        Ok(RpcSubscription { id, notifications })
    }

    /// Whether the transport is currently up. Requests made while it is
    /// down wait in the send queue until the connection is back.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Relaxed)
    }

    fn send_to_back(&self, message: FrontendMessage) -> Result<(), Error> {
        self.inner
            .to_back
            .send(message)
            .map_err(|_| Error::ClientDropped)
    }
}

/// Create some [`RpcParams`] to pass to our [`RpcClient`].
///
/// As with the [`serde_json::json!`] macro, this will panic if you provide
/// parameters which cannot successfully be serialized to JSON.
///
/// # Example
///
/// ```rust
/// use ethxt_rpcs::client::{rpc_params, RpcParams};
///
/// let params: RpcParams = rpc_params![1, true, "foo"];
/// assert_eq!(params.build().to_string(), "[1,true,\"foo\"]");
/// ```
#[macro_export]
macro_rules! rpc_params {
    ($($p:expr), *) => {{
        // May be unused if empty; no params.
        #[allow(unused_mut)]
        let mut params = $crate::client::RpcParams::new();
        $(
            params.push($p).expect("values passed to rpc_params! must be serializable to JSON");
        )*
        params
    }}
}
pub use rpc_params;

/// This represents the positional parameters passed to an [`RpcClient`].
///
/// Prefer to use the [`rpc_params!`] macro for simpler creation of these.
#[derive(Debug, Clone, Default)]
pub struct RpcParams(Vec<Value>);

impl RpcParams {
    /// Create a new empty set of [`RpcParams`].
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Push a parameter into our [`RpcParams`]. This serializes it to JSON
    /// in the process, and so will return an error if this is not possible.
    pub fn push<P: Serialize>(&mut self, param: P) -> Result<(), Error> {
        let value = serde_json::to_value(param).map_err(Error::Deserialization)?;
        self.0.push(value);
        Ok(())
    }

    /// Build the JSON array to go out on the wire.
    pub fn build(self) -> Value {
        Value::Array(self.0)
    }
}

/// An RPC subscription: the id the node assigned, plus a [`Stream`] of
/// notification payloads. When dropped, a best-effort unsubscribe is sent
/// the next time the node pushes a notification.
pub struct RpcSubscription {
    pub(crate) id: Vec<u8>,
    pub(crate) notifications: mpsc::UnboundedReceiver<Result<Value, Error>>,
}

impl std::fmt::Debug for RpcSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcSubscription")
            .field("id", &format_args!("0x{}", hex::encode(&self.id)))
            .finish()
    }
}

impl RpcSubscription {
    /// The subscription id assigned by the node, as raw bytes.
    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// Returns the next notification. `None` means the stream has ended;
    /// a `Some(Err(Error::Reset))` is delivered first if the connection
    /// was lost under the subscription.
    pub async fn next(&mut self) -> Option<Result<Value, Error>> {
        self.notifications.recv().await
    }
}

impl Stream for RpcSubscription {
    type Item = Result<Value, Error>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.notifications.poll_recv(cx)
    }
}
