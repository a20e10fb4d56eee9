// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! The background task which owns the connection.
//!
//! All connection state lives here, on one task: the id counter, the
//! in-flight map, the subscription map and the transport itself. The only
//! way in from other tasks is the frontend channel (which doubles as the
//! pre-send queue) and every reply travels back through a per-request
//! oneshot, so no locking is needed anywhere.

use crate::Error;
use crate::client::rpc_client::{ClientEvent, RetryPolicy};
use crate::client::transport::{Connect, TransportReceiver, TransportSender};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};

const LOG_TARGET: &str = "ethxt-rpcs-background-task";

/// How often the in-flight map is scanned for stale requests.
const STALE_CHECK_PERIOD: Duration = Duration::from_secs(1);

/// Reply channel for a plain method call.
pub(crate) type RequestSender = oneshot::Sender<Result<Value, Error>>;
/// Reply channel for a batch call; results are ordered by batch position.
pub(crate) type BatchSender = oneshot::Sender<Result<Vec<Value>, Error>>;
/// Reply channel for a subscription call: the subscription id bytes plus
/// the stream of notifications.
pub(crate) type SubscribeSender =
    oneshot::Sender<Result<(Vec<u8>, mpsc::UnboundedReceiver<Result<Value, Error>>), Error>>;

/// Message protocol between the front-end client handle and the background
/// task.
pub(crate) enum FrontendMessage {
    /// A plain RPC method request.
    Request {
        method: String,
        params: Value,
        sender: RequestSender,
    },
    /// A batch of requests sent as one frame. Every entry shares the same
    /// request id on the wire, matching how replies are correlated.
    Batch {
        calls: Vec<(String, Value)>,
        sender: BatchSender,
    },
    /// An `eth_subscribe` request.
    Subscribe { params: Value, sender: SubscribeSender },
}

impl FrontendMessage {
    /// Fail the message without sending it anywhere.
    fn reject(self, err: Error) {
        match self {
            FrontendMessage::Request { sender, .. } => {
                let _ = sender.send(Err(err));
            }
            FrontendMessage::Batch { sender, .. } => {
                let _ = sender.send(Err(err));
            }
            FrontendMessage::Subscribe { sender, .. } => {
                let _ = sender.send(Err(err));
            }
        }
    }
}

/// Where the reply to an in-flight request should go.
enum Reply {
    Single(RequestSender),
    Batch(BatchSender),
    Subscribe(SubscribeSender),
    /// The reply is internal bookkeeping (`eth_unsubscribe`) and is
    /// dropped on arrival.
    Discard,
}

impl Reply {
    fn fail(self, err: Error) {
        match self {
            Reply::Single(sender) => {
                let _ = sender.send(Err(err));
            }
            Reply::Batch(sender) => {
                let _ = sender.send(Err(err));
            }
            Reply::Subscribe(sender) => {
                let _ = sender.send(Err(err));
            }
            Reply::Discard => {}
        }
    }
}

struct InFlight {
    reply: Reply,
    sent_at: Instant,
}

struct ActiveSubscription {
    notifications: mpsc::UnboundedSender<Result<Value, Error>>,
}

/// What ended a serve loop.
enum ServeOutcome {
    /// The connection must be torn down and re-established.
    Reset,
    /// Every client handle is gone; the task should exit.
    FrontendClosed,
}

/// Whether an inbound frame leaves the connection usable.
enum Routed {
    Keep,
    Fatal,
}

pub(crate) struct BackgroundTask {
    channels: TaskChannels,
    data: TaskData,
}

struct TaskChannels {
    /// Messages sent into this background task from the client handle.
    /// This is also the send queue: messages submitted while the
    /// connection is down wait here.
    from_front: mpsc::UnboundedReceiver<FrontendMessage>,
}

struct TaskData {
    connector: Arc<dyn Connect>,
    /// The next request id to allocate. Starts at 1 and is never reset,
    /// so ids are unique across reconnections too.
    next_id: u64,
    /// Map from request id to the in-flight request awaiting its reply.
    in_flight: HashMap<u64, InFlight>,
    /// Map from subscription id bytes to the live subscription.
    subscriptions: HashMap<Vec<u8>, ActiveSubscription>,
    /// Mirrors whether a transport is currently up; read by
    /// `RpcClient::is_connected`.
    connected: Arc<AtomicBool>,
    events: Option<mpsc::UnboundedSender<ClientEvent>>,
    connect_timeout: Duration,
    request_timeout: Duration,
    retry_policy: Box<dyn RetryPolicy>,
}

impl BackgroundTask {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        connector: Arc<dyn Connect>,
        from_front: mpsc::UnboundedReceiver<FrontendMessage>,
        connected: Arc<AtomicBool>,
        events: Option<mpsc::UnboundedSender<ClientEvent>>,
        connect_timeout: Duration,
        request_timeout: Duration,
        retry_policy: Box<dyn RetryPolicy>,
    ) -> Self {
        BackgroundTask {
            channels: TaskChannels { from_front },
            data: TaskData {
                connector,
                next_id: 1,
                in_flight: HashMap::new(),
                subscriptions: HashMap::new(),
                connected,
                events,
                connect_timeout,
                request_timeout,
                retry_policy,
            },
        }
    }

    /// Run the connection until every client handle has been dropped.
    pub(crate) async fn run(self) {
        let mut channels = self.channels;
        let mut data = self.data;

        loop {
            let Some((tx, rx)) = data.connect_with_retries(&channels).await else {
                break;
            };

            data.connected.store(true, Ordering::Relaxed);
            data.emit(ClientEvent::Connected);

            let outcome = serve(&mut channels, &mut data, tx, rx).await;

            data.connected.store(false, Ordering::Relaxed);
            data.reset(&mut channels);
            data.emit(ClientEvent::Disconnected);

            if matches!(outcome, ServeOutcome::FrontendClosed) {
                break;
            }
        }

        tracing::trace!(target: LOG_TARGET, "Background task closed");
    }
}

/// Service the connection: dispatch frontend messages, route inbound
/// frames, and watch for stale requests. Dropping the transport halves on
/// return is what terminates the connection.
async fn serve(
    channels: &mut TaskChannels,
    data: &mut TaskData,
    mut tx: Box<dyn TransportSender>,
    mut rx: Box<dyn TransportReceiver>,
) -> ServeOutcome {
    let mut stale_check = tokio::time::interval(STALE_CHECK_PERIOD);
    stale_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            front_message = channels.from_front.recv() => {
                let Some(message) = front_message else {
                    tracing::trace!(target: LOG_TARGET, "Client handles dropped");
                    return ServeOutcome::FrontendClosed;
                };
                if let Err(e) = data.dispatch(message, tx.as_mut()).await {
                    tracing::warn!(target: LOG_TARGET, "Failed to send request: {e}");
                    return ServeOutcome::Reset;
                }
            },
            frame = rx.next_message() => {
                match frame {
                    Some(Ok(text)) => {
                        if let Routed::Fatal = data.route_frame(&text, tx.as_mut()).await {
                            return ServeOutcome::Reset;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(target: LOG_TARGET, "Transport error: {e}");
                        return ServeOutcome::Reset;
                    }
                    None => {
                        tracing::debug!(target: LOG_TARGET, "Connection closed by remote");
                        return ServeOutcome::Reset;
                    }
                }
            },
            _ = stale_check.tick() => {
                if data.has_stale_requests() {
                    tracing::warn!(target: LOG_TARGET, "Request timed out; resetting the connection");
                    return ServeOutcome::Reset;
                }
            },
        }
    }
}

impl TaskData {
    /// Establish a new connection, retrying per the backoff policy.
    /// Returns `None` once every client handle is gone.
    async fn connect_with_retries(
        &mut self,
        channels: &TaskChannels,
    ) -> Option<(Box<dyn TransportSender>, Box<dyn TransportReceiver>)> {
        let mut delays = self.retry_policy.delays();

        loop {
            if channels.from_front.is_closed() {
                return None;
            }

            match tokio::time::timeout(self.connect_timeout, self.connector.connect()).await {
                Ok(Ok(transport)) => return Some(transport),
                Ok(Err(e)) => {
                    tracing::warn!(target: LOG_TARGET, "Failed to connect: {e}")
                }
                Err(_) => {
                    tracing::warn!(target: LOG_TARGET, "Connect attempt timed out")
                }
            }

            let delay = delays.next().unwrap_or(Duration::from_secs(10));
            tokio::time::sleep(delay).await;
        }
    }

    /// Allocate an id for a frontend message, move it into the in-flight
    /// map and send it as one text frame.
    async fn dispatch(
        &mut self,
        message: FrontendMessage,
        tx: &mut dyn TransportSender,
    ) -> Result<(), Error> {
        let id = self.next_id;
        self.next_id += 1;

        let (wire, reply) = match message {
            FrontendMessage::Request {
                method,
                params,
                sender,
            } => (
                request_object(&method, params, id),
                Reply::Single(sender),
            ),
            FrontendMessage::Batch { calls, sender } => {
                // Every element carries the same id; replies are matched
                // positionally within the response array.
                let entries = calls
                    .into_iter()
                    .map(|(method, params)| request_object(&method, params, id))
                    .collect();
                (Value::Array(entries), Reply::Batch(sender))
            }
            FrontendMessage::Subscribe { params, sender } => (
                request_object("eth_subscribe", params, id),
                Reply::Subscribe(sender),
            ),
        };

        let encoded = wire.to_string();
        tracing::trace!(target: LOG_TARGET, "Sending request id={id}: {encoded}");

        self.in_flight.insert(
            id,
            InFlight {
                reply,
                sent_at: Instant::now(),
            },
        );

        tx.send_text(encoded).await
    }

    /// Parse and route one inbound frame.
    async fn route_frame(&mut self, text: &str, tx: &mut dyn TransportSender) -> Routed {
        let msg: Value = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, "Cannot parse inbound frame: {e}");
                return Routed::Fatal;
            }
        };

        // Anything that is an array, or carries an id, is a reply to
        // something in the in-flight map.
        if msg.is_array() || msg.get("id").is_some() {
            return self.route_reply(msg, tx).await;
        }

        // Subscription notifications route by their subscription id.
        if msg.get("method").and_then(Value::as_str) == Some("eth_subscription") {
            return self.route_notification(&msg, tx).await;
        }

        tracing::warn!(target: LOG_TARGET, "Unexpected JSON-RPC message: {msg}");
        Routed::Fatal
    }

    async fn route_reply(&mut self, msg: Value, tx: &mut dyn TransportSender) -> Routed {
        // Batches are correlated through the id of their first element.
        let id = match msg.as_array() {
            Some(entries) => entries.first().and_then(|e| e.get("id")),
            None => msg.get("id"),
        };
        let Some(id) = id.and_then(Value::as_u64) else {
            tracing::warn!(target: LOG_TARGET, "Reply with malformed id: {msg}");
            return Routed::Fatal;
        };

        let Some(entry) = self.in_flight.remove(&id) else {
            tracing::warn!(target: LOG_TARGET, "Got response to unknown request id: {id}");
            return Routed::Keep;
        };

        if let Some(error) = msg.get("error") {
            tracing::debug!(target: LOG_TARGET, "Got RPC error response ({id}): {error}");
            entry.reply.fail(Error::Server(error.clone()));
            return Routed::Keep;
        }

        match entry.reply {
            Reply::Batch(sender) => {
                let Some(entries) = msg.as_array() else {
                    tracing::warn!(target: LOG_TARGET, "Expected a batch reply for id {id}: {msg}");
                    return Routed::Keep;
                };
                let results = entries
                    .iter()
                    .map(|e| e.get("result").cloned().unwrap_or(Value::Null))
                    .collect();
                let _ = sender.send(Ok(results));
            }
            Reply::Single(sender) => {
                let result = msg.get("result").cloned().unwrap_or(Value::Null);
                let _ = sender.send(Ok(result));
            }
            Reply::Subscribe(sender) => {
                // The result is the hex encoded subscription id; its bytes
                // key the subscription map.
                let Some(sub_id) = msg
                    .get("result")
                    .and_then(Value::as_str)
                    .and_then(decode_subscription_id)
                else {
                    tracing::warn!(target: LOG_TARGET, "Malformed subscription id in reply: {msg}");
                    return Routed::Keep;
                };

                let (notif_tx, notif_rx) = mpsc::unbounded_channel();
                if sender.send(Ok((sub_id.clone(), notif_rx))).is_err() {
                    // The caller gave up before the reply arrived; don't
                    // leave the server streaming at nobody.
                    return self.unsubscribe(&sub_id, tx).await;
                }
                self.subscriptions
                    .insert(sub_id, ActiveSubscription { notifications: notif_tx });
            }
            Reply::Discard => {}
        }

        Routed::Keep
    }

    async fn route_notification(&mut self, msg: &Value, tx: &mut dyn TransportSender) -> Routed {
        let params = msg.get("params");
        let Some(sub_id) = params
            .and_then(|p| p.get("subscription"))
            .and_then(Value::as_str)
            .and_then(decode_subscription_id)
        else {
            tracing::warn!(target: LOG_TARGET, "Malformed subscription notification: {msg}");
            return Routed::Fatal;
        };

        let Some(active) = self.subscriptions.get(&sub_id) else {
            tracing::warn!(
                target: LOG_TARGET,
                "Got notification for unknown subscription id: 0x{}",
                hex::encode(&sub_id)
            );
            return Routed::Keep;
        };

        let result = params
            .and_then(|p| p.get("result"))
            .cloned()
            .unwrap_or(Value::Null);

        if active.notifications.send(Ok(result)).is_err() {
            // The subscriber is gone: prune the entry and tell the node.
            self.subscriptions.remove(&sub_id);
            return self.unsubscribe(&sub_id, tx).await;
        }

        Routed::Keep
    }

    /// Issue a best-effort `eth_unsubscribe`; the reply is discarded.
    async fn unsubscribe(&mut self, sub_id: &[u8], tx: &mut dyn TransportSender) -> Routed {
        let id = self.next_id;
        self.next_id += 1;

        let wire = request_object(
            "eth_unsubscribe",
            json!([format!("0x{}", hex::encode(sub_id))]),
            id,
        );
        self.in_flight.insert(
            id,
            InFlight {
                reply: Reply::Discard,
                sent_at: Instant::now(),
            },
        );

        match tx.send_text(wire.to_string()).await {
            Ok(()) => Routed::Keep,
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, "Failed to unsubscribe: {e}");
                Routed::Fatal
            }
        }
    }

    fn has_stale_requests(&self) -> bool {
        self.in_flight
            .values()
            .any(|entry| entry.sent_at.elapsed() >= self.request_timeout)
    }

    /// Fan the reset out: every in-flight request, every subscription and
    /// everything waiting in the send queue is failed exactly once, and
    /// all three containers are left empty.
    fn reset(&mut self, channels: &mut TaskChannels) {
        for (_id, entry) in self.in_flight.drain() {
            entry.reply.fail(Error::Reset);
        }
        for (_sub_id, active) in self.subscriptions.drain() {
            let _ = active.notifications.send(Err(Error::Reset));
        }
        while let Ok(message) = channels.from_front.try_recv() {
            message.reject(Error::Reset);
        }
    }

    fn emit(&self, event: ClientEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

fn request_object(method: &str, params: Value, id: u64) -> Value {
    json!({
        "method": method,
        "params": params,
        "id": id,
        "jsonrpc": "2.0",
    })
}

/// Subscription ids arrive as `0x`-prefixed hex strings; the decoded bytes
/// key the subscription map.
fn decode_subscription_id(hex_str: &str) -> Option<Vec<u8>> {
    hex::decode(hex_str.strip_prefix("0x").unwrap_or(hex_str)).ok()
}
