// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! The narrow seam between the connection core and whatever carries its
//! frames. The core only needs a message-oriented text channel that
//! preserves frame boundaries; everything else (TLS, compression, ping
//! handling) stays below this interface.

use crate::Error;
use std::{future::Future, pin::Pin};

/// A boxed future returned from the transport traits.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The sending half of an established connection.
pub trait TransportSender: Send + 'static {
    /// Send one text frame.
    fn send_text(&mut self, msg: String) -> TransportFuture<'_, Result<(), Error>>;
}

/// The receiving half of an established connection.
pub trait TransportReceiver: Send + 'static {
    /// Receive the next text frame. `None` means the connection is gone.
    fn next_message(&mut self) -> TransportFuture<'_, Option<Result<String, Error>>>;
}

/// Something that can establish fresh connections. The connection core
/// calls this on start and again after every reset.
pub trait Connect: Send + Sync + 'static {
    /// Establish a new connection, handing back its two halves.
    fn connect(
        &self,
    ) -> TransportFuture<'_, Result<(Box<dyn TransportSender>, Box<dyn TransportReceiver>), Error>>;
}

crate::macros::cfg_ws! {
    pub use ws::WsConnector;

    mod ws {
        use super::*;
        use futures::{SinkExt, StreamExt};
        use futures::stream::{SplitSink, SplitStream};
        use tokio::net::TcpStream;
        use tokio_tungstenite::{
            connect_async,
            tungstenite::protocol::Message,
            MaybeTlsStream, WebSocketStream,
        };
        use url::Url;

        type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

        /// A [`Connect`] implementation dialling a WebSocket URL with
        /// [`tokio_tungstenite`].
        pub struct WsConnector {
            url: Url,
        }

        impl WsConnector {
            /// Create a connector for the given URL.
            ///
            /// Errors if an insecure URL is provided. In this case, use
            /// [`WsConnector::new_insecure`] instead.
            pub fn new(url: impl AsRef<str>) -> Result<Self, Error> {
                let url = parse_url(url.as_ref())?;
                if !url_is_secure(&url) {
                    return Err(Error::InsecureUrl(url.into()));
                }
                Ok(WsConnector { url })
            }

            /// Create a connector for the given URL, allowing insecure URLs
            /// without SSL encryption (ws:// URLs).
            pub fn new_insecure(url: impl AsRef<str>) -> Result<Self, Error> {
                Ok(WsConnector {
                    url: parse_url(url.as_ref())?,
                })
            }
        }

        impl Connect for WsConnector {
            fn connect(
                &self,
            ) -> TransportFuture<'_, Result<(Box<dyn TransportSender>, Box<dyn TransportReceiver>), Error>>
            {
                Box::pin(async move {
                    let (ws, _response) = connect_async(self.url.as_str())
                        .await
                        .map_err(|e| Error::Transport(Box::new(e)))?;
                    let (sender, receiver) = ws.split();
                    Ok((
                        Box::new(WsSender { inner: sender }) as Box<dyn TransportSender>,
                        Box::new(WsReceiver { inner: receiver }) as Box<dyn TransportReceiver>,
                    ))
                })
            }
        }

        struct WsSender {
            inner: SplitSink<Ws, Message>,
        }

        impl TransportSender for WsSender {
            fn send_text(&mut self, msg: String) -> TransportFuture<'_, Result<(), Error>> {
                Box::pin(async move {
                    self.inner
                        .send(Message::Text(msg))
                        .await
                        .map_err(|e| Error::Transport(Box::new(e)))
                })
            }
        }

        struct WsReceiver {
            inner: SplitStream<Ws>,
        }

        impl TransportReceiver for WsReceiver {
            fn next_message(&mut self) -> TransportFuture<'_, Option<Result<String, Error>>> {
                Box::pin(async move {
                    loop {
                        match self.inner.next().await {
                            Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                            Some(Ok(Message::Binary(bytes))) => {
                                let text = String::from_utf8(bytes)
                                    .map_err(|e| Error::Transport(Box::new(e)));
                                return Some(text);
                            }
                            // Tungstenite replies to pings itself.
                            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                            Some(Ok(Message::Close(_))) | None => return None,
                            Some(Err(e)) => return Some(Err(Error::Transport(Box::new(e)))),
                        }
                    }
                })
            }
        }

        fn parse_url(url: &str) -> Result<Url, Error> {
            url.parse::<Url>().map_err(|e| Error::Transport(Box::new(e)))
        }

        /// A URL is considered secure if it uses a secure scheme ("https" or
        /// "wss") or is referring to localhost.
        fn url_is_secure(url: &Url) -> bool {
            let secure_scheme = url.scheme() == "https" || url.scheme() == "wss";
            let is_localhost = url.host().is_some_and(|e| match e {
                url::Host::Domain(e) => e == "localhost",
                url::Host::Ipv4(e) => e.is_loopback(),
                url::Host::Ipv6(e) => e.is_loopback(),
            });
            secure_scheme || is_localhost
        }

        #[cfg(test)]
        mod tests {
            use super::*;

            #[test]
            fn insecure_urls_are_rejected_by_default() {
                assert!(matches!(
                    WsConnector::new("ws://example.com"),
                    Err(Error::InsecureUrl(_))
                ));
                assert!(WsConnector::new("wss://example.com").is_ok());
                assert!(WsConnector::new("ws://127.0.0.1:8546").is_ok());
                assert!(WsConnector::new_insecure("ws://example.com").is_ok());
            }

            #[test]
            fn garbage_urls_are_rejected() {
                assert!(WsConnector::new("not a url").is_err());
            }
        }
    }
}
