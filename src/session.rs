//! Realtime session: handshake, keepalive, authentication and reconnect.
//!
//! ```text
//! Disconnected -> Connecting -> AwaitingHandshake -> NamespaceConnected -> Authenticated
//!                     ^                                                        |
//!                     +------------------- Retrying <------- (close / error) --+
//! ```
//!
//! Frame handling is split from socket I/O: [`Session::handle_frame`] turns one
//! inbound text frame into a [`Reply`], and the connection loop performs it.

use std::fmt;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::events::{EventDispatcher, ServerEvent, AUTH_EVENT};
use crate::protocol::{self, NamespaceFrame, OpenHandshake, RawFrame};
use crate::scan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    AwaitingHandshake,
    NamespaceConnected,
    Authenticated,
    Retrying,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::AwaitingHandshake => "awaiting_handshake",
            SessionState::NamespaceConnected => "namespace_connected",
            SessionState::Authenticated => "authenticated",
            SessionState::Retrying => "retrying",
        };
        f.write_str(name)
    }
}

/// What the connection loop must do after an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Nothing,
    Send(String),
    /// The server ended the session; reconnect.
    Close,
}

pub struct Session {
    ctx: AppContext,
    url: Url,
    state: SessionState,
    dispatcher: EventDispatcher,
}

impl Session {
    pub fn new(ctx: AppContext) -> Result<Self> {
        let url = protocol::connection_url(&ctx.config.host)?;
        Ok(Self {
            dispatcher: EventDispatcher::new(ctx.clone()),
            ctx,
            url,
            state: SessionState::Disconnected,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "Session state change");
            self.state = next;
        }
    }

    /// Connect, and reconnect after every loss, until shutdown.
    pub async fn run(mut self) {
        let backoff = self.ctx.config.reconnect_backoff();
        let shutdown = self.ctx.shutdown.clone();

        loop {
            match self.run_connection().await {
                Ok(()) => break,
                Err(e) => tracing::warn!(error = %e, "Realtime connection lost"),
            }

            // Only one reconnect is ever pending: this loop is the sole scheduler.
            self.transition(SessionState::Retrying);
            tracing::info!(backoff_ms = backoff.as_millis() as u64, "Reconnecting after backoff");
            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        self.transition(SessionState::Disconnected);
        tracing::info!("Realtime session stopped");
    }

    /// Drive one connection. `Ok` means shutdown was requested.
    async fn run_connection(&mut self) -> Result<()> {
        let shutdown = self.ctx.shutdown.clone();
        self.transition(SessionState::Connecting);
        tracing::info!(url = %self.url, "Connecting to media server");

        let ws = tokio::select! {
            result = connect_async(self.url.as_str()) => result?.0,
            _ = shutdown.cancelled() => return Ok(()),
        };
        let (mut sink, mut stream) = ws.split();

        self.transition(SessionState::AwaitingHandshake);
        let grace = tokio::time::sleep(self.ctx.config.handshake_grace());
        tokio::pin!(grace);
        let mut grace_pending = true;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    let goodbye = protocol::encode_message(&NamespaceFrame::Disconnect);
                    let _ = sink.send(Message::Text(goodbye.into())).await;
                    let _ = sink.close().await;
                    return Ok(());
                }

                message = stream.next() => {
                    let message = match message {
                        Some(Ok(message)) => message,
                        Some(Err(e)) => return Err(e.into()),
                        None => return Err(Error::Transport("connection closed".into())),
                    };

                    match message {
                        Message::Text(text) => match self.handle_frame(text.as_str()) {
                            Reply::Nothing => {}
                            Reply::Send(frame) => {
                                tracing::trace!(frame = %frame, "Sending frame");
                                sink.send(Message::Text(frame.into())).await?;
                            }
                            Reply::Close => {
                                return Err(Error::Transport("session closed by server".into()));
                            }
                        },
                        Message::Close(frame) => {
                            return Err(Error::Transport(format!("closed by server: {frame:?}")));
                        }
                        _ => {}
                    }
                }

                _ = &mut grace, if grace_pending => {
                    grace_pending = false;
                    let connect = protocol::encode_message(&NamespaceFrame::Connect(None));
                    sink.send(Message::Text(connect.into())).await?;
                }
            }
        }
    }

    /// React to one inbound text frame.
    pub fn handle_frame(&mut self, text: &str) -> Reply {
        tracing::trace!(frame = %text, "Received frame");

        let frame = match RawFrame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable frame");
                return Reply::Nothing;
            }
        };

        match frame {
            RawFrame::Ping(data) => Reply::Send(RawFrame::Pong(data).encode()),
            RawFrame::Pong(_) => Reply::Nothing,
            RawFrame::Close => Reply::Close,
            RawFrame::Open(body) => {
                match OpenHandshake::parse(&body) {
                    Ok(hs) => tracing::debug!(
                        sid = %hs.sid,
                        ping_interval = hs.ping_interval,
                        ping_timeout = hs.ping_timeout,
                        "Transport opened"
                    ),
                    Err(e) => tracing::debug!(error = %e, "Unreadable open handshake"),
                }
                Reply::Nothing
            }
            RawFrame::Message(body) => match protocol::decode_message(&body) {
                Ok(message) => self.handle_message(message),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping undecodable message");
                    Reply::Nothing
                }
            },
        }
    }

    fn handle_message(&mut self, message: NamespaceFrame) -> Reply {
        match message {
            NamespaceFrame::Connect(_) => {
                self.transition(SessionState::NamespaceConnected);
                scan::spawn_startup_scan(&self.ctx);
                let token = Value::String(self.ctx.config.token.clone());
                let auth = NamespaceFrame::event(AUTH_EVENT, token);
                Reply::Send(protocol::encode_message(&auth))
            }
            NamespaceFrame::Disconnect => Reply::Close,
            NamespaceFrame::Event { name, payload } => {
                if let Some(ServerEvent::AuthSuccess) = self.dispatcher.handle(&name, payload) {
                    self.transition(SessionState::Authenticated);
                }
                Reply::Nothing
            }
        }
    }
}
