//! Per-connection transport handle.
//!
//! A [`Connection`] owns the write half of one player's WebSocket. The read half
//! is handed to the inbound pump on construction and never shared. Writes from
//! both pumps go through one async mutex so frames never interleave, and every
//! write is bounded by a deadline.

use crate::error::ConnectionError;
use futures_util::sink::{Sink, SinkExt};
use futures_util::stream::{BoxStream, StreamExt};
use log::debug;
use shared::PlayerId;
use std::fmt;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

pub type ConnectionId = u64;

/// Read half of a connection, consumed by the inbound pump.
pub type FrameStream = BoxStream<'static, Result<Message, tungstenite::Error>>;

type FrameSink = Pin<Box<dyn Sink<Message, Error = tungstenite::Error> + Send>>;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

pub struct Connection {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    /// Set once, when the player is admitted. Closing takes this lock too, so a
    /// player is never stored on a connection that is already closed.
    player: parking_lot::Mutex<Option<PlayerId>>,
    writer: Mutex<FrameSink>,
    closed: watch::Sender<bool>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("player", &self.player_id())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Wraps an accepted WebSocket, returning the shared handle and the read half.
    pub fn new<S>(socket: WebSocketStream<S>, peer: Option<SocketAddr>) -> (Arc<Self>, FrameStream)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = socket.split();
        let (closed, _) = watch::channel(false);

        let connection = Arc::new(Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            peer,
            player: parking_lot::Mutex::new(None),
            writer: Mutex::new(Box::pin(sink)),
            closed,
        });

        (connection, stream.boxed())
    }

    /// Process-unique id, assigned in creation order starting at 1.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote address, when the transport came from a TCP accept.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Player this connection controls, once admitted.
    ///
    /// After [`close`](Connection::close) this value is final.
    pub fn player_id(&self) -> Option<PlayerId> {
        *self.player.lock()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Marks the connection closed and wakes every task waiting in [`closed`].
    ///
    /// Returns true only for the call that actually closed it; later calls are
    /// no-ops.
    ///
    /// [`closed`]: Connection::closed
    pub fn close(&self) -> bool {
        let _admission = self.player.lock();
        !self.closed.send_replace(true)
    }

    /// Resolves once [`close`](Connection::close) has been called.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Writes one frame, waiting at most `wait` for the transport.
    ///
    /// Fails with [`ConnectionError::Closed`] once the connection is closed and
    /// with [`ConnectionError::WriteTimeout`] when the peer stops draining.
    pub async fn send(&self, frame: Message, wait: Duration) -> Result<(), ConnectionError> {
        let mut writer = self.writer.lock().await;
        self.write_locked(&mut writer, frame, wait).await
    }

    /// Assigns the player id and writes its `INIT` frame under the write lock,
    /// so no `UPDATE` can reach the peer before it.
    ///
    /// If the id could not be stored (already admitted, or closed) the caller
    /// still owns the slot. Once stored, teardown releases it.
    pub async fn admit(
        &self,
        player: PlayerId,
        init: Message,
        wait: Duration,
    ) -> Result<(), ConnectionError> {
        let mut writer = self.writer.lock().await;
        {
            let mut admitted = self.player.lock();
            if let Some(existing) = *admitted {
                return Err(ConnectionError::AlreadyRegistered(existing));
            }
            if self.is_closed() {
                return Err(ConnectionError::Closed);
            }
            *admitted = Some(player);
        }
        self.write_locked(&mut writer, init, wait).await
    }

    /// Writes `frame` only if the connection has been admitted.
    ///
    /// Returns whether the frame was written.
    pub async fn send_if_admitted(
        &self,
        frame: Message,
        wait: Duration,
    ) -> Result<bool, ConnectionError> {
        let mut writer = self.writer.lock().await;
        if self.player_id().is_none() {
            return Ok(false);
        }
        self.write_locked(&mut writer, frame, wait).await?;
        Ok(true)
    }

    /// Sends a close frame carrying `reason` to the peer.
    pub async fn reject(&self, reason: &str, wait: Duration) -> Result<(), ConnectionError> {
        let frame = Message::Close(Some(CloseFrame {
            code: CloseCode::Policy,
            reason: reason.to_owned().into(),
        }));
        self.send(frame, wait).await
    }

    /// Best-effort closing handshake once both pumps are done.
    pub async fn shutdown(&self, wait: Duration) {
        let mut writer = self.writer.lock().await;
        match timeout(wait, writer.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Connection {}: close handshake failed: {}", self.id, e),
            Err(_) => debug!("Connection {}: close handshake timed out", self.id),
        }
    }

    async fn write_locked(
        &self,
        writer: &mut FrameSink,
        frame: Message,
        wait: Duration,
    ) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }

        match timeout(wait, writer.send(frame)).await {
            Ok(result) => result.map_err(ConnectionError::from),
            Err(_) => Err(ConnectionError::WriteTimeout(wait)),
        }
    }
}
