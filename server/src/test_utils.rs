//! Helpers for exercising pumps over in-memory WebSocket pairs.

use crate::config::ConnectionConfig;
use crate::game::Game;
use crate::lifecycle::ServerContext;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{duplex, DuplexStream};
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::WebSocketStream;

/// Returns the (server, client) ends of one WebSocket connection.
pub(crate) async fn socket_pair() -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
    socket_pair_with_capacity(1 << 20).await
}

/// Like [`socket_pair`], but each direction buffers at most `capacity` bytes
/// before writes stall.
pub(crate) async fn socket_pair_with_capacity(
    capacity: usize,
) -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
    let (server_io, client_io) = duplex(capacity);
    tokio::join!(
        WebSocketStream::from_raw_socket(server_io, Role::Server, None),
        WebSocketStream::from_raw_socket(client_io, Role::Client, None),
    )
}

pub(crate) fn context(max_players: usize, config: ConnectionConfig) -> Arc<ServerContext> {
    Arc::new(ServerContext::new(Arc::new(Game::new(max_players)), config))
}

/// Short periods so liveness tests finish quickly.
pub(crate) fn fast_config() -> ConnectionConfig {
    ConnectionConfig {
        update_period: Duration::from_millis(20),
        ping_period: Duration::from_millis(100),
        read_deadline: Duration::from_millis(300),
        write_wait: Duration::from_millis(200),
    }
}
