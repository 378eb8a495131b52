//! Connection startup and teardown.
//!
//! [`serve_connection`] registers a freshly accepted WebSocket and runs its two
//! pumps as independent tasks. Each pump holds a [`Teardown`] guard; whichever pump
//! stops first closes the connection, which wakes the other so it reaches its own
//! guard. The guard's work is idempotent, so the race is harmless.

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::game::Game;
use crate::registry::ConnectionRegistry;
use crate::{inbound, outbound};
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;

/// State shared by every pump in the process.
#[derive(Debug)]
pub struct ServerContext {
    pub game: Arc<Game>,
    pub registry: ConnectionRegistry,
    pub config: ConnectionConfig,
}

impl ServerContext {
    pub fn new(game: Arc<Game>, config: ConnectionConfig) -> Self {
        Self {
            game,
            registry: ConnectionRegistry::new(),
            config,
        }
    }

    /// Closes the connection, drops it from the registry and frees its player slot.
    ///
    /// Safe to call any number of times; only the first call that finds the
    /// connection registered releases the slot. Closing first fixes the player
    /// id, so an admission racing with this call either lands before it and is
    /// released here, or fails and is released by the admitting pump.
    pub fn disconnect(&self, connection: &Connection) {
        connection.close();

        if self.registry.unregister(connection.id()).is_some() {
            if let Some(player) = connection.player_id() {
                self.game.remove_player(player);
            }
            info!("Closing connection {}", connection.id());
        }
    }
}

/// Runs [`ServerContext::disconnect`] when a pump exits, however it exits.
pub(crate) struct Teardown {
    connection: Arc<Connection>,
    ctx: Arc<ServerContext>,
}

impl Teardown {
    pub(crate) fn new(connection: &Arc<Connection>, ctx: &Arc<ServerContext>) -> Self {
        Self {
            connection: Arc::clone(connection),
            ctx: Arc::clone(ctx),
        }
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.ctx.disconnect(&self.connection);
    }
}

/// Serves one accepted WebSocket until both pumps have stopped.
pub async fn serve_connection<S>(
    socket: WebSocketStream<S>,
    peer: Option<SocketAddr>,
    ctx: Arc<ServerContext>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (connection, frames) = Connection::new(socket, peer);
    ctx.registry.register(Arc::clone(&connection));

    let inbound = tokio::spawn(inbound::run(
        Arc::clone(&connection),
        frames,
        Arc::clone(&ctx),
    ));
    let outbound = tokio::spawn(outbound::run(Arc::clone(&connection), Arc::clone(&ctx)));

    let (inbound, outbound) = tokio::join!(inbound, outbound);
    for (pump, result) in [("inbound", inbound), ("outbound", outbound)] {
        if let Err(e) = result {
            error!(
                "Connection {}: {} pump failed: {}",
                connection.id(),
                pump,
                e
            );
        }
    }

    connection.shutdown(ctx.config.write_wait).await;
}
