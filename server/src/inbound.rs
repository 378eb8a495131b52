//! Inbound pump: applies a connection's commands to the game.

use crate::connection::{Connection, FrameStream};
use crate::error::ConnectionError;
use crate::lifecycle::{ServerContext, Teardown};
use futures_util::StreamExt;
use log::{debug, info, warn};
use shared::{decode_client_message, encode_server_message, ClientMessage, Inbound, ServerMessage};
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tokio_tungstenite::tungstenite::Message;

/// Reads frames until the transport fails, the peer closes, no pong arrives
/// within the read deadline, or the connection is closed by the outbound pump.
///
/// Errors while handling a single frame are logged and never end the loop.
pub async fn run(connection: Arc<Connection>, mut frames: FrameStream, ctx: Arc<ServerContext>) {
    let _teardown = Teardown::new(&connection, &ctx);
    let read_deadline = ctx.config.read_deadline;
    let mut deadline = Instant::now() + read_deadline;

    loop {
        let next = tokio::select! {
            _ = connection.closed() => break,
            next = timeout_at(deadline, frames.next()) => next,
        };

        let frame = match next {
            Err(_) => {
                info!(
                    "Connection {}: no pong within {:?}",
                    connection.id(),
                    read_deadline
                );
                break;
            }
            Ok(None) => {
                info!("Connection {}: transport closed by peer", connection.id());
                break;
            }
            Ok(Some(Err(e))) => {
                info!("Connection {}: read failed: {}", connection.id(), e);
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        let handled = match frame {
            Message::Text(text) => handle_payload(&connection, &ctx, text.as_bytes()).await,
            Message::Binary(bytes) => handle_payload(&connection, &ctx, &bytes).await,
            Message::Pong(_) => {
                deadline = Instant::now() + read_deadline;
                Ok(())
            }
            Message::Close(reason) => {
                info!("Connection {}: peer sent close {:?}", connection.id(), reason);
                break;
            }
            Message::Ping(_) | Message::Frame(_) => Ok(()),
        };

        if let Err(e) = handled {
            warn!("Connection {}: {}", connection.id(), e);
        }
    }
}

async fn handle_payload(
    connection: &Connection,
    ctx: &ServerContext,
    payload: &[u8],
) -> Result<(), ConnectionError> {
    match decode_client_message(payload)? {
        Inbound::Command(command) => handle_command(connection, ctx, command).await,
        Inbound::Unknown(kind) => {
            debug!(
                "Connection {}: ignoring message type {:?}",
                connection.id(),
                kind
            );
            Ok(())
        }
    }
}

async fn handle_command(
    connection: &Connection,
    ctx: &ServerContext,
    command: ClientMessage,
) -> Result<(), ConnectionError> {
    match command {
        ClientMessage::Ready => admit(connection, ctx).await,
        ClientMessage::UpdatePosition { y } => match connection.player_id() {
            Some(player) => Ok(ctx.game.update_player_position(player, y)?),
            None => {
                debug!(
                    "Connection {}: ignoring position from unregistered peer",
                    connection.id()
                );
                Ok(())
            }
        },
    }
}

async fn admit(connection: &Connection, ctx: &ServerContext) -> Result<(), ConnectionError> {
    let wait = ctx.config.write_wait;

    let registered = match connection.player_id() {
        Some(existing) => Err(ConnectionError::AlreadyRegistered(existing)),
        None => ctx.game.register_player().map_err(ConnectionError::from),
    };
    let player = match registered {
        Ok(player) => player,
        Err(e) => {
            connection.reject(&e.to_string(), wait).await?;
            return Err(e);
        }
    };

    let init = ServerMessage::Init {
        game: ctx.game.snapshot(),
        my_player_id: player,
    };
    let frame = match encode_server_message(&init) {
        Ok(text) => Message::Text(text),
        Err(e) => {
            ctx.game.remove_player(player);
            return Err(e.into());
        }
    };

    match connection.admit(player, frame, wait).await {
        Ok(()) => {
            info!("Connection {} admitted as player {}", connection.id(), player);
            Ok(())
        }
        Err(e) => {
            // Not stored on the connection, so teardown will never see it.
            if connection.player_id() != Some(player) {
                ctx.game.remove_player(player);
            }
            Err(e)
        }
    }
}
