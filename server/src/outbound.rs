//! Outbound pump: periodic snapshots and liveness pings for one connection.
//!
//! Two independent timers drive a single loop. A failed `UPDATE` is only logged;
//! a failed ping means the transport is unusable and ends the pump.

use crate::connection::Connection;
use crate::error::ConnectionError;
use crate::lifecycle::{ServerContext, Teardown};
use log::{debug, warn};
use shared::{encode_server_message, ServerMessage};
use std::sync::Arc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;

pub async fn run(connection: Arc<Connection>, ctx: Arc<ServerContext>) {
    let _teardown = Teardown::new(&connection, &ctx);
    let config = ctx.config;

    // First ticks fire one full period after start.
    let start = Instant::now();
    let mut updates = interval_at(start + config.update_period, config.update_period);
    let mut pings = interval_at(start + config.ping_period, config.ping_period);
    updates.set_missed_tick_behavior(MissedTickBehavior::Skip);
    pings.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = connection.closed() => break,
            _ = updates.tick() => {
                if let Err(e) = send_update(&connection, &ctx).await {
                    warn!("Connection {}: error sending update: {}", connection.id(), e);
                }
            }
            _ = pings.tick() => {
                if let Err(e) = connection.send(Message::Ping(Vec::new()), config.write_wait).await {
                    debug!("Connection {}: ping failed: {}", connection.id(), e);
                    break;
                }
            }
        }
    }
}

async fn send_update(connection: &Connection, ctx: &ServerContext) -> Result<(), ConnectionError> {
    if connection.player_id().is_none() {
        return Ok(());
    }

    let update = ServerMessage::Update {
        game: ctx.game.snapshot(),
    };
    let frame = Message::Text(encode_server_message(&update)?);
    connection
        .send_if_admitted(frame, ctx.config.write_wait)
        .await
        .map(|_| ())
}
