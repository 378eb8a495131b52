//! # Game Server Library
//!
//! Network layer of the paddle game server. Players connect over WebSocket, are
//! admitted into one shared authoritative game, and receive a snapshot of that
//! game every 100 ms. Dead peers are detected with transport-level ping/pong.
//!
//! ## Per-Connection Lifecycle
//!
//! Every accepted connection runs two tasks:
//! - **Inbound pump** (`inbound`): decodes `READY` and `UPDATEPOSITION` frames and
//!   applies them to the game. It owns the read half and enforces a rolling read
//!   deadline that only a pong re-arms.
//! - **Outbound pump** (`outbound`): sends `UPDATE` snapshots and pings on two
//!   independent timers.
//!
//! Whichever pump fails first closes the connection, unregisters it and frees its
//! player slot (`lifecycle`). Closing wakes the other pump so it exits as well.
//!
//! ## Shared State
//!
//! - `game::Game` guards the player table with a reader/writer lock, so snapshots
//!   never observe a half-applied update.
//! - `registry::ConnectionRegistry` tracks live connections; removal is idempotent.
//! - `connection::Connection` serializes all writes to one transport behind a
//!   per-connection lock and bounds each write by a deadline.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ConnectionConfig;
//! use server::game::Game;
//! use server::lifecycle::ServerContext;
//! use server::network::Server;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let game = Arc::new(Game::new(2));
//!     let ctx = Arc::new(ServerContext::new(game, ConnectionConfig::default()));
//!
//!     let server = Server::bind("127.0.0.1:8080", ctx).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod game;
pub mod inbound;
pub mod lifecycle;
pub mod network;
pub mod outbound;
pub mod registry;

#[cfg(test)]
mod test_utils;
