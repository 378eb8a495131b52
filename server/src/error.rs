use crate::game::GameError;
use shared::{PlayerId, ProtocolError};
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors raised while serving a single connection.
///
/// None of these escape the connection they belong to; the pumps decide per
/// variant whether to log and continue or to tear the connection down.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection is closed")]
    Closed,
    #[error("write did not complete within {0:?}")]
    WriteTimeout(Duration),
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("connection is already playing as player {0}")]
    AlreadyRegistered(PlayerId),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroPeriod(&'static str),
    #[error("read deadline {read_deadline:?} must be longer than the ping period {ping_period:?}")]
    DeadlineTooShort {
        read_deadline: Duration,
        ping_period: Duration,
    },
    #[error("max players must be at least 1")]
    NoPlayers,
}
