//! Wire protocol shared by the paddle server and its clients.
//!
//! Every frame is a single JSON object carrying a `Type` discriminator. Inbound
//! frames are decoded in two steps: the envelope is read first to learn the tag,
//! then the payload is decoded into the variant that tag names. Unknown tags are
//! reported separately from malformed frames so the server can ignore them quietly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const FIELD_WIDTH: i32 = 800;
pub const FIELD_HEIGHT: i32 = 600;
pub const PADDLE_HEIGHT: i32 = 100;
pub const DEFAULT_MAX_PLAYERS: usize = 2;

pub const READY_TAG: &str = "READY";
pub const UPDATE_POSITION_TAG: &str = "UPDATEPOSITION";
pub const INIT_TAG: &str = "INIT";
pub const UPDATE_TAG: &str = "UPDATE";

pub type PlayerId = u32;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSnapshot {
    #[serde(rename = "ID")]
    pub id: PlayerId,
    #[serde(rename = "Y")]
    pub y: i32,
}

/// Point-in-time copy of the authoritative game state.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct GameSnapshot {
    pub width: i32,
    pub height: i32,
    pub players: Vec<PlayerSnapshot>,
}

impl GameSnapshot {
    pub fn player(&self, id: PlayerId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.id == id)
    }
}

/// Commands a client sends to the server.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "Type")]
pub enum ClientMessage {
    #[serde(rename = "READY")]
    Ready,
    #[serde(rename = "UPDATEPOSITION")]
    UpdatePosition {
        #[serde(rename = "Y")]
        y: i32,
    },
}

/// Messages the server pushes to a client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "Type")]
pub enum ServerMessage {
    #[serde(rename = "INIT")]
    Init {
        #[serde(rename = "Game")]
        game: GameSnapshot,
        #[serde(rename = "MyPlayerID")]
        my_player_id: PlayerId,
    },
    #[serde(rename = "UPDATE")]
    Update {
        #[serde(rename = "Game")]
        game: GameSnapshot,
    },
}

impl ServerMessage {
    pub fn game(&self) -> &GameSnapshot {
        match self {
            ServerMessage::Init { game, .. } | ServerMessage::Update { game } => game,
        }
    }
}

/// Result of decoding one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(ClientMessage),
    Unknown(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "Type")]
    kind: String,
}

pub fn decode_client_message(payload: &[u8]) -> Result<Inbound, ProtocolError> {
    let envelope: Envelope = serde_json::from_slice(payload)?;
    match envelope.kind.as_str() {
        READY_TAG | UPDATE_POSITION_TAG => Ok(Inbound::Command(serde_json::from_slice(payload)?)),
        _ => Ok(Inbound::Unknown(envelope.kind)),
    }
}

pub fn encode_client_message(message: &ClientMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

pub fn encode_server_message(message: &ServerMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode_server_message(payload: &[u8]) -> Result<ServerMessage, ProtocolError> {
    Ok(serde_json::from_slice(payload)?)
}
