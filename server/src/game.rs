//! Authoritative game state shared by every connection.
//!
//! All access goes through [`Game`], which guards the player table with a single
//! reader/writer lock. The lock is never held across an await point, so pumps on
//! any worker thread can call into it directly.

use log::info;
use parking_lot::RwLock;
use shared::{GameSnapshot, PlayerId, PlayerSnapshot, FIELD_HEIGHT, FIELD_WIDTH, PADDLE_HEIGHT};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("game is full ({capacity} players)")]
    Full { capacity: usize },
    #[error("player {0} is not in the game")]
    UnknownPlayer(PlayerId),
}

#[derive(Debug, Clone, Copy)]
struct Player {
    y: i32,
}

impl Player {
    fn spawn() -> Self {
        Self {
            y: (FIELD_HEIGHT - PADDLE_HEIGHT) / 2,
        }
    }
}

#[derive(Debug)]
pub struct Game {
    players: RwLock<BTreeMap<PlayerId, Player>>,
    max_players: usize,
}

impl Game {
    /// Creates an empty game with `max_players` slots.
    ///
    /// Slot ids are [`PlayerId`]s, so capacity beyond `PlayerId::MAX` is unusable.
    pub fn new(max_players: usize) -> Self {
        Self {
            players: RwLock::new(BTreeMap::new()),
            max_players,
        }
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// Claims the lowest free player slot.
    pub fn register_player(&self) -> Result<PlayerId, GameError> {
        let mut players = self.players.write();
        let slots = PlayerId::try_from(self.max_players).unwrap_or(PlayerId::MAX);
        let id = (0..slots)
            .find(|id| !players.contains_key(id))
            .ok_or(GameError::Full {
                capacity: self.max_players,
            })?;

        let player = Player::spawn();
        info!("Added player {} at y={}", id, player.y);
        players.insert(id, player);
        Ok(id)
    }

    /// Moves a paddle, clamping it inside the field.
    pub fn update_player_position(&self, id: PlayerId, y: i32) -> Result<(), GameError> {
        let mut players = self.players.write();
        let player = players.get_mut(&id).ok_or(GameError::UnknownPlayer(id))?;
        player.y = y.clamp(0, FIELD_HEIGHT - PADDLE_HEIGHT);
        Ok(())
    }

    /// Frees a player's slot so a new player can take it.
    ///
    /// Returns false if the slot was already free.
    pub fn remove_player(&self, id: PlayerId) -> bool {
        let removed = self.players.write().remove(&id).is_some();
        if removed {
            info!("Removed player {}", id);
        }
        removed
    }

    /// Returns the number of occupied slots
    pub fn player_count(&self) -> usize {
        self.players.read().len()
    }

    /// Copies the current state for broadcast.
    ///
    /// Taken under the read lock, so it never mixes values from before and after
    /// a concurrent update. Players are ordered by id.
    pub fn snapshot(&self) -> GameSnapshot {
        let players = self.players.read();
        GameSnapshot {
            width: FIELD_WIDTH,
            height: FIELD_HEIGHT,
            players: players
                .iter()
                .map(|(id, player)| PlayerSnapshot {
                    id: *id,
                    y: player.y,
                })
                .collect(),
        }
    }
}
