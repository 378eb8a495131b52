//! Server configuration, parsed from the command line or the environment.

use crate::error::ConfigError;
use clap::Parser;
use shared::DEFAULT_MAX_PLAYERS;
use std::time::Duration;

pub const UPDATE_PERIOD: Duration = Duration::from_millis(100);
pub const PING_PERIOD: Duration = Duration::from_secs(1);
pub const READ_DEADLINE: Duration = Duration::from_secs(2);
pub const WRITE_WAIT: Duration = Duration::from_millis(500);

/// Timing of the per-connection pumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Interval between `UPDATE` snapshots.
    pub update_period: Duration,
    /// Interval between liveness pings.
    pub ping_period: Duration,
    /// Rolling deadline for the next liveness acknowledgment.
    pub read_deadline: Duration,
    /// Upper bound on any single write.
    pub write_wait: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            update_period: UPDATE_PERIOD,
            ping_period: PING_PERIOD,
            read_deadline: READ_DEADLINE,
            write_wait: WRITE_WAIT,
        }
    }
}

impl ConnectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, period) in [
            ("update period", self.update_period),
            ("ping period", self.ping_period),
            ("read deadline", self.read_deadline),
            ("write wait", self.write_wait),
        ] {
            if period.is_zero() {
                return Err(ConfigError::ZeroPeriod(name));
            }
        }

        // A deadline at or below the ping period drops healthy peers.
        if self.read_deadline <= self.ping_period {
            return Err(ConfigError::DeadlineTooShort {
                read_deadline: self.read_deadline,
                ping_period: self.ping_period,
            });
        }
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct ServerArgs {
    /// Server IP address to bind to
    #[clap(short = 'H', long, env = "PADDLE_HOST", default_value = "127.0.0.1")]
    pub host: String,
    /// Server port to listen on
    #[clap(short, long, env = "PADDLE_PORT", default_value = "8080")]
    pub port: u16,
    /// Number of player slots in the game
    #[clap(short, long, env = "PADDLE_MAX_PLAYERS", default_value_t = DEFAULT_MAX_PLAYERS)]
    pub max_players: usize,
    /// Milliseconds between game state updates
    #[clap(long, env = "PADDLE_UPDATE_MS", default_value = "100")]
    pub update_ms: u64,
    /// Milliseconds between liveness pings
    #[clap(long, env = "PADDLE_PING_MS", default_value = "1000")]
    pub ping_ms: u64,
    /// Milliseconds to wait for a pong before dropping the connection
    #[clap(long, env = "PADDLE_READ_DEADLINE_MS", default_value = "2000")]
    pub read_deadline_ms: u64,
    /// Milliseconds allowed for a single write
    #[clap(long, env = "PADDLE_WRITE_WAIT_MS", default_value = "500")]
    pub write_wait_ms: u64,
}

impl ServerArgs {
    /// Listen address in `host:port` form
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds and validates the per-connection timings.
    ///
    /// Also rejects a game without player slots.
    pub fn connection_config(&self) -> Result<ConnectionConfig, ConfigError> {
        if self.max_players == 0 {
            return Err(ConfigError::NoPlayers);
        }

        let config = ConnectionConfig {
            update_period: Duration::from_millis(self.update_ms),
            ping_period: Duration::from_millis(self.ping_ms),
            read_deadline: Duration::from_millis(self.read_deadline_ms),
            write_wait: Duration::from_millis(self.write_wait_ms),
        };
        config.validate()?;
        Ok(config)
    }
}
